pub mod booking;
pub mod channel;
pub mod config;
pub mod countdown;
pub mod error;
pub mod gateway;
pub mod payment;
pub mod promo;

pub use booking::{BookingApi, BookingCreated, CreateBookingRequest, RestBookingGateway};
pub use channel::{PushTransport, ReconnectPolicy, SeatLockChannel, SubscriptionGuard, WsTransport};
pub use config::Config;
pub use countdown::HoldCountdown;
pub use error::{ChannelError, GatewayError};
pub use gateway::{RestSeatLockGateway, SeatLockApi, SeatRequest};
pub use payment::{PaymentApi, PaymentOutcome, PaymentTarget, RestPaymentGateway};
pub use promo::{PromoError, PromotionApi, RestPromotionGateway};
