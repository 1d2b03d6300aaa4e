pub mod countdown;
pub mod identity;
pub mod seat;

pub use countdown::{Countdown, CountdownPoll};
pub use identity::HolderIdentity;
pub use seat::{HoldSession, SeatLockResult, SeatStatus, SeatUpdate};
