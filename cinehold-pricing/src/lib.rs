pub mod aggregator;
pub mod models;

pub use aggregator::{compute_final, PriceBreakdown};
pub use models::{ComboLine, ComboSelection, DiscountType, Promotion, RankDiscount};
