use crate::models::{ComboSelection, DiscountType, Promotion, RankDiscount};
use serde::{Deserialize, Serialize};

/// Derived price summary for the confirm step. Pure function of its inputs,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub combo_total: i64,
    pub promo_discount: i64,
    pub rank_discount: i64,
    pub final_total: i64,
}

/// Combine base seat price, combo lines, promotion and rank discount into the
/// payable amount.
///
/// Percentage discounts round to the nearest minor unit. A fixed-amount
/// promotion applies verbatim but never exceeds the subtotal. Promotion and
/// rank discounts stack additively, both computed against the same subtotal,
/// and the final total is clamped at zero.
pub fn compute_final(
    base_seat_total: i64,
    combos: &ComboSelection,
    promotion: Option<&Promotion>,
    rank: &RankDiscount,
) -> PriceBreakdown {
    let combo_total = combos.total();
    let subtotal = base_seat_total + combo_total;

    let promo_discount = match promotion {
        Some(promo) => match promo.discount_type {
            DiscountType::Percentage => percentage_of(subtotal, promo.discount_value),
            DiscountType::FixedAmount => (promo.discount_value.round() as i64).min(subtotal),
        },
        None => 0,
    };

    let rank_discount = if rank.enabled {
        percentage_of(subtotal, rank.percentage)
    } else {
        0
    };

    PriceBreakdown {
        combo_total,
        promo_discount,
        rank_discount,
        final_total: (subtotal - promo_discount - rank_discount).max(0),
    }
}

fn percentage_of(amount: i64, percentage: f64) -> i64 {
    (amount as f64 * percentage / 100.0).round() as i64
}
