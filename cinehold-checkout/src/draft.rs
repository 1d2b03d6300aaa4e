use crate::machine::CheckoutStep;
use cinehold_pricing::{compute_final, ComboSelection, PriceBreakdown, Promotion, RankDiscount};
use serde::{Deserialize, Serialize};

/// Contact details collected in the guest flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// The serializable state of an in-progress checkout.
///
/// Entirely client-owned: created on first entry to the flow, updated on every
/// field change, cleared on payment confirmation, cancellation, or hold
/// expiry. `booking_id` stays absent while a guest has not yet created a
/// server-side booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDraft {
    pub booking_id: Option<String>,
    pub active_step: CheckoutStep,
    pub selected_combos: ComboSelection,
    pub customer: Option<CustomerInfo>,
    pub payment_method: Option<String>,
    pub applied_promotion: Option<Promotion>,
    pub rank_discount: RankDiscount,
}

impl CheckoutDraft {
    pub fn new(entry_step: CheckoutStep) -> Self {
        Self {
            booking_id: None,
            active_step: entry_step,
            selected_combos: ComboSelection::new(),
            customer: None,
            payment_method: None,
            applied_promotion: None,
            rank_discount: RankDiscount::default(),
        }
    }

    /// Price summary for the current draft against the held seats' base total
    pub fn breakdown(&self, base_seat_total: i64) -> PriceBreakdown {
        compute_final(
            base_seat_total,
            &self.selected_combos,
            self.applied_promotion.as_ref(),
            &self.rank_discount,
        )
    }
}
