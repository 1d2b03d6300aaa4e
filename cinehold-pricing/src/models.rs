use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One food & beverage combo line in the cart, with the unit price snapshotted
/// at selection time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboLine {
    pub name: String,
    /// Minor currency units
    pub unit_price: i64,
    pub quantity: u32,
}

/// Selected combos keyed by combo item id.
///
/// Quantity zero means "not selected"; setting a line to zero removes it, so
/// iteration never sees dead entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboSelection(BTreeMap<String, ComboLine>);

impl ComboSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, combo_id: impl Into<String>, name: impl Into<String>, unit_price: i64, quantity: u32) {
        let combo_id = combo_id.into();
        if quantity == 0 {
            self.0.remove(&combo_id);
        } else {
            self.0.insert(combo_id, ComboLine { name: name.into(), unit_price, quantity });
        }
    }

    pub fn quantity(&self, combo_id: &str) -> u32 {
        self.0.get(combo_id).map(|line| line.quantity).unwrap_or(0)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&String, &ComboLine)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Σ quantity × unit price
    pub fn total(&self) -> i64 {
        self.0
            .values()
            .map(|line| i64::from(line.quantity) * line.unit_price)
            .sum()
    }
}

/// How a promotion discounts the subtotal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    FixedAmount,
    Percentage,
}

/// Promotion snapshot as returned by the promotion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

/// Loyalty-rank discount, applied on top of any promotion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankDiscount {
    pub enabled: bool,
    pub percentage: f64,
}

impl Default for RankDiscount {
    fn default() -> Self {
        Self { enabled: false, percentage: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut combos = ComboSelection::new();
        combos.set("c1", "Popcorn + Cola", 50_000, 2);
        assert_eq!(combos.quantity("c1"), 2);
        assert_eq!(combos.total(), 100_000);

        combos.set("c1", "Popcorn + Cola", 50_000, 0);
        assert!(combos.is_empty());
        assert_eq!(combos.quantity("c1"), 0);
    }

    #[test]
    fn test_total_sums_all_lines() {
        let mut combos = ComboSelection::new();
        combos.set("c1", "Popcorn", 45_000, 1);
        combos.set("c2", "Nachos", 60_000, 3);
        assert_eq!(combos.total(), 45_000 + 180_000);
    }
}
