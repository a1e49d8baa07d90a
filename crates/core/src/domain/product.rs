use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

/// Threshold applied when a product carries no explicit minimum stock level.
pub const DEFAULT_MIN_STOCK_LEVEL: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub Uuid);

impl ProductId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub min_stock_level: Option<i32>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn effective_min_stock_level(&self) -> i32 {
        self.min_stock_level.unwrap_or(DEFAULT_MIN_STOCK_LEVEL)
    }

    /// Low stock is derived, never stored: the threshold itself counts as low.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.effective_min_stock_level()
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        contains_folded(&self.name, &needle)
            || self.description.as_deref().is_some_and(|value| contains_folded(value, &needle))
            || self.barcode.as_deref().is_some_and(|value| contains_folded(value, &needle))
    }

    pub fn matches_category(&self, category: &str) -> bool {
        let needle = category.to_lowercase();
        self.category.as_deref().is_some_and(|value| contains_folded(value, &needle))
    }
}

pub(crate) fn contains_folded(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// A product row together with the number of its most recent ledger entries
/// (capped at [`RECENT_MOVEMENT_WINDOW`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductListing {
    pub product: Product,
    pub recent_movements: u32,
}

pub const RECENT_MOVEMENT_WINDOW: u32 = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{Product, ProductId, DEFAULT_MIN_STOCK_LEVEL};
    use crate::domain::UserId;

    fn product(stock_quantity: i32, min_stock_level: Option<i32>) -> Product {
        Product {
            id: ProductId::new(),
            name: "Widget".to_string(),
            description: Some("Blue steel widget".to_string()),
            price: Decimal::new(1999, 2),
            stock_quantity,
            min_stock_level,
            category: Some("Hardware".to_string()),
            barcode: Some("WID-0001".to_string()),
            user_id: UserId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_is_inclusive_of_threshold() {
        assert!(product(5, Some(5)).is_low_stock());
        assert!(product(4, Some(5)).is_low_stock());
        assert!(!product(6, Some(5)).is_low_stock());
    }

    #[test]
    fn missing_threshold_falls_back_to_default() {
        let at_default = product(DEFAULT_MIN_STOCK_LEVEL, None);
        assert_eq!(at_default.effective_min_stock_level(), DEFAULT_MIN_STOCK_LEVEL);
        assert!(at_default.is_low_stock());
        assert!(!product(DEFAULT_MIN_STOCK_LEVEL + 1, None).is_low_stock());
    }

    #[test]
    fn zero_threshold_is_honoured() {
        assert!(!product(1, Some(0)).is_low_stock());
        assert!(product(0, Some(0)).is_low_stock());
    }

    #[test]
    fn search_matches_name_description_or_barcode_case_insensitively() {
        let item = product(10, None);
        assert!(item.matches_search("widg"));
        assert!(item.matches_search("STEEL"));
        assert!(item.matches_search("wid-0001"));
        assert!(!item.matches_search("gadget"));
    }

    #[test]
    fn category_matches_substring() {
        let item = product(10, None);
        assert!(item.matches_category("hard"));
        assert!(!item.matches_category("software"));
    }
}
