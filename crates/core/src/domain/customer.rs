use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::contains_folded;
use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        contains_folded(&self.name, &needle)
            || self.email.as_deref().is_some_and(|value| contains_folded(value, &needle))
            || self.phone.as_deref().is_some_and(|value| contains_folded(value, &needle))
    }
}

/// How many of a customer's latest sales are summarised in listings.
pub const RECENT_SALES_WINDOW: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerListing {
    pub customer: Customer,
    /// Totals of the customer's most recent sales, newest first, at most
    /// [`RECENT_SALES_WINDOW`] entries.
    pub recent_sale_totals: Vec<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub limit: u32,
}
