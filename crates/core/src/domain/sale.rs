use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub Uuid);

impl SaleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SaleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Sales are read-only here; they are written by the point-of-sale surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub customer_id: Option<CustomerId>,
    pub customer_name: Option<String>,
    pub total_amount: Decimal,
    pub payment_method: Option<String>,
    pub items: Vec<SaleItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: Option<ProductId>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleFilter {
    pub customer_id: Option<CustomerId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: u32,
}

impl SaleFilter {
    pub fn admits(&self, sale: &Sale) -> bool {
        if let Some(customer_id) = self.customer_id {
            if sale.customer_id != Some(customer_id) {
                return false;
            }
        }
        if self.created_from.is_some_and(|from| sale.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| sale.created_at > to) {
            return false;
        }
        true
    }
}
