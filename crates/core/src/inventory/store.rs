use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::customer::{Customer, CustomerFilter, CustomerListing};
use crate::domain::inventory::{InventoryMovement, StockChange, StockChangeOutcome};
use crate::domain::product::{Product, ProductFilter, ProductId, ProductListing};
use crate::domain::sale::{Sale, SaleFilter};
use crate::errors::ApplicationError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store failure: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Backing store boundary. Nothing outside the data access operations talks to
/// an implementation of this trait directly.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Products matching `filter`, newest first, each with its recent movement count.
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductListing>, StoreError>;

    async fn all_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Products at or below their threshold. The default scans the whole set;
    /// stores that can compare columns should push the predicate down.
    async fn low_stock_products(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.all_products().await?;
        Ok(products.into_iter().filter(Product::is_low_stock).collect())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Reads the current stock, applies `change` and appends the ledger entry
    /// as one atomic unit. Either both writes persist or neither does.
    async fn apply_stock_change(
        &self,
        change: &StockChange,
    ) -> Result<StockChangeOutcome, StoreError>;

    async fn movements_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InventoryMovement>, StoreError>;

    /// Customers matching `filter`, newest first, limited to `filter.limit`.
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> Result<Vec<CustomerListing>, StoreError>;

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError>;

    /// Sales matching `filter`, newest first, with their line items.
    async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError>;
}
