//! Data access operations over the inventory store.

pub mod operations;
pub mod records;
pub mod store;

pub use operations::InventoryOperations;
pub use records::{
    CreatedCustomer, CreatedProduct, CustomerQuery, CustomerSummary, MovementReceipt,
    NewCustomerRequest, NewProductRequest, ProductQuery, ProductSummary, ReportRequest,
    SaleLine, SaleSummary, SalesQuery, StockUpdateRequest, StockUpdateResult, UpdatedStock,
};
pub use store::{InventoryStore, StoreError};
