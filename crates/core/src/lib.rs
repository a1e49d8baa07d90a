pub mod config;
pub mod domain;
pub mod errors;
pub mod inventory;

pub use domain::customer::{Customer, CustomerId};
pub use domain::inventory::{InventoryMovement, MovementId, MovementType};
pub use domain::product::{Product, ProductId};
pub use domain::report::{InventoryReport, ReportType};
pub use domain::sale::{Sale, SaleId, SaleItem};
pub use domain::UserId;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use inventory::{InventoryOperations, InventoryStore, StoreError};
