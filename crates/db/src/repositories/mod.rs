use thiserror::Error;

use stockroom_core::inventory::StoreError;

pub mod inventory;
pub mod memory;
mod rows;

pub use inventory::SqlInventoryStore;
pub use memory::InMemoryInventoryStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => StoreError::Backend(error.to_string()),
            RepositoryError::Decode(message) => StoreError::Decode(message),
            RepositoryError::Store(error) => error,
        }
    }
}
