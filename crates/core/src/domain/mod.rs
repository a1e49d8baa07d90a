pub mod customer;
pub mod identifier;
pub mod inventory;
pub mod product;
pub mod report;
pub mod sale;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the authenticated user that owns or performs a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
