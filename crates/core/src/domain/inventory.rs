use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::{Product, ProductId};
use crate::domain::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub Uuid);

impl MovementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Purchase,
    Sale,
    Adjustment,
    Return,
}

impl MovementType {
    pub const ALL: [MovementType; 4] =
        [MovementType::Purchase, MovementType::Sale, MovementType::Adjustment, MovementType::Return];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Adjustment => "adjustment",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "purchase" => Ok(Self::Purchase),
            "sale" => Ok(Self::Sale),
            "adjustment" => Ok(Self::Adjustment),
            "return" => Ok(Self::Return),
            other => Err(DomainError::InvalidAction(format!(
                "unsupported movement type `{other}` (expected purchase|sale|adjustment|return)"
            ))),
        }
    }
}

/// Immutable ledger entry. `new_stock = previous_stock + quantity_change`
/// and `new_stock >= 0` hold for every persisted row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity_change: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A stock change handed to the backing store, which applies the
/// read-modify-write and the ledger append as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockChange {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub quantity_change: i32,
    pub movement_type: MovementType,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub requested_at: DateTime<Utc>,
}

impl StockChange {
    /// Stock after applying this change to `previous_stock`, or the rejected
    /// outcome when it would go negative or past `i32::MAX`.
    pub fn resulting_stock(&self, previous_stock: i32) -> Result<i32, StockChangeOutcome> {
        match previous_stock.checked_add(self.quantity_change) {
            Some(stock) if stock >= 0 => Ok(stock),
            Some(_) => Err(StockChangeOutcome::WouldGoNegative { current: previous_stock }),
            None if self.quantity_change < 0 => {
                Err(StockChangeOutcome::WouldGoNegative { current: previous_stock })
            }
            None => Err(StockChangeOutcome::WouldOverflow { current: previous_stock }),
        }
    }

    pub fn movement_for(&self, previous_stock: i32, new_stock: i32) -> InventoryMovement {
        InventoryMovement {
            id: self.movement_id,
            product_id: self.product_id,
            movement_type: self.movement_type,
            quantity_change: self.quantity_change,
            previous_stock,
            new_stock,
            notes: self.notes.clone(),
            user_id: self.user_id,
            created_at: self.requested_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StockChangeOutcome {
    Applied { product: Product, movement: InventoryMovement },
    ProductMissing,
    WouldGoNegative { current: i32 },
    WouldOverflow { current: i32 },
}
