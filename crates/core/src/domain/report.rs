use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::MovementType;
use crate::domain::product::ProductId;
use crate::errors::DomainError;

/// Label used for products without a category in the category summary.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

pub const DEFAULT_REPORT_DAYS: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    LowStock,
    MovementSummary,
    CategorySummary,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "low_stock",
            Self::MovementSummary => "movement_summary",
            Self::CategorySummary => "category_summary",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "low_stock" => Ok(Self::LowStock),
            "movement_summary" => Ok(Self::MovementSummary),
            "category_summary" => Ok(Self::CategorySummary),
            other => Err(DomainError::InvalidReportType(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryReport {
    LowStock {
        products: Vec<LowStockEntry>,
    },
    MovementSummary {
        period_days: u32,
        total_movements: u32,
        summary: BTreeMap<MovementType, MovementTally>,
    },
    CategorySummary {
        categories: Vec<CategorySummaryEntry>,
    },
}

impl InventoryReport {
    pub fn report_type(&self) -> ReportType {
        match self {
            Self::LowStock { .. } => ReportType::LowStock,
            Self::MovementSummary { .. } => ReportType::MovementSummary,
            Self::CategorySummary { .. } => ReportType::CategorySummary,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LowStockEntry {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: i32,
    pub min_stock_level: Option<i32>,
    pub category: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MovementTally {
    pub count: u32,
    pub total_quantity: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorySummaryEntry {
    pub category: String,
    pub product_count: u32,
    pub total_stock: i64,
    pub average_price: Decimal,
}
