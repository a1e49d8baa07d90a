//! Parameter and result records of the data access operations.
//!
//! Results serialize to the JSON the reasoning capability reads; money stays a
//! `Decimal` internally and becomes text only through serde.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerId, CustomerListing};
use crate::domain::inventory::{InventoryMovement, MovementId, MovementType};
use crate::domain::product::{Product, ProductId, ProductListing};
use crate::domain::report::ReportType;
use crate::domain::sale::{Sale, SaleId, SaleItem};

pub const DEFAULT_CUSTOMER_LIMIT: u32 = 10;
pub const DEFAULT_SALES_LIMIT: u32 = 20;
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub low_stock: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub min_stock_level: Option<i32>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockUpdateRequest {
    pub product_id: String,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub notes: Option<String>,
    pub user_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCustomerRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub user_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SalesQuery {
    pub customer_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub days: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub min_stock_level: Option<i32>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub recent_movements: u32,
}

impl From<ProductListing> for ProductSummary {
    fn from(listing: ProductListing) -> Self {
        let ProductListing { product, recent_movements } = listing;
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock_quantity: product.stock_quantity,
            min_stock_level: product.min_stock_level,
            category: product.category,
            barcode: product.barcode,
            recent_movements,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub min_stock_level: i32,
    pub category: Option<String>,
}

impl From<&Product> for CreatedProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            stock_quantity: product.stock_quantity,
            min_stock_level: product.effective_min_stock_level(),
            category: product.category.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdateResult {
    pub product: UpdatedStock,
    pub movement: MovementReceipt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedStock {
    pub id: ProductId,
    pub name: String,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub quantity_changed: i32,
    pub min_stock_level: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReceipt {
    pub id: MovementId,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub created_at: DateTime<Utc>,
}

impl From<&InventoryMovement> for MovementReceipt {
    fn from(movement: &InventoryMovement) -> Self {
        Self {
            id: movement.id,
            movement_type: movement.movement_type,
            created_at: movement.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub recent_sales: u32,
    pub total_recent_sales: Decimal,
}

impl From<CustomerListing> for CustomerSummary {
    fn from(listing: CustomerListing) -> Self {
        let CustomerListing { customer, recent_sale_totals } = listing;
        Self {
            id: customer.id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            address: customer.address,
            recent_sales: recent_sale_totals.len() as u32,
            total_recent_sales: recent_sale_totals.iter().copied().sum(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCustomer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSummary {
    pub id: SaleId,
    pub customer: String,
    pub total_amount: Decimal,
    pub payment_method: Option<String>,
    pub items_count: u32,
    pub items: Vec<SaleLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<SaleItem> for SaleLine {
    fn from(item: SaleItem) -> Self {
        Self {
            product: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        }
    }
}

impl From<Sale> for SaleSummary {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id,
            customer: sale.customer_name.unwrap_or_else(|| WALK_IN_CUSTOMER.to_string()),
            total_amount: sale.total_amount,
            payment_method: sale.payment_method,
            items_count: sale.items.len() as u32,
            items: sale.items.into_iter().map(SaleLine::from).collect(),
            created_at: sale.created_at,
        }
    }
}
