//! The seven inventory tools exposed to the reasoning capability.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use stockroom_core::domain::inventory::MovementType;
use stockroom_core::domain::product::DEFAULT_MIN_STOCK_LEVEL;
use stockroom_core::domain::report::ReportType;
use stockroom_core::errors::{ApplicationError, DomainError};
use stockroom_core::inventory::{
    CustomerQuery, NewCustomerRequest, NewProductRequest, ProductQuery, ReportRequest, SalesQuery,
    StockUpdateRequest,
};

use crate::memory::{ContextPatch, CustomerFocus, ProductFocus};
use crate::tools::{decode_arguments, encode_result, object_schema, supplied, Param, Tool, ToolContext};

pub fn all() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(GetProducts),
        Box::new(CreateProduct),
        Box::new(UpdateStock),
        Box::new(GetCustomers),
        Box::new(CreateCustomer),
        Box::new(GetSales),
        Box::new(GetInventoryReport),
    ]
}

pub struct GetProducts;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetProductsArgs {
    category: Option<String>,
    #[serde(rename = "lowStock")]
    low_stock: Option<bool>,
    search: Option<String>,
}

#[async_trait]
impl Tool for GetProducts {
    fn name(&self) -> &'static str {
        "get_products"
    }

    fn description(&self) -> &'static str {
        "Search and retrieve products from the inventory. Can filter by category, search term, or show only low stock items."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            ("category", Param::Nullable("string"), "Product category to filter by (optional)"),
            ("lowStock", Param::Nullable("boolean"), "Whether to show only low stock products (optional)"),
            (
                "search",
                Param::Nullable("string"),
                "Search term for product name, description, or barcode (optional)",
            ),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: GetProductsArgs = decode_arguments(self.name(), arguments)?;
        let search = supplied(args.search);
        let searched = search.is_some();

        let products = context
            .operations
            .list_products(ProductQuery {
                category: supplied(args.category),
                search,
                low_stock: args.low_stock.unwrap_or(false),
            })
            .await?;

        if !products.is_empty() {
            let mut patch = ContextPatch::action(format!("Retrieved {} products", products.len()));
            if let [only] = products.as_slice() {
                if searched {
                    patch = patch.with_product(ProductFocus {
                        id: only.id,
                        name: only.name.clone(),
                        stock_quantity: only.stock_quantity,
                        min_stock_level: only.min_stock_level.unwrap_or(DEFAULT_MIN_STOCK_LEVEL),
                    });
                }
            }
            context.memory.update_context(context.session_id, patch).await;
        }

        encode_result(&products)
    }
}

pub struct CreateProduct;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateProductArgs {
    name: String,
    description: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    min_stock_level: Option<i32>,
    category: Option<String>,
    barcode: Option<String>,
    #[serde(rename = "userId")]
    user_id: String,
}

#[async_trait]
impl Tool for CreateProduct {
    fn name(&self) -> &'static str {
        "create_product"
    }

    fn description(&self) -> &'static str {
        "Create a new product in the inventory system."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            ("name", Param::Required("string"), "Product name"),
            ("description", Param::Nullable("string"), "Product description (optional)"),
            ("price", Param::Required("number"), "Product price"),
            ("stock_quantity", Param::Required("integer"), "Initial stock quantity"),
            (
                "min_stock_level",
                Param::Nullable("integer"),
                "Minimum stock level for alerts (optional, defaults to 5)",
            ),
            ("category", Param::Nullable("string"), "Product category (optional)"),
            ("barcode", Param::Nullable("string"), "Product barcode (optional)"),
            ("userId", Param::Required("string"), "User ID creating the product"),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: CreateProductArgs = decode_arguments(self.name(), arguments)?;
        let user_id = args.user_id.trim().to_string();

        let created = context
            .operations
            .create_product(NewProductRequest {
                name: args.name,
                description: supplied(args.description),
                price: args.price,
                stock_quantity: args.stock_quantity,
                min_stock_level: args.min_stock_level,
                category: supplied(args.category),
                barcode: supplied(args.barcode),
                user_id: user_id.clone(),
            })
            .await?;

        let patch = ContextPatch::action(format!("Created product \"{}\"", created.name))
            .with_product(ProductFocus {
                id: created.id,
                name: created.name.clone(),
                stock_quantity: created.stock_quantity,
                min_stock_level: created.min_stock_level,
            })
            .with_user(user_id);
        context.memory.update_context(context.session_id, patch).await;

        encode_result(&created)
    }
}

pub struct UpdateStock;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateStockArgs {
    #[serde(rename = "productId")]
    product_id: Option<String>,
    quantity: i32,
    #[serde(rename = "movementType")]
    movement_type: String,
    notes: Option<String>,
    #[serde(rename = "userId")]
    user_id: String,
}

#[async_trait]
impl Tool for UpdateStock {
    fn name(&self) -> &'static str {
        "update_stock"
    }

    fn description(&self) -> &'static str {
        "Update stock levels for a product. This creates an inventory movement record."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            (
                "productId",
                Param::Nullable("string"),
                "Product UUID to update; null uses the product currently being discussed",
            ),
            (
                "quantity",
                Param::Required("integer"),
                "Quantity change (positive for increase, negative for decrease)",
            ),
            (
                "movementType",
                Param::OneOf(&["purchase", "sale", "adjustment", "return"]),
                "Type of stock movement",
            ),
            ("notes", Param::Nullable("string"), "Notes about the stock movement (optional)"),
            ("userId", Param::Required("string"), "User ID performing the update"),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: UpdateStockArgs = decode_arguments(self.name(), arguments)?;
        let movement_type: MovementType = args.movement_type.parse()?;
        let user_id = args.user_id.trim().to_string();

        let product_id = match supplied(args.product_id) {
            Some(id) => id,
            None => context
                .memory
                .context(context.session_id)
                .await
                .current_product
                .map(|product| product.id.to_string())
                .ok_or(DomainError::InvalidIdentifier { field: "productId", value: String::new() })?,
        };

        let updated = context
            .operations
            .update_stock(StockUpdateRequest {
                product_id,
                quantity: args.quantity,
                movement_type,
                notes: supplied(args.notes),
                user_id: user_id.clone(),
            })
            .await?;

        let product = &updated.product;
        let patch = ContextPatch::action(format!(
            "Updated stock for \"{}\" by {} ({})",
            product.name, args.quantity, movement_type
        ))
        .with_product(ProductFocus {
            id: product.id,
            name: product.name.clone(),
            stock_quantity: product.new_stock,
            min_stock_level: product.min_stock_level,
        })
        .with_user(user_id);
        context.memory.update_context(context.session_id, patch).await;

        encode_result(&updated)
    }
}

pub struct GetCustomers;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetCustomersArgs {
    search: Option<String>,
    limit: Option<u32>,
}

#[async_trait]
impl Tool for GetCustomers {
    fn name(&self) -> &'static str {
        "get_customers"
    }

    fn description(&self) -> &'static str {
        "Search and retrieve customer information."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            (
                "search",
                Param::Nullable("string"),
                "Search term for customer name, email, or phone (optional)",
            ),
            (
                "limit",
                Param::Nullable("integer"),
                "Maximum number of customers to return (optional, defaults to 10)",
            ),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: GetCustomersArgs = decode_arguments(self.name(), arguments)?;
        let search = supplied(args.search);
        let searched = search.is_some();

        let customers =
            context.operations.list_customers(CustomerQuery { search, limit: args.limit }).await?;

        if !customers.is_empty() {
            let mut patch = ContextPatch::action(format!("Retrieved {} customers", customers.len()));
            if let [only] = customers.as_slice() {
                if searched {
                    patch = patch.with_customer(CustomerFocus { id: only.id, name: only.name.clone() });
                }
            }
            context.memory.update_context(context.session_id, patch).await;
        }

        encode_result(&customers)
    }
}

pub struct CreateCustomer;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateCustomerArgs {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    #[serde(rename = "userId")]
    user_id: String,
}

#[async_trait]
impl Tool for CreateCustomer {
    fn name(&self) -> &'static str {
        "create_customer"
    }

    fn description(&self) -> &'static str {
        "Create a new customer record."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            ("name", Param::Required("string"), "Customer name"),
            ("email", Param::Nullable("string"), "Customer email address (optional)"),
            ("phone", Param::Nullable("string"), "Customer phone number (optional)"),
            ("address", Param::Nullable("string"), "Customer address (optional)"),
            ("userId", Param::Required("string"), "User ID creating the customer"),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: CreateCustomerArgs = decode_arguments(self.name(), arguments)?;
        let user_id = args.user_id.trim().to_string();

        let created = context
            .operations
            .create_customer(NewCustomerRequest {
                name: args.name,
                email: supplied(args.email),
                phone: supplied(args.phone),
                address: supplied(args.address),
                user_id: user_id.clone(),
            })
            .await?;

        let patch = ContextPatch::action(format!("Created customer \"{}\"", created.name))
            .with_customer(CustomerFocus { id: created.id, name: created.name.clone() })
            .with_user(user_id);
        context.memory.update_context(context.session_id, patch).await;

        encode_result(&created)
    }
}

pub struct GetSales;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetSalesArgs {
    #[serde(rename = "customerId")]
    customer_id: Option<String>,
    #[serde(rename = "dateFrom")]
    date_from: Option<String>,
    #[serde(rename = "dateTo")]
    date_to: Option<String>,
    limit: Option<u32>,
}

#[async_trait]
impl Tool for GetSales {
    fn name(&self) -> &'static str {
        "get_sales"
    }

    fn description(&self) -> &'static str {
        "Retrieve sales history with optional filtering by customer or date range."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            ("customerId", Param::Nullable("string"), "Customer ID to filter by (optional)"),
            (
                "dateFrom",
                Param::Nullable("string"),
                "Start date for filtering in YYYY-MM-DD format (optional)",
            ),
            ("dateTo", Param::Nullable("string"), "End date for filtering in YYYY-MM-DD format (optional)"),
            (
                "limit",
                Param::Nullable("integer"),
                "Maximum number of sales to return (optional, defaults to 20)",
            ),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: GetSalesArgs = decode_arguments(self.name(), arguments)?;

        let sales = context
            .operations
            .list_sales(SalesQuery {
                customer_id: supplied(args.customer_id),
                date_from: supplied(args.date_from),
                date_to: supplied(args.date_to),
                limit: args.limit,
            })
            .await?;

        context
            .memory
            .update_context(
                context.session_id,
                ContextPatch::action(format!("Retrieved {} sales records", sales.len())),
            )
            .await;

        encode_result(&sales)
    }
}

pub struct GetInventoryReport;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetInventoryReportArgs {
    #[serde(rename = "type")]
    report_type: String,
    days: Option<u32>,
}

#[async_trait]
impl Tool for GetInventoryReport {
    fn name(&self) -> &'static str {
        "get_inventory_report"
    }

    fn description(&self) -> &'static str {
        "Generate various inventory and sales reports including low stock alerts, movement summaries, and category analysis."
    }

    fn parameters(&self) -> Value {
        object_schema(&[
            (
                "type",
                Param::OneOf(&["low_stock", "movement_summary", "category_summary"]),
                "Type of report to generate",
            ),
            (
                "days",
                Param::Nullable("integer"),
                "Number of days to include in the report (optional, defaults to 30)",
            ),
        ])
    }

    async fn execute(
        &self,
        context: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<Value, ApplicationError> {
        let args: GetInventoryReportArgs = decode_arguments(self.name(), arguments)?;
        let report_type: ReportType = args.report_type.parse()?;

        let report =
            context.operations.inventory_report(ReportRequest { report_type, days: args.days }).await?;

        context
            .memory
            .update_context(
                context.session_id,
                ContextPatch::action(format!("Generated {report_type} report")),
            )
            .await;

        encode_result(&report)
    }
}
