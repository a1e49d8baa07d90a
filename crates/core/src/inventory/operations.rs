use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::customer::{Customer, CustomerFilter, CustomerId};
use crate::domain::identifier::parse_identifier;
use crate::domain::inventory::{MovementId, StockChange, StockChangeOutcome};
use crate::domain::product::{Product, ProductFilter, ProductId, DEFAULT_MIN_STOCK_LEVEL};
use crate::domain::report::{
    CategorySummaryEntry, InventoryReport, LowStockEntry, MovementTally, ReportType,
    DEFAULT_REPORT_DAYS, UNCATEGORIZED_LABEL,
};
use crate::domain::sale::SaleFilter;
use crate::domain::UserId;
use crate::errors::{ApplicationError, DomainError};
use crate::inventory::records::{
    CreatedCustomer, CreatedProduct, CustomerQuery, CustomerSummary, MovementReceipt,
    NewCustomerRequest, NewProductRequest, ProductQuery, ProductSummary, ReportRequest,
    SaleSummary, SalesQuery, StockUpdateRequest, StockUpdateResult, UpdatedStock,
    DEFAULT_CUSTOMER_LIMIT, DEFAULT_SALES_LIMIT,
};
use crate::inventory::store::InventoryStore;

/// Validated, typed operations over products, customers, sales and the
/// inventory ledger.
#[derive(Clone)]
pub struct InventoryOperations {
    store: Arc<dyn InventoryStore>,
}

impl InventoryOperations {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn list_products(
        &self,
        query: ProductQuery,
    ) -> Result<Vec<ProductSummary>, ApplicationError> {
        let filter = ProductFilter {
            category: non_blank(query.category),
            search: non_blank(query.search),
        };
        let listings = self.store.list_products(&filter).await?;

        let summaries: Vec<ProductSummary> = listings
            .into_iter()
            .filter(|listing| !query.low_stock || listing.product.is_low_stock())
            .map(ProductSummary::from)
            .collect();

        debug!(
            event_name = "inventory.products.listed",
            result_count = summaries.len(),
            low_stock_only = query.low_stock,
            "listed products"
        );
        Ok(summaries)
    }

    pub async fn create_product(
        &self,
        request: NewProductRequest,
    ) -> Result<CreatedProduct, ApplicationError> {
        let user_id = UserId(parse_identifier("userId", &request.user_id)?);
        let name = required_text("name", request.name)?;
        if request.price.is_sign_negative() && !request.price.is_zero() {
            return Err(DomainError::InvalidArgument {
                field: "price",
                message: format!("price must not be negative (got {})", request.price),
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name,
            description: non_blank(request.description),
            price: request.price,
            stock_quantity: request.stock_quantity,
            min_stock_level: Some(request.min_stock_level.unwrap_or(DEFAULT_MIN_STOCK_LEVEL)),
            category: non_blank(request.category),
            barcode: non_blank(request.barcode),
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_product(&product).await?;

        info!(
            event_name = "inventory.product.created",
            product_id = %product.id,
            user_id = %user_id,
            "product created"
        );
        Ok(CreatedProduct::from(&product))
    }

    pub async fn update_stock(
        &self,
        request: StockUpdateRequest,
    ) -> Result<StockUpdateResult, ApplicationError> {
        let product_id = ProductId(parse_identifier("productId", &request.product_id)?);
        let user_id = UserId(parse_identifier("userId", &request.user_id)?);

        let change = StockChange {
            movement_id: MovementId::new(),
            product_id,
            quantity_change: request.quantity,
            movement_type: request.movement_type,
            notes: non_blank(request.notes),
            user_id,
            requested_at: Utc::now(),
        };

        match self.store.apply_stock_change(&change).await? {
            StockChangeOutcome::Applied { product, movement } => {
                info!(
                    event_name = "inventory.stock.updated",
                    product_id = %product.id,
                    movement_id = %movement.id.0,
                    movement_type = %movement.movement_type,
                    previous_stock = movement.previous_stock,
                    new_stock = movement.new_stock,
                    "stock updated"
                );
                Ok(StockUpdateResult {
                    product: UpdatedStock {
                        id: product.id,
                        name: product.name.clone(),
                        previous_stock: movement.previous_stock,
                        new_stock: movement.new_stock,
                        quantity_changed: movement.quantity_change,
                        min_stock_level: product.effective_min_stock_level(),
                    },
                    movement: MovementReceipt::from(&movement),
                })
            }
            StockChangeOutcome::ProductMissing => Err(DomainError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            }
            .into()),
            StockChangeOutcome::WouldOverflow { current } => Err(DomainError::InvalidArgument {
                field: "quantity",
                message: format!(
                    "adding {} to the current stock of {current} exceeds the largest storable quantity",
                    request.quantity
                ),
            }
            .into()),
            StockChangeOutcome::WouldGoNegative { current } => {
                info!(
                    event_name = "inventory.stock.rejected",
                    product_id = %product_id,
                    current_stock = current,
                    quantity_change = request.quantity,
                    "stock change rejected: insufficient stock"
                );
                Err(DomainError::InsufficientStock {
                    product_id,
                    current,
                    requested: request.quantity,
                    resulting: i64::from(current) + i64::from(request.quantity),
                }
                .into())
            }
        }
    }

    pub async fn list_customers(
        &self,
        query: CustomerQuery,
    ) -> Result<Vec<CustomerSummary>, ApplicationError> {
        let filter = CustomerFilter {
            search: non_blank(query.search),
            limit: positive_or(query.limit, DEFAULT_CUSTOMER_LIMIT),
        };
        let listings = self.store.list_customers(&filter).await?;
        Ok(listings.into_iter().map(CustomerSummary::from).collect())
    }

    pub async fn create_customer(
        &self,
        request: NewCustomerRequest,
    ) -> Result<CreatedCustomer, ApplicationError> {
        let user_id = UserId(parse_identifier("userId", &request.user_id)?);
        let name = required_text("name", request.name)?;
        let email = non_blank(request.email);
        if let Some(email) = email.as_deref() {
            validate_email(email)?;
        }

        let customer = Customer {
            id: CustomerId::new(),
            name,
            email,
            phone: non_blank(request.phone),
            address: non_blank(request.address),
            user_id,
            created_at: Utc::now(),
        };
        self.store.insert_customer(&customer).await?;

        info!(
            event_name = "inventory.customer.created",
            customer_id = %customer.id,
            user_id = %user_id,
            "customer created"
        );
        Ok(CreatedCustomer {
            id: customer.id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
        })
    }

    pub async fn list_sales(&self, query: SalesQuery) -> Result<Vec<SaleSummary>, ApplicationError> {
        let customer_id = match non_blank(query.customer_id) {
            Some(value) => Some(CustomerId(parse_identifier("customerId", &value)?)),
            None => None,
        };
        let created_from = non_blank(query.date_from)
            .map(|value| parse_date_bound("dateFrom", &value))
            .transpose()?;
        let created_to =
            non_blank(query.date_to).map(|value| parse_date_bound("dateTo", &value)).transpose()?;

        let filter = SaleFilter {
            customer_id,
            created_from,
            created_to,
            limit: positive_or(query.limit, DEFAULT_SALES_LIMIT),
        };
        let sales = self.store.list_sales(&filter).await?;
        Ok(sales.into_iter().map(SaleSummary::from).collect())
    }

    pub async fn inventory_report(
        &self,
        request: ReportRequest,
    ) -> Result<InventoryReport, ApplicationError> {
        let report = match request.report_type {
            ReportType::LowStock => {
                let products = self.store.low_stock_products().await?;
                InventoryReport::LowStock {
                    products: products
                        .into_iter()
                        .filter(Product::is_low_stock)
                        .map(|product| LowStockEntry {
                            id: product.id,
                            name: product.name,
                            stock_quantity: product.stock_quantity,
                            min_stock_level: product.min_stock_level,
                            category: product.category,
                        })
                        .collect(),
                }
            }
            ReportType::MovementSummary => {
                let period_days = positive_or(request.days, DEFAULT_REPORT_DAYS);
                let since = Duration::try_days(i64::from(period_days))
                    .and_then(|window| Utc::now().checked_sub_signed(window))
                    .ok_or_else(|| DomainError::InvalidArgument {
                        field: "days",
                        message: format!("{period_days} days reaches past the supported date range"),
                    })?;
                let movements = self.store.movements_since(since).await?;

                let mut summary = BTreeMap::new();
                for movement in &movements {
                    let tally: &mut MovementTally =
                        summary.entry(movement.movement_type).or_default();
                    tally.count += 1;
                    tally.total_quantity += i64::from(movement.quantity_change).abs();
                }

                InventoryReport::MovementSummary {
                    period_days,
                    total_movements: movements.len() as u32,
                    summary,
                }
            }
            ReportType::CategorySummary => {
                let products = self.store.all_products().await?;
                InventoryReport::CategorySummary { categories: summarize_categories(&products) }
            }
        };

        info!(
            event_name = "inventory.report.generated",
            report_type = %report.report_type(),
            "inventory report generated"
        );
        Ok(report)
    }
}

fn summarize_categories(products: &[Product]) -> Vec<CategorySummaryEntry> {
    struct Accumulator {
        product_count: u32,
        total_stock: i64,
        price_sum: Decimal,
    }

    let mut groups: HashMap<Option<&str>, Accumulator> = HashMap::new();
    for product in products {
        let entry = groups.entry(product.category.as_deref()).or_insert(Accumulator {
            product_count: 0,
            total_stock: 0,
            price_sum: Decimal::ZERO,
        });
        entry.product_count += 1;
        entry.total_stock += i64::from(product.stock_quantity);
        entry.price_sum += product.price;
    }

    let mut categories: Vec<CategorySummaryEntry> = groups
        .into_iter()
        .map(|(category, accumulator)| CategorySummaryEntry {
            category: category.unwrap_or(UNCATEGORIZED_LABEL).to_string(),
            product_count: accumulator.product_count,
            total_stock: accumulator.total_stock,
            average_price: (accumulator.price_sum / Decimal::from(accumulator.product_count))
                .round_dp(2),
        })
        .collect();
    categories.sort_by(|left, right| left.category.cmp(&right.category));
    categories
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn positive_or(value: Option<u32>, default: u32) -> u32 {
    value.filter(|value| *value > 0).unwrap_or(default)
}

fn required_text(field: &'static str, value: String) -> Result<String, DomainError> {
    non_blank(Some(value))
        .ok_or_else(|| DomainError::InvalidArgument { field, message: "must not be empty".into() })
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        })
        && !email.contains(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidArgument {
            field: "email",
            message: format!("`{email}` is not a valid email address"),
        })
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_date_bound(field: &'static str, value: &str) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value).map(|parsed| parsed.with_timezone(&Utc)).map_err(|_| {
        DomainError::InvalidArgument {
            field,
            message: format!("`{value}` is not a date in YYYY-MM-DD format"),
        }
    })
}
