use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use stockroom_core::domain::customer::{Customer, CustomerId};
use stockroom_core::domain::inventory::{MovementId, MovementType, StockChange};
use stockroom_core::domain::product::{Product, ProductId};
use stockroom_core::domain::sale::{Sale, SaleId, SaleItem};
use stockroom_core::domain::UserId;
use stockroom_core::inventory::InventoryStore;

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlInventoryStore};

pub const DEMO_USER_ID: &str = "5f1c2a7e-0000-4000-8000-000000000000";

struct SeedProduct {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    min_stock_level: Option<i32>,
    category: Option<&'static str>,
    barcode: Option<&'static str>,
    /// Ledger entries applied after insert, oldest first: (days ago, change, type).
    movements: &'static [(i64, i32, MovementType)],
    expected_stock: i32,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "5f1c2a7e-0001-4000-8000-000000000001",
        name: "Widget",
        description: "Standard steel widget",
        price_cents: 499,
        min_stock_level: Some(5),
        category: Some("Hardware"),
        barcode: Some("400000000001"),
        movements: &[(20, 8, MovementType::Purchase), (3, -5, MovementType::Sale)],
        expected_stock: 3,
    },
    SeedProduct {
        id: "5f1c2a7e-0001-4000-8000-000000000002",
        name: "Gadget",
        description: "Multi-purpose gadget",
        price_cents: 1250,
        min_stock_level: Some(5),
        category: Some("Hardware"),
        barcode: Some("400000000002"),
        movements: &[(15, 6, MovementType::Purchase), (2, -1, MovementType::Adjustment)],
        expected_stock: 5,
    },
    SeedProduct {
        id: "5f1c2a7e-0001-4000-8000-000000000003",
        name: "Sprocket",
        description: "Forty-tooth sprocket",
        price_cents: 325,
        min_stock_level: Some(10),
        category: Some("Hardware"),
        barcode: None,
        movements: &[
            (45, 50, MovementType::Purchase),
            (10, -12, MovementType::Sale),
            (5, 2, MovementType::Return),
        ],
        expected_stock: 40,
    },
    SeedProduct {
        id: "5f1c2a7e-0001-4000-8000-000000000004",
        name: "USB Cable Pack",
        description: "Three braided USB-C cables",
        price_cents: 1899,
        min_stock_level: None,
        category: Some("Electronics"),
        barcode: Some("400000000004"),
        movements: &[(6, 12, MovementType::Purchase)],
        expected_stock: 12,
    },
    SeedProduct {
        id: "5f1c2a7e-0001-4000-8000-000000000005",
        name: "Desk Lamp",
        description: "LED desk lamp",
        price_cents: 3400,
        min_stock_level: Some(2),
        category: None,
        barcode: None,
        movements: &[(1, 8, MovementType::Purchase)],
        expected_stock: 8,
    },
];

struct SeedCustomer {
    id: &'static str,
    name: &'static str,
    email: Option<&'static str>,
    phone: Option<&'static str>,
}

const SEED_CUSTOMERS: &[SeedCustomer] = &[
    SeedCustomer {
        id: "5f1c2a7e-0002-4000-8000-000000000001",
        name: "Acme Corp",
        email: Some("purchasing@acme.test"),
        phone: Some("+1-555-0100"),
    },
    SeedCustomer {
        id: "5f1c2a7e-0002-4000-8000-000000000002",
        name: "Globex Industries",
        email: Some("orders@globex.test"),
        phone: None,
    },
];

struct SeedSale {
    id: &'static str,
    customer_id: Option<&'static str>,
    payment_method: Option<&'static str>,
    days_ago: i64,
    /// (product id, quantity, unit price cents)
    items: &'static [(&'static str, i32, i64)],
}

const SEED_SALES: &[SeedSale] = &[
    SeedSale {
        id: "5f1c2a7e-0003-4000-8000-000000000001",
        customer_id: Some("5f1c2a7e-0002-4000-8000-000000000001"),
        payment_method: Some("card"),
        days_ago: 3,
        items: &[("5f1c2a7e-0001-4000-8000-000000000001", 5, 499)],
    },
    SeedSale {
        id: "5f1c2a7e-0003-4000-8000-000000000002",
        customer_id: Some("5f1c2a7e-0002-4000-8000-000000000002"),
        payment_method: Some("invoice"),
        days_ago: 10,
        items: &[
            ("5f1c2a7e-0001-4000-8000-000000000003", 12, 325),
            ("5f1c2a7e-0001-4000-8000-000000000002", 1, 1250),
        ],
    },
    SeedSale {
        id: "5f1c2a7e-0003-4000-8000-000000000003",
        customer_id: None,
        payment_method: Some("cash"),
        days_ago: 1,
        items: &[("5f1c2a7e-0001-4000-8000-000000000005", 1, 3400)],
    },
];

/// Deterministic demo dataset: a product below its threshold, one exactly at
/// it, healthy stock, an uncategorized product, two customers and a walk-in
/// sale. Stock levels are reached through ledger entries so every product's
/// history is consistent.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Replaces any previously seeded demo rows.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        Self::clean(pool).await?;

        let store = SqlInventoryStore::new(pool.clone());
        let user_id = UserId(parse_seed_uuid(DEMO_USER_ID)?);
        let now = Utc::now();
        let mut movements_seeded = 0;

        for seed in SEED_PRODUCTS {
            let created_at = now - Duration::days(60);
            let product = Product {
                id: ProductId(parse_seed_uuid(seed.id)?),
                name: seed.name.to_string(),
                description: Some(seed.description.to_string()),
                price: Decimal::new(seed.price_cents, 2),
                stock_quantity: 0,
                min_stock_level: seed.min_stock_level,
                category: seed.category.map(str::to_string),
                barcode: seed.barcode.map(str::to_string),
                user_id,
                created_at,
                updated_at: created_at,
            };
            store.insert_product(&product).await?;

            for (days_ago, quantity_change, movement_type) in seed.movements {
                store
                    .apply_stock_change(&StockChange {
                        movement_id: MovementId::new(),
                        product_id: product.id,
                        quantity_change: *quantity_change,
                        movement_type: *movement_type,
                        notes: Some("demo seed".to_string()),
                        user_id,
                        requested_at: days_before(now, *days_ago),
                    })
                    .await?;
                movements_seeded += 1;
            }
        }

        for seed in SEED_CUSTOMERS {
            store
                .insert_customer(&Customer {
                    id: CustomerId(parse_seed_uuid(seed.id)?),
                    name: seed.name.to_string(),
                    email: seed.email.map(str::to_string),
                    phone: seed.phone.map(str::to_string),
                    address: None,
                    user_id,
                    created_at: now - Duration::days(30),
                })
                .await?;
        }

        for seed in SEED_SALES {
            let items = seed
                .items
                .iter()
                .map(|(product_id, quantity, unit_price_cents)| {
                    let unit_price = Decimal::new(*unit_price_cents, 2);
                    Ok(SaleItem {
                        product_id: Some(ProductId(parse_seed_uuid(product_id)?)),
                        product_name: None,
                        quantity: *quantity,
                        unit_price,
                        subtotal: unit_price * Decimal::from(*quantity),
                    })
                })
                .collect::<Result<Vec<_>, RepositoryError>>()?;
            let total_amount: Decimal = items.iter().map(|item| item.subtotal).sum();

            store
                .record_sale(&Sale {
                    id: SaleId(parse_seed_uuid(seed.id)?),
                    customer_id: seed.customer_id.map(parse_seed_uuid).transpose()?.map(CustomerId),
                    customer_name: None,
                    total_amount,
                    payment_method: seed.payment_method.map(str::to_string),
                    items,
                    created_at: days_before(now, seed.days_ago),
                })
                .await?;
        }

        Ok(SeedResult {
            products_seeded: SEED_PRODUCTS.len(),
            customers_seeded: SEED_CUSTOMERS.len(),
            sales_seeded: SEED_SALES.len(),
            movements_seeded,
        })
    }

    /// Verify that seed data exists and matches the expected stock levels.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for seed in SEED_PRODUCTS {
            let stock: Option<i32> =
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?")
                    .bind(seed.id)
                    .fetch_optional(pool)
                    .await?;
            checks.push((seed.name, stock == Some(seed.expected_stock)));

            let ledger_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM inventory_movements WHERE product_id = ?")
                    .bind(seed.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((seed.name, ledger_count == seed.movements.len() as i64));
        }

        for seed in SEED_CUSTOMERS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?)")
                    .bind(seed.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((seed.name, exists == 1));
        }

        for seed in SEED_SALES {
            let item_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM sale_items WHERE sale_id = ?")
                    .bind(seed.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((seed.id, item_count == seed.items.len() as i64));
        }

        let failed = checks
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(label, _)| (*label).to_string())
            .collect::<Vec<_>>();

        Ok(VerificationResult { checks_run: checks.len(), failed })
    }

    /// Remove seeded fixtures; rows created by other users are untouched.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for seed in SEED_SALES {
            sqlx::query("DELETE FROM sale_items WHERE sale_id = ?")
                .bind(seed.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM sales WHERE id = ?").bind(seed.id).execute(&mut *tx).await?;
        }
        for seed in SEED_CUSTOMERS {
            sqlx::query("DELETE FROM customers WHERE id = ?")
                .bind(seed.id)
                .execute(&mut *tx)
                .await?;
        }
        for seed in SEED_PRODUCTS {
            sqlx::query("DELETE FROM inventory_movements WHERE product_id = ?")
                .bind(seed.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM products WHERE id = ?")
                .bind(seed.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn parse_seed_uuid(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value)
        .map_err(|error| RepositoryError::Decode(format!("seed id `{value}`: {error}")))
}

fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub customers_seeded: usize,
    pub sales_seeded: usize,
    pub movements_seeded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub checks_run: usize,
    pub failed: Vec<String>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }
}
