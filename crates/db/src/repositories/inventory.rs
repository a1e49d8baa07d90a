use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use stockroom_core::domain::customer::{
    Customer, CustomerFilter, CustomerId, CustomerListing, RECENT_SALES_WINDOW,
};
use stockroom_core::domain::inventory::{InventoryMovement, StockChange, StockChangeOutcome};
use stockroom_core::domain::product::{
    Product, ProductFilter, ProductId, ProductListing, DEFAULT_MIN_STOCK_LEVEL,
    RECENT_MOVEMENT_WINDOW,
};
use stockroom_core::domain::sale::{Sale, SaleFilter, SaleId, SaleItem};
use stockroom_core::inventory::{InventoryStore, StoreError};

use super::rows::{
    customer_from_row, decode_decimal, decode_optional_uuid, decode_timestamp, decode_uuid,
    encode_timestamp, movement_from_row, product_from_row, CUSTOMER_COLUMNS,
    MOVEMENT_COLUMNS, PRODUCT_COLUMNS,
};
use super::RepositoryError;
use crate::DbPool;

pub struct SqlInventoryStore {
    pool: DbPool,
}

impl SqlInventoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Persists a sale and its line items in one transaction. Sales have no
    /// conversational entry point; this exists for seeding and imports.
    pub async fn record_sale(&self, sale: &Sale) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO sales (id, customer_id, total_amount, payment_method, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(sale.id.0.to_string())
        .bind(sale.customer_id.map(|id| id.0.to_string()))
        .bind(sale.total_amount.to_string())
        .bind(&sale.payment_method)
        .bind(encode_timestamp(&sale.created_at))
        .execute(&mut *tx)
        .await?;

        for item in &sale.items {
            sqlx::query(
                "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, subtotal)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(sale.id.0.to_string())
            .bind(item.product_id.map(|id| id.0.to_string()))
            .bind(item.quantity)
            .bind(item.unit_price.to_string())
            .bind(item.subtotal.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Text filters run in Rust after the fetch; SQLite's `LOWER` and `LIKE`
    /// fold ASCII only.
    async fn fetch_product_listings(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductListing>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(PRODUCT_COLUMNS);
        query.push(", MIN(");
        query.push_bind(i64::from(RECENT_MOVEMENT_WINDOW));
        query.push(
            ", (SELECT COUNT(*) FROM inventory_movements m WHERE m.product_id = p.id)) \
             AS recent_movements FROM products p \
             ORDER BY p.created_at DESC, p.id ASC",
        );

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut listings = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row)?;
            let in_category = filter
                .category
                .as_deref()
                .map_or(true, |category| product.matches_category(category));
            let in_search =
                filter.search.as_deref().map_or(true, |term| product.matches_search(term));
            if !(in_category && in_search) {
                continue;
            }
            let recent_movements: i64 = row.try_get("recent_movements")?;
            listings.push(ProductListing {
                product,
                recent_movements: u32::try_from(recent_movements).unwrap_or(0),
            });
        }
        Ok(listings)
    }

    async fn fetch_products(&self, low_stock_only: bool) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(PRODUCT_COLUMNS);
        query.push(" FROM products p");
        if low_stock_only {
            query.push(" WHERE p.stock_quantity <= COALESCE(p.min_stock_level, ");
            query.push_bind(DEFAULT_MIN_STOCK_LEVEL);
            query.push(")");
        }
        query.push(" ORDER BY p.name ASC, p.id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?"))
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn store_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (
                id, name, description, price, stock_quantity, min_stock_level,
                category, barcode, user_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.0.to_string())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(&product.category)
        .bind(&product.barcode)
        .bind(product.user_id.0.to_string())
        .bind(encode_timestamp(&product.created_at))
        .bind(encode_timestamp(&product.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The guarded `UPDATE` takes the write lock first, so the stock read,
    /// the bounds check and the ledger append all see one consistent row.
    async fn apply_change(
        &self,
        change: &StockChange,
    ) -> Result<StockChangeOutcome, RepositoryError> {
        let product_id = change.product_id.0.to_string();
        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE products
             SET stock_quantity = stock_quantity + ?1, updated_at = ?2
             WHERE id = ?3
               AND stock_quantity + ?1 >= 0
               AND stock_quantity + ?1 <= 2147483647
             RETURNING stock_quantity",
        )
        .bind(change.quantity_change)
        .bind(encode_timestamp(&change.requested_at))
        .bind(&product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_stock) = updated else {
            let current: Option<i32> =
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?")
                    .bind(&product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Ok(match current {
                Some(current) if i64::from(current) + i64::from(change.quantity_change) < 0 => {
                    StockChangeOutcome::WouldGoNegative { current }
                }
                Some(current) => StockChangeOutcome::WouldOverflow { current },
                None => StockChangeOutcome::ProductMissing,
            });
        };

        let new_stock = i32::try_from(new_stock)
            .map_err(|_| RepositoryError::Decode(format!("stock {new_stock} out of range")))?;
        let previous_stock = new_stock - change.quantity_change;
        let movement = change.movement_for(previous_stock, new_stock);

        sqlx::query(
            "INSERT INTO inventory_movements (
                id, product_id, movement_type, quantity_change, previous_stock,
                new_stock, notes, user_id, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(movement.id.0.to_string())
        .bind(&product_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity_change)
        .bind(movement.previous_stock)
        .bind(movement.new_stock)
        .bind(&movement.notes)
        .bind(movement.user_id.0.to_string())
        .bind(encode_timestamp(&movement.created_at))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?"))
            .bind(&product_id)
            .fetch_one(&mut *tx)
            .await?;
        let product = product_from_row(&row)?;

        tx.commit().await?;
        Ok(StockChangeOutcome::Applied { product, movement })
    }

    async fn fetch_movements_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InventoryMovement>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements
             WHERE created_at >= ?
             ORDER BY created_at DESC"
        ))
        .bind(encode_timestamp(&since))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(movement_from_row).collect()
    }

    async fn fetch_customer_listings(
        &self,
        filter: &CustomerFilter,
    ) -> Result<Vec<CustomerListing>, RepositoryError> {
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(CUSTOMER_COLUMNS);
        query.push(" FROM customers ORDER BY created_at DESC, id ASC");
        // Searches filter in Rust, so the limit can only go to SQL without one.
        if filter.search.is_none() {
            query.push(" LIMIT ");
            query.push_bind(i64::from(filter.limit));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut customers = Vec::new();
        for row in &rows {
            if customers.len() == limit {
                break;
            }
            let customer = customer_from_row(row)?;
            if filter.search.as_deref().map_or(true, |term| customer.matches_search(term)) {
                customers.push(customer);
            }
        }

        let mut listings = Vec::with_capacity(customers.len());
        for customer in customers {
            let recent_sale_totals = self.recent_sale_totals(&customer.id).await?;
            listings.push(CustomerListing { customer, recent_sale_totals });
        }
        Ok(listings)
    }

    async fn recent_sale_totals(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<rust_decimal::Decimal>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT total_amount FROM sales
             WHERE customer_id = ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(customer_id.0.to_string())
        .bind(RECENT_SALES_WINDOW as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|row| decode_decimal(row, "total_amount")).collect()
    }

    async fn store_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, address, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer.id.0.to_string())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.user_id.0.to_string())
        .bind(encode_timestamp(&customer.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT s.id AS id, s.customer_id AS customer_id, c.name AS customer_name, \
             s.total_amount AS total_amount, s.payment_method AS payment_method, \
             s.created_at AS created_at \
             FROM sales s LEFT JOIN customers c ON c.id = s.customer_id WHERE 1 = 1",
        );

        if let Some(customer_id) = filter.customer_id {
            query.push(" AND s.customer_id = ");
            query.push_bind(customer_id.0.to_string());
        }
        if let Some(created_from) = filter.created_from {
            query.push(" AND s.created_at >= ");
            query.push_bind(encode_timestamp(&created_from));
        }
        if let Some(created_to) = filter.created_to {
            query.push(" AND s.created_at <= ");
            query.push_bind(encode_timestamp(&created_to));
        }

        query.push(" ORDER BY s.created_at DESC, s.id ASC LIMIT ");
        query.push_bind(i64::from(filter.limit));

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut sales = rows
            .iter()
            .map(|row| {
                Ok(Sale {
                    id: SaleId(decode_uuid(row, "id")?),
                    customer_id: decode_optional_uuid(row, "customer_id")?.map(CustomerId),
                    customer_name: row.try_get("customer_name")?,
                    total_amount: decode_decimal(row, "total_amount")?,
                    payment_method: row.try_get("payment_method")?,
                    items: Vec::new(),
                    created_at: decode_timestamp(row, "created_at")?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        if sales.is_empty() {
            return Ok(sales);
        }

        let mut items_query = QueryBuilder::<Sqlite>::new(
            "SELECT si.sale_id AS sale_id, si.product_id AS product_id, p.name AS product_name, \
             si.quantity AS quantity, si.unit_price AS unit_price, si.subtotal AS subtotal \
             FROM sale_items si LEFT JOIN products p ON p.id = si.product_id \
             WHERE si.sale_id IN (",
        );
        let mut separated = items_query.separated(", ");
        for sale in &sales {
            separated.push_bind(sale.id.0.to_string());
        }
        separated.push_unseparated(") ORDER BY si.id ASC");

        let item_rows = items_query.build().fetch_all(&self.pool).await?;
        for row in &item_rows {
            let sale_id = SaleId(decode_uuid(row, "sale_id")?);
            let item = SaleItem {
                product_id: decode_optional_uuid(row, "product_id")?.map(ProductId),
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                unit_price: decode_decimal(row, "unit_price")?,
                subtotal: decode_decimal(row, "subtotal")?,
            };
            if let Some(sale) = sales.iter_mut().find(|sale| sale.id == sale_id) {
                sale.items.push(item);
            }
        }

        Ok(sales)
    }
}

#[async_trait]
impl InventoryStore for SqlInventoryStore {
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductListing>, StoreError> {
        Ok(self.fetch_product_listings(filter).await?)
    }

    async fn all_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.fetch_products(false).await?)
    }

    async fn low_stock_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.fetch_products(true).await?)
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.fetch_product(id).await?)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        Ok(self.store_product(product).await?)
    }

    async fn apply_stock_change(
        &self,
        change: &StockChange,
    ) -> Result<StockChangeOutcome, StoreError> {
        Ok(self.apply_change(change).await?)
    }

    async fn movements_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InventoryMovement>, StoreError> {
        Ok(self.fetch_movements_since(since).await?)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> Result<Vec<CustomerListing>, StoreError> {
        Ok(self.fetch_customer_listings(filter).await?)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        Ok(self.store_customer(customer).await?)
    }

    async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        Ok(self.fetch_sales(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use stockroom_core::domain::customer::{Customer, CustomerFilter, CustomerId};
    use stockroom_core::domain::inventory::{
        MovementId, MovementType, StockChange, StockChangeOutcome,
    };
    use stockroom_core::domain::product::{Product, ProductFilter, ProductId};
    use stockroom_core::domain::sale::{Sale, SaleFilter, SaleId, SaleItem};
    use stockroom_core::domain::UserId;
    use stockroom_core::inventory::InventoryStore;

    use super::SqlInventoryStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlInventoryStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlInventoryStore::new(pool)
    }

    fn product(name: &str, stock: i32, min_stock_level: Option<i32>, age_secs: i64) -> Product {
        let created_at = Utc::now() - Duration::seconds(age_secs);
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: None,
            price: Decimal::new(1999, 2),
            stock_quantity: stock,
            min_stock_level,
            category: Some("Hardware".to_string()),
            barcode: None,
            user_id: UserId::new(),
            created_at,
            updated_at: created_at,
        }
    }

    fn change(product_id: ProductId, quantity_change: i32) -> StockChange {
        StockChange {
            movement_id: MovementId::new(),
            product_id,
            quantity_change,
            movement_type: MovementType::Adjustment,
            notes: None,
            user_id: UserId::new(),
            requested_at: Utc::now(),
        }
    }

    async fn movement_count(store: &SqlInventoryStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM inventory_movements")
            .fetch_one(store.pool())
            .await
            .expect("count movements")
    }

    #[tokio::test]
    async fn products_round_trip_with_decimal_price() {
        let store = store().await;
        let widget = product("Widget", 3, Some(5), 0);
        store.insert_product(&widget).await.expect("insert");

        let loaded = store.find_product(&widget.id).await.expect("find").expect("present");
        assert_eq!(loaded.price, Decimal::new(1999, 2));
        assert_eq!(loaded.min_stock_level, Some(5));
        assert_eq!(loaded.name, "Widget");
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_search_escapes_wildcards() {
        let store = store().await;
        store.insert_product(&product("Old Gear", 10, None, 60)).await.expect("insert");
        store.insert_product(&product("New Gear", 10, None, 0)).await.expect("insert");
        store.insert_product(&product("100% Cotton", 10, None, 30)).await.expect("insert");

        let all = store.list_products(&ProductFilter::default()).await.expect("list");
        let names: Vec<&str> = all.iter().map(|listing| listing.product.name.as_str()).collect();
        assert_eq!(names, vec!["New Gear", "100% Cotton", "Old Gear"]);

        let literal = store
            .list_products(&ProductFilter { search: Some("0%".to_string()), category: None })
            .await
            .expect("search");
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].product.name, "100% Cotton");

        let by_category = store
            .list_products(&ProductFilter { category: Some("hard".to_string()), search: None })
            .await
            .expect("category");
        assert_eq!(by_category.len(), 3);
    }

    #[tokio::test]
    async fn search_folds_case_beyond_ascii() {
        let store = store().await;
        let mut eclair = product("Éclair Mould", 10, None, 0);
        eclair.category = Some("Pâtisserie".to_string());
        store.insert_product(&eclair).await.expect("insert");
        store.insert_product(&product("Widget", 10, None, 0)).await.expect("insert");

        for term in ["Éclair", "éclair", "ÉCLAIR MOULD"] {
            let hits = store
                .list_products(&ProductFilter { search: Some(term.to_string()), category: None })
                .await
                .expect("search");
            assert_eq!(hits.len(), 1, "search `{term}` should find the mould");
            assert_eq!(hits[0].product.id, eclair.id);
        }

        let by_category = store
            .list_products(&ProductFilter { category: Some("PÂTISSERIE".to_string()), search: None })
            .await
            .expect("category");
        assert_eq!(by_category.len(), 1);

        let customer = Customer {
            id: CustomerId::new(),
            name: "Zoë Ångström".to_string(),
            email: None,
            phone: None,
            address: None,
            user_id: UserId::new(),
            created_at: Utc::now(),
        };
        store.insert_customer(&customer).await.expect("insert customer");
        let customers = store
            .list_customers(&CustomerFilter { search: Some("ångström".to_string()), limit: 10 })
            .await
            .expect("customer search");
        assert_eq!(customers.len(), 1);
    }

    #[tokio::test]
    async fn customer_search_applies_limit_after_matching() {
        let store = store().await;
        for (age, name) in [(0, "Umbrella Ltd"), (10, "Acme North"), (20, "Acme South"), (30, "Initech")]
        {
            store
                .insert_customer(&Customer {
                    id: CustomerId::new(),
                    name: name.to_string(),
                    email: None,
                    phone: None,
                    address: None,
                    user_id: UserId::new(),
                    created_at: Utc::now() - Duration::minutes(age),
                })
                .await
                .expect("insert customer");
        }

        let listings = store
            .list_customers(&CustomerFilter { search: Some("acme".to_string()), limit: 1 })
            .await
            .expect("list customers");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].customer.name, "Acme North");
    }

    #[tokio::test]
    async fn recent_movement_count_is_capped() {
        let store = store().await;
        let widget = product("Widget", 0, None, 0);
        store.insert_product(&widget).await.expect("insert");
        for _ in 0..7 {
            store.apply_stock_change(&change(widget.id, 1)).await.expect("apply");
        }

        let listings = store.list_products(&ProductFilter::default()).await.expect("list");
        assert_eq!(listings[0].recent_movements, 5);
    }

    #[tokio::test]
    async fn low_stock_pushdown_includes_threshold_and_default() {
        let store = store().await;
        store.insert_product(&product("At threshold", 5, Some(5), 0)).await.expect("insert");
        store.insert_product(&product("Above threshold", 6, Some(5), 0)).await.expect("insert");
        store.insert_product(&product("Default threshold", 5, None, 0)).await.expect("insert");
        store.insert_product(&product("Zero threshold", 0, Some(0), 0)).await.expect("insert");

        let low = store.low_stock_products().await.expect("low stock");
        let names: Vec<&str> = low.iter().map(|product| product.name.as_str()).collect();
        assert_eq!(names, vec!["At threshold", "Default threshold", "Zero threshold"]);
    }

    #[tokio::test]
    async fn stock_change_updates_product_and_ledger_together() {
        let store = store().await;
        let widget = product("Widget", 3, Some(5), 0);
        store.insert_product(&widget).await.expect("insert");

        let outcome = store.apply_stock_change(&change(widget.id, 10)).await.expect("apply");
        let StockChangeOutcome::Applied { product, movement } = outcome else {
            panic!("expected applied outcome, got {outcome:?}");
        };
        assert_eq!(product.stock_quantity, 13);
        assert_eq!(movement.previous_stock, 3);
        assert_eq!(movement.new_stock, 13);
        assert_eq!(movement_count(&store).await, 1);
    }

    #[tokio::test]
    async fn negative_result_and_missing_product_leave_no_trace() {
        let store = store().await;
        let widget = product("Widget", 3, Some(5), 0);
        store.insert_product(&widget).await.expect("insert");

        let outcome = store.apply_stock_change(&change(widget.id, -4)).await.expect("apply");
        assert_eq!(outcome, StockChangeOutcome::WouldGoNegative { current: 3 });

        let missing = store.apply_stock_change(&change(ProductId::new(), 1)).await.expect("apply");
        assert_eq!(missing, StockChangeOutcome::ProductMissing);

        let reloaded = store.find_product(&widget.id).await.expect("find").expect("present");
        assert_eq!(reloaded.stock_quantity, 3);
        assert_eq!(movement_count(&store).await, 0);
    }

    #[tokio::test]
    async fn change_past_integer_range_is_an_overflow_not_a_shortage() {
        let store = store().await;
        let widget = product("Widget", i32::MAX - 1, Some(5), 0);
        store.insert_product(&widget).await.expect("insert");

        let outcome = store.apply_stock_change(&change(widget.id, 2)).await.expect("apply");
        assert_eq!(outcome, StockChangeOutcome::WouldOverflow { current: i32::MAX - 1 });
        assert_eq!(movement_count(&store).await, 0);
    }

    #[tokio::test]
    async fn ledger_failure_rolls_back_stock_update() {
        let store = store().await;
        let widget = product("Widget", 3, Some(5), 0);
        store.insert_product(&widget).await.expect("insert");

        sqlx::query(
            "CREATE TRIGGER fail_ledger BEFORE INSERT ON inventory_movements
             BEGIN SELECT RAISE(ABORT, 'injected ledger failure'); END",
        )
        .execute(store.pool())
        .await
        .expect("install trigger");

        let result = store.apply_stock_change(&change(widget.id, 10)).await;
        assert!(result.is_err(), "ledger failure should surface");

        let reloaded = store.find_product(&widget.id).await.expect("find").expect("present");
        assert_eq!(reloaded.stock_quantity, 3, "stock update must roll back with the ledger row");
        assert_eq!(movement_count(&store).await, 0);
    }

    #[tokio::test]
    async fn customers_carry_their_three_most_recent_sale_totals() {
        let store = store().await;
        let customer = Customer {
            id: CustomerId::new(),
            name: "Acme Corp".to_string(),
            email: Some("buyer@acme.test".to_string()),
            phone: None,
            address: None,
            user_id: UserId::new(),
            created_at: Utc::now(),
        };
        store.insert_customer(&customer).await.expect("insert customer");

        for (age, cents) in [(40, 100), (30, 200), (20, 300), (10, 400)] {
            store
                .record_sale(&Sale {
                    id: SaleId::new(),
                    customer_id: Some(customer.id),
                    customer_name: None,
                    total_amount: Decimal::new(cents, 2),
                    payment_method: Some("card".to_string()),
                    items: Vec::new(),
                    created_at: Utc::now() - Duration::minutes(age),
                })
                .await
                .expect("record sale");
        }

        let listings = store
            .list_customers(&CustomerFilter { search: Some("ACME".to_string()), limit: 10 })
            .await
            .expect("list customers");
        assert_eq!(listings.len(), 1);
        assert_eq!(
            listings[0].recent_sale_totals,
            vec![Decimal::new(400, 2), Decimal::new(300, 2), Decimal::new(200, 2)]
        );
    }

    #[tokio::test]
    async fn sales_join_customer_and_product_names_within_date_bounds() {
        let store = store().await;
        let widget = product("Widget", 10, None, 0);
        store.insert_product(&widget).await.expect("insert product");

        let now = Utc::now();
        let recent = Sale {
            id: SaleId::new(),
            customer_id: None,
            customer_name: None,
            total_amount: Decimal::new(3998, 2),
            payment_method: None,
            items: vec![SaleItem {
                product_id: Some(widget.id),
                product_name: None,
                quantity: 2,
                unit_price: Decimal::new(1999, 2),
                subtotal: Decimal::new(3998, 2),
            }],
            created_at: now - Duration::days(1),
        };
        let old = Sale {
            id: SaleId::new(),
            items: Vec::new(),
            created_at: now - Duration::days(40),
            ..recent.clone()
        };
        store.record_sale(&recent).await.expect("record recent");
        store.record_sale(&old).await.expect("record old");

        let sales = store
            .list_sales(&SaleFilter {
                customer_id: None,
                created_from: Some(now - Duration::days(7)),
                created_to: Some(now),
                limit: 20,
            })
            .await
            .expect("list sales");

        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, recent.id);
        assert_eq!(sales[0].customer_name, None);
        assert_eq!(sales[0].items.len(), 1);
        assert_eq!(sales[0].items[0].product_name.as_deref(), Some("Widget"));
    }
}
