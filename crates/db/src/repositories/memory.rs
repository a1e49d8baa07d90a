use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use stockroom_core::domain::customer::{
    Customer, CustomerFilter, CustomerListing, RECENT_SALES_WINDOW,
};
use stockroom_core::domain::inventory::{InventoryMovement, StockChange, StockChangeOutcome};
use stockroom_core::domain::product::{
    Product, ProductFilter, ProductId, ProductListing, RECENT_MOVEMENT_WINDOW,
};
use stockroom_core::domain::sale::{Sale, SaleFilter};
use stockroom_core::inventory::{InventoryStore, StoreError};

#[derive(Default)]
struct InventoryState {
    products: Vec<Product>,
    movements: Vec<InventoryMovement>,
    customers: Vec<Customer>,
    sales: Vec<Sale>,
}

/// Whole dataset behind one lock, so a stock change and its ledger entry are
/// applied under the same write guard.
#[derive(Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<InventoryState>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_sale(&self, sale: Sale) {
        self.state.write().await.sales.push(sale);
    }

    pub async fn movements_for(&self, product_id: &ProductId) -> Vec<InventoryMovement> {
        let state = self.state.read().await;
        state.movements.iter().filter(|movement| movement.product_id == *product_id).cloned().collect()
    }
}

fn duplicate(entity: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{entity} {id} already exists"))
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductListing>, StoreError> {
        let state = self.state.read().await;
        let mut matching: Vec<&Product> = state
            .products
            .iter()
            .filter(|product| {
                filter.category.as_deref().map_or(true, |category| product.matches_category(category))
            })
            .filter(|product| {
                filter.search.as_deref().map_or(true, |term| product.matches_search(term))
            })
            .collect();
        matching.sort_by_key(|product| Reverse(product.created_at));

        Ok(matching
            .into_iter()
            .map(|product| {
                let movements = state
                    .movements
                    .iter()
                    .filter(|movement| movement.product_id == product.id)
                    .count() as u32;
                ProductListing {
                    product: product.clone(),
                    recent_movements: movements.min(RECENT_MOVEMENT_WINDOW),
                }
            })
            .collect())
    }

    async fn all_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut products = self.state.read().await.products.clone();
        products.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(products)
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|product| product.id == *id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.products.iter().any(|existing| existing.id == product.id) {
            return Err(duplicate("product", product.id));
        }
        state.products.push(product.clone());
        Ok(())
    }

    async fn apply_stock_change(
        &self,
        change: &StockChange,
    ) -> Result<StockChangeOutcome, StoreError> {
        let mut state = self.state.write().await;
        let Some(product) = state.products.iter_mut().find(|product| product.id == change.product_id)
        else {
            return Ok(StockChangeOutcome::ProductMissing);
        };

        let previous_stock = product.stock_quantity;
        let new_stock = match change.resulting_stock(previous_stock) {
            Ok(new_stock) => new_stock,
            Err(rejected) => return Ok(rejected),
        };

        product.stock_quantity = new_stock;
        product.updated_at = change.requested_at;
        let product = product.clone();

        let movement = change.movement_for(previous_stock, new_stock);
        state.movements.push(movement.clone());
        Ok(StockChangeOutcome::Applied { product, movement })
    }

    async fn movements_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<InventoryMovement>, StoreError> {
        let state = self.state.read().await;
        let mut movements: Vec<InventoryMovement> = state
            .movements
            .iter()
            .filter(|movement| movement.created_at >= since)
            .cloned()
            .collect();
        movements.sort_by_key(|movement| Reverse(movement.created_at));
        Ok(movements)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> Result<Vec<CustomerListing>, StoreError> {
        let state = self.state.read().await;
        let mut matching: Vec<&Customer> = state
            .customers
            .iter()
            .filter(|customer| {
                filter.search.as_deref().map_or(true, |term| customer.matches_search(term))
            })
            .collect();
        matching.sort_by_key(|customer| Reverse(customer.created_at));

        Ok(matching
            .into_iter()
            .take(filter.limit as usize)
            .map(|customer| {
                let mut sales: Vec<&Sale> = state
                    .sales
                    .iter()
                    .filter(|sale| sale.customer_id == Some(customer.id))
                    .collect();
                sales.sort_by_key(|sale| Reverse(sale.created_at));
                CustomerListing {
                    customer: customer.clone(),
                    recent_sale_totals: sales
                        .into_iter()
                        .take(RECENT_SALES_WINDOW)
                        .map(|sale| sale.total_amount)
                        .collect(),
                }
            })
            .collect())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.customers.iter().any(|existing| existing.id == customer.id) {
            return Err(duplicate("customer", customer.id));
        }
        state.customers.push(customer.clone());
        Ok(())
    }

    async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        let state = self.state.read().await;
        let mut sales: Vec<Sale> = state
            .sales
            .iter()
            .filter(|sale| filter.admits(sale))
            .map(|sale| {
                let mut sale = sale.clone();
                sale.customer_name = sale.customer_id.and_then(|customer_id| {
                    state
                        .customers
                        .iter()
                        .find(|customer| customer.id == customer_id)
                        .map(|customer| customer.name.clone())
                });
                for item in &mut sale.items {
                    item.product_name = item.product_id.and_then(|product_id| {
                        state
                            .products
                            .iter()
                            .find(|product| product.id == product_id)
                            .map(|product| product.name.clone())
                    });
                }
                sale
            })
            .collect();
        sales.sort_by_key(|sale| Reverse(sale.created_at));
        sales.truncate(filter.limit as usize);
        Ok(sales)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use stockroom_core::domain::inventory::{
        MovementId, MovementType, StockChange, StockChangeOutcome,
    };
    use stockroom_core::domain::product::{Product, ProductId};
    use stockroom_core::domain::UserId;
    use stockroom_core::inventory::InventoryStore;

    use super::InMemoryInventoryStore;

    fn product(stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            name: "Widget".to_string(),
            description: None,
            price: Decimal::new(500, 2),
            stock_quantity: stock,
            min_stock_level: Some(5),
            category: None,
            barcode: None,
            user_id: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn change(product_id: ProductId, quantity_change: i32) -> StockChange {
        StockChange {
            movement_id: MovementId::new(),
            product_id,
            quantity_change,
            movement_type: MovementType::Sale,
            notes: Some("counter sale".to_string()),
            user_id: UserId::new(),
            requested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn stock_change_appends_matching_ledger_entry() {
        let store = InMemoryInventoryStore::new();
        let widget = product(3);
        store.insert_product(&widget).await.expect("insert");

        let outcome = store.apply_stock_change(&change(widget.id, -3)).await.expect("apply");
        assert!(matches!(outcome, StockChangeOutcome::Applied { ref product, .. } if product.stock_quantity == 0));

        let movements = store.movements_for(&widget.id).await;
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].previous_stock, 3);
        assert_eq!(movements[0].new_stock, 0);
        assert_eq!(movements[0].quantity_change, -3);
    }

    #[tokio::test]
    async fn rejected_change_leaves_state_untouched() {
        let store = InMemoryInventoryStore::new();
        let widget = product(3);
        store.insert_product(&widget).await.expect("insert");

        let outcome = store.apply_stock_change(&change(widget.id, -4)).await.expect("apply");
        assert_eq!(outcome, StockChangeOutcome::WouldGoNegative { current: 3 });
        assert!(store.movements_for(&widget.id).await.is_empty());

        let reloaded = store.find_product(&widget.id).await.expect("find").expect("present");
        assert_eq!(reloaded.stock_quantity, 3);
    }

    #[tokio::test]
    async fn duplicate_product_ids_are_rejected() {
        let store = InMemoryInventoryStore::new();
        let widget = product(1);
        store.insert_product(&widget).await.expect("insert");
        assert!(store.insert_product(&widget).await.is_err());
    }
}
