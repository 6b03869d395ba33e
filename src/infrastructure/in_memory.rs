use crate::domain::customer::{Customer, CustomerId};
use crate::domain::order::{Order, OrderId, OrderLine, StockAdjustment};
use crate::domain::ports::{
    CommitScope, CommitScopeBox, CustomerLookup, CustomerRegistry, OrderCreate, OrderHistory,
    ProductBatchLookup, ProductCatalog, ProductStockUpdate, UnitOfWork,
};
use crate::domain::product::{Product, ProductId};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Default)]
struct State {
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    orders: Vec<Order>,
}

/// A thread-safe in-memory store for customers, products and orders.
///
/// Uses `Arc<RwLock<..>>` so clones share one state. Lookups take the read
/// lock; a [`CommitScope`] holds the write lock from `begin` until it is
/// committed or dropped, which serializes every stock mutation.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock of a product, if it exists.
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        let state = self.state.read().await;
        state.products.get(&id).map(|product| product.quantity)
    }
}

#[async_trait]
impl CustomerLookup for InMemoryStore {
    async fn find_by_id(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.get(&id).cloned())
    }
}

#[async_trait]
impl ProductBatchLookup for InMemoryStore {
    async fn find_all_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> StoreResult<CommitScopeBox> {
        let state = self.state.clone().write_owned().await;
        Ok(Box::new(InMemoryCommitScope {
            state,
            stock: HashMap::new(),
            orders: Vec::new(),
        }))
    }
}

#[async_trait]
impl CustomerRegistry for InMemoryStore {
    async fn upsert_customer(&self, customer: Customer) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.customers.insert(customer.id, customer);
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn upsert_product(&self, product: Product) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }
}

#[async_trait]
impl OrderHistory for InMemoryStore {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn all_orders(&self) -> StoreResult<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.clone())
    }
}

/// Staged writes against an exclusively locked [`InMemoryStore`].
pub struct InMemoryCommitScope {
    state: OwnedRwLockWriteGuard<State>,
    stock: HashMap<ProductId, u32>,
    orders: Vec<Order>,
}

impl InMemoryCommitScope {
    fn current_quantity(&self, id: ProductId) -> StoreResult<u32> {
        if let Some(&staged) = self.stock.get(&id) {
            return Ok(staged);
        }
        self.state
            .products
            .get(&id)
            .map(|product| product.quantity)
            .ok_or(StoreError::MissingProduct(id))
    }
}

#[async_trait]
impl ProductStockUpdate for InMemoryCommitScope {
    async fn update_quantities(&mut self, adjustments: &[StockAdjustment]) -> StoreResult<()> {
        let mut pending: HashMap<ProductId, u32> = HashMap::with_capacity(adjustments.len());
        for adjustment in adjustments {
            let found = match pending.get(&adjustment.product_id) {
                Some(&quantity) => quantity,
                None => self.current_quantity(adjustment.product_id)?,
            };
            if found != adjustment.expected_quantity {
                return Err(StoreError::Conflict {
                    product_id: adjustment.product_id,
                    expected: adjustment.expected_quantity,
                    found,
                });
            }
            pending.insert(adjustment.product_id, adjustment.new_quantity);
        }
        self.stock.extend(pending);
        Ok(())
    }
}

#[async_trait]
impl OrderCreate for InMemoryCommitScope {
    async fn create(&mut self, customer: &Customer, lines: Vec<OrderLine>) -> StoreResult<Order> {
        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            customer_id: customer.id,
            lines,
            created_at: now,
            updated_at: now,
        };
        self.orders.push(order.clone());
        Ok(order)
    }
}

#[async_trait]
impl CommitScope for InMemoryCommitScope {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self {
            mut state,
            stock,
            orders,
        } = *self;
        for (id, quantity) in stock {
            let product = state
                .products
                .get_mut(&id)
                .ok_or(StoreError::MissingProduct(id))?;
            product.quantity = quantity;
        }
        state.orders.extend(orders);
        Ok(())
    }
}
