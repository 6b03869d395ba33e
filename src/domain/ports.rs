use super::customer::{Customer, CustomerId};
use super::order::{Order, OrderId, OrderLine, StockAdjustment};
use super::product::{Product, ProductId};
use crate::error::StoreResult;
use async_trait::async_trait;

#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> StoreResult<Option<Customer>>;
}

#[async_trait]
pub trait ProductBatchLookup: Send + Sync {
    /// Returns only the products that exist; callers infer missing ids.
    async fn find_all_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
}

/// Applies stock adjustments inside an open [`CommitScope`].
#[async_trait]
pub trait ProductStockUpdate: Send {
    /// All-or-nothing: if any product's current quantity differs from the
    /// adjustment's `expected_quantity`, nothing is staged and
    /// `StoreError::Conflict` is returned.
    async fn update_quantities(&mut self, adjustments: &[StockAdjustment]) -> StoreResult<()>;
}

/// Creates an order inside an open [`CommitScope`].
#[async_trait]
pub trait OrderCreate: Send {
    /// Assigns identity and timestamps. The order becomes visible on commit.
    async fn create(&mut self, customer: &Customer, lines: Vec<OrderLine>) -> StoreResult<Order>;
}

/// An open unit of work. Dropping it without calling `commit` discards every
/// staged write.
#[async_trait]
pub trait CommitScope: ProductStockUpdate + OrderCreate {
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> StoreResult<CommitScopeBox>;
}

#[async_trait]
pub trait CustomerRegistry: Send + Sync {
    async fn upsert_customer(&self, customer: Customer) -> StoreResult<()>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn upsert_product(&self, product: Product) -> StoreResult<()>;
    async fn all_products(&self) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait OrderHistory: Send + Sync {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn all_orders(&self) -> StoreResult<Vec<Order>>;
}

pub type CustomerLookupBox = Box<dyn CustomerLookup>;
pub type ProductBatchLookupBox = Box<dyn ProductBatchLookup>;
pub type UnitOfWorkBox = Box<dyn UnitOfWork>;
pub type CommitScopeBox = Box<dyn CommitScope>;
