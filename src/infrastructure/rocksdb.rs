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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Column Family for customer records.
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family for products and their stock levels.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for placed orders, keyed by their time-ordered id.
pub const CF_ORDERS: &str = "orders";

/// A persistent store implementation using RocksDB.
///
/// Customers, products and orders live in separate Column Families, keyed by
/// the raw UUID bytes and stored as JSON. A commit scope holds `commit_lock`
/// for its whole lifetime and writes everything it staged as one `WriteBatch`,
/// so a commit is atomic and never interleaves with another.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the customers, products and orders column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_CUSTOMERS, CF_PRODUCTS, CF_ORDERS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Internal(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, family: &'static str, key: &[u8]) -> StoreResult<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, family: &'static str, key: &[u8], value: &T) -> StoreResult<()> {
        let cf = self.cf(family)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, family: &'static str) -> StoreResult<Vec<T>> {
        let cf = self.cf(family)?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| -> StoreResult<T> {
                let (_key, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }
}

#[async_trait]
impl CustomerLookup for RocksDbStore {
    async fn find_by_id(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        self.get_json(CF_CUSTOMERS, id.0.as_bytes())
    }
}

#[async_trait]
impl ProductBatchLookup for RocksDbStore {
    async fn find_all_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.get_json(CF_PRODUCTS, id.0.as_bytes())? {
                products.push(product);
            }
        }
        Ok(products)
    }
}

#[async_trait]
impl UnitOfWork for RocksDbStore {
    async fn begin(&self) -> StoreResult<CommitScopeBox> {
        let guard = self.commit_lock.clone().lock_owned().await;
        Ok(Box::new(RocksDbCommitScope {
            store: self.clone(),
            _guard: guard,
            products: HashMap::new(),
            orders: Vec::new(),
        }))
    }
}

#[async_trait]
impl CustomerRegistry for RocksDbStore {
    async fn upsert_customer(&self, customer: Customer) -> StoreResult<()> {
        self.put_json(CF_CUSTOMERS, customer.id.0.as_bytes(), &customer)
    }
}

#[async_trait]
impl ProductCatalog for RocksDbStore {
    async fn upsert_product(&self, product: Product) -> StoreResult<()> {
        // Stock writes go through the same lock as commits.
        let _guard = self.commit_lock.lock().await;
        self.put_json(CF_PRODUCTS, product.id.0.as_bytes(), &product)
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.scan(CF_PRODUCTS)?;
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }
}

#[async_trait]
impl OrderHistory for RocksDbStore {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.get_json(CF_ORDERS, id.0.as_bytes())
    }

    async fn all_orders(&self) -> StoreResult<Vec<Order>> {
        self.scan(CF_ORDERS)
    }
}

/// Staged writes against a [`RocksDbStore`] while its commit lock is held.
pub struct RocksDbCommitScope {
    store: RocksDbStore,
    _guard: OwnedMutexGuard<()>,
    products: HashMap<ProductId, Product>,
    orders: Vec<Order>,
}

impl RocksDbCommitScope {
    fn load(&self, id: ProductId) -> StoreResult<Product> {
        if let Some(staged) = self.products.get(&id) {
            return Ok(staged.clone());
        }
        self.store
            .get_json(CF_PRODUCTS, id.0.as_bytes())?
            .ok_or(StoreError::MissingProduct(id))
    }
}

#[async_trait]
impl ProductStockUpdate for RocksDbCommitScope {
    async fn update_quantities(&mut self, adjustments: &[StockAdjustment]) -> StoreResult<()> {
        let mut pending: HashMap<ProductId, Product> = HashMap::with_capacity(adjustments.len());
        for adjustment in adjustments {
            let mut product = match pending.remove(&adjustment.product_id) {
                Some(product) => product,
                None => self.load(adjustment.product_id)?,
            };
            if product.quantity != adjustment.expected_quantity {
                return Err(StoreError::Conflict {
                    product_id: adjustment.product_id,
                    expected: adjustment.expected_quantity,
                    found: product.quantity,
                });
            }
            product.quantity = adjustment.new_quantity;
            pending.insert(product.id, product);
        }
        self.products.extend(pending);
        Ok(())
    }
}

#[async_trait]
impl OrderCreate for RocksDbCommitScope {
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
impl CommitScope for RocksDbCommitScope {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let products_cf = self.store.cf(CF_PRODUCTS)?;
        let orders_cf = self.store.cf(CF_ORDERS)?;

        let mut batch = WriteBatch::default();
        for product in self.products.values() {
            batch.put_cf(products_cf, product.id.0.as_bytes(), serde_json::to_vec(product)?);
        }
        for order in &self.orders {
            batch.put_cf(orders_cf, order.id.0.as_bytes(), serde_json::to_vec(order)?);
        }

        self.store.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Money;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn widget(quantity: u32) -> Product {
        Product::new(
            ProductId::new(),
            "Widget",
            Money::new(dec!(5.00)).unwrap(),
            quantity,
        )
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_CUSTOMERS).is_some());
        assert!(store.db.cf_handle(CF_PRODUCTS).is_some());
        assert!(store.db.cf_handle(CF_ORDERS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_lookups() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let customer = Customer::new(CustomerId::new(), "Ada", "ada@example.com");
        let product = widget(10);

        store.upsert_customer(customer.clone()).await.unwrap();
        store.upsert_product(product.clone()).await.unwrap();

        assert_eq!(store.find_by_id(customer.id).await.unwrap(), Some(customer));
        assert_eq!(
            store
                .find_all_by_ids(&[product.id, ProductId::new()])
                .await
                .unwrap(),
            vec![product]
        );
    }

    #[tokio::test]
    async fn test_rocksdb_commit_and_reopen() {
        let dir = tempdir().unwrap();
        let customer = Customer::new(CustomerId::new(), "Ada", "ada@example.com");
        let product = widget(10);

        let order = {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store.upsert_product(product.clone()).await.unwrap();

            let mut scope = store.begin().await.unwrap();
            scope
                .update_quantities(&[product.reserve(4).unwrap()])
                .await
                .unwrap();
            let order = scope
                .create(
                    &customer,
                    vec![OrderLine {
                        product_id: product.id,
                        price: product.price,
                        quantity: 4,
                    }],
                )
                .await
                .unwrap();
            scope.commit().await.unwrap();
            order
        };

        let store = RocksDbStore::open(dir.path()).unwrap();
        let stored = store.find_all_by_ids(&[product.id]).await.unwrap();
        assert_eq!(stored[0].quantity, 6);
        assert_eq!(store.find_order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_rocksdb_stale_adjustment_conflicts() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let product = widget(10);
        store.upsert_product(product.clone()).await.unwrap();
        let stale = product.reserve(4).unwrap();

        let mut moved = product.clone();
        moved.quantity = 8;
        store.upsert_product(moved).await.unwrap();

        let mut scope = store.begin().await.unwrap();
        assert!(matches!(
            scope.update_quantities(&[stale]).await,
            Err(StoreError::Conflict { found: 8, .. })
        ));
        drop(scope);

        let stored = store.find_all_by_ids(&[product.id]).await.unwrap();
        assert_eq!(stored[0].quantity, 8);
        assert!(store.all_orders().await.unwrap().is_empty());
    }
}
