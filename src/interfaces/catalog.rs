use crate::domain::customer::Customer;
use crate::domain::ports::{CustomerRegistry, ProductCatalog};
use crate::domain::product::Product;
use crate::error::StoreResult;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Seed data for a store, read from JSON:
/// `{ "customers": [...], "products": [...] }`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn from_reader<R: Read>(source: R) -> StoreResult<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Upserts every customer and product into `store`.
    pub async fn seed<S>(&self, store: &S) -> StoreResult<()>
    where
        S: CustomerRegistry + ProductCatalog,
    {
        for customer in &self.customers {
            store.upsert_customer(customer.clone()).await?;
        }
        for product in &self.products {
            store.upsert_product(product.clone()).await?;
        }
        tracing::debug!(
            customers = self.customers.len(),
            products = self.products.len(),
            "catalog seeded"
        );
        Ok(())
    }
}
