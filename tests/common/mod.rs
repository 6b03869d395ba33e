#![allow(dead_code)]

use order_placement::domain::customer::{Customer, CustomerId};
use order_placement::domain::ports::{CustomerRegistry, ProductCatalog};
use order_placement::domain::product::{Money, Product, ProductId};
use order_placement::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

pub struct Fixture {
    pub store: InMemoryStore,
    pub customer: CustomerId,
    pub products: Vec<ProductId>,
}

/// A store with one customer and one product per `(name, price, stock)` entry.
pub async fn seeded(stock: &[(&str, Decimal, u32)]) -> Fixture {
    let store = InMemoryStore::new();
    let customer = Customer::new(CustomerId::new(), "Ada", "ada@example.com");
    store.upsert_customer(customer.clone()).await.unwrap();

    let mut products = Vec::with_capacity(stock.len());
    for (name, price, quantity) in stock {
        let product = Product::new(
            ProductId::new(),
            *name,
            Money::new(*price).unwrap(),
            *quantity,
        );
        products.push(product.id);
        store.upsert_product(product).await.unwrap();
    }

    Fixture {
        store,
        customer: customer.id,
        products,
    }
}

pub const ADA: &str = "0b9c3f8e-6d55-4c4e-9a57-3f1d2b7c8a10";
pub const WIDGET: &str = "5f0e7a2c-1b3d-4e8f-9a6b-7c5d4e3f2a11";
pub const GADGET: &str = "6a1f8b3d-2c4e-4f9a-8b7c-8d6e5f4a3b22";

/// Catalog with customer Ada, a Widget (stock 10, 5.00) and a Gadget (stock 3, 12.50).
pub fn catalog_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "customers": [{{ "id": "{ADA}", "name": "Ada", "email": "ada@example.com" }}],
            "products": [
                {{ "id": "{WIDGET}", "name": "Widget", "price": "5.00", "quantity": 10 }},
                {{ "id": "{GADGET}", "name": "Gadget", "price": "12.50", "quantity": 3 }}
            ]
        }}"#
    )
    .unwrap();
    file
}

/// Writes an order CSV with the standard header followed by `rows`.
pub fn orders_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "order, customer, product, quantity").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}
