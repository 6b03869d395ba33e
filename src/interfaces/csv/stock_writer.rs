use crate::domain::product::Product;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct StockRecord<'a> {
    product: String,
    name: &'a str,
    quantity: u32,
}

/// Writes current stock levels as CSV: `product,name,quantity`.
pub struct StockReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StockReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_products(&mut self, products: &[Product]) -> csv::Result<()> {
        for product in products {
            self.writer.serialize(StockRecord {
                product: product.id.to_string(),
                name: &product.name,
                quantity: product.quantity,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
