use crate::domain::order::Order;
use crate::error::OrderError;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    order: &'a str,
    status: &'a str,
    order_id: String,
    detail: String,
}

/// Writes one CSV row per placement attempt:
/// `order,status,order_id,detail`.
///
/// `status` is `placed` on success, otherwise the error kind, with the error
/// message in `detail`.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcome(
        &mut self,
        reference: &str,
        outcome: &Result<Order, OrderError>,
    ) -> csv::Result<()> {
        let record = match outcome {
            Ok(order) => OutcomeRecord {
                order: reference,
                status: "placed",
                order_id: order.id.to_string(),
                detail: String::new(),
            },
            Err(e) => OutcomeRecord {
                order: reference,
                status: e.kind(),
                order_id: String::new(),
                detail: e.to_string(),
            },
        };
        self.writer.serialize(record)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
