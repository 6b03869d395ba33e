use crate::domain::customer::CustomerId;
use crate::domain::product::{Money, ProductId};
use crate::error::OrderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    /// Time-ordered id, as assigned by the stores on creation.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One product/quantity/price entry of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Product price captured when the order was placed.
    pub price: Money,
    pub quantity: u32,
}

/// A placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn line_for(&self, product_id: ProductId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }
}

/// Post-decrement stock value for one product, conditioned on the stock level
/// it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub expected_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl RequestedLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// What to do when one request names the same product twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateLinePolicy {
    /// Fail with `InvalidRequest`.
    #[default]
    Reject,
    /// Sum the quantities into the first occurrence.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: CustomerId,
    pub lines: Vec<RequestedLine>,
}

impl OrderRequest {
    pub fn new(customer_id: CustomerId, lines: Vec<RequestedLine>) -> Self {
        Self { customer_id, lines }
    }

    /// Validates the request shape and returns lines with unique product ids,
    /// in the order the products first appear.
    pub fn normalized_lines(
        &self,
        policy: DuplicateLinePolicy,
        max_lines: usize,
    ) -> Result<Vec<RequestedLine>, OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::InvalidRequest(
                "Order must contain at least one line".to_string(),
            ));
        }
        if self.lines.len() > max_lines {
            return Err(OrderError::InvalidRequest(format!(
                "Order has {} lines, at most {max_lines} allowed",
                self.lines.len()
            )));
        }

        let mut positions: HashMap<ProductId, usize> = HashMap::with_capacity(self.lines.len());
        let mut normalized: Vec<RequestedLine> = Vec::with_capacity(self.lines.len());

        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidRequest(format!(
                    "Quantity for product {} must be positive",
                    line.product_id
                )));
            }

            match positions.get(&line.product_id) {
                None => {
                    positions.insert(line.product_id, normalized.len());
                    normalized.push(*line);
                }
                Some(_) if policy == DuplicateLinePolicy::Reject => {
                    return Err(OrderError::InvalidRequest(format!(
                        "Product {} appears more than once",
                        line.product_id
                    )));
                }
                Some(&idx) => {
                    let merged = &mut normalized[idx];
                    merged.quantity =
                        merged.quantity.checked_add(line.quantity).ok_or_else(|| {
                            OrderError::InvalidRequest(format!(
                                "Combined quantity for product {} overflows",
                                line.product_id
                            ))
                        })?;
                }
            }
        }

        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lines: Vec<RequestedLine>) -> OrderRequest {
        OrderRequest::new(CustomerId::new(), lines)
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let result = request(vec![]).normalized_lines(DuplicateLinePolicy::Reject, 10);
        assert!(matches!(result, Err(OrderError::InvalidRequest(_))));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let result = request(vec![RequestedLine::new(ProductId::new(), 0)])
            .normalized_lines(DuplicateLinePolicy::Merge, 10);
        assert!(matches!(result, Err(OrderError::InvalidRequest(_))));
    }

    #[test]
    fn test_too_many_lines_is_rejected() {
        let lines = (0..3).map(|_| RequestedLine::new(ProductId::new(), 1)).collect();
        let result = request(lines).normalized_lines(DuplicateLinePolicy::Reject, 2);
        assert!(matches!(result, Err(OrderError::InvalidRequest(_))));
    }

    #[test]
    fn test_duplicates_rejected_by_default() {
        let p = ProductId::new();
        let result = request(vec![RequestedLine::new(p, 1), RequestedLine::new(p, 2)])
            .normalized_lines(DuplicateLinePolicy::default(), 10);
        assert!(matches!(result, Err(OrderError::InvalidRequest(_))));
    }

    #[test]
    fn test_duplicates_merged_at_first_position() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let lines = request(vec![
            RequestedLine::new(a, 1),
            RequestedLine::new(b, 5),
            RequestedLine::new(a, 2),
        ])
        .normalized_lines(DuplicateLinePolicy::Merge, 10)
        .unwrap();

        assert_eq!(lines, vec![RequestedLine::new(a, 3), RequestedLine::new(b, 5)]);
    }

    #[test]
    fn test_merge_overflow_is_rejected() {
        let p = ProductId::new();
        let result = request(vec![RequestedLine::new(p, u32::MAX), RequestedLine::new(p, 1)])
            .normalized_lines(DuplicateLinePolicy::Merge, 10);
        assert!(matches!(result, Err(OrderError::InvalidRequest(_))));
    }
}
