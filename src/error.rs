use crate::domain::customer::CustomerId;
use crate::domain::product::ProductId;
use miette::Diagnostic;
use thiserror::Error;

/// Failures raised by the storage adapters behind the ports.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Stock for product {product_id} changed concurrently (expected {expected}, found {found})")]
    Conflict {
        product_id: ProductId,
        expected: u32,
        found: u32,
    },
    #[error("Product {0} disappeared before commit")]
    MissingProduct(ProductId),
    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why an order could not be placed.
///
/// Everything except [`OrderError::CommitFailed`] and [`OrderError::LookupFailed`]
/// describes a request that will keep failing until the caller changes it.
#[derive(Error, Debug, Diagnostic)]
pub enum OrderError {
    #[error("Customer {0} does not exist")]
    #[diagnostic(code(order::customer_not_found))]
    CustomerNotFound(CustomerId),

    #[error("One or more products were not found: {}", join_ids(.0))]
    #[diagnostic(code(order::product_not_found))]
    ProductNotFound(Vec<ProductId>),

    #[error(
        "Product {name} ({product_id}) has {available} unit(s) in stock, requested {requested}"
    )]
    #[diagnostic(
        code(order::insufficient_stock),
        help("lower the requested quantity or wait for the product to be restocked")
    )]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("Invalid request: {0}")]
    #[diagnostic(code(order::invalid_request))]
    InvalidRequest(String),

    #[error("Order commit failed: {0}")]
    #[diagnostic(
        code(order::commit_failed),
        help("nothing was written; the request can be retried")
    )]
    CommitFailed(#[source] StoreError),

    #[error("Store lookup failed: {0}")]
    #[diagnostic(
        code(order::lookup_failed),
        help("nothing was written; the request can be retried")
    )]
    LookupFailed(#[source] StoreError),
}

impl OrderError {
    /// Transient storage faults; the same request may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommitFailed(_) | Self::LookupFailed(_))
    }

    /// Short stable label, used in outcome reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CustomerNotFound(_) => "customer_not_found",
            Self::ProductNotFound(_) => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InvalidRequest(_) => "invalid_request",
            Self::CommitFailed(_) => "commit_failed",
            Self::LookupFailed(_) => "lookup_failed",
        }
    }
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, OrderError>;
