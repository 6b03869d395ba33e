use crate::domain::customer::Customer;
use crate::domain::order::{
    DuplicateLinePolicy, Order, OrderLine, OrderRequest, RequestedLine, StockAdjustment,
};
use crate::domain::ports::{
    CustomerLookup, CustomerLookupBox, ProductBatchLookup, ProductBatchLookupBox, UnitOfWork,
    UnitOfWorkBox,
};
use crate::domain::product::{Product, ProductId};
use crate::error::{OrderError, Result, StoreError, StoreResult};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Tunables for [`OrderPlacementService`].
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    /// Budget for one whole placement, shared by every store call it makes.
    pub call_timeout: Duration,
    pub duplicate_lines: DuplicateLinePolicy,
    pub max_lines: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            duplicate_lines: DuplicateLinePolicy::Reject,
            max_lines: 500,
        }
    }
}

/// Places orders against injected customer, product and order stores.
///
/// A placement validates the customer, resolves every requested product in one
/// batch, checks stock for each line and then commits the stock decrements
/// together with the new order. Either all of it becomes visible or none of it
/// does. Stock decrements are conditional on the quantities observed during
/// validation, so concurrent placements can never oversell a product.
pub struct OrderPlacementService {
    customers: CustomerLookupBox,
    products: ProductBatchLookupBox,
    unit_of_work: UnitOfWorkBox,
    config: PlacementConfig,
}

impl OrderPlacementService {
    /// Creates a new `OrderPlacementService` with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `customers` - Resolves customer ids.
    /// * `products` - Resolves requested products in one batch.
    /// * `unit_of_work` - Opens the scope that commits stock and the order together.
    pub fn new(
        customers: CustomerLookupBox,
        products: ProductBatchLookupBox,
        unit_of_work: UnitOfWorkBox,
    ) -> Self {
        Self::with_config(customers, products, unit_of_work, PlacementConfig::default())
    }

    pub fn with_config(
        customers: CustomerLookupBox,
        products: ProductBatchLookupBox,
        unit_of_work: UnitOfWorkBox,
        config: PlacementConfig,
    ) -> Self {
        Self {
            customers,
            products,
            unit_of_work,
            config,
        }
    }

    /// Wires every port to clones of a single store.
    pub fn from_store<S>(store: S, config: PlacementConfig) -> Self
    where
        S: CustomerLookup + ProductBatchLookup + UnitOfWork + Clone + 'static,
    {
        Self::with_config(
            Box::new(store.clone()),
            Box::new(store.clone()),
            Box::new(store),
            config,
        )
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Places an order, giving the whole placement `call_timeout` to finish.
    #[tracing::instrument(
        skip_all,
        fields(customer = %request.customer_id, lines = request.lines.len())
    )]
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order> {
        let deadline = Instant::now() + self.config.call_timeout;
        self.place_order_before(request, deadline).await
    }

    /// Places an order, abandoning any store call still pending at `deadline`.
    ///
    /// A deadline hit during the commit behaves like any other commit failure:
    /// the scope is dropped and nothing is written.
    pub async fn place_order_before(&self, request: OrderRequest, deadline: Instant) -> Result<Order> {
        let result = self.place(&request, deadline).await;
        match &result {
            Ok(order) => info!(order = %order.id, lines = order.lines.len(), "order placed"),
            Err(e) if e.is_retryable() => error!(kind = e.kind(), error = %e, "order placement failed"),
            Err(e) => warn!(kind = e.kind(), error = %e, "order rejected"),
        }
        result
    }

    async fn place(&self, request: &OrderRequest, deadline: Instant) -> Result<Order> {
        let lines =
            request.normalized_lines(self.config.duplicate_lines, self.config.max_lines)?;

        let customer = within(
            deadline,
            "customer lookup",
            self.customers.find_by_id(request.customer_id),
        )
        .await
        .map_err(OrderError::LookupFailed)?
        .ok_or(OrderError::CustomerNotFound(request.customer_id))?;

        let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        let products = within(
            deadline,
            "product lookup",
            self.products.find_all_by_ids(&ids),
        )
        .await
        .map_err(OrderError::LookupFailed)?;

        let (adjustments, order_lines) = stage(&lines, products)?;

        self.commit(&customer, adjustments, order_lines, deadline)
            .await
            .map_err(OrderError::CommitFailed)
    }

    async fn commit(
        &self,
        customer: &Customer,
        adjustments: Vec<StockAdjustment>,
        lines: Vec<OrderLine>,
        deadline: Instant,
    ) -> StoreResult<Order> {
        let work = async {
            let mut scope = self.unit_of_work.begin().await?;
            scope.update_quantities(&adjustments).await?;
            let order = scope.create(customer, lines).await?;
            scope.commit().await?;
            Ok::<_, StoreError>(order)
        };
        within(deadline, "commit", work).await
    }
}

/// Matches requested lines to resolved products, computing each stock
/// adjustment and snapshotting the current price into the order line.
fn stage(
    lines: &[RequestedLine],
    products: Vec<Product>,
) -> Result<(Vec<StockAdjustment>, Vec<OrderLine>)> {
    // Anything the store returned that was not asked for is dropped here.
    let by_id: HashMap<ProductId, Product> = products
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let missing: Vec<ProductId> = lines
        .iter()
        .map(|line| line.product_id)
        .filter(|id| !by_id.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(OrderError::ProductNotFound(missing));
    }

    let mut adjustments = Vec::with_capacity(lines.len());
    let mut order_lines = Vec::with_capacity(lines.len());
    for line in lines {
        let product = &by_id[&line.product_id];
        adjustments.push(product.reserve(line.quantity)?);
        order_lines.push(OrderLine {
            product_id: product.id,
            price: product.price,
            quantity: line.quantity,
        });
    }

    Ok((adjustments, order_lines))
}

async fn within<T>(
    deadline: Instant,
    operation: &'static str,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| StoreError::DeadlineExceeded(operation))?
}
