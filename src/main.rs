use clap::Parser;
use miette::{IntoDiagnostic, Result};
use order_placement::application::placement::{OrderPlacementService, PlacementConfig};
use order_placement::domain::order::{DuplicateLinePolicy, Order, OrderRequest};
use order_placement::domain::ports::{
    CustomerLookup, CustomerRegistry, ProductBatchLookup, ProductCatalog, UnitOfWork,
};
use order_placement::error::OrderError;
use order_placement::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use order_placement::infrastructure::rocksdb::RocksDbStore;
use order_placement::interfaces::catalog::Catalog;
use order_placement::interfaces::csv::order_reader::OrderReader;
use order_placement::interfaces::csv::outcome_writer::OutcomeWriter;
use order_placement::interfaces::csv::stock_writer::StockReportWriter;
use order_placement::telemetry;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Order lines CSV file (order,customer,product,quantity)
    input: PathBuf,

    /// JSON catalog of customers and products to load before placing orders.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Time budget for each placement, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Sum repeated products within one order instead of rejecting the order.
    #[arg(long)]
    merge_duplicates: bool,

    /// Maximum number of lines accepted in one order.
    #[arg(long, default_value_t = 500)]
    max_lines: usize,

    /// Maximum number of placements in flight at once.
    #[arg(long, default_value_t = 16)]
    concurrency: usize,

    /// How many times to retry a placement that failed with a retryable error.
    #[arg(long, default_value_t = 0)]
    max_retries: u32,

    /// Write the final stock levels to this CSV file.
    #[arg(long)]
    stock_report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn placement_config(&self) -> PlacementConfig {
        PlacementConfig {
            call_timeout: Duration::from_millis(self.timeout_ms),
            duplicate_lines: if self.merge_duplicates {
                DuplicateLinePolicy::Merge
            } else {
                DuplicateLinePolicy::Reject
            },
            max_lines: self.max_lines,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match &cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let store = RocksDbStore::open(db_path).into_diagnostic()?;
            run(&cli, store).await
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            run(&cli, InMemoryStore::new()).await
        }
        None => run(&cli, InMemoryStore::new()).await,
    }
}

async fn run<S>(cli: &Cli, store: S) -> Result<()>
where
    S: CustomerLookup
        + ProductBatchLookup
        + UnitOfWork
        + CustomerRegistry
        + ProductCatalog
        + Clone
        + 'static,
{
    if let Some(path) = &cli.catalog {
        let file = File::open(path).into_diagnostic()?;
        let catalog = Catalog::from_reader(file).into_diagnostic()?;
        catalog.seed(&store).await.into_diagnostic()?;
    }

    let file = File::open(&cli.input).into_diagnostic()?;
    let (requests, skipped) = OrderReader::new(file).requests();
    for e in &skipped {
        eprintln!("Error reading order line: {}", e);
    }

    let service = Arc::new(OrderPlacementService::from_store(
        store.clone(),
        cli.placement_config(),
    ));
    let limit = Arc::new(Semaphore::new(cli.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut outcomes: Vec<Option<std::result::Result<Order, OrderError>>> =
        requests.iter().map(|_| None).collect();

    // Permits are taken before spawning so placements start in input order.
    for (idx, named) in requests.iter().enumerate() {
        let request = match named.request.clone().into_request() {
            Ok(request) => request,
            Err(e) => {
                outcomes[idx] = Some(Err(e));
                continue;
            }
        };
        let permit = Arc::clone(&limit).acquire_owned().await.into_diagnostic()?;
        let service = Arc::clone(&service);
        let max_retries = cli.max_retries;
        tasks.spawn(async move {
            let outcome = place_with_retries(&service, request, max_retries).await;
            drop(permit);
            (idx, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (idx, outcome) = joined.into_diagnostic()?;
        outcomes[idx] = Some(outcome);
    }

    {
        let stdout = io::stdout();
        let mut writer = OutcomeWriter::new(stdout.lock());
        for (named, outcome) in requests.iter().zip(outcomes) {
            if let Some(outcome) = outcome {
                writer
                    .write_outcome(&named.reference, &outcome)
                    .into_diagnostic()?;
            }
        }
        writer.flush().into_diagnostic()?;
    }

    if let Some(path) = &cli.stock_report {
        let products = store.all_products().await.into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        StockReportWriter::new(file)
            .write_products(&products)
            .into_diagnostic()?;
    }

    Ok(())
}

/// Retries transient failures with exponential backoff; business rejections
/// are returned as-is on the first attempt.
async fn place_with_retries(
    service: &OrderPlacementService,
    request: OrderRequest,
    max_retries: u32,
) -> std::result::Result<Order, OrderError> {
    let mut attempt = 0;
    let mut delay = Duration::from_millis(10);
    loop {
        match service.place_order(request.clone()).await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                tracing::info!(attempt, error = %e, "retrying order placement");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(1));
            }
            outcome => return outcome,
        }
    }
}
