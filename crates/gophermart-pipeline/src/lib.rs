pub mod metrics;
pub mod pool;
pub mod processor;
pub mod supervisor;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gophermart_accrual::AccrualGateway;
use gophermart_core::repo::{BalanceRepo, CreditRepo, OrderRepo};

pub use metrics::Metrics;
pub use pool::{Pool, Task};
pub use processor::{OrderProcessor, ProcessorConfig};

/// Narrow surface the Supervisor and the API's Submission Hook share:
/// hand an order number to the pipeline for processing.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, number: i64);
}

/// Wires the Worker Pool, Order Processor, and Accrual Client into a
/// single handle the Lifecycle owns. Implements `Submitter` so both the
/// Supervisor and `gophermart-api`'s order-registration handler call the
/// same code path (spec.md's Submission Hook).
pub struct Pipeline<R> {
    pool: Pool,
    processor: Arc<OrderProcessor<R>>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl<R> Pipeline<R>
where
    R: OrderRepo + BalanceRepo + CreditRepo + Send + Sync + 'static,
{
    pub fn start(
        repo: Arc<R>,
        accrual: Arc<dyn AccrualGateway>,
        config: ProcessorConfig,
        metrics: Arc<Metrics>,
        pool_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        let processor = Arc::new(OrderProcessor::new(repo, accrual, config, Arc::clone(&metrics)));
        let pool = Pool::spawn(pool_size);
        Self {
            pool,
            processor,
            metrics,
            cancel,
        }
    }

    /// Spawn the Supervisor loop as its own task, sweeping NEW orders on
    /// an interval independent of the Submission Hook.
    pub fn spawn_supervisor(
        &self,
        repo: Arc<R>,
        submitter: Arc<dyn Submitter>,
    ) -> JoinHandle<()> {
        let shutdown = self.cancel.clone();
        tokio::spawn(async move {
            supervisor::run(repo, submitter, shutdown).await;
        })
    }

    /// Stop accepting new work and drain everything already queued.
    ///
    /// Takes `&self` so Lifecycle can hold the same `Arc<Pipeline<R>>` it
    /// handed out as the shared `Submitter` for the API layer and the
    /// Supervisor, rather than needing sole ownership to tear it down.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.pool.shutdown();
        self.pool.join().await;
    }
}

#[async_trait]
impl<R> Submitter for Pipeline<R>
where
    R: OrderRepo + BalanceRepo + CreditRepo + Send + Sync + 'static,
{
    async fn submit(&self, number: i64) {
        self.metrics.orders_submitted_total.inc();
        let processor = Arc::clone(&self.processor);
        let cancel = self.cancel.clone();
        self.pool
            .submit(Box::new(move || {
                Box::pin(async move {
                    match processor.process(number, &cancel).await {
                        Ok(()) => {}
                        Err(e) => match e {
                            gophermart_core::error::ProcessorError::AlreadyClaimed
                            | gophermart_core::error::ProcessorError::Cancelled => {
                                info!(order = number, error = %e, "processing ended uneventfully")
                            }
                            _ => warn!(order = number, error = %e, "order processing failed"),
                        },
                    }
                })
            }))
            .await;
    }
}
