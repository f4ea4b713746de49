use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gophermart_core::repo::OrderRepo;
use gophermart_core::state::OrderStatus;

use crate::Submitter;

/// Periodic sweep that re-submits any order still sitting in NEW, acting
/// as the crash-recovery / missed-submission safety net. Modeled on a
/// ticking reconcile loop raced against a cancellation token.
pub async fn run<R: OrderRepo + Send + Sync>(
    repo: Arc<R>,
    submitter: Arc<dyn Submitter>,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match repo.get_orders_by_status(OrderStatus::New).await {
                    Ok(orders) => {
                        for order in orders {
                            submitter.submit(order.number).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "supervisor sweep failed"),
                }
            }
            _ = shutdown.cancelled() => {
                info!("supervisor shutting down");
                break;
            }
        }
    }
}
