use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gophermart_accrual::{AccrualGateway, Calculation};
use gophermart_core::error::ProcessorError;
use gophermart_core::repo::{BalanceRepo, CreditRepo, OrderRepo};
use gophermart_core::state::OrderStatus;
use gophermart_core::types::CalculationStatus;

use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    pub max_attempts: u32,
    pub poll_delay: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            poll_delay: Duration::from_secs(5),
        }
    }
}

/// Drives one order from NEW through the accrual pipeline to a terminal
/// status: claim, poll the accrual service, then credit the owning user's
/// balance and mark PROCESSED as one atomic step.
pub struct OrderProcessor<R> {
    repo: Arc<R>,
    accrual: Arc<dyn AccrualGateway>,
    config: ProcessorConfig,
    metrics: Arc<Metrics>,
}

impl<R> OrderProcessor<R>
where
    R: OrderRepo + BalanceRepo + CreditRepo + Send + Sync,
{
    pub fn new(
        repo: Arc<R>,
        accrual: Arc<dyn AccrualGateway>,
        config: ProcessorConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repo,
            accrual,
            config,
            metrics,
        }
    }

    pub async fn process(
        &self,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessorError> {
        let timer = self.metrics.order_processing_duration_seconds.start_timer();
        let result = self.process_inner(number, cancel).await;
        timer.observe_duration();

        match &result {
            Ok(()) => self.metrics.orders_processed_total.inc(),
            Err(ProcessorError::Cancelled) | Err(ProcessorError::AlreadyClaimed) => {}
            Err(_) => self.metrics.orders_invalidated_total.inc(),
        }
        result
    }

    async fn process_inner(
        &self,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessorError> {
        // Step 1: claim the order with a compare-and-swap transition.
        let claimed = tokio::select! {
            r = self.repo.update_order_status_if(number, OrderStatus::New, OrderStatus::Processing) => r,
            _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
        }
        .map_err(|e| ProcessorError::Internal(e.to_string()))?;

        if !claimed {
            return Err(ProcessorError::AlreadyClaimed);
        }

        info!(order = number, "order entering PROCESSING");

        // Step 2: poll the accrual service, bounded by max_attempts.
        let mut attempts = 0u32;
        let body = loop {
            if attempts >= self.config.max_attempts {
                self.invalidate(number).await;
                return Err(ProcessorError::AttemptsExceeded(self.config.max_attempts));
            }

            self.metrics.accrual_requests_total.inc();
            let calc = tokio::select! {
                r = self.accrual.get_calculation(number) => r,
                _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
            };

            let calc = match calc {
                Ok(c) => c,
                Err(e) => {
                    self.invalidate(number).await;
                    return Err(ProcessorError::RemoteUnreachable(e.to_string()));
                }
            };

            match calc {
                Calculation::TooManyRequests => {
                    self.metrics.accrual_rate_limited_total.inc();
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_delay) => {}
                        _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
                    }
                    continue;
                }
                Calculation::NoContent | Calculation::ServerError(_) => {
                    self.invalidate(number).await;
                    return Err(ProcessorError::NotRegistered);
                }
                Calculation::Body(body) => match body.status {
                    CalculationStatus::Invalid => {
                        self.invalidate(number).await;
                        return Err(ProcessorError::DeclaredInvalid);
                    }
                    CalculationStatus::Processed => break body,
                    CalculationStatus::Registered | CalculationStatus::Processing => {
                        attempts += 1;
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.poll_delay) => {}
                            _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
                        }
                    }
                },
            }
        };

        // Step 3: reload the order to recover its owning user_id. A
        // failure here returns Internal without flipping the order's
        // status, since we no longer know who to invalidate on behalf of.
        let order = tokio::select! {
            r = self.repo.get_order_by_number(number) => r,
            _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
        }
        .map_err(|e| ProcessorError::Internal(e.to_string()))?;

        // Step 4: load the user.
        let user = tokio::select! {
            r = self.repo.get_user(order.user_id) => r,
            _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
        };
        let user = match user {
            Ok(u) => u,
            Err(_) => {
                self.invalidate(number).await;
                return Err(ProcessorError::Internal("owning user not found".into()));
            }
        };

        let accrual = body.accrual.unwrap_or(0.0).floor() as i64;
        let new_balance = user.balance + accrual;

        // Steps 5-7: credit balance, record accrual, and mark PROCESSED as
        // a single atomic unit.
        let credited = tokio::select! {
            r = self.repo.credit_order(number, user.id, new_balance, (accrual > 0).then_some(accrual)) => r,
            _ = cancel.cancelled() => return Err(ProcessorError::Cancelled),
        };

        match credited {
            Ok(()) => {
                info!(order = number, accrual, "order PROCESSED");
                Ok(())
            }
            Err(e) => {
                self.invalidate(number).await;
                Err(ProcessorError::Internal(e.to_string()))
            }
        }
    }

    async fn invalidate(&self, number: i64) {
        if let Err(e) = self.repo.update_order_status(number, OrderStatus::Invalid).await {
            warn!(order = number, error = %e, "failed to mark order INVALID");
        }
    }
}
