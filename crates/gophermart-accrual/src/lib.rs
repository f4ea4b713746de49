mod client;

pub use client::AccrualClient;

use async_trait::async_trait;
use gophermart_core::error::AccrualError;
use gophermart_core::types::CalculationBody;

/// Outcome of one `GET /api/orders/{number}` call, preserving the
/// status-code branches the Order Processor must distinguish (spec.md
/// section 4.2): a 200 carries a body, 204/429/5xx are returned verbatim.
#[derive(Debug, Clone)]
pub enum Calculation {
    Body(CalculationBody),
    NoContent,
    TooManyRequests,
    ServerError(u16),
}

/// A client for the external accrual-calculation service.
///
/// No retries and no persistent state live here -- that policy belongs to
/// the Order Processor (gophermart-pipeline), which is the only caller.
#[async_trait]
pub trait AccrualGateway: Send + Sync {
    async fn get_calculation(&self, number: i64) -> Result<Calculation, AccrualError>;
}
