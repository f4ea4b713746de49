use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use gophermart_core::error::AccrualError;

use crate::{AccrualGateway, Calculation};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin `reqwest` wrapper over `GET {base}/api/orders/{number}`.
pub struct AccrualClient {
    http: Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("failed to build accrual HTTP client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AccrualGateway for AccrualClient {
    async fn get_calculation(&self, number: i64) -> Result<Calculation, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);
        debug!(url = %url, "GET accrual calculation");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AccrualError::Connection(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp
                    .json()
                    .await
                    .map_err(|e| AccrualError::Decode(e.to_string()))?;
                Ok(Calculation::Body(body))
            }
            StatusCode::NO_CONTENT => Ok(Calculation::NoContent),
            StatusCode::TOO_MANY_REQUESTS => Ok(Calculation::TooManyRequests),
            status if status.is_server_error() => Ok(Calculation::ServerError(status.as_u16())),
            status => Ok(Calculation::ServerError(status.as_u16())),
        }
    }
}
