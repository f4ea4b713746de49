mod config;
mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use gophermart_accrual::AccrualClient;
use gophermart_api::AppState;
use gophermart_core::repo::{OrderQueryRepo, UserRepo, WithdrawalRepo};
use gophermart_pipeline::{Metrics, Pipeline, ProcessorConfig, Submitter};
use gophermart_storage::{create_pool, run_migrations, PgRepository};

use config::Config;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gophermart_server=info,gophermart_pipeline=info".into()),
        )
        .json()
        .init();

    let config = Config::parse();
    info!(listen_address = %config.listen_address, "gophermart-server starting");

    let pool = match create_pool(&config.database_dsn) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to create database pool");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        error!(error = %e, "migrations failed");
        std::process::exit(1);
    }

    let repo = Arc::new(PgRepository::new(pool));
    let accrual: Arc<dyn gophermart_accrual::AccrualGateway> =
        Arc::new(AccrualClient::new(config.accrual_base_url()));

    let registry = prometheus::Registry::new();
    let metrics = Arc::new(Metrics::new(&registry));

    let cancel = CancellationToken::new();

    let processor_config = ProcessorConfig {
        max_attempts: config.max_accrual_attempts,
        poll_delay: Duration::from_secs(config.accrual_poll_delay_seconds),
    };

    let pipeline = Arc::new(Pipeline::start(
        Arc::clone(&repo),
        accrual,
        processor_config,
        Arc::clone(&metrics),
        config.pool_size,
        cancel.clone(),
    ));

    let submitter: Arc<dyn Submitter> = pipeline.clone();
    let _supervisor = pipeline.spawn_supervisor(Arc::clone(&repo), submitter.clone());

    let app_state = Arc::new(AppState {
        users: repo.clone() as Arc<dyn UserRepo>,
        orders: repo.clone() as Arc<dyn OrderQueryRepo>,
        withdrawals: repo.clone() as Arc<dyn WithdrawalRepo>,
        submitter,
        jwt_secret: config.secret_key.clone(),
        token_expiry: Duration::from_secs(config.token_expiry_hours * 3600),
    });

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
        .merge(gophermart_api::router(app_state))
        .layer(TraceLayer::new_for_http());

    let listener = match TcpListener::bind(config.bind_address()).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr = %config.listen_address, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(addr = %config.listen_address, "HTTP server listening");

    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        info!("shutdown signal received");
        shutdown_cancel.cancel();
    });

    let serve = axum::serve(listener, app).with_graceful_shutdown({
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    });

    match tokio::time::timeout(DRAIN_TIMEOUT, serve).await {
        Ok(Ok(())) => info!("HTTP server drained"),
        Ok(Err(e)) => error!(error = %e, "HTTP server error"),
        Err(_) => warn!("HTTP server drain timed out, forcing shutdown"),
    }

    cancel.cancel();
    pipeline.shutdown().await;

    info!("gophermart-server stopped");
}

async fn metrics_handler(
    axum::extract::State(registry): axum::extract::State<prometheus::Registry>,
) -> impl IntoResponse {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let families = registry.gather();
    let mut buf = Vec::new();
    match encoder.encode(&families, &mut buf) {
        Ok(()) => (StatusCode::OK, buf).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding error: {e}"),
        )
            .into_response(),
    }
}
