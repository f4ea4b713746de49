pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

pub use state::{AppState, SessionContext};

/// Builds the full `/api/user/*` router: register/login are public, every
/// other route requires a verified `AUTH_TOKEN` cookie. Modeled on the
/// teacher's `public.merge(authenticated)` split in `ssmd-harman::api`.
pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/api/user/register", post(handlers::register))
        .route("/api/user/login", post(handlers::login));

    let authenticated = Router::new()
        .route(
            "/api/user/orders",
            post(handlers::register_order).get(handlers::list_orders),
        )
        .route("/api/user/balance", get(handlers::balance))
        .route("/api/user/balance/withdraw", post(handlers::withdraw))
        .route("/api/user/withdrawals", get(handlers::list_withdrawals))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    public.merge(authenticated).with_state(state)
}
