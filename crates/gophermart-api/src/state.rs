use std::sync::Arc;
use std::time::Duration;

use gophermart_core::repo::{OrderQueryRepo, UserRepo, WithdrawalRepo};
use gophermart_pipeline::Submitter;

/// Everything the HTTP handlers need, handed in by `gophermart-server` at
/// startup. Deliberately holds trait objects rather than a concrete
/// `PgRepository` so this crate never depends on `gophermart-storage` or
/// Postgres directly -- the wiring lives in the binary, the same split the
/// teacher draws between its `AppState` (generic over `ExchangeAdapter`)
/// and `harman::db`'s concrete Postgres functions.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub orders: Arc<dyn OrderQueryRepo>,
    pub withdrawals: Arc<dyn WithdrawalRepo>,
    pub submitter: Arc<dyn Submitter>,
    pub jwt_secret: String,
    pub token_expiry: Duration,
}

/// Populated into request extensions by the auth middleware once the
/// `AUTH_TOKEN` cookie has been verified.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    pub user_id: i64,
}
