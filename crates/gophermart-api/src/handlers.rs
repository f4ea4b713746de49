use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use gophermart_core::error::RepoError;
use gophermart_core::luhn;
use gophermart_core::state::OrderStatus;

use crate::auth::{hash_password, session_cookie, verify_password};
use crate::error::ApiError;
use crate::state::{AppState, SessionContext};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    login: String,
    password: String,
}

/// `POST /api/user/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.login.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("login and password are required".into()));
    }

    let hash = hash_password(&req.password)?;
    let user = match state.users.create_user(&req.login, &hash).await {
        Ok(u) => u,
        Err(RepoError::Conflict) => return Err(ApiError::LoginTaken),
        Err(e) => return Err(e.into()),
    };

    let cookie = session_cookie(&state, user.id)?;
    Ok((StatusCode::OK, jar.add(cookie)))
}

/// `POST /api/user/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.login.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("login and password are required".into()));
    }

    let user = state
        .users
        .get_user_by_login(&req.login)
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let cookie = session_cookie(&state, user.id)?;
    Ok((StatusCode::OK, jar.add(cookie)))
}

/// `POST /api/user/orders` -- body is the decimal order number as plain text.
pub async fn register_order(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let number: i64 = body
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("order number must be a decimal integer".into()))?;

    if !luhn::is_valid(number) {
        return Err(ApiError::InvalidOrderNumber);
    }

    match state.orders.create_order(ctx.user_id, number).await {
        Ok(_) => {
            state.submitter.submit(number).await;
            Ok(StatusCode::ACCEPTED)
        }
        Err(RepoError::Conflict) => match state.orders.list_orders_for_user(ctx.user_id).await {
            Ok(existing) if existing.iter().any(|o| o.number == number) => Ok(StatusCode::OK),
            _ => Err(ApiError::Conflict),
        },
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<i64>,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// `GET /api/user/orders`
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.orders.list_orders_for_user(ctx.user_id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let views: Vec<OrderView> = orders
        .into_iter()
        .map(|o| OrderView {
            number: o.number.to_string(),
            status: o.status,
            accrual: o.accrual,
            uploaded_at: o.created_at,
        })
        .collect();
    Ok((StatusCode::OK, Json(views)).into_response())
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub current: i64,
    pub withdrawn: i64,
}

/// `GET /api/user/balance`
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.get_user(ctx.user_id).await?;
    let withdrawals = state.withdrawals.list_withdrawals_for_user(ctx.user_id).await?;
    let withdrawn: i64 = withdrawals.iter().map(|w| w.sum).sum();

    Ok(Json(BalanceView {
        current: user.balance,
        withdrawn,
    }))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    order: String,
    sum: i64,
}

/// `POST /api/user/balance/withdraw`
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let number: i64 = req
        .order
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("order number must be a decimal integer".into()))?;

    if !luhn::is_valid(number) {
        return Err(ApiError::InvalidOrderNumber);
    }
    if req.sum <= 0 {
        return Err(ApiError::BadRequest("sum must be positive".into()));
    }

    match state.withdrawals.withdraw(ctx.user_id, number, req.sum).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(RepoError::Conflict) => Err(ApiError::InsufficientFunds),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalView {
    pub order: String,
    pub sum: i64,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

/// `GET /api/user/withdrawals`
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<impl IntoResponse, ApiError> {
    let withdrawals = state.withdrawals.list_withdrawals_for_user(ctx.user_id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let views: Vec<WithdrawalView> = withdrawals
        .into_iter()
        .map(|w| WithdrawalView {
            order: w.order_number.to_string(),
            sum: w.sum,
            processed_at: w.created_at,
        })
        .collect();
    Ok((StatusCode::OK, Json(views)).into_response())
}
