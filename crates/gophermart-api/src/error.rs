use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use gophermart_core::error::RepoError;

/// Maps a handler-level failure to the HTTP status codes spec.md section 6
/// assigns each endpoint. Grounded on the teacher's pattern of returning
/// `(StatusCode, Json<...>)` tuples from every handler branch, collapsed
/// into a single `IntoResponse` impl here instead of repeating the mapping
/// at every call site.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("order number already registered to another user")]
    Conflict,

    #[error("login already taken")]
    LoginTaken,

    #[error("order number fails the Luhn check")]
    InvalidOrderNumber,

    #[error("insufficient balance")]
    InsufficientFunds,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::Unauthorized,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict | ApiError::LoginTaken => StatusCode::CONFLICT,
            ApiError::InvalidOrderNumber => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal API error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
