use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{AppState, SessionContext};

pub const AUTH_COOKIE_NAME: &str = "AUTH_TOKEN";

/// Session claims signed into the `AUTH_TOKEN` cookie. Mirrors the
/// teacher's JWT-based session pattern, generalized from a third-party-
/// issued token (Cloudflare Access) to one this service issues itself.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: i64,
    exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Sign a session token for `user_id`, valid for `state.token_expiry`.
fn issue_token(state: &AppState, user_id: i64) -> Result<String, ApiError> {
    let expiry = ChronoDuration::from_std(state.token_expiry)
        .unwrap_or_else(|_| ChronoDuration::hours(12));
    let exp = Utc::now()
        .checked_add_signed(expiry)
        .ok_or_else(|| ApiError::Internal("token expiry overflow".into()))?
        .timestamp() as usize;
    let claims = Claims { user_id, exp };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

fn verify_token(state: &AppState, token: &str) -> Result<i64, ApiError> {
    let decoding_key = DecodingKey::from_secret(state.jwt_secret.as_bytes());
    let claims = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|_| ApiError::Unauthorized)?
        .claims;
    Ok(claims.user_id)
}

/// Build the `AUTH_TOKEN` cookie to attach to a register/login response.
pub fn session_cookie(state: &AppState, user_id: i64) -> Result<Cookie<'static>, ApiError> {
    let token = issue_token(state, user_id)?;
    let max_age = time::Duration::try_from(state.token_expiry)
        .unwrap_or(time::Duration::hours(12));
    let cookie = Cookie::build((AUTH_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build();
    Ok(cookie)
}

/// Verifies the `AUTH_TOKEN` cookie and injects a `SessionContext` into the
/// request's extensions. Applied to every `/api/user/*` route except
/// register/login, modeled on the teacher's `auth_middleware` shape in
/// `ssmd-harman::api`.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = jar
        .get(AUTH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = verify_token(&state, &token).map_err(|_| StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(SessionContext { user_id });
    Ok(next.run(req).await)
}
