//! End-to-end exercises of the HTTP surface against in-memory repository
//! doubles, run through the router with `tower::ServiceExt::oneshot`
//! rather than a bound socket. Covers spec.md section 8's S4 (Luhn
//! rejection), S5 (cross-user order conflict), and S7 (insufficient
//! withdrawal funds), plus the register/login happy paths those scenarios
//! build on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use gophermart_api::{router, AppState};
use gophermart_core::error::RepoError;
use gophermart_core::repo::{OrderQueryRepo, UserRepo, WithdrawalRepo};
use gophermart_core::state::OrderStatus;
use gophermart_core::types::{Order, User, Withdrawal};
use gophermart_pipeline::Submitter;

/// A single in-memory double backing `UserRepo`, `OrderQueryRepo`, and
/// `WithdrawalRepo`, the same narrow-trait split `PgRepository` satisfies
/// in `gophermart-storage`. One struct is enough here since the API
/// layer never needs the Processor-facing traits.
#[derive(Default)]
struct MockRepo {
    users: Mutex<Vec<User>>,
    orders: Mutex<Vec<Order>>,
    withdrawals: Mutex<HashMap<i64, Vec<Withdrawal>>>,
    next_id: Mutex<i64>,
}

impl MockRepo {
    fn next_id(&self) -> i64 {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        *id
    }

    fn seed_user(&self, login: &str, password_hash: &str, balance: i64) -> User {
        let user = User {
            id: self.next_id(),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            balance,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }
}

#[async_trait]
impl UserRepo for MockRepo {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, RepoError> {
        if self.users.lock().unwrap().iter().any(|u| u.login == login) {
            return Err(RepoError::Conflict);
        }
        Ok(self.seed_user(login, password_hash, 0))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<User, RepoError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_user(&self, id: i64) -> Result<User, RepoError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl OrderQueryRepo for MockRepo {
    async fn create_order(&self, user_id: i64, number: i64) -> Result<Order, RepoError> {
        let mut orders = self.orders.lock().unwrap();
        if orders.iter().any(|o| o.number == number) {
            return Err(RepoError::Conflict);
        }
        let order = Order {
            id: orders.len() as i64 + 1,
            user_id,
            number,
            status: OrderStatus::New,
            accrual: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn list_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepoError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WithdrawalRepo for MockRepo {
    async fn withdraw(
        &self,
        user_id: i64,
        order_number: i64,
        sum: i64,
    ) -> Result<Withdrawal, RepoError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == user_id).ok_or(RepoError::NotFound)?;
        if user.balance < sum {
            return Err(RepoError::Conflict);
        }
        user.balance -= sum;
        let withdrawal = Withdrawal {
            id: 1,
            user_id,
            order_number,
            sum,
            created_at: Utc::now(),
        };
        self.withdrawals
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(withdrawal.clone());
        Ok(withdrawal)
    }

    async fn list_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, RepoError> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Records submitted order numbers instead of running a real pipeline.
#[derive(Default)]
struct NoopSubmitter {
    submitted: Mutex<Vec<i64>>,
}

#[async_trait]
impl Submitter for NoopSubmitter {
    async fn submit(&self, number: i64) {
        self.submitted.lock().unwrap().push(number);
    }
}

fn test_state(repo: Arc<MockRepo>) -> Arc<AppState> {
    Arc::new(AppState {
        users: repo.clone(),
        orders: repo.clone(),
        withdrawals: repo,
        submitter: Arc::new(NoopSubmitter::default()),
        jwt_secret: "test-secret".into(),
        token_expiry: Duration::from_secs(3600),
    })
}

fn json_body(json: serde_json::Value) -> Body {
    Body::from(json.to_string())
}

/// Registers `login`/`password` and returns the `AUTH_TOKEN` cookie header
/// value from the response, ready to attach to a follow-up request.
async fn register_and_get_cookie(
    state: Arc<AppState>,
    login: &str,
    password: &str,
) -> String {
    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(json_body(serde_json::json!({ "login": login, "password": password })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);

    let cookie = register_and_get_cookie(state.clone(), "alice", "hunter2").await;
    assert!(cookie.starts_with("AUTH_TOKEN="));

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(json_body(serde_json::json!({ "login": "alice", "password": "hunter2" })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);
    register_and_get_cookie(state.clone(), "alice", "hunter2").await;

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(json_body(serde_json::json!({ "login": "alice", "password": "wrong" })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registering_a_duplicate_login_is_a_conflict() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);
    register_and_get_cookie(state.clone(), "alice", "hunter2").await;

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(json_body(serde_json::json!({ "login": "alice", "password": "other" })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// S4 -- an order number that fails the Luhn check is rejected with 422,
/// never reaching the repository or the submitter.
#[tokio::test]
async fn s4_luhn_invalid_order_number_is_unprocessable() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);
    let cookie = register_and_get_cookie(state.clone(), "alice", "hunter2").await;

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/orders")
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("1234567890"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

/// S5 -- an order number already registered by a different user yields
/// 409, and re-submitting one's own order number yields 200, not 202.
#[tokio::test]
async fn s5_order_number_conflict_across_users() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);
    let alice_cookie = register_and_get_cookie(state.clone(), "alice", "hunter2").await;
    let bob_cookie = register_and_get_cookie(state.clone(), "bob", "hunter3").await;

    let first = router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/orders")
                .header(header::COOKIE, alice_cookie.clone())
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("12345678903"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let resubmit = router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/orders")
                .header(header::COOKIE, alice_cookie)
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("12345678903"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resubmit.status(), StatusCode::OK);

    let other_user = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/orders")
                .header(header::COOKIE, bob_cookie)
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("12345678903"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(other_user.status(), StatusCode::CONFLICT);
}

/// S7 -- withdrawing more than the current balance is rejected with 402
/// and leaves the balance untouched.
#[tokio::test]
async fn s7_withdraw_insufficient_funds() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo.clone());
    let cookie = register_and_get_cookie(state.clone(), "alice", "hunter2").await;

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/balance/withdraw")
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(json_body(serde_json::json!({ "order": "12345678903", "sum": 100 })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let user = repo.get_user_by_login("alice").await.unwrap();
    assert_eq!(user.balance, 0);
}

/// A request with no `AUTH_TOKEN` cookie never reaches the handler.
#[tokio::test]
async fn unauthenticated_request_is_rejected() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// An empty order list reports 204, per spec.md's "no orders yet" case.
#[tokio::test]
async fn list_orders_empty_is_no_content() {
    let repo = Arc::new(MockRepo::default());
    let state = test_state(repo);
    let cookie = register_and_get_cookie(state.clone(), "alice", "hunter2").await;

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/orders")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
