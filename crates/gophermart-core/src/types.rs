use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::OrderStatus;

/// A registered user and their bonus balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    /// Bonus points currently available. Never negative.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A submitted order number and its accrual-pipeline state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    /// Luhn-valid decimal order number. Globally unique across users.
    pub number: i64,
    pub status: OrderStatus,
    /// Set only once, when status becomes Processed with a positive credit.
    pub accrual: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A debit against a user's balance, referencing an order number that need
/// not exist as an `Order` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    pub order_number: i64,
    pub sum: i64,
    pub created_at: DateTime<Utc>,
}

/// Response body shape of `GET {accrual-base}/api/orders/{number}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculationBody {
    #[allow(dead_code)]
    pub order: String,
    pub status: CalculationStatus,
    pub accrual: Option<f64>,
}

/// The accrual service's own status vocabulary for a calculation, distinct
/// from `OrderStatus` (ours has no REGISTERED).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalculationStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}
