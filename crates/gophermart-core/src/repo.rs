use async_trait::async_trait;

use crate::error::RepoError;
use crate::state::OrderStatus;
use crate::types::{Order, User, Withdrawal};

/// Everything the Order Processor needs to drive an order's status.
///
/// Deliberately narrow: the Processor must not be able to reach user
/// registration, withdrawals, or session concerns. Implementations also
/// satisfy `BalanceRepo`; the split exists so Processor test doubles don't
/// have to stub the whole storage surface.
#[async_trait]
pub trait OrderRepo: Send + Sync {
    async fn get_order_by_number(&self, number: i64) -> Result<Order, RepoError>;

    async fn get_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepoError>;

    /// Unconditional status write. Errors if no row matched.
    async fn update_order_status(
        &self,
        number: i64,
        status: OrderStatus,
    ) -> Result<(), RepoError>;

    /// Transition `number` from `expected` to `next` iff its current status
    /// is still `expected`. Returns `Ok(true)` if the row was updated,
    /// `Ok(false)` if another writer already moved it on.
    async fn update_order_status_if(
        &self,
        number: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, RepoError>;

    async fn update_order_accrual(&self, number: i64, accrual: i64) -> Result<(), RepoError>;
}

/// Balance reads/writes needed by the Order Processor.
#[async_trait]
pub trait BalanceRepo: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<User, RepoError>;

    /// Overwrites the user's balance. Errors if no row matched.
    async fn update_user_balance(&self, id: i64, new_balance: i64) -> Result<(), RepoError>;
}

/// Credits an order's accrual and the owning user's balance as a single
/// atomic unit, then marks the order PROCESSED. Kept as one call (rather
/// than composed from `OrderRepo`/`BalanceRepo`) so implementations can
/// wrap it in a single database transaction.
#[async_trait]
pub trait CreditRepo: Send + Sync {
    async fn credit_order(
        &self,
        number: i64,
        user_id: i64,
        new_balance: i64,
        accrual: Option<i64>,
    ) -> Result<(), RepoError>;
}

/// User registration/auth surface. Not reachable from the Processor.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, RepoError>;
    async fn get_user_by_login(&self, login: &str) -> Result<User, RepoError>;
    async fn get_user(&self, id: i64) -> Result<User, RepoError>;
}

/// Order listing/registration surface used by the API layer.
#[async_trait]
pub trait OrderQueryRepo: Send + Sync {
    async fn create_order(&self, user_id: i64, number: i64) -> Result<Order, RepoError>;
    async fn list_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepoError>;
}

/// Withdrawal ledger surface used by the API layer.
#[async_trait]
pub trait WithdrawalRepo: Send + Sync {
    /// Debits the user's balance and inserts a withdrawal row atomically.
    /// Errors with `RepoError::Conflict` if the balance would go negative.
    async fn withdraw(
        &self,
        user_id: i64,
        order_number: i64,
        sum: i64,
    ) -> Result<Withdrawal, RepoError>;
    async fn list_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, RepoError>;
}
