use std::str::FromStr;

use async_trait::async_trait;
use deadpool_postgres::Pool;

use gophermart_core::error::RepoError;
use gophermart_core::repo::{
    BalanceRepo, CreditRepo, OrderQueryRepo, OrderRepo, UserRepo, WithdrawalRepo,
};
use gophermart_core::state::OrderStatus;
use gophermart_core::types::{Order, User, Withdrawal};

/// `deadpool_postgres`-backed implementation of every repository trait.
///
/// A single struct implements all six traits, as recommended by the
/// trait split: the narrowness lives in the trait boundaries the Order
/// Processor and API layer are written against, not in separate storage
/// types.
#[derive(Clone)]
pub struct PgRepository {
    pool: Pool,
}

impl PgRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn pg_err(e: tokio_postgres::Error) -> RepoError {
    if let Some(db_err) = e.as_db_error() {
        if db_err.code() == &tokio_postgres::error::SqlState::UNIQUE_VIOLATION {
            return RepoError::Conflict;
        }
    }
    RepoError::Database(e.to_string())
}

fn pool_err(e: deadpool_postgres::PoolError) -> RepoError {
    RepoError::Database(format!("pool error: {e}"))
}

fn row_to_order(row: &tokio_postgres::Row) -> Order {
    let status_str: String = row.get("status");
    Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        number: row.get("number"),
        status: OrderStatus::from_str(&status_str).expect("invalid status in database"),
        accrual: row.get("accrual"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_user(row: &tokio_postgres::Row) -> User {
    User {
        id: row.get("id"),
        login: row.get("login"),
        password_hash: row.get("password_hash"),
        balance: row.get("balance"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_withdrawal(row: &tokio_postgres::Row) -> Withdrawal {
    Withdrawal {
        id: row.get("id"),
        user_id: row.get("user_id"),
        order_number: row.get("order_number"),
        sum: row.get("sum"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl OrderRepo for PgRepository {
    async fn get_order_by_number(&self, number: i64) -> Result<Order, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let row = client
            .query_opt(
                "SELECT id, user_id, number, status, accrual, created_at, updated_at \
                 FROM orders WHERE number = $1",
                &[&number],
            )
            .await
            .map_err(pg_err)?
            .ok_or(RepoError::NotFound)?;
        Ok(row_to_order(&row))
    }

    async fn get_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let rows = client
            .query(
                "SELECT id, user_id, number, status, accrual, created_at, updated_at \
                 FROM orders WHERE status = $1 ORDER BY created_at",
                &[&status.to_string()],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows.iter().map(row_to_order).collect())
    }

    async fn update_order_status(&self, number: i64, status: OrderStatus) -> Result<(), RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let count = client
            .execute(
                "UPDATE orders SET status = $1, updated_at = NOW() WHERE number = $2",
                &[&status.to_string(), &number],
            )
            .await
            .map_err(pg_err)?;
        if count == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_order_status_if(
        &self,
        number: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let count = client
            .execute(
                "UPDATE orders SET status = $1, updated_at = NOW() \
                 WHERE number = $2 AND status = $3",
                &[&next.to_string(), &number, &expected.to_string()],
            )
            .await
            .map_err(pg_err)?;
        Ok(count > 0)
    }

    async fn update_order_accrual(&self, number: i64, accrual: i64) -> Result<(), RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let count = client
            .execute(
                "UPDATE orders SET accrual = $1, updated_at = NOW() WHERE number = $2",
                &[&accrual, &number],
            )
            .await
            .map_err(pg_err)?;
        if count == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl BalanceRepo for PgRepository {
    async fn get_user(&self, id: i64) -> Result<User, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let row = client
            .query_opt(
                "SELECT id, login, password_hash, balance, created_at, updated_at \
                 FROM users WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(pg_err)?
            .ok_or(RepoError::NotFound)?;
        Ok(row_to_user(&row))
    }

    async fn update_user_balance(&self, id: i64, new_balance: i64) -> Result<(), RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let count = client
            .execute(
                "UPDATE users SET balance = $1, updated_at = NOW() WHERE id = $2",
                &[&new_balance, &id],
            )
            .await
            .map_err(pg_err)?;
        if count == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CreditRepo for PgRepository {
    async fn credit_order(
        &self,
        number: i64,
        user_id: i64,
        new_balance: i64,
        accrual: Option<i64>,
    ) -> Result<(), RepoError> {
        let mut client = self.pool.get().await.map_err(pool_err)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| RepoError::Database(format!("begin tx: {e}")))?;

        tx.execute(
            "UPDATE orders SET status = 'PROCESSED', accrual = $1, updated_at = NOW() \
             WHERE number = $2",
            &[&accrual, &number],
        )
        .await
        .map_err(pg_err)?;

        tx.execute(
            "UPDATE users SET balance = $1, updated_at = NOW() WHERE id = $2",
            &[&new_balance, &user_id],
        )
        .await
        .map_err(pg_err)?;

        tx.commit()
            .await
            .map_err(|e| RepoError::Database(format!("commit: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for PgRepository {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let row = client
            .query_one(
                "INSERT INTO users (login, password_hash) VALUES ($1, $2) \
                 RETURNING id, login, password_hash, balance, created_at, updated_at",
                &[&login, &password_hash],
            )
            .await
            .map_err(pg_err)?;
        Ok(row_to_user(&row))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<User, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let row = client
            .query_opt(
                "SELECT id, login, password_hash, balance, created_at, updated_at \
                 FROM users WHERE login = $1",
                &[&login],
            )
            .await
            .map_err(pg_err)?
            .ok_or(RepoError::NotFound)?;
        Ok(row_to_user(&row))
    }

    async fn get_user(&self, id: i64) -> Result<User, RepoError> {
        BalanceRepo::get_user(self, id).await
    }
}

#[async_trait]
impl OrderQueryRepo for PgRepository {
    async fn create_order(&self, user_id: i64, number: i64) -> Result<Order, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let row = client
            .query_one(
                "INSERT INTO orders (user_id, number, status) VALUES ($1, $2, 'NEW') \
                 RETURNING id, user_id, number, status, accrual, created_at, updated_at",
                &[&user_id, &number],
            )
            .await
            .map_err(pg_err)?;
        Ok(row_to_order(&row))
    }

    async fn list_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let rows = client
            .query(
                "SELECT id, user_id, number, status, accrual, created_at, updated_at \
                 FROM orders WHERE user_id = $1 ORDER BY created_at",
                &[&user_id],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows.iter().map(row_to_order).collect())
    }
}

#[async_trait]
impl WithdrawalRepo for PgRepository {
    async fn withdraw(
        &self,
        user_id: i64,
        order_number: i64,
        sum: i64,
    ) -> Result<Withdrawal, RepoError> {
        let mut client = self.pool.get().await.map_err(pool_err)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| RepoError::Database(format!("begin tx: {e}")))?;

        let row = tx
            .query_one("SELECT balance FROM users WHERE id = $1 FOR UPDATE", &[&user_id])
            .await
            .map_err(pg_err)?;
        let balance: i64 = row.get("balance");

        if balance < sum {
            return Err(RepoError::Conflict);
        }

        tx.execute(
            "UPDATE users SET balance = $1, updated_at = NOW() WHERE id = $2",
            &[&(balance - sum), &user_id],
        )
        .await
        .map_err(pg_err)?;

        let row = tx
            .query_one(
                "INSERT INTO withdrawals (user_id, order_number, sum) VALUES ($1, $2, $3) \
                 RETURNING id, user_id, order_number, sum, created_at",
                &[&user_id, &order_number, &sum],
            )
            .await
            .map_err(pg_err)?;

        tx.commit()
            .await
            .map_err(|e| RepoError::Database(format!("commit: {e}")))?;

        Ok(row_to_withdrawal(&row))
    }

    async fn list_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, RepoError> {
        let client = self.pool.get().await.map_err(pool_err)?;
        let rows = client
            .query(
                "SELECT id, user_id, order_number, sum, created_at \
                 FROM withdrawals WHERE user_id = $1 ORDER BY created_at",
                &[&user_id],
            )
            .await
            .map_err(pg_err)?;
        Ok(rows.iter().map(row_to_withdrawal).collect())
    }
}
