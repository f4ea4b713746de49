use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

/// Create a connection pool from a Postgres connection URI.
pub fn create_pool(database_uri: &str) -> Result<Pool, String> {
    let pg_config: tokio_postgres::Config = database_uri
        .parse()
        .map_err(|e: tokio_postgres::Error| format!("invalid database URI: {}", e))?;

    let mut cfg = Config::new();
    if let Some(host) = pg_config.get_hosts().first() {
        match host {
            tokio_postgres::config::Host::Tcp(h) => cfg.host = Some(h.clone()),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(p) => {
                cfg.host = Some(p.to_string_lossy().to_string())
            }
        }
    }
    if let Some(port) = pg_config.get_ports().first() {
        cfg.port = Some(*port);
    }
    if let Some(user) = pg_config.get_user() {
        cfg.user = Some(user.to_string());
    }
    if let Some(password) = pg_config.get_password() {
        cfg.password = Some(String::from_utf8_lossy(password).to_string());
    }
    if let Some(dbname) = pg_config.get_dbname() {
        cfg.dbname = Some(dbname.to_string());
    }

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| format!("failed to create pool: {}", e))
}

/// Apply pending migrations, tracked in a `schema_migrations` ledger table.
pub async fn run_migrations(pool: &Pool) -> Result<(), String> {
    let client = pool
        .get()
        .await
        .map_err(|e| format!("failed to get connection: {}", e))?;

    // 001 is idempotent via IF NOT EXISTS and always runs.
    let migration_001 = include_str!("migrations/001_initial.sql");
    client
        .batch_execute(migration_001)
        .await
        .map_err(|e| format!("migration 001 failed: {}", e))?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .await
        .map_err(|e| format!("create schema_migrations failed: {}", e))?;

    let row = client
        .query_opt(
            "SELECT version FROM schema_migrations WHERE version = '002_order_status_check'",
            &[],
        )
        .await
        .map_err(|e| format!("check migration 002: {}", e))?;

    if row.is_none() {
        let migration_002 = include_str!("migrations/002_order_status_check.sql");
        client
            .batch_execute(migration_002)
            .await
            .map_err(|e| format!("migration 002 failed: {}", e))?;
        client
            .execute(
                "INSERT INTO schema_migrations (version) VALUES ('002_order_status_check')",
                &[],
            )
            .await
            .map_err(|e| format!("record migration 002: {}", e))?;
        info!("migration 002_order_status_check applied");
    }

    info!("database migrations applied successfully");
    Ok(())
}
