use clap::Parser;

/// Startup configuration, recognised as both CLI flags and environment
/// variables. Modeled directly on the teacher's `Args` (`clap::Parser`
/// deriving CLI flags each overridable by an `env` var); defaults and
/// variable names follow spec.md section 6's configuration table and the
/// conventional gophermart environment variable names.
#[derive(Debug, Parser)]
#[command(name = "gophermart-server")]
pub struct Config {
    /// Address the HTTP API listens on. Accepts a Go-style `:PORT` form
    /// (bind on all interfaces) or a full `host:port`.
    #[arg(long, env = "RUN_ADDRESS", default_value = ":8080")]
    pub listen_address: String,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URI")]
    pub database_dsn: String,

    /// Base address of the external accrual-calculation service.
    #[arg(long, env = "ACCRUAL_SYSTEM_ADDRESS", default_value = ":8090")]
    pub accrual_address: String,

    /// Signing key for session tokens.
    #[arg(long, env = "SECRET_KEY")]
    pub secret_key: String,

    /// Session lifetime, in hours.
    #[arg(long, env = "TOKEN_EXPIRY_HOURS", default_value_t = 12)]
    pub token_expiry_hours: u64,

    /// Worker pool size (N).
    #[arg(long, env = "POOL_SIZE", default_value_t = 30)]
    pub pool_size: usize,

    /// Per-order accrual polling attempt ceiling.
    #[arg(long, env = "MAX_ACCRUAL_ATTEMPTS", default_value_t = 5)]
    pub max_accrual_attempts: u32,

    /// Sleep duration on HTTP 429 and "still processing", in seconds.
    #[arg(long, env = "ACCRUAL_POLL_DELAY_SECONDS", default_value_t = 5)]
    pub accrual_poll_delay_seconds: u64,
}

impl Config {
    /// `listen_address` normalised into something `TcpListener::bind`
    /// accepts: a bare `:PORT` binds on all interfaces, matching the Go
    /// convention spec.md's default value follows.
    pub fn bind_address(&self) -> String {
        normalize(&self.listen_address, "0.0.0.0")
    }

    /// `accrual_address` normalised into a full base URL for the accrual
    /// HTTP client.
    pub fn accrual_base_url(&self) -> String {
        if self.accrual_address.starts_with("http://") || self.accrual_address.starts_with("https://") {
            self.accrual_address.clone()
        } else {
            format!("http://{}", normalize(&self.accrual_address, "localhost"))
        }
    }
}

fn normalize(addr: &str, default_host: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("{default_host}:{port}")
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(listen: &str, accrual: &str) -> Config {
        Config {
            listen_address: listen.to_string(),
            database_dsn: "postgres://localhost/gophermart".into(),
            accrual_address: accrual.to_string(),
            secret_key: "secret".into(),
            token_expiry_hours: 12,
            pool_size: 30,
            max_accrual_attempts: 5,
            accrual_poll_delay_seconds: 5,
        }
    }

    #[test]
    fn normalizes_go_style_port_only_address() {
        let c = cfg(":8080", ":8090");
        assert_eq!(c.bind_address(), "0.0.0.0:8080");
        assert_eq!(c.accrual_base_url(), "http://localhost:8090");
    }

    #[test]
    fn passes_through_explicit_host() {
        let c = cfg("127.0.0.1:9000", "http://accrual.internal:9090");
        assert_eq!(c.bind_address(), "127.0.0.1:9000");
        assert_eq!(c.accrual_base_url(), "http://accrual.internal:9090");
    }
}
