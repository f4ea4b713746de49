pub mod db;
pub mod repository;

pub use db::{create_pool, run_migrations};
pub use repository::PgRepository;
