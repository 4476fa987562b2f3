//! PostgreSQL stores built on diesel and an r2d2 pool.

mod connection;
mod models;
pub mod schema;
mod tasks;
mod usage;

pub use connection::{PgPool, connect, connect_from_env, run_migrations};
pub use models::{TaskRow, UsageRow};
pub use tasks::PgTaskStore;
pub use usage::PgUsageStore;
