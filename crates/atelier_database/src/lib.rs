//! Task and usage stores for Atelier.
//!
//! The in-memory stores are always available and back the test suites and
//! single-process deployments. The `postgres` feature adds diesel-backed stores
//! that share an r2d2 connection pool and run queries on the blocking thread pool.
//!
//! # Example
//!
//! ```
//! use atelier_database::{InMemoryTaskStore, InMemoryUsageStore};
//!
//! let tasks = InMemoryTaskStore::new();
//! let usage = InMemoryUsageStore::new();
//! assert!(tasks.is_empty());
//! assert!(usage.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory_tasks;
mod memory_usage;

#[cfg(feature = "postgres")]
mod postgres;

pub use memory_tasks::InMemoryTaskStore;
pub use memory_usage::InMemoryUsageStore;

#[cfg(feature = "postgres")]
pub use postgres::{
    PgPool, PgTaskStore, PgUsageStore, TaskRow, UsageRow, connect, connect_from_env,
    run_migrations, schema,
};
