//! Connection pool and migrations.

use atelier_error::{AtelierResult, PersistenceError, PersistenceErrorKind};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Shared PostgreSQL connection pool.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Build a pool of up to `pool_size` connections and check one out to verify it.
pub fn connect(database_url: &str, pool_size: u32) -> AtelierResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(pool_size.max(1))
        .build(manager)
        .map_err(|e| PersistenceError::new(PersistenceErrorKind::Connection(e.to_string())))?;
    {
        let _conn = pool.get().map_err(PersistenceError::from)?;
    }
    info!(pool_size, "Connected to PostgreSQL");
    Ok(pool)
}

/// Build a pool from the `DATABASE_URL` environment variable.
pub fn connect_from_env(pool_size: u32) -> AtelierResult<PgPool> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        PersistenceError::new(PersistenceErrorKind::Connection(
            "DATABASE_URL environment variable not set".to_string(),
        ))
    })?;
    connect(&database_url, pool_size)
}

/// Apply pending migrations.
pub fn run_migrations(pool: &PgPool) -> AtelierResult<()> {
    let mut conn = pool.get().map_err(PersistenceError::from)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| PersistenceError::new(PersistenceErrorKind::Migration(e.to_string())))?;
    info!(count = applied.len(), "Applied migrations");
    Ok(())
}

/// Run `f` with a pooled connection on the blocking thread pool.
pub(crate) async fn with_connection<T, F>(pool: &PgPool, f: F) -> AtelierResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> AtelierResult<T> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(PersistenceError::from)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| PersistenceError::new(PersistenceErrorKind::Join(e.to_string())))?
}
