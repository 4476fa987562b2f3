//! PostgreSQL usage store.

use super::connection::{PgPool, with_connection};
use super::models::UsageRow;
use super::schema::usage_records::dsl as u;
use async_trait::async_trait;
use atelier_core::{UsageCharge, UsageRecord};
use atelier_error::{AtelierResult, PersistenceError, QuotaExceeded};
use atelier_interface::{AdmitGuard, UsageStore};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::{debug, instrument};

/// Usage store over the `usage_records` table.
///
/// Every call runs in one transaction holding `SELECT ... FOR UPDATE` on the user's
/// row, which serialises concurrent admissions across processes.
#[derive(Clone)]
pub struct PgUsageStore {
    pool: PgPool,
}

impl std::fmt::Debug for PgUsageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUsageStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl PgUsageStore {
    /// Create a store over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Create the row if missing, then lock it and apply rollover.
fn lock_record(
    conn: &mut PgConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> QueryResult<UsageRecord> {
    diesel::insert_into(u::usage_records)
        .values(UsageRow::from(&UsageRecord::new(user_id, now)))
        .on_conflict_do_nothing()
        .execute(conn)?;
    let row = u::usage_records
        .find(user_id)
        .select(UsageRow::as_select())
        .for_update()
        .first(conn)?;
    let mut record = UsageRecord::from(row);
    if record.rollover(now) {
        debug!(user_id, "Billing period rolled over");
        save(conn, &record)?;
    }
    Ok(record)
}

fn save(conn: &mut PgConnection, record: &UsageRecord) -> QueryResult<usize> {
    diesel::update(u::usage_records.find(&record.user_id))
        .set(&UsageRow::from(record))
        .execute(conn)
}

#[async_trait]
impl UsageStore for PgUsageStore {
    #[instrument(skip(self, guard), fields(units = charge.units, credits = charge.credits))]
    async fn admit(
        &self,
        user_id: &str,
        charge: UsageCharge,
        guard: AdmitGuard,
        now: DateTime<Utc>,
    ) -> AtelierResult<UsageRecord> {
        let user_id = user_id.to_string();
        with_connection(&self.pool, move |conn| {
            // A rejected guard still commits the rollover.
            let outcome = conn
                .transaction::<Result<UsageRecord, QuotaExceeded>, diesel::result::Error, _>(|conn| {
                    let mut record = lock_record(conn, &user_id, now)?;
                    if let Err(exceeded) = guard(&record) {
                        return Ok(Err(exceeded));
                    }
                    record.charge(&charge, now);
                    save(conn, &record)?;
                    Ok(Ok(record))
                })
                .map_err(PersistenceError::from)?;
            Ok(outcome?)
        })
        .await
    }

    async fn load(&self, user_id: &str, now: DateTime<Utc>) -> AtelierResult<UsageRecord> {
        let user_id = user_id.to_string();
        with_connection(&self.pool, move |conn| {
            let record = conn
                .transaction(|conn| lock_record(conn, &user_id, now))
                .map_err(PersistenceError::from)?;
            Ok(record)
        })
        .await
    }
}
