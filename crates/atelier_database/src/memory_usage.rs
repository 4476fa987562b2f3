//! In-memory usage store.

use async_trait::async_trait;
use atelier_core::{UsageCharge, UsageRecord};
use atelier_error::AtelierResult;
use atelier_interface::{AdmitGuard, UsageStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};

/// Usage store keeping one record per user behind a mutex.
///
/// `admit` runs rollover, guard and charge while holding the lock, so concurrent
/// admissions for a user are serialised.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    records: Mutex<HashMap<String, UsageRecord>>,
}

impl InMemoryUsageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a user's record verbatim.
    pub fn put(&self, record: UsageRecord) {
        self.lock().insert(record.user_id.clone(), record);
    }

    /// The stored record without rollover.
    pub fn get(&self, user_id: &str) -> Option<UsageRecord> {
        self.lock().get(user_id).cloned()
    }

    /// Whether no user has a record yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, UsageRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    #[instrument(skip(self, guard), fields(units = charge.units, credits = charge.credits))]
    async fn admit(
        &self,
        user_id: &str,
        charge: UsageCharge,
        guard: AdmitGuard,
        now: DateTime<Utc>,
    ) -> AtelierResult<UsageRecord> {
        let mut records = self.lock();
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| UsageRecord::new(user_id, now));
        if record.rollover(now) {
            debug!("Billing period rolled over");
        }
        guard(record)?;
        record.charge(&charge, now);
        Ok(record.clone())
    }

    async fn load(&self, user_id: &str, now: DateTime<Utc>) -> AtelierResult<UsageRecord> {
        let mut records = self.lock();
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| UsageRecord::new(user_id, now));
        record.rollover(now);
        Ok(record.clone())
    }
}
