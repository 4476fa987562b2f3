//! In-memory task store.

use async_trait::async_trait;
use atelier_core::{GenerationTask, TaskStatus};
use atelier_error::{AtelierResult, PersistenceError, PersistenceErrorKind};
use atelier_interface::{ProgressUpdate, TaskStore, UnitOutcome, UnitSettlement};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};

/// Task store holding rows in a mutex-guarded vector.
///
/// Each trait method takes the lock once and never across an await, so multi-row
/// writes are atomic with respect to every other call.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    rows: Mutex<Vec<GenerationTask>>,
    writes: AtomicU64,
    failing_settles: AtomicU32,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write calls that changed at least one row.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of every stored row.
    pub fn rows(&self) -> Vec<GenerationTask> {
        self.lock().clone()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Make the next `n` settle writes fail without touching any row.
    pub fn fail_next_settles(&self, n: u32) {
        self.failing_settles.store(n, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GenerationTask>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_write(&self, changed: u64) -> u64 {
        if changed > 0 {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        changed
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_settles
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn in_batch<'a>(
    rows: &'a mut [GenerationTask],
    task_id: &'a str,
    user_id: &'a str,
) -> impl Iterator<Item = &'a mut GenerationTask> + 'a {
    rows.iter_mut()
        .filter(move |row| row.task_id == task_id && row.user_id == user_id)
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    async fn insert_batch(&self, tasks: &[GenerationTask]) -> AtelierResult<()> {
        let mut rows = self.lock();
        let mut seen: HashSet<(&str, u32)> = rows
            .iter()
            .map(|row| (row.task_id.as_str(), row.unit_index))
            .collect();
        for task in tasks {
            if !seen.insert((task.task_id.as_str(), task.unit_index)) {
                return Err(PersistenceError::new(PersistenceErrorKind::Conflict(format!(
                    "unit {} of task {} already exists",
                    task.unit_index, task.task_id
                )))
                .into());
            }
        }
        rows.extend_from_slice(tasks);
        self.record_write(tasks.len() as u64);
        debug!("Inserted batch");
        Ok(())
    }

    async fn find_batch(
        &self,
        task_id: &str,
        user_id: &str,
        statuses: &[TaskStatus],
    ) -> AtelierResult<Vec<GenerationTask>> {
        let rows = self.lock();
        let mut found: Vec<GenerationTask> = rows
            .iter()
            .filter(|row| row.task_id == task_id && row.user_id == user_id)
            .filter(|row| statuses.is_empty() || statuses.contains(&row.status))
            .cloned()
            .collect();
        found.sort_by_key(|row| row.unit_index);
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn update_progress(
        &self,
        task_id: &str,
        user_id: &str,
        update: ProgressUpdate,
    ) -> AtelierResult<u64> {
        let now = Utc::now();
        let mut rows = self.lock();
        let changed = in_batch(&mut rows, task_id, user_id)
            .map(|row| row.apply_progress(update.status, update.progress, update.eta, now))
            .filter(|applied| *applied)
            .count() as u64;
        Ok(self.record_write(changed))
    }

    #[instrument(skip(self, settlements), fields(count = settlements.len()))]
    async fn settle_units(
        &self,
        task_id: &str,
        user_id: &str,
        settlements: &[UnitSettlement],
    ) -> AtelierResult<u64> {
        if self.take_injected_failure() {
            return Err(PersistenceError::new(PersistenceErrorKind::Query(
                "injected settle failure".to_string(),
            ))
            .into());
        }
        let now = Utc::now();
        let mut rows = self.lock();
        let mut changed = 0;
        for row in in_batch(&mut rows, task_id, user_id) {
            let Some(settlement) = settlements.iter().find(|s| s.unit_index == row.unit_index)
            else {
                continue;
            };
            let applied = match &settlement.outcome {
                UnitOutcome::Completed(artifact) => row.complete(artifact, now),
                UnitOutcome::Failed(message) => row.fail(message.as_str(), now),
            };
            if applied {
                changed += 1;
            }
        }
        Ok(self.record_write(changed))
    }

    #[instrument(skip(self))]
    async fn fail_pending(&self, task_id: &str, user_id: &str, message: &str) -> AtelierResult<u64> {
        let now = Utc::now();
        let mut rows = self.lock();
        let changed = in_batch(&mut rows, task_id, user_id)
            .map(|row| row.fail(message, now))
            .filter(|applied| *applied)
            .count() as u64;
        Ok(self.record_write(changed))
    }

    async fn owner_of(&self, task_id: &str) -> AtelierResult<Option<String>> {
        Ok(self
            .lock()
            .iter()
            .find(|row| row.task_id == task_id)
            .map(|row| row.user_id.clone()))
    }
}
