//! PostgreSQL task store.

use super::connection::{PgPool, with_connection};
use super::models::TaskRow;
use super::schema::generation_tasks::dsl as t;
use async_trait::async_trait;
use atelier_core::{GenerationTask, TaskStatus};
use atelier_error::{AtelierResult, PersistenceError};
use atelier_interface::{ProgressUpdate, TaskStore, UnitOutcome, UnitSettlement};
use chrono::Utc;
use diesel::prelude::*;
use tracing::{debug, instrument};

/// Task store over the `generation_tasks` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl std::fmt::Debug for PgTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTaskStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl PgTaskStore {
    /// Create a store over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn pending_names() -> Vec<&'static str> {
    TaskStatus::PENDING.iter().map(TaskStatus::as_str).collect()
}

/// States a row may be in for its status to move to `next`.
fn progress_sources(next: TaskStatus) -> Vec<&'static str> {
    TaskStatus::PENDING
        .iter()
        .filter(|current| current.can_transition_to(next))
        .map(TaskStatus::as_str)
        .collect()
}

#[async_trait]
impl TaskStore for PgTaskStore {
    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    async fn insert_batch(&self, tasks: &[GenerationTask]) -> AtelierResult<()> {
        let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from).collect();
        with_connection(&self.pool, move |conn| {
            conn.transaction(|conn| {
                diesel::insert_into(t::generation_tasks)
                    .values(&rows)
                    .execute(conn)
            })
            .map_err(PersistenceError::from)?;
            debug!(count = rows.len(), "Inserted batch");
            Ok(())
        })
        .await
    }

    async fn find_batch(
        &self,
        task_id: &str,
        user_id: &str,
        statuses: &[TaskStatus],
    ) -> AtelierResult<Vec<GenerationTask>> {
        let task_id = task_id.to_string();
        let user_id = user_id.to_string();
        let names: Vec<&'static str> = statuses.iter().map(TaskStatus::as_str).collect();
        with_connection(&self.pool, move |conn| {
            let mut query = t::generation_tasks
                .filter(t::task_id.eq(&task_id))
                .filter(t::user_id.eq(&user_id))
                .into_boxed();
            if !names.is_empty() {
                query = query.filter(t::status.eq_any(names));
            }
            let rows = query
                .order(t::unit_index.asc())
                .select(TaskRow::as_select())
                .load(conn)
                .map_err(PersistenceError::from)?;
            rows.into_iter()
                .map(|row| GenerationTask::try_from(row).map_err(Into::into))
                .collect()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn update_progress(
        &self,
        task_id: &str,
        user_id: &str,
        update: ProgressUpdate,
    ) -> AtelierResult<u64> {
        if update.status.is_terminal() {
            return Ok(0);
        }
        let task_id = task_id.to_string();
        let user_id = user_id.to_string();
        let sources = progress_sources(update.status);
        with_connection(&self.pool, move |conn| {
            let now = Utc::now();
            let changed = conn
                .transaction(|conn| {
                    let changed = diesel::update(
                        t::generation_tasks
                            .filter(t::task_id.eq(&task_id))
                            .filter(t::user_id.eq(&user_id))
                            .filter(t::status.eq_any(pending_names())),
                    )
                    .set((
                        t::progress.eq(i16::from(update.progress.min(100))),
                        t::eta.eq(update.eta),
                        t::updated_at.eq(now),
                    ))
                    .execute(conn)?;
                    diesel::update(
                        t::generation_tasks
                            .filter(t::task_id.eq(&task_id))
                            .filter(t::user_id.eq(&user_id))
                            .filter(t::status.eq_any(sources)),
                    )
                    .set(t::status.eq(update.status.as_str()))
                    .execute(conn)?;
                    diesel::QueryResult::Ok(changed)
                })
                .map_err(PersistenceError::from)?;
            Ok(changed as u64)
        })
        .await
    }

    #[instrument(skip(self, settlements), fields(count = settlements.len()))]
    async fn settle_units(
        &self,
        task_id: &str,
        user_id: &str,
        settlements: &[UnitSettlement],
    ) -> AtelierResult<u64> {
        let task_id = task_id.to_string();
        let user_id = user_id.to_string();
        let settlements = settlements.to_vec();
        with_connection(&self.pool, move |conn| {
            let now = Utc::now();
            let changed = conn
                .transaction(|conn| {
                    let mut changed = 0;
                    for settlement in &settlements {
                        let unit = i32::try_from(settlement.unit_index).unwrap_or(i32::MAX);
                        let target = t::generation_tasks
                            .filter(t::task_id.eq(&task_id))
                            .filter(t::user_id.eq(&user_id))
                            .filter(t::unit_index.eq(unit))
                            .filter(t::status.eq_any(pending_names()));
                        changed += match &settlement.outcome {
                            UnitOutcome::Completed(artifact) => diesel::update(target)
                                .set((
                                    t::status.eq(TaskStatus::Completed.as_str()),
                                    t::progress.eq(100i16),
                                    t::eta.eq(None::<f64>),
                                    t::path.eq(&artifact.path),
                                    t::url.eq(&artifact.url),
                                    t::verified_at.eq(now),
                                    t::error_message.eq(None::<String>),
                                    t::updated_at.eq(now),
                                ))
                                .execute(conn)?,
                            UnitOutcome::Failed(message) => diesel::update(target)
                                .set((
                                    t::status.eq(TaskStatus::Failed.as_str()),
                                    t::progress.eq(0i16),
                                    t::eta.eq(None::<f64>),
                                    t::error_message.eq(message),
                                    t::updated_at.eq(now),
                                ))
                                .execute(conn)?,
                        };
                    }
                    diesel::QueryResult::Ok(changed)
                })
                .map_err(PersistenceError::from)?;
            Ok(changed as u64)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn fail_pending(&self, task_id: &str, user_id: &str, message: &str) -> AtelierResult<u64> {
        let task_id = task_id.to_string();
        let user_id = user_id.to_string();
        let message = message.to_string();
        with_connection(&self.pool, move |conn| {
            let now = Utc::now();
            let changed = diesel::update(
                t::generation_tasks
                    .filter(t::task_id.eq(&task_id))
                    .filter(t::user_id.eq(&user_id))
                    .filter(t::status.eq_any(pending_names())),
            )
            .set((
                t::status.eq(TaskStatus::Failed.as_str()),
                t::progress.eq(0i16),
                t::eta.eq(None::<f64>),
                t::error_message.eq(&message),
                t::updated_at.eq(now),
            ))
            .execute(conn)
            .map_err(PersistenceError::from)?;
            Ok(changed as u64)
        })
        .await
    }

    async fn owner_of(&self, task_id: &str) -> AtelierResult<Option<String>> {
        let task_id = task_id.to_string();
        with_connection(&self.pool, move |conn| {
            let owner = t::generation_tasks
                .filter(t::task_id.eq(&task_id))
                .select(t::user_id)
                .first::<String>(conn)
                .optional()
                .map_err(PersistenceError::from)?;
            Ok(owner)
        })
        .await
    }
}
