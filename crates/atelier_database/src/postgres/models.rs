//! Database rows and their conversions to the core model.

use super::schema::{generation_tasks, usage_records};
use atelier_core::{GenerationTask, MediaKind, TaskStatus, UsageRecord};
use atelier_error::{PersistenceError, PersistenceErrorKind};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Row of the `generation_tasks` table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = generation_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: Uuid,
    pub task_id: String,
    pub user_id: String,
    pub media_kind: String,
    pub unit_index: i32,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub seed: i64,
    pub model_id: String,
    pub steps: i32,
    pub guidance: f64,
    pub sampler: String,
    pub width: i32,
    pub height: i32,
    pub fps: Option<i32>,
    pub frames: Option<i32>,
    pub upscale: bool,
    pub status: String,
    pub progress: i16,
    pub eta: Option<f64>,
    pub future_link: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `usage_records` table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = usage_records)]
#[diesel(primary_key(user_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UsageRow {
    pub user_id: String,
    pub nuts_used: i64,
    pub images_generated: i64,
    pub daily_image_count: i32,
    pub last_image_date: Option<NaiveDate>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

fn corrupt(detail: String) -> PersistenceError {
    PersistenceError::new(PersistenceErrorKind::Corrupt(detail))
}

impl From<&GenerationTask> for TaskRow {
    fn from(task: &GenerationTask) -> Self {
        Self {
            id: task.id,
            task_id: task.task_id.clone(),
            user_id: task.user_id.clone(),
            media_kind: task.media_kind.as_str().to_string(),
            unit_index: to_i32(task.unit_index),
            prompt: task.prompt.clone(),
            negative_prompt: task.negative_prompt.clone(),
            // Stored bit-for-bit; seeds above i64::MAX read back unchanged.
            seed: task.seed as i64,
            model_id: task.model_id.clone(),
            steps: to_i32(task.steps),
            guidance: task.guidance,
            sampler: task.sampler.clone(),
            width: to_i32(task.width),
            height: to_i32(task.height),
            fps: task.fps.map(to_i32),
            frames: task.frames.map(to_i32),
            upscale: task.upscale,
            status: task.status.as_str().to_string(),
            progress: i16::from(task.progress),
            eta: task.eta,
            future_link: task.future_link.clone(),
            path: task.path.clone(),
            url: task.url.clone(),
            verified_at: task.verified_at,
            error_message: task.error_message.clone(),
            category_id: task.category_id.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl TryFrom<TaskRow> for GenerationTask {
    type Error = PersistenceError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: TaskStatus = row
            .status
            .parse()
            .map_err(|_| corrupt(format!("unknown task status '{}'", row.status)))?;
        let media_kind: MediaKind = row
            .media_kind
            .parse()
            .map_err(|_| corrupt(format!("unknown media kind '{}'", row.media_kind)))?;
        Ok(Self {
            id: row.id,
            task_id: row.task_id,
            user_id: row.user_id,
            media_kind,
            unit_index: to_u32(row.unit_index),
            prompt: row.prompt,
            negative_prompt: row.negative_prompt,
            seed: row.seed as u64,
            model_id: row.model_id,
            steps: to_u32(row.steps),
            guidance: row.guidance,
            sampler: row.sampler,
            width: to_u32(row.width),
            height: to_u32(row.height),
            fps: row.fps.map(to_u32),
            frames: row.frames.map(to_u32),
            upscale: row.upscale,
            status,
            progress: u8::try_from(row.progress.clamp(0, 100)).unwrap_or_default(),
            eta: row.eta,
            future_link: row.future_link,
            path: row.path,
            url: row.url,
            verified_at: row.verified_at,
            error_message: row.error_message,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&UsageRecord> for UsageRow {
    fn from(record: &UsageRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            nuts_used: i64::try_from(record.nuts_used).unwrap_or(i64::MAX),
            images_generated: i64::try_from(record.images_generated).unwrap_or(i64::MAX),
            daily_image_count: i32::try_from(record.daily_image_count).unwrap_or(i32::MAX),
            last_image_date: record.last_image_date,
            period_start: record.period_start,
            period_end: record.period_end,
            updated_at: record.updated_at,
        }
    }
}

impl From<UsageRow> for UsageRecord {
    fn from(row: UsageRow) -> Self {
        Self {
            user_id: row.user_id,
            nuts_used: u64::try_from(row.nuts_used).unwrap_or_default(),
            images_generated: u64::try_from(row.images_generated).unwrap_or_default(),
            daily_image_count: to_u32(row.daily_image_count),
            last_image_date: row.last_image_date,
            period_start: row.period_start,
            period_end: row.period_end,
            updated_at: row.updated_at,
        }
    }
}
