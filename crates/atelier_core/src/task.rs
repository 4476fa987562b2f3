//! Generation task rows and their lifecycle.

use crate::GenerationParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of one generation unit.
///
/// `Completed` and `Failed` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::AsRefStr,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted by the provider, not started
    #[display("queued")]
    Queued,
    /// Provider is working on it
    #[display("processing")]
    Processing,
    /// Artifact stored on the CDN
    #[display("completed")]
    Completed,
    /// Unit will never produce an artifact
    #[display("failed")]
    Failed,
}

impl TaskStatus {
    /// States that reconciliation still has to settle.
    pub const PENDING: [TaskStatus; 2] = [TaskStatus::Queued, TaskStatus::Processing];

    /// Convert to string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_core::TaskStatus;
    ///
    /// assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Processing));
    /// assert!(!TaskStatus::Processing.can_transition_to(TaskStatus::Queued));
    /// assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Failed));
    /// ```
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Completed | TaskStatus::Failed, _) => false,
            (TaskStatus::Processing, TaskStatus::Queued) => false,
            _ => true,
        }
    }
}

/// Kind of artifact a task produces.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    #[display("image")]
    Image,
    /// Video clip
    #[display("video")]
    Video,
}

impl MediaKind {
    /// Convert to string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// File extension used when the source does not reveal one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }
}

/// One requested output unit (an image or a video).
///
/// All units of a batch share `task_id`; `unit_index` is the submission index and
/// the only correlation between a row and the provider's output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    /// Row identity
    pub id: Uuid,
    /// Provider-assigned id shared by the batch
    pub task_id: String,
    /// Owning user
    pub user_id: String,
    /// Image or video
    pub media_kind: MediaKind,
    /// Position within the batch
    pub unit_index: u32,
    /// Prompt text
    pub prompt: String,
    /// Negative prompt
    pub negative_prompt: Option<String>,
    /// Per-unit seed
    pub seed: u64,
    /// Model identifier
    pub model_id: String,
    /// Inference step count
    pub steps: u32,
    /// Guidance value
    pub guidance: f64,
    /// Sampler name
    pub sampler: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Frames per second (video only)
    pub fps: Option<u32>,
    /// Frame count (video only)
    pub frames: Option<u32>,
    /// Whether upscaling was requested
    pub upscale: bool,
    /// Lifecycle state
    pub status: TaskStatus,
    /// Progress 0–100
    pub progress: u8,
    /// Provider estimate in seconds
    pub eta: Option<f64>,
    /// Provider-predicted output URL for this unit
    pub future_link: Option<String>,
    /// Storage key, set on completion
    pub path: Option<String>,
    /// Public CDN URL, set on completion
    pub url: Option<String>,
    /// When the artifact was stored
    pub verified_at: Option<DateTime<Utc>>,
    /// Why the unit failed
    pub error_message: Option<String>,
    /// Inferred category
    pub category_id: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl GenerationTask {
    /// Build the queued placeholder row for one unit of a freshly submitted batch.
    #[allow(clippy::too_many_arguments)]
    pub fn placeholder(
        task_id: &str,
        user_id: &str,
        unit_index: u32,
        seed: u64,
        params: &GenerationParams,
        future_link: Option<String>,
        category_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            media_kind: params.media_kind,
            unit_index,
            prompt: params.prompt.clone(),
            negative_prompt: params.negative_prompt.clone(),
            seed,
            model_id: params.model_id.clone(),
            steps: params.steps,
            guidance: params.guidance,
            sampler: params.sampler.clone(),
            width: params.width,
            height: params.height,
            fps: params.fps,
            frames: params.frames,
            upscale: params.upscale,
            status: TaskStatus::Queued,
            progress: 0,
            eta: None,
            future_link,
            path: None,
            url: None,
            verified_at: None,
            error_message: None,
            category_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record non-terminal provider progress. Returns false if the row is terminal.
    ///
    /// Progress and eta are always written to a pending row. The status only moves
    /// forward, so a `queued` report after `processing` keeps `processing`.
    pub fn apply_progress(
        &mut self,
        status: TaskStatus,
        progress: u8,
        eta: Option<f64>,
        now: DateTime<Utc>,
    ) -> bool {
        if status.is_terminal() || self.status.is_terminal() {
            return false;
        }
        if self.status.can_transition_to(status) {
            self.status = status;
        }
        self.progress = progress.min(100);
        self.eta = eta;
        self.updated_at = now;
        true
    }

    /// Mark the unit completed with its stored artifact.
    pub fn complete(&mut self, artifact: &crate::StoredArtifact, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(TaskStatus::Completed) {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.eta = None;
        self.path = Some(artifact.path.clone());
        self.url = Some(artifact.url.clone());
        self.verified_at = Some(now);
        self.error_message = None;
        self.updated_at = now;
        true
    }

    /// Mark the unit failed.
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(TaskStatus::Failed) {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.progress = 0;
        self.eta = None;
        self.error_message = Some(message.into());
        self.updated_at = now;
        true
    }
}
