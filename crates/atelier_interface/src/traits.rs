//! Collaborator traits.

use crate::{AdmitGuard, ProgressUpdate, UnitSettlement};
use async_trait::async_trait;
use atelier_core::{
    Caller, Category, GenerationTask, ModelPreset, Plan, ProviderStatus, SubmitJob, Submission,
    TaskStatus, UsageCharge, UsageRecord, WebhookEvent,
};
use atelier_error::AtelierResult;
use chrono::{DateTime, Utc};

/// An external media-generation backend.
///
/// Implementations differ in how results arrive (inline at submission, by polling,
/// or by webhook push). Callers must handle every case and never assume which.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Submit one batch of `job.samples` units.
    ///
    /// Fails with a generation error when the provider reports an error payload or
    /// omits a task id.
    async fn submit(&self, job: &SubmitJob) -> AtelierResult<Submission>;

    /// Current provider status of a task.
    async fn fetch_status(&self, task_id: &str) -> AtelierResult<ProviderStatus>;

    /// Decode a webhook push into the same shape as a poll result.
    fn parse_webhook(&self, payload: &serde_json::Value) -> AtelierResult<WebhookEvent>;

    /// Parameter preset for a model, if one is configured.
    fn preset(&self, model_id: &str) -> Option<ModelPreset>;

    /// Model used when a request names none.
    fn default_model(&self) -> &str;

    /// Provider name for logs (e.g. "polling", "webhook").
    fn name(&self) -> &'static str;
}

/// Persistent store for generation task rows.
///
/// Every multi-row write is atomic: concurrent readers see all of it or none of it.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert every row of a new batch in one transaction.
    async fn insert_batch(&self, tasks: &[GenerationTask]) -> AtelierResult<()>;

    /// Rows of a batch owned by `user_id`, ordered by unit index.
    ///
    /// An empty `statuses` slice matches every status.
    async fn find_batch(
        &self,
        task_id: &str,
        user_id: &str,
        statuses: &[TaskStatus],
    ) -> AtelierResult<Vec<GenerationTask>>;

    /// Apply progress to every pending row. Returns the number of rows changed.
    async fn update_progress(
        &self,
        task_id: &str,
        user_id: &str,
        update: ProgressUpdate,
    ) -> AtelierResult<u64>;

    /// Write terminal outcomes for pending units in one transaction.
    ///
    /// Settlements for rows that are already terminal are ignored.
    async fn settle_units(
        &self,
        task_id: &str,
        user_id: &str,
        settlements: &[UnitSettlement],
    ) -> AtelierResult<u64>;

    /// Fail every pending row of a batch. Returns the number of rows changed.
    async fn fail_pending(&self, task_id: &str, user_id: &str, message: &str)
    -> AtelierResult<u64>;

    /// Owner of a batch, used to route provider webhooks.
    async fn owner_of(&self, task_id: &str) -> AtelierResult<Option<String>>;
}

/// Persistent store for per-user usage records.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Atomically load-or-create the user's record, roll over a stale period, run
    /// `guard`, and commit `charge` if the guard passes.
    ///
    /// Two concurrent calls for the same user never both pass the guard against the
    /// same snapshot. Returns the committed record.
    async fn admit(
        &self,
        user_id: &str,
        charge: UsageCharge,
        guard: AdmitGuard,
        now: DateTime<Utc>,
    ) -> AtelierResult<UsageRecord>;

    /// Load-or-create the user's record with period rollover applied.
    async fn load(&self, user_id: &str, now: DateTime<Utc>) -> AtelierResult<UsageRecord>;
}

/// CDN object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `path` and return its public URL.
    async fn put(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> AtelierResult<String>;
}

/// Downloads remote artifacts.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch the body at `url`.
    async fn fetch(&self, url: &str) -> AtelierResult<Vec<u8>>;
}

/// Read-only plan reference data.
#[async_trait]
pub trait PlanDirectory: Send + Sync {
    /// The plan the caller is subscribed to.
    async fn plan_for(&self, caller: &Caller) -> AtelierResult<Plan>;
}

/// Pure prompt classifier.
pub trait CategoryClassifier: Send + Sync {
    /// Best-matching category for `prompt`, if any matches.
    fn classify<'a>(&self, prompt: &str, categories: &'a [Category]) -> Option<&'a Category>;
}

/// Admission control keyed by user and client address.
#[async_trait]
pub trait AdmissionControl: Send + Sync {
    /// Admit one request or fail with a rate-limit error.
    async fn admit(&self, user_id: &str, client_addr: &str) -> AtelierResult<()>;
}
