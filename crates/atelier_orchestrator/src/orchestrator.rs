//! The task orchestrator: submission, polling, webhooks and quota reports.

use crate::reconcile::BatchClaims;
use crate::{
    AdmitRequest, KeywordClassifier, OrchestratorConfig, QuotaLedger, QuotaReport,
    validate_request,
};
use atelier_core::{
    BatchStatus, Caller, GenerationRequest, GenerationTask, MediaKind, ProviderState,
    ProviderStatus, SubmitJob, TaskStatus, UsageSnapshot, derive_seeds,
};
use atelier_error::{AtelierResult, GenerationError, GenerationErrorKind, NotFoundError};
use atelier_interface::{
    AdmissionControl, CategoryClassifier, GenerationProvider, PlanDirectory, TaskStore,
    UsageStore,
};
use atelier_storage::ArtifactUploader;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// What a successful submission hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// Provider task id shared by the batch
    pub task_id: String,
    /// Seed of each unit, by unit index
    pub seeds: Vec<u64>,
    /// Credits charged
    pub credits_charged: u64,
    /// Usage after the charge; absent for callers exempt from quota
    pub usage: Option<UsageSnapshot>,
    /// Batch state right after submission
    pub batch: BatchStatus,
}

/// Coordinates providers, stores, the quota ledger and the uploader.
///
/// Depends only on collaborator traits; providers are registered per media kind.
pub struct TaskOrchestrator {
    pub(crate) config: OrchestratorConfig,
    pub(crate) providers: HashMap<MediaKind, Arc<dyn GenerationProvider>>,
    pub(crate) tasks: Arc<dyn TaskStore>,
    pub(crate) ledger: QuotaLedger,
    pub(crate) uploader: ArtifactUploader,
    pub(crate) plans: Arc<dyn PlanDirectory>,
    pub(crate) classifier: Arc<dyn CategoryClassifier>,
    pub(crate) admission: Option<Arc<dyn AdmissionControl>>,
    pub(crate) claims: BatchClaims,
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("config", &self.config)
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("admission", &self.admission.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskOrchestrator {
    /// Orchestrator with no providers, the keyword classifier and no admission control.
    pub fn new(
        config: OrchestratorConfig,
        tasks: Arc<dyn TaskStore>,
        usage: Arc<dyn UsageStore>,
        uploader: ArtifactUploader,
        plans: Arc<dyn PlanDirectory>,
    ) -> Self {
        let ledger = QuotaLedger::new(usage, config.tiers().clone());
        Self {
            config,
            providers: HashMap::new(),
            tasks,
            ledger,
            uploader,
            plans,
            classifier: Arc::new(KeywordClassifier),
            admission: None,
            claims: BatchClaims::default(),
        }
    }

    /// Register the provider for a media kind.
    pub fn with_provider(mut self, kind: MediaKind, provider: Arc<dyn GenerationProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Replace the prompt classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn CategoryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Enable admission control.
    pub fn with_admission(mut self, admission: Arc<dyn AdmissionControl>) -> Self {
        self.admission = Some(admission);
        self
    }

    /// Settings in use.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The quota ledger.
    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    pub(crate) fn provider(&self, kind: MediaKind) -> AtelierResult<&Arc<dyn GenerationProvider>> {
        self.providers.get(&kind).ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::NoProvider(kind.to_string())).into()
        })
    }

    /// Submit a batch.
    ///
    /// Nothing is written before the provider has accepted the job; the batch rows
    /// are then inserted in one atomic write. Outputs the provider returned inline
    /// are settled before this returns.
    ///
    /// # Errors
    ///
    /// Request, rate-limit and quota errors before the provider is called; provider
    /// and generation errors from the submission; persistence errors from the insert.
    #[instrument(
        skip(self, request),
        fields(user_id = %caller.user_id, media = %request.media_kind, units = request.units)
    )]
    pub async fn submit(
        &self,
        caller: &Caller,
        client_addr: &str,
        request: GenerationRequest,
    ) -> AtelierResult<SubmissionReceipt> {
        let kind = request.media_kind;
        let provider = self.provider(kind)?;
        let model = request
            .model_id
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        let preset = provider.preset(&model);
        let params = request.resolve(preset.as_ref(), provider.default_model());
        let units = request.units;
        validate_request(&params, units, *self.config.max_units())?;

        let exempt = caller.bypasses_limits();
        if let Some(admission) = self.admission.as_ref().filter(|_| !exempt) {
            admission.admit(&caller.user_id, client_addr).await?;
        }

        let seeds = {
            let mut rng = rand::thread_rng();
            derive_seeds(request.seed, units, &mut rng)
        };
        let credits = u64::from(units).saturating_mul(self.config.pricing().per_unit(kind));

        let usage = if exempt {
            debug!("Quota skipped for exempt caller");
            None
        } else {
            let plan = self.plans.plan_for(caller).await?;
            let admit = AdmitRequest {
                units,
                credit_cost: credits,
                width: params.width,
                height: params.height,
                steps: params.steps,
                upscale: params.upscale,
            };
            Some(self.ledger.admit(&caller.user_id, admit, &plan).await?)
        };

        let job = SubmitJob {
            params: params.clone(),
            seed: seeds.first().copied().unwrap_or_default(),
            samples: units,
            webhook_url: self.config.webhook_url(kind.as_str()),
            tracking_id: Some(Uuid::new_v4().to_string()),
        };
        let submission = provider.submit(&job).await?;
        let task_id = submission.task_id.clone();

        let category_id = self
            .classifier
            .classify(&params.prompt, self.config.categories())
            .map(|c| c.id.clone());
        let now = Utc::now();
        let rows: Vec<GenerationTask> = seeds
            .iter()
            .zip(0u32..)
            .map(|(seed, index)| {
                GenerationTask::placeholder(
                    &task_id,
                    &caller.user_id,
                    index,
                    *seed,
                    &params,
                    submission.future_links.get(index as usize).cloned(),
                    category_id.clone(),
                    now,
                )
            })
            .collect();
        self.tasks.insert_batch(&rows).await?;
        info!(task_id = %task_id, category = ?category_id, "Batch submitted");

        let batch = if submission.ready_outputs.is_empty() {
            BatchStatus::from_units(&task_id, rows)
        } else {
            debug!(
                outputs = submission.ready_outputs.len(),
                "Provider answered inline"
            );
            let mut status = ProviderStatus::new(ProviderState::Success);
            status.outputs = submission.ready_outputs.clone();
            status.eta = submission.eta;
            self.reconcile(&task_id, &caller.user_id, rows, status).await?
        };

        Ok(SubmissionReceipt {
            task_id,
            seeds,
            credits_charged: if exempt { 0 } else { credits },
            usage,
            batch,
        })
    }

    /// Reconcile a batch against a fresh provider status and return it.
    ///
    /// A batch with no pending units is returned as stored, without calling the
    /// provider or writing anything. If the status fetch fails after its retries,
    /// every pending unit is marked failed before the error is returned.
    ///
    /// # Errors
    ///
    /// [`NotFoundError`] when `user_id` owns no rows for `task_id`.
    #[instrument(skip(self))]
    pub async fn poll(&self, user_id: &str, task_id: &str) -> AtelierResult<BatchStatus> {
        let _claim = self.claims.claim(task_id).await;
        let pending = self
            .tasks
            .find_batch(task_id, user_id, &TaskStatus::PENDING)
            .await?;
        let Some(first) = pending.first() else {
            return self.current(task_id, user_id).await;
        };
        let provider = self.provider(first.media_kind)?;
        let status = match provider.fetch_status(task_id).await {
            Ok(status) => status,
            Err(err) => {
                self.sweep(task_id, user_id, &err).await;
                return Err(err);
            }
        };
        self.reconcile(task_id, user_id, pending, status).await
    }

    /// Reconcile a batch from a provider webhook push.
    ///
    /// The owner is looked up from the provider task id in the payload.
    #[instrument(skip(self, payload))]
    pub async fn handle_webhook(
        &self,
        kind: MediaKind,
        payload: &serde_json::Value,
    ) -> AtelierResult<BatchStatus> {
        let provider = self.provider(kind)?;
        let event = provider.parse_webhook(payload)?;
        let task_id = event.task_id;
        let user_id = self
            .tasks
            .owner_of(&task_id)
            .await?
            .ok_or_else(|| NotFoundError::new(task_id.clone()))?;
        debug!(task_id = %task_id, tracking_id = ?event.tracking_id, state = %event.status.state, "Webhook received");

        let _claim = self.claims.claim(&task_id).await;
        let pending = self
            .tasks
            .find_batch(&task_id, &user_id, &TaskStatus::PENDING)
            .await?;
        if pending.is_empty() {
            return self.current(&task_id, &user_id).await;
        }
        self.reconcile(&task_id, &user_id, pending, event.status).await
    }

    /// The caller's plan and current usage.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn quota(&self, caller: &Caller) -> AtelierResult<QuotaReport> {
        let plan = self.plans.plan_for(caller).await?;
        let usage = self.ledger.snapshot(&caller.user_id).await?;
        Ok(QuotaReport { plan, usage })
    }
}
