//! Scripted collaborators and a wired-up orchestrator for scenario tests.
#![allow(dead_code)]

use async_trait::async_trait;
use atelier_core::{
    ArtifactSource, Caller, Category, GenerationRequest, GenerationRequestBuilder, MediaKind,
    ModelPreset, Plan, ProviderState, ProviderStatus, Role, SubmitJob, Submission, TierCeilings,
    WebhookEvent,
};
use atelier_database::{InMemoryTaskStore, InMemoryUsageStore};
use atelier_error::{
    AtelierResult, GenerationError, GenerationErrorKind, ProviderError, RateLimitError,
    RateLimitErrorKind, UploadError, UploadErrorKind,
};
use atelier_interface::{AdmissionControl, ArtifactFetcher, GenerationProvider};
use atelier_orchestrator::{OrchestratorConfig, StaticPlanDirectory, TaskOrchestrator};
use atelier_rate_limit::RetryPolicy;
use atelier_storage::{ArtifactUploader, MemoryObjectStore};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider answering from a script.
pub struct ScriptedProvider {
    submission: Option<Submission>,
    statuses: Mutex<VecDeque<ProviderStatus>>,
    jobs: Mutex<Vec<SubmitJob>>,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    /// Accepts every job under `task_id`.
    pub fn accepting(task_id: &str) -> Self {
        Self::with_submission(Some(Submission {
            task_id: task_id.to_string(),
            eta: Some(20.0),
            ..Default::default()
        }))
    }

    /// Rejects every job.
    pub fn rejecting() -> Self {
        Self::with_submission(None)
    }

    /// Uses `submission` as the answer to every submit.
    pub fn with_submission(submission: Option<Submission>) -> Self {
        Self {
            submission,
            statuses: Mutex::new(VecDeque::new()),
            jobs: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Queue the answer to the next status fetch.
    pub fn push_status(&self, status: ProviderStatus) {
        self.statuses.lock().unwrap().push_back(status);
    }

    /// Jobs submitted so far.
    pub fn jobs(&self) -> Vec<SubmitJob> {
        self.jobs.lock().unwrap().clone()
    }

    /// Status fetches so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn submit(&self, job: &SubmitJob) -> AtelierResult<Submission> {
        self.jobs.lock().unwrap().push(job.clone());
        self.submission.clone().ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Rejected("prompt refused".into())).into()
        })
    }

    async fn fetch_status(&self, _task_id: &str) -> AtelierResult<ProviderStatus> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::transport("no scripted status").into())
    }

    fn parse_webhook(&self, payload: &serde_json::Value) -> AtelierResult<WebhookEvent> {
        let task_id = payload["id"]
            .as_str()
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::MissingTaskId))?;
        let mut status =
            ProviderStatus::new(ProviderState::parse(payload["status"].as_str().unwrap_or("")));
        if status.state == ProviderState::Success {
            status.outputs = payload["output"]
                .as_array()
                .map(|o| o.iter().filter_map(|v| v.as_str()).map(ArtifactSource::parse).collect())
                .unwrap_or_default();
        }
        status.message = payload["message"].as_str().map(str::to_string);
        Ok(WebhookEvent {
            task_id: task_id.to_string(),
            tracking_id: None,
            status,
        })
    }

    fn preset(&self, _model_id: &str) -> Option<ModelPreset> {
        None
    }

    fn default_model(&self) -> &str {
        "base-model"
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Fetcher serving any URL except ones containing "broken".
#[derive(Default)]
pub struct UrlFetcher {
    calls: AtomicUsize,
}

impl UrlFetcher {
    /// Fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for UrlFetcher {
    async fn fetch(&self, url: &str) -> AtelierResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return Err(UploadError::new(UploadErrorKind::Download(format!("{url} returned 404"))).into());
        }
        Ok(format!("bytes of {url}").into_bytes())
    }
}

/// Admission control that refuses everyone.
pub struct ClosedDoor;

#[async_trait]
impl AdmissionControl for ClosedDoor {
    async fn admit(&self, _user_id: &str, _client_addr: &str) -> AtelierResult<()> {
        Err(RateLimitError::new(RateLimitErrorKind::LimitExceeded {
            retry_after_ms: 3000,
        })
        .into())
    }
}

/// Orchestrator wired to in-memory collaborators.
pub struct Harness {
    pub orchestrator: TaskOrchestrator,
    pub tasks: Arc<InMemoryTaskStore>,
    pub usage: Arc<InMemoryUsageStore>,
    pub store: Arc<MemoryObjectStore>,
    pub fetcher: Arc<UrlFetcher>,
    pub provider: Arc<ScriptedProvider>,
}

/// The `free` plan used by most scenarios: 100 credits, 4 units per generation.
pub fn free_plan() -> Plan {
    Plan::new("free", "basic", Some(100), 4)
}

pub fn default_config() -> OrchestratorConfig {
    let mut tiers = HashMap::new();
    tiers.insert(
        "basic".to_string(),
        TierCeilings {
            max_width: 768,
            max_height: 768,
            max_steps: 30,
            allow_upscale: false,
        },
    );
    OrchestratorConfig::default()
        .with_upload_retries(2)
        .with_webhook_base_url(Some("https://atelier.example.com".to_string()))
        .with_categories(vec![Category {
            id: "landscape".into(),
            name: "Landscape".into(),
            keywords: vec!["lighthouse".into(), "sea".into()],
        }])
        .with_tiers(tiers)
}

impl Harness {
    /// Harness where every user is on `plan`.
    pub fn new(plan: Plan, provider: ScriptedProvider) -> Self {
        Self::with_config(plan, provider, default_config())
    }

    /// Harness with explicit orchestrator settings.
    pub fn with_config(plan: Plan, provider: ScriptedProvider, config: OrchestratorConfig) -> Self {
        let tasks = Arc::new(InMemoryTaskStore::new());
        let usage = Arc::new(InMemoryUsageStore::new());
        let store = Arc::new(MemoryObjectStore::new("https://cdn.example.com"));
        let fetcher = Arc::new(UrlFetcher::default());
        let provider = Arc::new(provider);
        let uploader = ArtifactUploader::new(
            store.clone(),
            fetcher.clone(),
            RetryPolicy::new(1, 1.5, 2),
            "generations",
        );
        let mut plans = HashMap::new();
        let name = plan.name().clone();
        plans.insert(name.clone(), plan);
        let directory = StaticPlanDirectory::new(plans, name, HashMap::new());

        let orchestrator = TaskOrchestrator::new(
            config,
            tasks.clone(),
            usage.clone(),
            uploader,
            Arc::new(directory),
        )
        .with_provider(MediaKind::Image, provider.clone());

        Self {
            orchestrator,
            tasks,
            usage,
            store,
            fetcher,
            provider,
        }
    }
}

pub fn alice() -> Caller {
    Caller::new("alice", Role::User)
}

pub fn image_request(units: u32, seed: Option<u64>) -> GenerationRequest {
    let mut builder = GenerationRequestBuilder::default();
    builder
        .media_kind(MediaKind::Image)
        .prompt("a lighthouse on a cliff above the sea")
        .units(units);
    if let Some(seed) = seed {
        builder.seed(seed);
    }
    builder.build().unwrap()
}

pub fn processing(progress: f64) -> ProviderStatus {
    let mut status = ProviderStatus::new(ProviderState::Processing);
    status.progress = Some(progress);
    status.eta = Some(12.0);
    status
}

/// A `queued` report carrying only a fresh estimate.
pub fn queued(eta: f64) -> ProviderStatus {
    let mut status = ProviderStatus::new(ProviderState::Queued);
    status.eta = Some(eta);
    status
}

pub fn success(urls: &[&str]) -> ProviderStatus {
    let mut status = ProviderStatus::new(ProviderState::Success);
    status.outputs = urls.iter().map(|u| ArtifactSource::Url(u.to_string())).collect();
    status
}

pub fn failure(message: &str) -> ProviderStatus {
    let mut status = ProviderStatus::new(ProviderState::Failed);
    status.message = Some(message.to_string());
    status
}
