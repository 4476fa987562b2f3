//! A server bound to a local port over in-memory collaborators.
#![allow(dead_code)]

use async_trait::async_trait;
use atelier_core::{
    ArtifactSource, MediaKind, ModelPreset, Plan, ProviderState, ProviderStatus, SubmitJob,
    Submission, WebhookEvent,
};
use atelier_database::{InMemoryTaskStore, InMemoryUsageStore};
use atelier_error::{AtelierResult, GenerationError, GenerationErrorKind};
use atelier_interface::{ArtifactFetcher, GenerationProvider};
use atelier_orchestrator::{OrchestratorConfig, StaticPlanDirectory, TaskOrchestrator};
use atelier_rate_limit::RetryPolicy;
use atelier_server::{AppState, router};
use atelier_storage::{ArtifactUploader, MemoryObjectStore};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TASK_ID: &str = "T-http";
/// The only user id allowed to present the bot role.
pub const BOT_USER: &str = "crawler";

/// Provider that accepts every job and reports it half done.
///
/// The first job gets [`TASK_ID`], later ones `T-http-2`, `T-http-3` and so on.
#[derive(Default)]
pub struct StubProvider {
    jobs: Mutex<Vec<SubmitJob>>,
    fetches: AtomicUsize,
}

impl StubProvider {
    pub fn jobs(&self) -> Vec<SubmitJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for StubProvider {
    async fn submit(&self, job: &SubmitJob) -> AtelierResult<Submission> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        let task_id = match jobs.len() {
            1 => TASK_ID.to_string(),
            n => format!("{}-{}", TASK_ID, n),
        };
        Ok(Submission {
            task_id,
            eta: Some(30.0),
            ..Default::default()
        })
    }

    async fn fetch_status(&self, _task_id: &str) -> AtelierResult<ProviderStatus> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut status = ProviderStatus::new(ProviderState::Processing);
        status.progress = Some(50.0);
        Ok(status)
    }

    fn parse_webhook(&self, payload: &serde_json::Value) -> AtelierResult<WebhookEvent> {
        let task_id = payload["id"]
            .as_str()
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::MissingTaskId))?;
        let mut status =
            ProviderStatus::new(ProviderState::parse(payload["status"].as_str().unwrap_or("")));
        status.outputs = payload["output"]
            .as_array()
            .map(|o| o.iter().filter_map(|v| v.as_str()).map(ArtifactSource::parse).collect())
            .unwrap_or_default();
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
        "stub"
    }
}

struct EchoFetcher;

#[async_trait]
impl ArtifactFetcher for EchoFetcher {
    async fn fetch(&self, url: &str) -> AtelierResult<Vec<u8>> {
        Ok(url.as_bytes().to_vec())
    }
}

/// Everyone is on `plan`; image jobs go to a [`StubProvider`].
pub fn orchestrator(plan: Plan) -> (TaskOrchestrator, Arc<StubProvider>, Arc<InMemoryTaskStore>) {
    let tasks = Arc::new(InMemoryTaskStore::new());
    let provider = Arc::new(StubProvider::default());
    let uploader = ArtifactUploader::new(
        Arc::new(MemoryObjectStore::new("https://cdn.example.com")),
        Arc::new(EchoFetcher),
        RetryPolicy::new(1, 1.5, 2),
        "generations",
    );
    let name = plan.name().clone();
    let plans = StaticPlanDirectory::new(
        HashMap::from([(name.clone(), plan)]),
        name,
        HashMap::new(),
    );
    let config = OrchestratorConfig::default()
        .with_webhook_base_url(Some("https://atelier.example.com".to_string()));

    let orchestrator = TaskOrchestrator::new(
        config,
        tasks.clone(),
        Arc::new(InMemoryUsageStore::new()),
        uploader,
        Arc::new(plans),
    )
    .with_provider(MediaKind::Image, provider.clone());
    (orchestrator, provider, tasks)
}

/// Serve `state` on an ephemeral port and return its base URL.
pub async fn serve(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}

/// A running server and handles on its collaborators.
pub struct TestServer {
    pub base: String,
    pub provider: Arc<StubProvider>,
    pub tasks: Arc<InMemoryTaskStore>,
    pub http: reqwest::Client,
}

impl TestServer {
    pub async fn start(plan: Plan) -> Self {
        Self::start_with(plan, |o| o).await
    }

    /// Start after applying `configure` to the orchestrator.
    pub async fn start_with(
        plan: Plan,
        configure: impl FnOnce(TaskOrchestrator) -> TaskOrchestrator,
    ) -> Self {
        let (orchestrator, provider, tasks) = orchestrator(plan);
        let state = AppState::new(Arc::new(configure(orchestrator))).with_bot_users([BOT_USER]);
        let base = serve(state).await;
        Self {
            base,
            provider,
            tasks,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `POST /generations/image` as `user`.
    pub async fn submit_image(&self, user: &str, body: serde_json::Value) -> reqwest::Response {
        self.http
            .post(self.url("/generations/image"))
            .header("x-user-id", user)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

pub fn free_plan() -> Plan {
    Plan::new("free", "basic", Some(100), 4)
}
