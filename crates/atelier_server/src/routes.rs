//! Router and handlers.

use crate::{ApiError, BotAllowlist, CallerIdentity, ClientAddr};
use atelier_core::{BatchStatus, GenerationRequest, MediaKind, content_type_for_extension};
use atelier_error::RequestError;
use atelier_orchestrator::{QuotaReport, SubmissionReceipt, TaskOrchestrator};
use atelier_storage::FileSystemObjectStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: Arc<TaskOrchestrator>,
    cdn: Option<Arc<FileSystemObjectStore>>,
    bots: BotAllowlist,
}

impl AppState {
    /// State serving `orchestrator`, without a local CDN or bot accounts.
    pub fn new(orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self {
            orchestrator,
            cdn: None,
            bots: BotAllowlist::default(),
        }
    }

    /// Also serve stored artifacts under `/cdn/`.
    pub fn with_cdn(mut self, cdn: Arc<FileSystemObjectStore>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    /// Let these user ids present the `bot` role.
    pub fn with_bot_users<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.bots = BotAllowlist::new(ids);
        self
    }

    /// The orchestrator behind the handlers.
    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }
}

impl FromRef<AppState> for BotAllowlist {
    fn from_ref(state: &AppState) -> Self {
        state.bots.clone()
    }
}

/// Build the HTTP router.
///
/// | method | path | |
/// |--------|------|-|
/// | `GET` | `/health` | liveness |
/// | `POST` | `/generations/{image,video}` | submit a batch |
/// | `GET` | `/generations/{task_id}` | poll a batch |
/// | `GET` | `/quota` | plan and usage of the caller |
/// | `POST` | `/webhooks/image-generation` | image provider push |
/// | `POST` | `/webhooks/video-generation` | video provider push |
/// | `GET` | `/cdn/{key}` | stored artifacts, when a local CDN is attached |
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/generations/:id", post(submit).get(poll))
        .route("/quota", get(quota))
        .route("/webhooks/image-generation", post(image_webhook))
        .route("/webhooks/video-generation", post(video_webhook));
    if state.cdn.is_some() {
        router = router.route("/cdn/*key", get(artifact));
    }
    router.with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    RequestError::invalid("body", rejection.body_text()).into()
}

/// `POST /generations/{kind}`: the path segment names the media kind.
async fn submit(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    ClientAddr(client_addr): ClientAddr,
    Path(kind): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let kind = MediaKind::from_str(&kind).map_err(|_| {
        RequestError::invalid("media_kind", format!("unknown media kind '{}'", kind))
    })?;
    let Json(mut body) = body.map_err(invalid_body)?;
    body.as_object_mut()
        .ok_or_else(|| RequestError::invalid("body", "expected a JSON object"))?
        .insert("mediaKind".to_string(), Value::from(kind.as_str()));
    let request: GenerationRequest =
        serde_json::from_value(body).map_err(|e| RequestError::invalid("body", e.to_string()))?;

    let receipt = state
        .orchestrator
        .submit(&caller, &client_addr, request)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// `GET /generations/{task_id}`.
async fn poll(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(task_id): Path<String>,
) -> Result<Json<BatchStatus>, ApiError> {
    let status = state.orchestrator.poll(&caller.user_id, &task_id).await?;
    Ok(Json(status))
}

async fn quota(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<QuotaReport>, ApiError> {
    Ok(Json(state.orchestrator.quota(&caller).await?))
}

async fn image_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchStatus>, ApiError> {
    webhook(&state, MediaKind::Image, payload).await
}

async fn video_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchStatus>, ApiError> {
    webhook(&state, MediaKind::Video, payload).await
}

async fn webhook(
    state: &AppState,
    kind: MediaKind,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchStatus>, ApiError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let status = state.orchestrator.handle_webhook(kind, &payload).await?;
    Ok(Json(status))
}

async fn artifact(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let Some(cdn) = state.cdn.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let path = match cdn.local_path(&key) {
        Ok(path) => path,
        Err(e) => {
            debug!(key = %key, error = %e, "Rejected artifact key");
            return StatusCode::NOT_FOUND.into_response();
        }
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let ext = key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
            (
                [(header::CONTENT_TYPE, content_type_for_extension(ext))],
                bytes,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
