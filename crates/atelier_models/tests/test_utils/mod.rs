//! In-process mock of the provider REST API.

use atelier_core::{GenerationRequestBuilder, MediaKind, SubmitJob};
use atelier_models::ProviderEndpoint;
use atelier_rate_limit::{RetryPolicy, RetryingClient};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Replies {
    generate: (StatusCode, Value),
    fetch: Value,
    seen: Arc<Mutex<Vec<(String, Value)>>>,
}

/// A running mock provider.
pub struct MockProvider {
    pub base: String,
    seen: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockProvider {
    /// Start a provider answering generate with `generate` and fetch with `fetch`.
    pub async fn spawn(generate: Value, fetch: Value) -> Self {
        Self::spawn_with_status(StatusCode::OK, generate, fetch).await
    }

    /// Like [`spawn`](Self::spawn) with an explicit generate status code.
    pub async fn spawn_with_status(status: StatusCode, generate: Value, fetch: Value) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let replies = Replies {
            generate: (status, generate),
            fetch,
            seen: seen.clone(),
        };
        let router = Router::new()
            .route("/generate", post(generate_handler))
            .route("/fetch/:id", post(fetch_handler))
            .with_state(replies);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            seen,
        }
    }

    /// Endpoint pointed at this mock with fast retries.
    pub fn endpoint(&self) -> ProviderEndpoint {
        ProviderEndpoint::new(
            RetryingClient::new(RetryPolicy::new(1, 1.5, 5)),
            "test-key",
            format!("{}/generate", self.base),
            format!("{}/fetch", self.base),
            "base-model",
        )
    }

    /// Requests received so far as (path, body).
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

async fn generate_handler(
    State(replies): State<Replies>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    replies
        .seen
        .lock()
        .unwrap()
        .push(("/generate".to_string(), body));
    (replies.generate.0, Json(replies.generate.1.clone()))
}

async fn fetch_handler(
    State(replies): State<Replies>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    replies
        .seen
        .lock()
        .unwrap()
        .push((format!("/fetch/{}", id), body));
    Json(replies.fetch.clone())
}

/// A four-image job with base seed 100.
pub fn image_job(webhook: Option<&str>) -> SubmitJob {
    let params = GenerationRequestBuilder::default()
        .media_kind(MediaKind::Image)
        .prompt("a lighthouse at dusk")
        .negative_prompt("blurry")
        .build()
        .unwrap()
        .resolve(None, "base-model");
    SubmitJob {
        params,
        seed: 100,
        samples: 4,
        webhook_url: webhook.map(str::to_string),
        tracking_id: Some("batch-1".to_string()),
    }
}
