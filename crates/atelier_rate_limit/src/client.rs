//! Outbound HTTP with retry classification.

use crate::{RetryPolicy, retry_with_policy};
use atelier_error::ProviderError;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

const BODY_EXCERPT: usize = 512;

/// HTTP client shared by every provider adapter.
///
/// Non-2xx responses become [`ProviderError`]s carrying the status code. 4xx other
/// than 429 is terminal, 5xx and 429 are retried, and failures below HTTP (DNS,
/// connect, timeout) are always retried.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// Client with a default `reqwest` configuration.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_client(reqwest::Client::new(), policy)
    }

    /// Client reusing an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// Backoff policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send the request produced by `build` until it succeeds or attempts run out.
    ///
    /// `build` is invoked once per attempt because a sent request cannot be reused.
    #[instrument(skip(self, build))]
    pub async fn call<F>(&self, build: F, max_attempts: u32) -> Result<reqwest::Response, ProviderError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        retry_with_policy(&self.policy, max_attempts, |attempt| {
            let request = build(&self.http);
            async move {
                debug!(attempt, "Sending provider request");
                let response = request.send().await.map_err(classify_transport)?;
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let url = response.url().to_string();
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::http(
                    status.as_u16(),
                    format!("{} returned {}: {}", url, status, excerpt(&body)),
                ))
            }
        })
        .await
    }

    /// Like [`call`](Self::call), then decode the body as JSON.
    ///
    /// A body that fails to decode is a terminal error and is not retried.
    #[instrument(skip(self, build))]
    pub async fn call_json<T, F>(&self, build: F, max_attempts: u32) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let response = self.call(build, max_attempts).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(format!("Failed to read body: {}", e)))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::decode(format!(
                "Unexpected response body ({}): {}",
                e,
                excerpt(&String::from_utf8_lossy(&bytes))
            ))
        })
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::new(format!("Invalid request: {}", err), None, false)
    } else {
        ProviderError::transport(format!("Request failed: {}", err))
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
