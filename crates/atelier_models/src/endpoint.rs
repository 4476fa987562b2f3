//! Provider endpoint settings, presets and the two HTTP calls both variants share.

use crate::{FetchBody, GenerateBody, ProviderMetrics, ProviderResponse};
use atelier_core::ModelPreset;
use atelier_error::AtelierResult;
use atelier_rate_limit::{ProviderConfig, RetryPolicy, RetryingClient};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, instrument};

/// Connection details and presets shared by both provider variants.
#[derive(Clone)]
pub struct ProviderEndpoint {
    pub(crate) client: RetryingClient,
    pub(crate) api_key: String,
    pub(crate) generate_url: String,
    pub(crate) fetch_url: String,
    pub(crate) default_model: String,
    pub(crate) max_attempts: u32,
    pub(crate) presets: HashMap<String, ModelPreset>,
}

impl std::fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("generate_url", &self.generate_url)
            .field("fetch_url", &self.fetch_url)
            .field("default_model", &self.default_model)
            .field("max_attempts", &self.max_attempts)
            .field("presets", &self.presets.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ProviderEndpoint {
    /// Endpoint with explicit settings.
    pub fn new(
        client: RetryingClient,
        api_key: impl Into<String>,
        generate_url: impl Into<String>,
        fetch_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            generate_url: generate_url.into(),
            fetch_url: fetch_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
            max_attempts: 3,
            presets: HashMap::new(),
        }
    }

    /// Endpoint from configuration. Reads the API key from the environment once.
    pub fn from_config(config: &ProviderConfig, policy: RetryPolicy) -> AtelierResult<Self> {
        let api_key = config.api_key()?;
        Ok(Self::new(
            RetryingClient::new(policy),
            api_key,
            &config.generate_url,
            &config.fetch_url,
            &config.default_model,
        )
        .with_max_attempts(config.max_attempts)
        .with_presets(config.presets.clone()))
    }

    /// Attempts per provider call.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replace the preset table.
    pub fn with_presets(mut self, presets: HashMap<String, ModelPreset>) -> Self {
        self.presets = presets;
        self
    }

    /// Preset for `model_id`.
    pub fn preset(&self, model_id: &str) -> Option<ModelPreset> {
        self.presets.get(model_id).cloned()
    }

    /// Status URL for a task.
    pub fn fetch_url_for(&self, task_id: &str) -> String {
        format!("{}/{}", self.fetch_url, task_id)
    }
}

impl ProviderEndpoint {
    /// POST the generate body.
    #[instrument(skip(self, body), fields(model = %body.model_id(), samples = body.samples()))]
    pub(crate) async fn generate(
        &self,
        provider: &'static str,
        body: &GenerateBody,
    ) -> AtelierResult<ProviderResponse> {
        let started = Instant::now();
        let result = self
            .client
            .call_json::<ProviderResponse, _>(
                |http| http.post(&self.generate_url).json(body),
                self.max_attempts,
            )
            .await;
        ProviderMetrics::get().observe(provider, "generate", started, result.as_ref().err());
        let response: ProviderResponse = result?;
        debug!(status = ?response.status(), id = ?response.id(), "Generate response");
        Ok(response)
    }

    /// POST to the fetch endpoint for `task_id`.
    #[instrument(skip(self))]
    pub(crate) async fn fetch(
        &self,
        provider: &'static str,
        task_id: &str,
    ) -> AtelierResult<ProviderResponse> {
        let url = self.fetch_url_for(task_id);
        let body = FetchBody {
            key: self.api_key.clone(),
        };
        let started = Instant::now();
        let result = self
            .client
            .call_json::<ProviderResponse, _>(
                |http| http.post(&url).json(&body),
                self.max_attempts,
            )
            .await;
        ProviderMetrics::get().observe(provider, "fetch", started, result.as_ref().err());
        let response: ProviderResponse = result?;
        debug!(status = ?response.status(), progress = ?response.progress(), "Fetch response");
        Ok(response)
    }
}
