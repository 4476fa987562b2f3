//! Polling provider client.

use crate::{ProviderEndpoint, conversion};
use async_trait::async_trait;
use atelier_core::{
    ArtifactSource, ModelPreset, ProviderState, ProviderStatus, SubmitJob, Submission,
    WebhookEvent,
};
use atelier_error::AtelierResult;
use atelier_interface::GenerationProvider;
use tracing::{info, instrument};

const NAME: &str = "polling";

/// Provider that submits directly and either answers inline or hands back an id to poll.
///
/// No webhook is registered; status arrives only through [`fetch_status`].
///
/// [`fetch_status`]: GenerationProvider::fetch_status
#[derive(Debug, Clone)]
pub struct PollingProvider {
    endpoint: ProviderEndpoint,
}

impl PollingProvider {
    /// Create a provider over `endpoint`.
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl GenerationProvider for PollingProvider {
    #[instrument(skip(self, job), fields(samples = job.samples, seed = job.seed))]
    async fn submit(&self, job: &SubmitJob) -> AtelierResult<Submission> {
        let mut job = job.clone();
        job.webhook_url = None;
        let body = conversion::to_generate_body(&job, &self.endpoint.api_key)?;
        let response = self.endpoint.generate(NAME, &body).await?;
        let task_id = conversion::require_task_id(&response)?;

        let ready_outputs: Vec<ArtifactSource> =
            if conversion::state_of(&response) == ProviderState::Success {
                response
                    .output()
                    .iter()
                    .map(|o| ArtifactSource::parse(o))
                    .collect()
            } else {
                Vec::new()
            };

        info!(
            task_id = %task_id,
            inline = ready_outputs.len(),
            "Submitted to polling provider"
        );
        Ok(Submission {
            task_id,
            eta: *response.eta(),
            future_links: response.future_links().clone(),
            ready_outputs,
        })
    }

    async fn fetch_status(&self, task_id: &str) -> AtelierResult<ProviderStatus> {
        let response = self.endpoint.fetch(NAME, task_id).await?;
        Ok(conversion::to_status(&response))
    }

    fn parse_webhook(&self, payload: &serde_json::Value) -> AtelierResult<WebhookEvent> {
        conversion::to_webhook_event(payload)
    }

    fn preset(&self, model_id: &str) -> Option<ModelPreset> {
        self.endpoint.preset(model_id)
    }

    fn default_model(&self) -> &str {
        &self.endpoint.default_model
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
