//! Webhook provider client.

use crate::{ProviderEndpoint, conversion};
use async_trait::async_trait;
use atelier_core::{ModelPreset, ProviderStatus, SubmitJob, Submission, WebhookEvent};
use atelier_error::AtelierResult;
use atelier_interface::GenerationProvider;
use tracing::{info, instrument, warn};

const NAME: &str = "webhook";

/// Provider that always queues the job and returns a task id.
///
/// The submission registers the webhook URL and tracking id from the job and
/// returns predicted output links. Inline outputs in the submit response are
/// ignored; results are taken from status fetches or webhook pushes.
#[derive(Debug, Clone)]
pub struct WebhookProvider {
    endpoint: ProviderEndpoint,
}

impl WebhookProvider {
    /// Create a provider over `endpoint`.
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl GenerationProvider for WebhookProvider {
    #[instrument(skip(self, job), fields(samples = job.samples, seed = job.seed))]
    async fn submit(&self, job: &SubmitJob) -> AtelierResult<Submission> {
        if job.webhook_url.is_none() {
            warn!("Submitting without a webhook URL; results will arrive only by polling");
        }
        let body = conversion::to_generate_body(job, &self.endpoint.api_key)?;
        let response = self.endpoint.generate(NAME, &body).await?;
        let task_id = conversion::require_task_id(&response)?;

        info!(
            task_id = %task_id,
            future_links = response.future_links().len(),
            "Submitted to webhook provider"
        );
        Ok(Submission {
            task_id,
            eta: *response.eta(),
            future_links: response.future_links().clone(),
            ready_outputs: Vec::new(),
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
