//! Conversions between core types and the provider wire format.

use crate::{GenerateBody, ProviderResponse};
use atelier_core::{ArtifactSource, ProviderState, ProviderStatus, SubmitJob, WebhookEvent};
use atelier_error::{AtelierResult, GenerationError, GenerationErrorKind};

/// Build the generate body for `job`.
pub fn to_generate_body(job: &SubmitJob, api_key: &str) -> AtelierResult<GenerateBody> {
    let params = &job.params;
    GenerateBody::builder()
        .key(api_key)
        .prompt(params.prompt.clone())
        .negative_prompt(params.negative_prompt.clone())
        .seed(job.seed)
        .width(params.width)
        .height(params.height)
        .samples(job.samples)
        .webhook(job.webhook_url.clone())
        .track_id(job.tracking_id.clone())
        .model_id(params.model_id.clone())
        .num_inference_steps(params.steps)
        .guidance_scale(params.guidance)
        .scheduler(params.sampler.clone())
        .fps(params.fps)
        .num_frames(params.frames)
        .upscale(params.upscale.then(|| "yes".to_string()))
        .extra(params.extra.clone())
        .build()
        .map_err(|e| {
            GenerationError::new(GenerationErrorKind::Rejected(format!(
                "Failed to build request: {}",
                e
            )))
            .into()
        })
}

/// Provider state of a response, treating a missing status as unknown.
pub fn state_of(response: &ProviderResponse) -> ProviderState {
    response
        .status()
        .as_deref()
        .map(ProviderState::parse)
        .unwrap_or(ProviderState::Unknown)
}

/// Interpret a fetch or webhook response.
pub fn to_status(response: &ProviderResponse) -> ProviderStatus {
    let state = state_of(response);
    ProviderStatus {
        state,
        progress: *response.progress(),
        eta: *response.eta(),
        outputs: if state == ProviderState::Success {
            response.output().iter().map(|o| ArtifactSource::parse(o)).collect()
        } else {
            Vec::new()
        },
        message: response.message_text(),
    }
}

/// Reject error payloads and responses without a task id.
pub fn require_task_id(response: &ProviderResponse) -> AtelierResult<String> {
    if state_of(response) == ProviderState::Failed {
        let message = response
            .message_text()
            .unwrap_or_else(|| "provider reported an error".to_string());
        return Err(GenerationError::new(GenerationErrorKind::Rejected(message)).into());
    }
    response
        .id()
        .clone()
        .ok_or_else(|| GenerationError::new(GenerationErrorKind::MissingTaskId).into())
}

/// Decode a webhook push.
pub fn to_webhook_event(payload: &serde_json::Value) -> AtelierResult<WebhookEvent> {
    let response: ProviderResponse = serde_json::from_value(payload.clone()).map_err(|e| {
        GenerationError::new(GenerationErrorKind::Rejected(format!(
            "Unreadable webhook payload: {}",
            e
        )))
    })?;
    let task_id = response
        .id()
        .clone()
        .ok_or_else(|| GenerationError::new(GenerationErrorKind::MissingTaskId))?;
    Ok(WebhookEvent {
        task_id,
        tracking_id: response.track_id().clone(),
        status: to_status(&response),
    })
}
