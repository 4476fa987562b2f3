//! Data exchanged with generation providers.

use crate::{ArtifactSource, GenerationParams};
use serde::{Deserialize, Serialize};

/// Model-parameter preset shipped in configuration.
///
/// Values here fill in whatever the request leaves unset; `extra` entries are passed
/// to the provider verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPreset {
    /// Provider model identifier
    pub model_id: String,
    /// Default step count
    #[serde(default)]
    pub steps: Option<u32>,
    /// Default guidance value
    #[serde(default)]
    pub guidance: Option<f64>,
    /// Default sampler
    #[serde(default)]
    pub sampler: Option<String>,
    /// Default width
    #[serde(default)]
    pub width: Option<u32>,
    /// Default height
    #[serde(default)]
    pub height: Option<u32>,
    /// Default fps (video)
    #[serde(default)]
    pub fps: Option<u32>,
    /// Default frame count (video)
    #[serde(default)]
    pub frames: Option<u32>,
    /// Additional provider parameters
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One provider call for a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJob {
    /// Resolved generation parameters
    pub params: GenerationParams,
    /// Seed of unit 0; the provider increments per sample
    pub seed: u64,
    /// Number of units
    pub samples: u32,
    /// Where the provider should push completion
    pub webhook_url: Option<String>,
    /// Correlation id echoed back by webhooks
    pub tracking_id: Option<String>,
}

/// Provider acknowledgement of a submitted batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Submission {
    /// Provider task id shared by the batch
    pub task_id: String,
    /// Estimated seconds until ready
    pub eta: Option<f64>,
    /// Predicted output URLs by unit index
    pub future_links: Vec<String>,
    /// Outputs already available at submission time
    pub ready_outputs: Vec<ArtifactSource>,
}

/// Provider-side task state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    /// Waiting in the provider queue
    #[display("queued")]
    Queued,
    /// Being generated
    #[display("processing")]
    Processing,
    /// Outputs ready
    #[display("success")]
    Success,
    /// Provider gave up
    #[display("failed")]
    Failed,
    /// Unrecognised status string
    #[display("unknown")]
    Unknown,
}

impl ProviderState {
    /// Interpret a provider status string.
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_core::ProviderState;
    ///
    /// assert_eq!(ProviderState::parse("success"), ProviderState::Success);
    /// assert_eq!(ProviderState::parse("error"), ProviderState::Failed);
    /// assert_eq!(ProviderState::parse("warming"), ProviderState::Unknown);
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" | "starting" => ProviderState::Queued,
            "processing" | "running" | "in_progress" => ProviderState::Processing,
            "success" | "succeeded" | "completed" | "done" => ProviderState::Success,
            "failed" | "failure" | "error" | "cancelled" => ProviderState::Failed,
            _ => ProviderState::Unknown,
        }
    }

    /// Whether the provider will not change this state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderState::Success | ProviderState::Failed)
    }
}

/// Progress shown when the provider does not report one.
pub fn fallback_progress(state: ProviderState) -> u8 {
    match state {
        ProviderState::Queued => 5,
        ProviderState::Processing => 50,
        ProviderState::Success => 100,
        ProviderState::Failed => 0,
        ProviderState::Unknown => 10,
    }
}

/// Provider status for a task, from a poll or a webhook push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Provider state
    pub state: ProviderState,
    /// Explicit progress, 0–100
    pub progress: Option<f64>,
    /// Estimated seconds until ready
    pub eta: Option<f64>,
    /// Outputs by unit index
    pub outputs: Vec<ArtifactSource>,
    /// Provider message, usually on failure
    pub message: Option<String>,
}

impl ProviderStatus {
    /// Status with only a state.
    pub fn new(state: ProviderState) -> Self {
        Self {
            state,
            progress: None,
            eta: None,
            outputs: Vec::new(),
            message: None,
        }
    }

    /// Progress percentage: explicit provider progress wins, otherwise the state table.
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_core::{ProviderState, ProviderStatus};
    ///
    /// let mut status = ProviderStatus::new(ProviderState::Processing);
    /// assert_eq!(status.progress_percent(), 50);
    /// status.progress = Some(40.0);
    /// assert_eq!(status.progress_percent(), 40);
    /// ```
    pub fn progress_percent(&self) -> u8 {
        match self.progress {
            Some(p) if p.is_finite() => p.clamp(0.0, 100.0).round() as u8,
            _ => fallback_progress(self.state),
        }
    }
}

/// A provider push, decoded into the same shape as a poll result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Provider task id the push refers to
    pub task_id: String,
    /// Correlation id sent at submission, if echoed back
    pub tracking_id: Option<String>,
    /// Reported status
    pub status: ProviderStatus,
}
