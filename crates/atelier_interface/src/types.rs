//! Value types exchanged across the collaborator traits.

use atelier_core::{StoredArtifact, TaskStatus, UsageRecord};
use atelier_error::QuotaExceeded;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Quota rule evaluated by a [`crate::UsageStore`] inside its atomic admit step.
///
/// The guard sees the record after period rollover and before the charge.
pub type AdmitGuard = Arc<dyn Fn(&UsageRecord) -> Result<(), QuotaExceeded> + Send + Sync>;

/// Non-terminal progress applied to every pending unit of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// `queued` or `processing`
    pub status: TaskStatus,
    /// Progress 0–100
    pub progress: u8,
    /// Provider estimate in seconds
    pub eta: Option<f64>,
}

/// How one unit of a batch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOutcome {
    /// Artifact stored
    Completed(StoredArtifact),
    /// Unit failed with a reason
    Failed(String),
}

impl UnitOutcome {
    /// Whether the unit completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, UnitOutcome::Completed(_))
    }
}

/// Terminal outcome for the unit at `unit_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSettlement {
    /// Submission index of the unit
    pub unit_index: u32,
    /// Terminal outcome
    pub outcome: UnitOutcome,
}
