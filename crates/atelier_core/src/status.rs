//! Aggregate status of a batch, as reported to callers.

use crate::{GenerationTask, TaskStatus};
use serde::{Deserialize, Serialize};

/// Batch-level view over the unit rows of one task.
///
/// While any unit is pending the batch is `processing` (or `queued` if no unit has
/// started). Once every unit is terminal the batch is `completed` if at least one unit
/// completed and `failed` otherwise. Progress is the mean of unit progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    /// Provider task id
    pub task_id: String,
    /// Aggregated state
    pub status: TaskStatus,
    /// Mean progress 0–100
    pub progress: u8,
    /// Largest remaining provider estimate
    pub eta: Option<f64>,
    /// CDN URLs of completed units, in unit order
    pub outputs: Vec<String>,
    /// Unit rows ordered by index
    pub units: Vec<GenerationTask>,
    /// First failure message, if any
    pub message: Option<String>,
}

impl BatchStatus {
    /// Aggregate unit rows. Rows are sorted by `unit_index`.
    pub fn from_units(task_id: &str, mut units: Vec<GenerationTask>) -> Self {
        units.sort_by_key(|u| u.unit_index);

        let all_terminal = units.iter().all(|u| u.status.is_terminal());
        let any_completed = units.iter().any(|u| u.status == TaskStatus::Completed);
        let status = if units.is_empty() {
            TaskStatus::Queued
        } else if all_terminal && any_completed {
            TaskStatus::Completed
        } else if all_terminal {
            TaskStatus::Failed
        } else if units.iter().any(|u| u.status == TaskStatus::Processing) {
            TaskStatus::Processing
        } else {
            TaskStatus::Queued
        };

        let progress = if units.is_empty() {
            0
        } else {
            let sum: u32 = units.iter().map(|u| u32::from(u.progress)).sum();
            (sum / units.len() as u32) as u8
        };

        let eta = units
            .iter()
            .filter(|u| !u.status.is_terminal())
            .filter_map(|u| u.eta)
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |a| a.max(e))));

        let outputs = units
            .iter()
            .filter(|u| u.status == TaskStatus::Completed)
            .filter_map(|u| u.url.clone())
            .collect();

        let message = units.iter().find_map(|u| u.error_message.clone());

        Self {
            task_id: task_id.to_string(),
            status,
            progress,
            eta,
            outputs,
            units,
            message,
        }
    }

    /// Whether every unit is terminal.
    pub fn is_settled(&self) -> bool {
        !self.units.is_empty() && self.units.iter().all(|u| u.status.is_terminal())
    }
}
