//! Turning provider status into row state.

use crate::TaskOrchestrator;
use atelier_core::{
    ArtifactSource, BatchStatus, GenerationTask, ProviderState, ProviderStatus, TaskStatus,
};
use atelier_error::{AtelierError, AtelierResult, NotFoundError};
use atelier_interface::{ProgressUpdate, UnitOutcome, UnitSettlement};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, instrument, warn};

const MISSING_OUTPUT: &str = "Provider returned no output for this unit";
const GENERATION_FAILED: &str = "Generation failed";

/// Per-batch claims held while a batch is being reconciled.
///
/// A poll and a webhook for the same batch, or two overlapping polls, take turns:
/// the second one re-reads the pending rows after the first has settled them and
/// never uploads the same artifact twice. Claims are local to this process.
#[derive(Debug, Default)]
pub(crate) struct BatchClaims {
    held: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BatchClaims {
    /// Wait for exclusive reconciliation rights on `task_id`.
    pub(crate) async fn claim(&self, task_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
            held.retain(|_, slot| Arc::strong_count(slot) > 1);
            held.entry(task_id.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Batches currently claimed or waited on.
    #[cfg(test)]
    fn len(&self) -> usize {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.retain(|_, slot| Arc::strong_count(slot) > 1);
        held.len()
    }
}

impl TaskOrchestrator {
    /// Apply `status` to the pending rows, then return the whole batch.
    ///
    /// If applying fails, every pending unit is marked failed on a best-effort basis
    /// and the original error is returned.
    #[instrument(skip(self, pending, status), fields(pending = pending.len(), state = %status.state))]
    pub(crate) async fn reconcile(
        &self,
        task_id: &str,
        user_id: &str,
        pending: Vec<GenerationTask>,
        status: ProviderStatus,
    ) -> AtelierResult<BatchStatus> {
        if let Err(err) = self.apply(task_id, user_id, &pending, &status).await {
            self.sweep(task_id, user_id, &err).await;
            return Err(err);
        }
        self.current(task_id, user_id).await
    }

    /// Every row of the batch as stored.
    pub(crate) async fn current(&self, task_id: &str, user_id: &str) -> AtelierResult<BatchStatus> {
        let rows = self.tasks.find_batch(task_id, user_id, &[]).await?;
        if rows.is_empty() {
            return Err(NotFoundError::new(task_id).into());
        }
        Ok(BatchStatus::from_units(task_id, rows))
    }

    async fn apply(
        &self,
        task_id: &str,
        user_id: &str,
        pending: &[GenerationTask],
        status: &ProviderStatus,
    ) -> AtelierResult<()> {
        match status.state {
            ProviderState::Success => {
                let settled = self
                    .settle_success(task_id, user_id, pending, &status.outputs)
                    .await?;
                info!(settled, outputs = status.outputs.len(), "Batch settled");
            }
            ProviderState::Failed => {
                let message = status.message.as_deref().unwrap_or(GENERATION_FAILED);
                let failed = self.tasks.fail_pending(task_id, user_id, message).await?;
                warn!(failed, message, "Provider reported failure");
            }
            ProviderState::Queued | ProviderState::Processing | ProviderState::Unknown => {
                let update = ProgressUpdate {
                    status: if status.state == ProviderState::Processing {
                        TaskStatus::Processing
                    } else {
                        TaskStatus::Queued
                    },
                    progress: status.progress_percent(),
                    eta: status.eta,
                };
                self.tasks.update_progress(task_id, user_id, update).await?;
            }
        }
        Ok(())
    }

    /// Upload every pending unit concurrently and settle all of them in one write.
    ///
    /// Output slots are matched to rows by unit index. A unit without an output, or
    /// whose upload fails, is settled as failed without affecting the others.
    async fn settle_success(
        &self,
        task_id: &str,
        user_id: &str,
        pending: &[GenerationTask],
        outputs: &[ArtifactSource],
    ) -> AtelierResult<u64> {
        let retries = *self.config.upload_retries();
        let settlements: Vec<UnitSettlement> = join_all(pending.iter().map(|row| async move {
            let outcome = match outputs.get(row.unit_index as usize) {
                Some(source) => match self.uploader.upload(source, row.media_kind, retries).await {
                    Ok(artifact) => UnitOutcome::Completed(artifact),
                    Err(err) => {
                        warn!(unit = row.unit_index, error = %err, "Upload failed");
                        UnitOutcome::Failed(format!("Upload failed: {}", err.kind))
                    }
                },
                None => UnitOutcome::Failed(MISSING_OUTPUT.to_string()),
            };
            UnitSettlement {
                unit_index: row.unit_index,
                outcome,
            }
        }))
        .await;
        self.tasks.settle_units(task_id, user_id, &settlements).await
    }

    pub(crate) async fn sweep(&self, task_id: &str, user_id: &str, cause: &AtelierError) {
        error!(task_id, error = %cause, "Reconciliation failed; failing pending units");
        let message = format!("Reconciliation failed: {}", cause);
        if let Err(secondary) = self.tasks.fail_pending(task_id, user_id, &message).await {
            error!(task_id, error = %secondary, "Could not fail pending units");
        }
    }
}
