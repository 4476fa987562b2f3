//! Generation task orchestration and usage metering for Atelier.
//!
//! [`TaskOrchestrator`] drives a batch from submission to settlement:
//!
//! 1. validate and resolve the request against the model preset
//! 2. admit it through [`QuotaLedger`] (bots skip quota and admission control)
//! 3. submit one provider job for the whole batch
//! 4. insert one placeholder row per unit in a single atomic write
//! 5. reconcile on every poll or webhook until every unit is terminal
//!
//! Reconciliation uploads finished units concurrently and settles each one on its
//! own, so one failed upload never drags its siblings down.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classifier;
mod config;
mod ledger;
mod orchestrator;
mod plans;
mod reconcile;
mod validation;

pub use classifier::KeywordClassifier;
pub use config::OrchestratorConfig;
pub use ledger::{AdmitRequest, QuotaLedger, QuotaReport};
pub use orchestrator::{SubmissionReceipt, TaskOrchestrator};
pub use plans::StaticPlanDirectory;
pub use validation::validate_request;
