//! Core data types for the Atelier generation orchestration engine.
//!
//! This crate provides the data model shared by the provider adapters, the stores,
//! the usage ledger and the task orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod category;
mod plan;
mod provider;
mod request;
mod status;
mod task;
mod usage;

pub use artifact::{ArtifactSource, StoredArtifact, content_type_for_extension};
pub use category::Category;
pub use plan::{Caller, Plan, Role, TierCeilings};
pub use provider::{
    ModelPreset, ProviderState, ProviderStatus, SubmitJob, Submission, WebhookEvent,
    fallback_progress,
};
pub use request::{
    GenerationParams, GenerationRequest, GenerationRequestBuilder,
    GenerationRequestBuilderError, derive_seeds,
};
pub use status::BatchStatus;
pub use task::{GenerationTask, MediaKind, TaskStatus};
pub use usage::{BillingPeriod, UsageCharge, UsageRecord, UsageSnapshot};
