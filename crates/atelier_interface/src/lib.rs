//! Collaborator traits for the Atelier generation orchestration engine.
//!
//! The orchestrator depends only on these traits. Provider backends, persistent
//! stores, the CDN and admission control each supply an implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{
    AdmissionControl, ArtifactFetcher, CategoryClassifier, GenerationProvider, ObjectStore,
    PlanDirectory, TaskStore, UsageStore,
};
pub use types::{AdmitGuard, ProgressUpdate, UnitOutcome, UnitSettlement};
