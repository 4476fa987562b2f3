//! Error types for the Atelier engine.
//!
//! This crate provides the error taxonomy shared by every Atelier crate.
//!
//! # Error Hierarchy
//!
//! Errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! The classes the orchestrator reasons about are:
//! - [`ProviderError`]: transient provider failures (network, 5xx, 429), retried locally
//! - [`GenerationError`]: terminal provider-reported failures
//! - [`QuotaExceeded`]: admission rejected by the usage ledger
//! - [`UploadError`]: CDN upload failure after retry exhaustion
//! - [`NotFoundError`]: no task rows match a task id and user
//!
//! # Examples
//!
//! ```
//! use atelier_error::{AtelierResult, ProviderError};
//!
//! fn submit() -> AtelierResult<String> {
//!     Err(ProviderError::http(503, "Service unavailable"))?
//! }
//!
//! match submit() {
//!     Ok(id) => println!("Submitted: {}", id),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generation;
mod not_found;
mod persistence;
mod provider;
mod quota;
mod rate_limit;
mod request;
mod server;
mod storage;
mod upload;

pub use config::{ConfigError, ConfigErrorKind};
pub use error::{AtelierError, AtelierErrorKind, AtelierResult};
pub use generation::{GenerationError, GenerationErrorKind};
pub use not_found::NotFoundError;
pub use persistence::{PersistenceError, PersistenceErrorKind};
pub use provider::{ProviderError, RetryableError};
pub use quota::{QuotaExceeded, QuotaKind};
pub use rate_limit::{RateLimitError, RateLimitErrorKind};
pub use request::{RequestError, RequestErrorKind};
pub use server::{ServerError, ServerErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use upload::{UploadError, UploadErrorKind};
