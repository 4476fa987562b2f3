//! Retry, admission control and configuration for the Atelier engine.
//!
//! - [`RetryPolicy`] and [`retry_with_policy`]: bounded exponential backoff driven by
//!   [`atelier_error::RetryableError`] classification
//! - [`RetryingClient`]: the outbound HTTP client every provider call goes through
//! - [`KeyedAdmission`]: governor-backed admission control keyed by user and client
//! - [`AtelierConfig`]: TOML configuration with bundled defaults and user overrides

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admission;
mod client;
mod config;
mod retry;

pub use admission::{AdmissionConfig, KeyedAdmission};
pub use client::RetryingClient;
pub use config::{
    AtelierConfig, PricingConfig, ProviderConfig, ProviderVariant, ServerConfig, UploadConfig,
};
pub use retry::{RetryPolicy, retry_with_policy};
