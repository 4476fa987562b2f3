//! Generation provider integrations for Atelier.
//!
//! Two provider variants implement [`atelier_interface::GenerationProvider`]:
//!
//! - [`PollingProvider`]: legacy backend that may answer a submission inline and is
//!   otherwise polled
//! - [`WebhookProvider`]: always queues, returns predicted output links, and pushes
//!   completion to a webhook
//!
//! Both speak the same JSON wire format ([`GenerateBody`], [`ProviderResponse`]) and
//! send every request through [`atelier_rate_limit::RetryingClient`].
//!
//! # Example
//!
//! ```no_run
//! use atelier_core::MediaKind;
//! use atelier_models::provider_from_config;
//! use atelier_rate_limit::AtelierConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AtelierConfig::load()?;
//! let image = config.provider(MediaKind::Image).ok_or("no image provider")?;
//! let provider = provider_from_config(image, config.retry)?;
//! println!("using {}", provider.name());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod conversion;
mod dto;
mod endpoint;
mod metrics;
mod polling;
mod webhook;

pub use dto::{FetchBody, GenerateBody, GenerateBodyBuilder, ProviderResponse};
pub use endpoint::ProviderEndpoint;
pub use metrics::{ProviderMetrics, classify_error};
pub use polling::PollingProvider;
pub use webhook::WebhookProvider;

use atelier_error::AtelierResult;
use atelier_interface::GenerationProvider;
use atelier_rate_limit::{ProviderConfig, ProviderVariant, RetryPolicy};
use std::sync::Arc;

/// Build the provider variant a configuration section names.
pub fn provider_from_config(
    config: &ProviderConfig,
    policy: RetryPolicy,
) -> AtelierResult<Arc<dyn GenerationProvider>> {
    let endpoint = ProviderEndpoint::from_config(config, policy)?;
    Ok(match config.variant {
        ProviderVariant::Polling => Arc::new(PollingProvider::new(endpoint)),
        ProviderVariant::Webhook => Arc::new(WebhookProvider::new(endpoint)),
    })
}
