//! Orchestrator settings.

use atelier_core::{Category, TierCeilings};
use atelier_rate_limit::{AtelierConfig, PricingConfig};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the orchestrator needs from configuration, passed in at construction.
///
/// # Examples
///
/// ```
/// use atelier_orchestrator::OrchestratorConfig;
///
/// let config = OrchestratorConfig::default()
///     .with_max_units(4)
///     .with_webhook_base_url(Some("https://atelier.example.com".to_string()));
/// assert_eq!(*config.max_units(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct OrchestratorConfig {
    /// Credits charged per unit
    pricing: PricingConfig,
    /// Upload attempts per unit
    upload_retries: u32,
    /// Public base URL that providers push webhooks to
    webhook_base_url: Option<String>,
    /// Categories offered to the classifier
    categories: Vec<Category>,
    /// Ceilings per restricted tier name
    tiers: HashMap<String, TierCeilings>,
    /// Largest batch accepted
    max_units: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            upload_retries: 3,
            webhook_base_url: None,
            categories: Vec::new(),
            tiers: HashMap::new(),
            max_units: 8,
        }
    }
}

impl OrchestratorConfig {
    /// Settings drawn from a loaded [`AtelierConfig`].
    pub fn from_config(config: &AtelierConfig) -> Self {
        let base = config.server.public_base_url.trim();
        Self {
            pricing: config.pricing.clone(),
            upload_retries: config.upload.retries,
            webhook_base_url: (!base.is_empty()).then(|| base.to_string()),
            categories: config.categories.clone(),
            tiers: config.tiers.clone(),
            max_units: config.max_units,
        }
    }

    /// Webhook URL for a media kind, when a public base URL is configured.
    pub fn webhook_url(&self, media: &str) -> Option<String> {
        self.webhook_base_url
            .as_ref()
            .map(|base| format!("{}/webhooks/{}-generation", base.trim_end_matches('/'), media))
    }
}
