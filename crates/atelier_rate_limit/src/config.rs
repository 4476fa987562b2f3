//! TOML configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Bundled defaults (`atelier.toml` shipped with the workspace)
//! 2. `~/.config/atelier/atelier.toml`
//! 3. `./atelier.toml`
//! 4. `ATELIER__*` environment variables (`ATELIER__SERVER__BIND=0.0.0.0:9000`)

use crate::{AdmissionConfig, RetryPolicy};
use atelier_core::{Category, MediaKind, ModelPreset, Plan, TierCeilings};
use atelier_error::{AtelierError, AtelierResult, ConfigError, ConfigErrorKind};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../atelier.toml");

fn default_attempts() -> u32 {
    3
}

/// How a provider delivers results.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderVariant {
    /// Submits directly; may answer inline, otherwise polled
    Polling,
    /// Always returns a task id and pushes to a webhook
    Webhook,
}

/// One provider endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Delivery variant
    pub variant: ProviderVariant,
    /// URL jobs are POSTed to
    pub generate_url: String,
    /// Base URL for status fetches; the task id is appended
    pub fetch_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model used when a request names none
    pub default_model: String,
    /// Attempts per provider call
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// Presets keyed by model id
    #[serde(default)]
    pub presets: HashMap<String, ModelPreset>,
}

impl ProviderConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> AtelierResult<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            AtelierError::from(ConfigError::new(ConfigErrorKind::MissingEnv(
                self.api_key_env.clone(),
            )))
        })
    }
}

/// CDN upload settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Key prefix for stored artifacts
    pub category: String,
    /// Attempts per artifact
    #[serde(default = "default_attempts")]
    pub retries: u32,
    /// Directory backing the filesystem object store
    pub root: String,
    /// Public URL prefix of the object store
    pub public_base_url: String,
}

/// Credit prices per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Credits per image
    pub image_credits: u64,
    /// Credits per video
    pub video_credits: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            image_credits: 1,
            video_credits: 5,
        }
    }
}

impl PricingConfig {
    /// Credits charged per unit of `kind`.
    pub fn per_unit(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.image_credits,
            MediaKind::Video => self.video_credits,
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
    /// Externally reachable base URL, used to build webhook URLs
    pub public_base_url: String,
    /// User ids allowed to present the `bot` role
    #[serde(default)]
    pub bot_users: Vec<String>,
}

/// Top-level Atelier configuration.
///
/// # Example
///
/// ```no_run
/// use atelier_rate_limit::AtelierConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AtelierConfig::load()?;
/// let basic = config.tiers.get("basic");
/// println!("basic tier ceilings: {:?}", basic);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtelierConfig {
    /// Backoff shared by provider calls and uploads
    #[serde(default)]
    pub retry: RetryPolicy,
    /// CDN upload settings
    pub upload: UploadConfig,
    /// Credit prices
    pub pricing: PricingConfig,
    /// Largest batch a single request may ask for, whatever the plan
    pub max_units: u32,
    /// Providers keyed by media kind (`image`, `video`)
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Plans keyed by name
    #[serde(default)]
    pub plans: HashMap<String, Plan>,
    /// Plan for users without an assignment
    pub default_plan: String,
    /// User id → plan name
    #[serde(default)]
    pub assignments: HashMap<String, String>,
    /// Ceilings for restricted tiers, keyed by tier name
    #[serde(default)]
    pub tiers: HashMap<String, TierCeilings>,
    /// Prompt categories
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Admission control limits
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// HTTP surface
    pub server: ServerConfig,
}

impl AtelierConfig {
    /// Load configuration from a specific file path, on top of the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> AtelierResult<Self> {
        debug!("Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Load configuration from a TOML string, on top of the bundled defaults.
    pub fn from_toml_str(toml: &str) -> AtelierResult<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled.
    #[instrument]
    pub fn load() -> AtelierResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/atelier/atelier.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("atelier").required(false))
            .add_source(Environment::with_prefix("ATELIER").separator("__"));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> AtelierResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                AtelierError::from(ConfigError::new(ConfigErrorKind::Load(e.to_string())))
            })?
            .try_deserialize()
            .map_err(|e| {
                AtelierError::from(ConfigError::new(ConfigErrorKind::Parse(e.to_string())))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-references between sections.
    pub fn validate(&self) -> AtelierResult<()> {
        if !self.plans.contains_key(&self.default_plan) {
            return Err(ConfigError::new(ConfigErrorKind::UnknownPlan {
                plan: self.default_plan.clone(),
                referenced_by: "default_plan".to_string(),
            })
            .into());
        }
        if let Some((user, plan)) = self
            .assignments
            .iter()
            .find(|(_, plan)| !self.plans.contains_key(*plan))
        {
            return Err(ConfigError::new(ConfigErrorKind::UnknownPlan {
                plan: plan.clone(),
                referenced_by: format!("assignments.{}", user),
            })
            .into());
        }
        if self.max_units == 0 {
            return Err(ConfigError::invalid("max_units", "must be positive").into());
        }
        Ok(())
    }

    /// Provider configured for `kind`.
    pub fn provider(&self, kind: MediaKind) -> Option<&ProviderConfig> {
        self.providers.get(kind.as_str())
    }

    /// Plan assigned to `user_id`, falling back to the default plan.
    pub fn plan_for(&self, user_id: &str) -> Option<&Plan> {
        let name = self
            .assignments
            .get(user_id)
            .unwrap_or(&self.default_plan);
        self.plans.get(name)
    }
}
