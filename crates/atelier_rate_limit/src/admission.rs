//! Admission control keyed by (user, client address).

use async_trait::async_trait;
use atelier_error::{AtelierResult, RateLimitError, RateLimitErrorKind};
use atelier_interface::AdmissionControl;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::{debug, instrument};

type Key = (String, String);
type KeyedLimiter = RateLimiter<Key, DefaultKeyedStateStore<Key>, DefaultClock>;

fn default_requests_per_minute() -> u32 {
    20
}

fn default_burst() -> u32 {
    5
}

/// Admission limits applied per (user, client address) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Sustained requests per minute
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Requests allowed back to back
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
        }
    }
}

/// Governor-backed [`AdmissionControl`].
pub struct KeyedAdmission {
    limiter: KeyedLimiter,
    clock: DefaultClock,
}

impl std::fmt::Debug for KeyedAdmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedAdmission")
            .field("tracked_keys", &self.limiter.len())
            .finish()
    }
}

impl KeyedAdmission {
    /// Build a limiter from configuration.
    ///
    /// # Errors
    ///
    /// Fails if either limit is zero.
    pub fn new(config: AdmissionConfig) -> Result<Self, RateLimitError> {
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            RateLimitError::new(RateLimitErrorKind::Config(
                "requests_per_minute must be positive".to_string(),
            ))
        })?;
        let burst = NonZeroU32::new(config.burst).ok_or_else(|| {
            RateLimitError::new(RateLimitErrorKind::Config(
                "burst must be positive".to_string(),
            ))
        })?;
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
        })
    }

    /// Forget keys whose budget has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

#[async_trait]
impl AdmissionControl for KeyedAdmission {
    #[instrument(skip(self))]
    async fn admit(&self, user_id: &str, client_addr: &str) -> AtelierResult<()> {
        let key = (user_id.to_string(), client_addr.to_string());
        match self.limiter.check_key(&key) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                debug!(wait_ms = wait.as_millis() as u64, "Admission denied");
                Err(RateLimitError::new(RateLimitErrorKind::LimitExceeded {
                    retry_after_ms: wait.as_millis() as u64,
                })
                .into())
            }
        }
    }
}
