//! Metrics for provider API calls.
//!
//! OpenTelemetry instruments labeled by provider variant and operation. Without an
//! installed meter provider they are no-ops.

use atelier_error::ProviderError;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS: OnceLock<ProviderMetrics> = OnceLock::new();

/// Metrics for provider interactions.
#[derive(Clone)]
pub struct ProviderMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Total provider requests
    pub requests: Counter<u64>,
    /// Failed provider requests
    pub errors: Counter<u64>,
    /// Provider call duration in seconds, retries included
    pub duration: Histogram<f64>,
}

impl ProviderMetrics {
    fn init() -> Self {
        let meter = global::meter("atelier_provider");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("provider.requests")
                .with_description("Total provider API requests")
                .build(),
            errors: meter
                .u64_counter("provider.errors")
                .with_description("Failed provider API requests")
                .build(),
            duration: meter
                .f64_histogram("provider.duration")
                .with_unit("seconds")
                .with_description("Provider API call duration")
                .build(),
        }
    }

    /// Get the global provider metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record one finished call.
    pub fn observe(
        &self,
        provider: &str,
        operation: &str,
        started: Instant,
        error: Option<&ProviderError>,
    ) {
        let labels = [
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("operation", operation.to_string()),
        ];
        self.requests.add(1, &labels);
        self.duration
            .record(started.elapsed().as_secs_f64(), &labels);
        if let Some(error) = error {
            let mut labels = labels.to_vec();
            labels.push(KeyValue::new("error_type", classify_error(error)));
            self.errors.add(1, &labels);
        }
    }
}

/// Classify a provider error for metrics labeling.
///
/// Returns one of: "rate_limit", "auth", "invalid_request", "server", "network", "decode"
pub fn classify_error(error: &ProviderError) -> &'static str {
    match error.http_status {
        Some(429) => "rate_limit",
        Some(401 | 403) => "auth",
        Some(status) if status < 500 => "invalid_request",
        Some(_) => "server",
        None if error.retryable => "network",
        None => "decode",
    }
}
