//! Provider transport errors and retry classification.

/// Failure talking to an external generation provider.
///
/// Classification follows HTTP semantics: 4xx responses other than 429 are terminal,
/// 5xx and 429 are retryable, and transport failures (DNS, connect, timeout) are always
/// retryable.
///
/// # Examples
///
/// ```
/// use atelier_error::{ProviderError, RetryableError};
///
/// assert!(ProviderError::http(503, "Service unavailable").is_retryable());
/// assert!(ProviderError::http(429, "Slow down").is_retryable());
/// assert!(!ProviderError::http(401, "Bad key").is_retryable());
/// assert!(ProviderError::transport("dns failure").is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} (status {:?}, retryable: {}) at line {} in {}", message, http_status, retryable, line, file)]
pub struct ProviderError {
    /// Human-readable description
    pub message: String,
    /// HTTP status when the provider answered
    pub http_status: Option<u16>,
    /// Whether another attempt may succeed
    pub retryable: bool,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ProviderError {
    /// Create an error with explicit classification.
    #[track_caller]
    pub fn new(message: impl Into<String>, http_status: Option<u16>, retryable: bool) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            http_status,
            retryable,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Error for a non-2xx HTTP response.
    #[track_caller]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(message, Some(status), Self::status_is_retryable(status))
    }

    /// Error for a failure below HTTP (DNS, connect, timeout, reset).
    #[track_caller]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(message, None, true)
    }

    /// Error for a response body that could not be understood.
    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(message, None, false)
    }

    /// Whether a status code should be retried.
    pub fn status_is_retryable(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }
}

/// Trait for errors that support retry logic.
///
/// This trait allows error types to specify whether they should trigger another attempt.
/// The delay between attempts is owned by the retry policy, not by the error.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503 (service unavailable), 429 (rate limit),
    /// or network timeouts should return true. Permanent errors like 401
    /// (unauthorized) or 400 (bad request) should return false.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}
