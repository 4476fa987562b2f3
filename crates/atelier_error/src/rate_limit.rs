//! Admission control errors.

/// Error kinds for admission control.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RateLimitErrorKind {
    /// Too many requests for this caller
    #[display("Rate limit exceeded, retry after {} ms", retry_after_ms)]
    LimitExceeded {
        /// Milliseconds until the next request would be admitted
        retry_after_ms: u64,
    },
    /// Invalid limiter configuration
    #[display("Invalid rate limit configuration: {}", _0)]
    Config(String),
}

/// Admission control error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rate Limit Error: {} at line {} in {}", kind, line, file)]
pub struct RateLimitError {
    /// The kind of error that occurred
    pub kind: RateLimitErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RateLimitError {
    /// Create a new rate limiting error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
