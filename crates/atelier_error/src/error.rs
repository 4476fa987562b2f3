//! Top-level error wrapper types.

use crate::{
    ConfigError, GenerationError, NotFoundError, PersistenceError, ProviderError, QuotaExceeded,
    RateLimitError, RequestError, RetryableError, ServerError, StorageError, UploadError,
};

/// Every error condition an Atelier operation can surface.
///
/// # Examples
///
/// ```
/// use atelier_error::{AtelierError, AtelierErrorKind, NotFoundError};
///
/// let err: AtelierError = NotFoundError::new("T1").into();
/// assert!(matches!(err.kind(), AtelierErrorKind::NotFound(_)));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum AtelierErrorKind {
    /// Transient provider failure (network, 5xx, 429) that survived retry
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Terminal provider-reported failure
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Usage quota rejected the request
    #[from(QuotaExceeded)]
    Quota(QuotaExceeded),
    /// Artifact upload failed
    #[from(UploadError)]
    Upload(UploadError),
    /// No task rows matched
    #[from(NotFoundError)]
    NotFound(NotFoundError),
    /// CDN object store error
    #[from(StorageError)]
    Storage(StorageError),
    /// Persistent store error
    #[from(PersistenceError)]
    Persistence(PersistenceError),
    /// Admission control rejected the caller
    #[from(RateLimitError)]
    RateLimit(RateLimitError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Malformed generation request
    #[from(RequestError)]
    Request(RequestError),
    /// HTTP surface error
    #[from(ServerError)]
    Server(ServerError),
}

/// Atelier error with kind discrimination.
///
/// # Examples
///
/// ```
/// use atelier_error::{AtelierResult, ConfigError};
///
/// fn load() -> AtelierResult<()> {
///     Err(ConfigError::invalid("providers.image", "missing"))?
/// }
///
/// assert!(load().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Atelier Error: {}", _0)]
pub struct AtelierError(Box<AtelierErrorKind>);

impl AtelierError {
    /// Create a new error from a kind.
    pub fn new(kind: AtelierErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &AtelierErrorKind {
        &self.0
    }

    /// The quota rejection carried by this error, if any.
    pub fn as_quota(&self) -> Option<&QuotaExceeded> {
        match self.kind() {
            AtelierErrorKind::Quota(q) => Some(q),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to AtelierErrorKind
impl<T> From<T> for AtelierError
where
    T: Into<AtelierErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

impl RetryableError for AtelierError {
    fn is_retryable(&self) -> bool {
        match self.kind() {
            AtelierErrorKind::Provider(e) => e.is_retryable(),
            AtelierErrorKind::Upload(e) => e.is_retryable(),
            AtelierErrorKind::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for Atelier operations.
pub type AtelierResult<T> = std::result::Result<T, AtelierError>;
