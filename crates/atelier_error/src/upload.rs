//! Artifact upload errors.

use crate::RetryableError;

/// Kinds of upload failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum UploadErrorKind {
    /// Downloading the provider artifact failed
    #[display("Failed to download artifact: {}", _0)]
    Download(String),
    /// The inline payload is not valid encoded data
    #[display("Failed to decode inline artifact: {}", _0)]
    Decode(String),
    /// The object store refused the write
    #[display("Failed to store artifact: {}", _0)]
    Store(String),
    /// Every attempt failed
    #[display("Upload failed after {} attempts: {}", attempts, last)]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Message of the final failure
        last: String,
    },
}

/// Upload error with location tracking.
///
/// # Examples
///
/// ```
/// use atelier_error::{RetryableError, UploadError, UploadErrorKind};
///
/// let err = UploadError::new(UploadErrorKind::Decode("bad padding".to_string()));
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upload Error: {} at line {} in {}", kind, line, file)]
pub struct UploadError {
    /// The kind of error that occurred
    pub kind: UploadErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UploadError {
    /// Create a new upload error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UploadErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl RetryableError for UploadError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            UploadErrorKind::Download(_) | UploadErrorKind::Store(_)
        )
    }
}
