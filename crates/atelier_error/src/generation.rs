//! Terminal generation errors reported by a provider.

/// Provider-reported conditions that no retry will fix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// The provider answered with an error payload
    #[display("Provider rejected the request: {}", _0)]
    Rejected(String),
    /// The provider accepted the request but returned no task id
    #[display("Provider response carried no task id")]
    MissingTaskId,
    /// The provider reported the task as failed
    #[display("Generation failed: {}", _0)]
    Failed(String),
    /// No provider is configured for the requested media kind
    #[display("No provider configured for {}", _0)]
    NoProvider(String),
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use atelier_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::MissingTaskId);
/// assert!(format!("{}", err).contains("no task id"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
