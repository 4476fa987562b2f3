//! Generation request validation errors.

/// Specific validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RequestErrorKind {
    /// Missing required field
    #[display("Missing required field: {}", _0)]
    MissingField(String),

    /// Invalid field value
    #[display("Invalid field value for '{}': {}", field, reason)]
    InvalidField {
        /// The field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Caller identity missing or malformed
    #[display("Unauthenticated: {}", _0)]
    Unauthenticated(String),
}

/// Request error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Request Error: {} at line {} in {}", kind, line, file)]
pub struct RequestError {
    kind: RequestErrorKind,
    line: u32,
    file: &'static str,
}

impl RequestError {
    /// Create a new request error with caller location tracking.
    #[track_caller]
    pub fn new(kind: RequestErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for [`RequestErrorKind::InvalidField`].
    #[track_caller]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::InvalidField {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RequestErrorKind {
        &self.kind
    }
}

/// Convert from derive_builder error string.
impl From<String> for RequestError {
    #[track_caller]
    fn from(msg: String) -> Self {
        Self::new(RequestErrorKind::MissingField(msg))
    }
}
