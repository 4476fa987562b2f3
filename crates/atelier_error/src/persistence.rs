//! Persistent store error types.

/// Kinds of persistent store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PersistenceErrorKind {
    /// Failed to obtain a connection
    #[display("Connection error: {}", _0)]
    Connection(String),
    /// A write conflicted with existing rows
    #[display("Conflict: {}", _0)]
    Conflict(String),
    /// Query failed
    #[display("Query error: {}", _0)]
    Query(String),
    /// A stored value could not be interpreted
    #[display("Corrupt row: {}", _0)]
    Corrupt(String),
    /// Schema migration failed
    #[display("Migration error: {}", _0)]
    Migration(String),
    /// Blocking task was cancelled or panicked
    #[display("Background task failed: {}", _0)]
    Join(String),
}

/// Persistence error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Persistence Error: {} at line {} in {}", kind, line, file)]
pub struct PersistenceError {
    /// The kind of error that occurred
    pub kind: PersistenceErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PersistenceError {
    /// Create a new persistence error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PersistenceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::result::Error> for PersistenceError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::new(PersistenceErrorKind::Conflict(info.message().to_string()))
            }
            other => Self::new(PersistenceErrorKind::Query(other.to_string())),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::r2d2::PoolError> for PersistenceError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::new(PersistenceErrorKind::Connection(err.to_string()))
    }
}
