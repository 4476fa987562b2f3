//! Missing task batch error.

/// No task rows match the requested task id for this user.
///
/// # Examples
///
/// ```
/// use atelier_error::NotFoundError;
///
/// let err = NotFoundError::new("T1");
/// assert_eq!(err.task_id, "T1");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Not Found: no tasks for task id {} at line {} in {}", task_id, line, file)]
pub struct NotFoundError {
    /// Provider task id that was looked up
    pub task_id: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl NotFoundError {
    /// Create a new NotFoundError at the current location.
    #[track_caller]
    pub fn new(task_id: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            task_id: task_id.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
