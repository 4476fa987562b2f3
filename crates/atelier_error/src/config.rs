//! Configuration loading and validation errors.

/// What is wrong with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A secret is read from an environment variable that is not set
    #[display("environment variable {} is not set", _0)]
    MissingEnv(String),

    /// Sources could not be read or merged
    #[display("failed to load configuration: {}", _0)]
    Load(String),

    /// Merged sources do not match the expected shape
    #[display("failed to parse configuration: {}", _0)]
    Parse(String),

    /// A plan name that is not defined under `[plans]`
    #[display("plan '{}' referenced by {} is not defined", plan, referenced_by)]
    UnknownPlan {
        /// The missing plan name
        plan: String,
        /// Where the name was used
        referenced_by: String,
    },

    /// A value outside its allowed range
    #[display("invalid value for {}: {}", key, reason)]
    Invalid {
        /// Dotted config key
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a configuration error at the caller's location.
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::new(ConfigErrorKind::MissingEnv("ATELIER_IMAGE_API_KEY".into()));
    /// assert!(err.to_string().contains("ATELIER_IMAGE_API_KEY is not set"));
    /// ```
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for [`ConfigErrorKind::Invalid`].
    #[track_caller]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid {
            key: key.into(),
            reason: reason.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_plan_names_both_sides() {
        let err = ConfigError::new(ConfigErrorKind::UnknownPlan {
            plan: "gold".into(),
            referenced_by: "default_plan".into(),
        });
        assert_eq!(
            err.kind().to_string(),
            "plan 'gold' referenced by default_plan is not defined"
        );
        assert!(err.to_string().ends_with(file!()));
    }

    #[test]
    fn invalid_records_key() {
        let err = ConfigError::invalid("max_units", "must be positive");
        assert!(matches!(
            err.kind(),
            ConfigErrorKind::Invalid { key, .. } if key == "max_units"
        ));
    }
}
