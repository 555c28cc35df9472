//! Error types for aipcheck.

use thiserror::Error;

/// The main error type for aipcheck operations.
///
/// Rule violations are never reported through this type. They are collected
/// into reports. An `Error` means an input or the checker itself could not be
/// used.
#[derive(Error, Debug)]
pub enum Error {
    /// Input does not parse into the expected schema.
    #[error("malformed input at `{path}`: {message}")]
    MalformedInput {
        /// Field path of the offending value (empty for the document root).
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a malformed-input error for the given path.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error rejects a single input rather than the whole run.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedInput { .. })
    }
}

/// Result type alias using aipcheck's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_path() {
        let err = Error::malformed("error.details[0]", "missing `@type`");
        assert_eq!(
            err.to_string(),
            "malformed input at `error.details[0]`: missing `@type`"
        );
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_config_is_not_malformed_input() {
        let err = Error::config("unknown rule `Nope`");
        assert!(!err.is_malformed_input());
        assert_eq!(err.to_string(), "Configuration error: unknown rule `Nope`");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
