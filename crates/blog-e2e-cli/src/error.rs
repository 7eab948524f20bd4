//! Error types for the CLI

use blog_e2e::E2eError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("Test execution failed: {message}")]
    TestExecution {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error("{0}")]
    E2e(#[from] E2eError),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a test execution error
    #[must_use]
    pub fn test_execution(message: impl Into<String>) -> Self {
        Self::TestExecution {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("no chromium");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: no chromium");
    }

    #[test]
    fn test_test_execution_error() {
        let err = CliError::test_execution("2 of 60 scenarios failed");
        assert!(err.to_string().contains("2 of 60"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("unknown suite `blog`");
        assert!(err.to_string().starts_with("Invalid argument"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "report.json");
        let err: CliError = io_err.into();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_library_error_is_transparent() {
        let err: CliError = E2eError::config("workers must be positive").into();
        assert!(matches!(err, CliError::E2e(_)));
        assert_eq!(
            err.to_string(),
            E2eError::config("workers must be positive").to_string()
        );
    }
}
