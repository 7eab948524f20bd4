//! Result and error types for blog-e2e.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for blog-e2e operations
pub type E2eResult<T> = Result<T, E2eError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum E2eError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page-level driver error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// An element or state never appeared within its bound
    #[error("Timed out after {ms}ms waiting for {waiting_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waiting_for: String,
    },

    /// Actual value did not match the expected value
    #[error("Assertion failed: {description}\n  expected: {expected}\n  actual:   {actual}")]
    Assertion {
        /// What was asserted
        description: String,
        /// Expected value (literal or pattern)
        expected: String,
        /// Last observed value
        actual: String,
    },

    /// Network failure surfaced by the harness
    #[error("Network failure for {url}: {reason}")]
    Network {
        /// Request URL
        url: String,
        /// Failure reason
        reason: String,
    },

    /// Selector could not be parsed
    #[error("Invalid selector `{selector}`: {message}")]
    Selector {
        /// Selector source
        selector: String,
        /// Parse error
        message: String,
    },

    /// An action could not be performed on a resolved element
    #[error("{action} on `{selector}` failed: {message}")]
    Action {
        /// Action name
        action: String,
        /// Locator description
        selector: String,
        /// Error message
        message: String,
    },

    /// Script evaluation error
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// The driver does not implement the operation
    #[error("{driver} driver does not support {operation}")]
    Unsupported {
        /// Driver name
        driver: String,
        /// Operation name
        operation: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Coarse classification reported to the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Expected vs. actual mismatch
    Assertion,
    /// Bounded wait elapsed
    Timeout,
    /// Injected or real network failure
    Network,
    /// Anything the harness itself could not do
    Harness,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Assertion => "assertion",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Harness => "harness",
        };
        f.write_str(name)
    }
}

impl E2eError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(
        description: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            description: description.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(ms: u64, waiting_for: impl Into<String>) -> Self {
        Self::Timeout {
            ms,
            waiting_for: waiting_for.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create an action error
    #[must_use]
    pub fn action(
        action: impl Into<String>,
        selector: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Action {
            action: action.into(),
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    #[must_use]
    pub fn unsupported(driver: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            driver: driver.into(),
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify the error for reporting
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Assertion { .. } => FailureKind::Assertion,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Network { .. } => FailureKind::Network,
            _ => FailureKind::Harness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message_shows_expected_and_actual() {
        let err = E2eError::assertion("page title", "\"Willian Nguyen - Home\"", "\"Home\"");
        let message = err.to_string();
        assert!(message.contains("page title"));
        assert!(message.contains("expected: \"Willian Nguyen - Home\""));
        assert!(message.contains("actual:   \"Home\""));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            E2eError::assertion("x", "1", "2").kind(),
            FailureKind::Assertion
        );
        assert_eq!(E2eError::timeout(5000, "h1").kind(), FailureKind::Timeout);
        assert_eq!(
            E2eError::Network {
                url: "/api/subscribe".into(),
                reason: "net::ERR_INTERNET_DISCONNECTED".into()
            }
            .kind(),
            FailureKind::Network
        );
        assert_eq!(E2eError::page("closed").kind(), FailureKind::Harness);
    }

    #[test]
    fn test_timeout_display() {
        let err = E2eError::timeout(250, "`.success` to be visible");
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms waiting for `.success` to be visible"
        );
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::Assertion).unwrap();
        assert_eq!(json, "\"assertion\"");
    }
}
