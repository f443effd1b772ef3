//! Load error types.
//!
//! These errors are serializable and do not depend on transport error types;
//! adapters capture status codes and messages as plain values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad class of a load error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The descriptor itself is unusable; nothing was dispatched.
    Structural,
    /// The transport reported a failure.
    Transport,
    /// No terminal transport event arrived in time.
    Timeout,
    /// The load was cancelled by the caller.
    Cancelled,
}

/// Error type for load operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoadError {
    /// The source did not match the file-URI pattern.
    #[error("Invalid source: '{src}'")]
    InvalidSource {
        /// The offending source string.
        src: String,
    },

    /// The descriptor is malformed.
    #[error("Invalid descriptor: {message}")]
    InvalidDescriptor {
        /// What was wrong.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Http {
        /// HTTP status code (0 when the request never got a response).
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Network failure before or while reading the response.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
    },

    /// A host element reported an error, or a fetched tag failed to decode.
    #[error("Element error: {message}")]
    Element {
        /// Detailed error message.
        message: String,
    },

    /// The host-element strategy had no element to load into.
    #[error("No host element available for {kind} tags")]
    NoHostElement {
        /// Tag kind that was needed.
        kind: String,
    },

    /// No terminal transport event arrived within the timeout window.
    #[error("Timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The load was cancelled.
    #[error("Load cancelled")]
    Cancelled,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl LoadError {
    /// Create an invalid source error.
    pub fn invalid_source(src: impl Into<String>) -> Self {
        Self::InvalidSource { src: src.into() }
    }

    /// Create an invalid descriptor error.
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            message: message.into(),
        }
    }

    /// Create an HTTP status error.
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an element error.
    pub fn element(message: impl Into<String>) -> Self {
        Self::Element {
            message: message.into(),
        }
    }

    /// Create a missing host element error.
    pub fn no_host_element(kind: impl Into<String>) -> Self {
        Self::NoHostElement { kind: kind.into() }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSource { .. } | Self::InvalidDescriptor { .. } => {
                ErrorCategory::Structural
            }
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Http { .. }
            | Self::Network { .. }
            | Self::Element { .. }
            | Self::NoHostElement { .. }
            | Self::Other { .. } => ErrorCategory::Transport,
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidSource { src } => format!("'{src}' is not a loadable source."),
            Self::InvalidDescriptor { message } => format!("Invalid descriptor: {message}"),
            Self::Http { status: 0, url } => format!("No response from {url}."),
            Self::Http { status, url } => format!("Server returned HTTP {status} for {url}."),
            Self::Network { message } => format!("Network error: {message}"),
            Self::Element { message } => format!("Resource failed to load: {message}"),
            Self::NoHostElement { kind } => {
                format!("No host element is available to load {kind} resources.")
            }
            Self::Timeout { timeout_ms } => {
                format!("No response within {timeout_ms} ms; the load was abandoned.")
            }
            Self::Cancelled => "Load was cancelled.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            LoadError::invalid_source("").category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            LoadError::http(404, "a.png").category(),
            ErrorCategory::Transport
        );
        assert_eq!(LoadError::timeout(8000).category(), ErrorCategory::Timeout);
        assert_eq!(LoadError::Cancelled.category(), ErrorCategory::Cancelled);
    }

    #[test]
    fn test_error_serialization() {
        let err = LoadError::http(404, "https://example.com/a.png");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("404"));

        let parsed: LoadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_user_messages() {
        assert!(LoadError::timeout(8000).user_message().contains("8000"));
        assert!(LoadError::http(0, "x").user_message().contains("No response"));
        assert!(LoadError::Cancelled.is_cancelled());
        assert!(LoadError::timeout(1).is_timeout());
    }
}
