//! Backend error types.
//!
//! These errors are internal to `preload-http` and are mapped to
//! [`LoadError`] at the boundary.

use preload_core::LoadError;
use thiserror::Error;

/// Result type alias for backend operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised while fetching a body.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Network or HTTP client error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local file could not be read.
    #[error("failed to read {path}: {source}")]
    File {
        /// The file path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The URL uses a scheme the backend cannot serve.
    #[error("unsupported URL scheme '{scheme}'")]
    UnsupportedScheme {
        /// The rejected scheme
        scheme: String,
    },

    /// The source could not be turned into a URL.
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

impl From<HttpError> for LoadError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status, url } => Self::http(status, url),
            HttpError::Network(e) => match e.status() {
                Some(status) => Self::http(status.as_u16(), e.url().map_or_else(String::new, ToString::to_string)),
                None => Self::network(e.to_string()),
            },
            HttpError::File { path, source } => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    Self::http(404, path)
                } else {
                    Self::network(format!("{path}: {source}"))
                }
            }
            HttpError::UnsupportedScheme { .. } | HttpError::InvalidUrl(_) => {
                Self::network(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_http_error() {
        let err = HttpError::Status {
            status: 404,
            url: "https://example.com/a.png".to_string(),
        };
        assert_eq!(
            LoadError::from(err),
            LoadError::http(404, "https://example.com/a.png")
        );
    }

    #[test]
    fn test_missing_file_maps_to_404() {
        let err = HttpError::File {
            path: "/nope.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(matches!(LoadError::from(err), LoadError::Http { status: 404, .. }));
    }

    #[test]
    fn test_unsupported_scheme_is_network_error() {
        let err = HttpError::UnsupportedScheme {
            scheme: "ftp".to_string(),
        };
        let mapped = LoadError::from(err);
        assert!(matches!(mapped, LoadError::Network { .. }));
        assert!(mapped.to_string().contains("ftp"));
    }
}
