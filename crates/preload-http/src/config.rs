//! Public configuration for the HTTP backend.

use std::time::Duration;

/// Configuration for [`ReqwestBackend`](crate::ReqwestBackend).
///
/// # Example
///
/// ```
/// use preload_http::HttpClientConfig;
/// use std::time::Duration;
///
/// let config = HttpClientConfig::new()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_header("Accept-Language", "en");
/// ```
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Connection establishment timeout
    pub(crate) connect_timeout: Duration,
    /// Extra headers sent with every request
    pub(crate) headers: Vec<(String, String)>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("preload/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            headers: Vec::new(),
        }
    }
}

impl HttpClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout.
    ///
    /// The overall per-item timeout is enforced by the queue, not here.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        let config = HttpClientConfig::default();
        assert!(config.user_agent.starts_with("preload/"));
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_with_header_accumulates() {
        let config = HttpClientConfig::new()
            .with_header("A", "1")
            .with_header("B", "2");
        assert_eq!(config.headers.len(), 2);
    }
}
