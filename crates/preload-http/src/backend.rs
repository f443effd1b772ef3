//! HTTP backend abstraction for the network strategy.
//!
//! This module provides a trait-based backend so the network loader can be
//! exercised without sockets. The production implementation uses reqwest and
//! streams the body chunk by chunk so progress can be reported.

use std::path::Path;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use url::Url;

use crate::config::HttpClientConfig;
use crate::error::{HttpError, HttpResult};

/// Progress callback: `(loaded, total)` where `total` is known only when the
/// server announced a length. Callbacks may borrow from the caller.
pub type ProgressFn<'a> = dyn Fn(u64, Option<u64>) + Send + Sync + 'a;

/// How the body should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Decode as UTF-8 text (lossy).
    Text,
    /// Keep the raw bytes.
    Binary,
}

/// A fetched response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Bytes),
}

impl Body {
    /// Number of bytes in the body.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// HTTP status (200 for local files)
    pub status: u16,
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    /// The body
    pub body: Body,
}

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for backends that fetch a resource body.
///
/// Implementations report progress through `progress` as data arrives and
/// must treat any non-success status as an error.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Fetch `url` and deliver the body as `kind`.
    async fn fetch(
        &self,
        url: &Url,
        kind: BodyKind,
        progress: &ProgressFn<'_>,
    ) -> HttpResult<FetchedBody>;
}

/// Resolve a resource source into a URL.
///
/// Absolute URLs pass through. Anything else is treated as a filesystem path,
/// relative paths resolving against the current directory.
///
/// # Errors
///
/// Returns [`HttpError::InvalidUrl`] if the source is neither a URL nor a
/// usable path.
pub fn resolve_url(src: &str) -> HttpResult<Url> {
    if let Ok(url) = Url::parse(src) {
        // Single-letter schemes are Windows drive letters, not URLs
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    let path = Path::new(src);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| HttpError::InvalidUrl(src.to_string()))?
            .join(path)
    };
    Url::from_file_path(&absolute).map_err(|()| HttpError::InvalidUrl(src.to_string()))
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production backend using reqwest for `http`/`https` and `tokio::fs` for
/// `file` URLs.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Create a backend with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (invalid header
    /// names or TLS initialization failure).
    pub fn new(config: &HttpClientConfig) -> HttpResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpError::InvalidUrl(format!("bad header name '{name}'")))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|_| HttpError::InvalidUrl(format!("bad header value for '{name}'")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_http(
        &self,
        url: &Url,
        kind: BodyKind,
        progress: &ProgressFn<'_>,
    ) -> HttpResult<FetchedBody> {
        let mut response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let total = response.content_length();

        let mut buffer = BytesMut::new();
        let mut loaded: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            loaded += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);
            progress(loaded, total);
        }

        tracing::debug!(target: "preload.http", url = %url, bytes = loaded, "fetched");

        Ok(FetchedBody {
            status: status.as_u16(),
            content_type,
            body: into_body(buffer.freeze(), kind),
        })
    }

    async fn fetch_file(
        url: &Url,
        kind: BodyKind,
        progress: &ProgressFn<'_>,
    ) -> HttpResult<FetchedBody> {
        let path = url
            .to_file_path()
            .map_err(|()| HttpError::InvalidUrl(url.to_string()))?;
        let bytes = tokio::fs::read(&path).await.map_err(|source| HttpError::File {
            path: path.display().to_string(),
            source,
        })?;

        let len = bytes.len() as u64;
        progress(len, Some(len));
        tracing::debug!(target: "preload.http", path = %path.display(), bytes = len, "read local file");

        Ok(FetchedBody {
            status: 200,
            content_type: None,
            body: into_body(Bytes::from(bytes), kind),
        })
    }
}

fn into_body(bytes: Bytes, kind: BodyKind) -> Body {
    match kind {
        BodyKind::Binary => Body::Binary(bytes),
        BodyKind::Text => Body::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn fetch(
        &self,
        url: &Url,
        kind: BodyKind,
        progress: &ProgressFn<'_>,
    ) -> HttpResult<FetchedBody> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url, kind, progress).await,
            "file" => Self::fetch_file(url, kind, progress).await,
            other => Err(HttpError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[test]
    fn test_resolve_url_passes_absolute_urls() {
        let url = resolve_url("https://cdn.example.com/img/a.png?v=2").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/img/a.png");
    }

    #[test]
    fn test_resolve_url_turns_relative_paths_into_file_urls() {
        let url = resolve_url("assets/data.json").unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/assets/data.json"));
    }

    #[tokio::test]
    async fn test_reads_local_file_as_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"a\":1}}").unwrap();

        let backend = ReqwestBackend::new(&HttpClientConfig::default()).unwrap();
        let url = Url::from_file_path(file.path()).unwrap();
        let seen = Mutex::new(Vec::new());
        let progress = |loaded: u64, total: Option<u64>| seen.lock().unwrap().push((loaded, total));

        let fetched = backend.fetch(&url, BodyKind::Text, &progress).await.unwrap();

        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body, Body::Text("{\"a\":1}".to_string()));
        assert_eq!(seen.lock().unwrap().as_slice(), &[(7, Some(7))]);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.bin")).unwrap();
        let backend = ReqwestBackend::new(&HttpClientConfig::default()).unwrap();

        let err = backend
            .fetch(&url, BodyKind::Binary, &|_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::File { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let backend = ReqwestBackend::new(&HttpClientConfig::default()).unwrap();
        let url = Url::parse("ftp://example.com/a.txt").unwrap();
        let err = backend
            .fetch(&url, BodyKind::Text, &|_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedScheme { .. }));
    }
}
