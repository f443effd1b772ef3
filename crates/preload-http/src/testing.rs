//! Fake backend for tests.
//!
//! Enabled inside this crate's tests and, for other crates, through the
//! `test-utils` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::backend::{Body, BodyKind, FetchedBody, HttpBackend, ProgressFn};
use crate::error::{HttpError, HttpResult};

/// Canned response for the fake backend.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: Bytes,
    pub content_type: Option<String>,
    /// Time to wait before answering
    pub delay: Duration,
    /// Number of progress reports spread over `delay`
    pub chunks: u32,
}

impl CannedResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: None,
            delay: Duration::ZERO,
            chunks: 1,
        }
    }

    /// A response with an error status and empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok(Bytes::new())
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub const fn with_chunks(mut self, chunks: u32) -> Self {
        self.chunks = if chunks == 0 { 1 } else { chunks };
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A fake backend that returns canned responses.
///
/// Responses are matched by substring against the requested URL. Requests
/// with no match answer 404.
#[derive(Debug, Default)]
pub struct FakeBackend {
    responses: Mutex<Vec<(String, CannedResponse)>>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    counts: Mutex<HashMap<String, usize>>,
}

impl FakeBackend {
    /// Create a new fake backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a canned response for URLs containing `url_contains`.
    #[must_use]
    pub fn with_response(self, url_contains: &str, response: CannedResponse) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url_contains.to_string(), response));
        self
    }

    /// Wrap in an `Arc` for sharing with a loader.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times a URL containing `pattern` was requested.
    pub fn request_count(&self, pattern: &str) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(url, _)| url.contains(pattern))
            .map(|(_, n)| *n)
            .sum()
    }

    /// Highest number of simultaneous requests observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn find_response(&self, url: &str) -> Option<CannedResponse> {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
    }

    fn record(&self, url: &str) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpBackend for FakeBackend {
    async fn fetch(
        &self,
        url: &Url,
        kind: BodyKind,
        progress: &ProgressFn<'_>,
    ) -> HttpResult<FetchedBody> {
        self.record(url.as_str());
        let _guard = InFlightGuard(&self.in_flight);

        let response = self
            .find_response(url.as_str())
            .unwrap_or_else(|| CannedResponse::status(404));

        let total = response.body.len() as u64;
        let chunks = u64::from(response.chunks.max(1));
        let step = response.delay / response.chunks.max(1);
        for n in 1..=chunks {
            if !step.is_zero() {
                tokio::time::sleep(step).await;
            }
            if response.status == 200 {
                progress(total * n / chunks, Some(total));
            }
        }

        if !(200..300).contains(&response.status) {
            return Err(HttpError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }

        let body = match kind {
            BodyKind::Binary => Body::Binary(response.body),
            BodyKind::Text => Body::Text(String::from_utf8_lossy(&response.body).into_owned()),
        };
        Ok(FetchedBody {
            status: response.status,
            content_type: response.content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_backend_returns_canned_response() {
        let backend = FakeBackend::new().with_response("a.txt", CannedResponse::ok("hello"));
        let url = Url::parse("https://example.com/a.txt").unwrap();

        let fetched = backend.fetch(&url, BodyKind::Text, &|_, _| {}).await.unwrap();

        assert_eq!(fetched.body, Body::Text("hello".to_string()));
        assert_eq!(backend.requests(), vec![url.to_string()]);
        assert_eq!(backend.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_fake_backend_unknown_url_is_404() {
        let backend = FakeBackend::new();
        let url = Url::parse("https://example.com/missing.png").unwrap();

        let err = backend
            .fetch(&url, BodyKind::Binary, &|_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 404, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fake_backend_reports_chunked_progress() {
        let backend = FakeBackend::new().with_response(
            "big.bin",
            CannedResponse::ok(vec![0u8; 100])
                .with_delay(Duration::from_millis(400))
                .with_chunks(4),
        );
        let url = Url::parse("https://example.com/big.bin").unwrap();
        let seen = Mutex::new(Vec::new());
        let progress = |loaded: u64, _total: Option<u64>| seen.lock().unwrap().push(loaded);

        backend.fetch(&url, BodyKind::Binary, &progress).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), &[25, 50, 75, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_response_waits_for_the_clock() {
        let backend = FakeBackend::new().with_response(
            "slow.txt",
            CannedResponse::ok("late").with_delay(Duration::from_millis(100)),
        );
        let url = Url::parse("https://example.com/slow.txt").unwrap();
        let quiet = |_: u64, _: Option<u64>| {};

        let mut fetch = tokio_test::task::spawn(backend.fetch(&url, BodyKind::Text, &quiet));
        tokio_test::assert_pending!(fetch.poll());
        assert_eq!(backend.requests(), vec![url.to_string()]);

        tokio::time::advance(Duration::from_millis(100)).await;
        let fetched = tokio_test::assert_ready_ok!(fetch.poll());
        assert_eq!(fetched.body, Body::Text("late".to_string()));
    }
}
