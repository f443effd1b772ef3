//! Host elements for a terminal.
//!
//! A terminal has no audio or image elements, so the CLI stands one in that
//! downloads its source through the HTTP backend and reports the same
//! lifecycle signals a browser element would.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use preload_core::{HostElement, HostElementFactory, HostSignal, TagKind};
use preload_http::{BodyKind, HttpBackend, resolve_url};

/// Creates [`FetchElement`]s over a shared backend.
pub struct FetchElementFactory<B> {
    backend: Arc<B>,
}

impl<B: HttpBackend + 'static> FetchElementFactory<B> {
    pub const fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

impl<B: HttpBackend + 'static> HostElementFactory for FetchElementFactory<B> {
    fn create(&self, kind: TagKind) -> Option<Arc<dyn HostElement>> {
        Some(Arc::new(FetchElement {
            kind,
            backend: Arc::clone(&self.backend),
            task: Mutex::new(None),
        }))
    }
}

/// An element that "buffers" its source by downloading it.
pub struct FetchElement<B> {
    kind: TagKind,
    backend: Arc<B>,
    task: Mutex<Option<AbortHandle>>,
}

impl<B: HttpBackend + 'static> HostElement for FetchElement<B> {
    fn kind(&self) -> TagKind {
        self.kind
    }

    fn assign_source(&self, src: &str) -> mpsc::UnboundedReceiver<HostSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = match resolve_url(src) {
            Ok(url) => url,
            Err(e) => {
                let _ = tx.send(HostSignal::Error(e.to_string()));
                return rx;
            }
        };

        let backend = Arc::clone(&self.backend);
        let handle = tokio::spawn(async move {
            let progress_tx = tx.clone();
            let progress = move |loaded: u64, total: Option<u64>| {
                let _ = progress_tx.send(HostSignal::Progress {
                    loaded,
                    total: total.unwrap_or(loaded),
                });
            };
            let signal = match backend.fetch(&url, BodyKind::Binary, &progress).await {
                Ok(_) => HostSignal::Ready,
                Err(e) => HostSignal::Error(e.to_string()),
            };
            let _ = tx.send(signal);
        });

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
        rx
    }

    fn release(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::debug!(target: "preload.cli", kind = %self.kind, "releasing element");
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use preload_http::testing::{CannedResponse, FakeBackend};

    use super::*;

    async fn collect(mut rx: mpsc::UnboundedReceiver<HostSignal>) -> Vec<HostSignal> {
        let mut signals = Vec::new();
        while let Some(signal) = rx.recv().await {
            signals.push(signal);
        }
        signals
    }

    #[tokio::test]
    async fn test_element_reports_progress_then_ready() {
        let backend = FakeBackend::new()
            .with_response("beep.mp3", CannedResponse::ok(vec![0_u8; 64]).with_chunks(2))
            .shared();
        let factory = FetchElementFactory::new(Arc::clone(&backend));
        let element = factory.create(TagKind::Audio).expect("element");
        assert_eq!(element.kind(), TagKind::Audio);

        let signals = collect(element.assign_source("https://cdn.test/beep.mp3")).await;
        assert_eq!(
            signals,
            [
                HostSignal::Progress { loaded: 32, total: 64 },
                HostSignal::Progress { loaded: 64, total: 64 },
                HostSignal::Ready,
            ]
        );
        assert_eq!(backend.request_count("beep.mp3"), 1);
    }

    #[tokio::test]
    async fn test_element_reports_http_failure() {
        let backend = FakeBackend::new().shared();
        let element = FetchElementFactory::new(backend)
            .create(TagKind::Audio)
            .expect("element");

        let signals = collect(element.assign_source("https://cdn.test/missing.mp3")).await;
        assert!(matches!(signals.as_slice(), [HostSignal::Error(_)]));
    }

    #[tokio::test]
    async fn test_release_stops_the_download() {
        let backend = FakeBackend::new()
            .with_response(
                "slow.mp3",
                CannedResponse::ok(vec![0_u8; 8]).with_delay(std::time::Duration::from_secs(30)),
            )
            .shared();
        let element = FetchElementFactory::new(backend)
            .create(TagKind::Audio)
            .expect("element");

        let mut rx = element.assign_source("https://cdn.test/slow.mp3");
        {
            let mut next = tokio_test::task::spawn(rx.recv());
            tokio_test::assert_pending!(next.poll());
        }
        element.release();
        let signals = collect(rx).await;
        assert!(!signals.contains(&HostSignal::Ready));
    }
}
