//! Network strategy.

use std::sync::Arc;

use async_trait::async_trait;

use preload_core::{LoadError, LoadOutput, LoadResult};
use preload_http::{BodyKind, HttpBackend, resolve_url};

use super::decode::format_body;
use super::{LoadJob, Loader};

/// Loads items by fetching their bytes through an [`HttpBackend`].
///
/// Images and binary blobs are requested as bytes; everything else as text.
/// The fetched body is decoded by type before the load completes.
pub struct NetworkLoader<B: HttpBackend> {
    backend: Arc<B>,
}

impl<B: HttpBackend> NetworkLoader<B> {
    pub const fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

#[async_trait]
impl<B: HttpBackend + 'static> Loader for NetworkLoader<B> {
    async fn load(&self, job: LoadJob) -> LoadResult<LoadOutput> {
        let url = resolve_url(&job.item.src)?;
        let kind = if job.item.resource_type.is_binary() {
            BodyKind::Binary
        } else {
            BodyKind::Text
        };

        let report = |loaded: u64, total: Option<u64>| {
            job.report_progress(loaded, total.unwrap_or(0));
        };

        let fetched = tokio::select! {
            biased;

            () = job.cancel.cancelled() => return Err(LoadError::Cancelled),
            fetched = self.backend.fetch(&url, kind, &report) => fetched?,
        };

        tracing::debug!(
            target: "preload.queue",
            id = %job.item.id,
            status = fetched.status,
            bytes = fetched.body.len(),
            "fetched"
        );

        format_body(&job.item, fetched.body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use preload_core::{Formatted, LoadItem, ResourceType};
    use preload_http::testing::{CannedResponse, FakeBackend};
    use tokio::sync::watch;
    use tokio_util::sync::CancellationToken;

    use crate::transport::ProgressUpdate;

    fn job(src: &str, resource_type: ResourceType) -> (LoadJob, watch::Receiver<ProgressUpdate>) {
        let (tx, rx) = watch::channel(ProgressUpdate::default());
        let job = LoadJob::new(
            Arc::new(LoadItem::new(src, resource_type)),
            CancellationToken::new(),
            tx,
        );
        (job, rx)
    }

    #[tokio::test]
    async fn test_fetches_and_parses_json() {
        let backend = FakeBackend::new()
            .with_response("a.json", CannedResponse::ok(r#"{"level": 3}"#))
            .shared();
        let loader = NetworkLoader::new(backend);
        let (job, rx) = job("https://cdn.test/a.json", ResourceType::Json);

        let output = loader.load(job).await.unwrap();

        assert_eq!(output.formatted.as_json().unwrap()["level"], 3);
        assert_eq!(rx.borrow().loaded, 12);
    }

    #[tokio::test]
    async fn test_forwards_every_chunk_through_the_job() {
        let backend = FakeBackend::new()
            .with_response("big.txt", CannedResponse::ok("x".repeat(40)).with_chunks(4))
            .shared();
        let loader = NetworkLoader::new(backend);
        let (job, rx) = job("https://cdn.test/big.txt", ResourceType::Text);

        loader.load(job).await.unwrap();

        let update = *rx.borrow();
        assert_eq!((update.loaded, update.total, update.seq), (40, 40, 4));
    }

    #[tokio::test]
    async fn test_http_status_is_transport_error() {
        let backend = FakeBackend::new()
            .with_response("gone.txt", CannedResponse::status(410))
            .shared();
        let loader = NetworkLoader::new(backend);
        let (job, _rx) = job("https://cdn.test/gone.txt", ResourceType::Text);

        let err = loader.load(job).await.unwrap_err();
        assert_eq!(err, LoadError::http(410, "https://cdn.test/gone.txt"));
    }

    #[tokio::test]
    async fn test_binary_hint_for_binary_types() {
        let backend = FakeBackend::new()
            .with_response("blob.bin", CannedResponse::ok(vec![0xFF, 0xFE]))
            .shared();
        let loader = NetworkLoader::new(backend);
        let (job, _rx) = job("https://cdn.test/blob.bin", ResourceType::Binary);

        let output = loader.load(job).await.unwrap();
        assert!(matches!(output.formatted, Formatted::Binary(ref b) if b.len() == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_fetch() {
        let backend = FakeBackend::new()
            .with_response(
                "slow.txt",
                CannedResponse::ok("late").with_delay(Duration::from_secs(60)),
            )
            .shared();
        let loader = NetworkLoader::new(backend);
        let (job, _rx) = job("https://cdn.test/slow.txt", ResourceType::Text);
        let cancel = job.cancel.clone();

        let handle = tokio::spawn(async move { loader.load(job).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), Err(LoadError::Cancelled));
    }
}
