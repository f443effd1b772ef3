//! Host-element strategy.

use std::sync::Arc;

use async_trait::async_trait;

use preload_core::{
    ElementHandle, Formatted, HostElement, HostElementFactory, HostSignal, LoadError, LoadOutput,
    LoadResult, RawContent, TagKind,
};

use super::{LoadJob, Loader};

/// Loads items by assigning their source to a host element.
///
/// The element is the item's own placeholder element when it carries one,
/// otherwise one created by the factory. The load completes on
/// [`HostSignal::Ready`]; `Stalled` is only logged and the queue timeout
/// decides. An element that never becomes ready is released, including when
/// the load future is dropped mid-flight after a timeout.
#[derive(Default)]
pub struct HostElementLoader {
    factory: Option<Arc<dyn HostElementFactory>>,
}

impl HostElementLoader {
    /// A loader that only uses elements attached to placeholders.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(factory: Arc<dyn HostElementFactory>) -> Self {
        Self {
            factory: Some(factory),
        }
    }

    fn element_for(&self, job: &LoadJob) -> LoadResult<Arc<dyn HostElement>> {
        if let Some(element) = job.item.placeholder.as_ref().and_then(|p| p.element()) {
            return Ok(Arc::clone(element));
        }

        let kind = job
            .item
            .placeholder
            .as_ref()
            .map_or_else(|| TagKind::for_type(job.item.resource_type), |p| p.kind());
        self.factory
            .as_ref()
            .and_then(|factory| factory.create(kind))
            .ok_or_else(|| LoadError::no_host_element(kind.as_str()))
    }
}

/// Releases the element unless it was handed off as the load output.
struct ReleaseGuard {
    element: Arc<dyn HostElement>,
    armed: bool,
}

impl ReleaseGuard {
    fn new(element: Arc<dyn HostElement>) -> Self {
        Self {
            element,
            armed: true,
        }
    }

    fn disarm(mut self) -> Arc<dyn HostElement> {
        self.armed = false;
        Arc::clone(&self.element)
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if self.armed {
            self.element.release();
        }
    }
}

#[async_trait]
impl Loader for HostElementLoader {
    async fn load(&self, job: LoadJob) -> LoadResult<LoadOutput> {
        let element = self.element_for(&job)?;
        let mut signals = element.assign_source(&job.item.src);
        let kind = element.kind();
        let guard = ReleaseGuard::new(element);

        loop {
            tokio::select! {
                biased;

                () = job.cancel.cancelled() => return Err(LoadError::Cancelled),

                signal = signals.recv() => match signal {
                    Some(HostSignal::Progress { loaded, total }) => {
                        job.report_progress(loaded, total);
                    }
                    Some(HostSignal::Ready) => break,
                    Some(HostSignal::Error(message)) => return Err(LoadError::element(message)),
                    Some(HostSignal::Stalled) => {
                        tracing::debug!(target: "preload.queue", id = %job.item.id, "host element stalled");
                    }
                    None => {
                        return Err(LoadError::element(format!(
                            "{kind} element closed before it was ready"
                        )));
                    }
                },
            }
        }

        let handle = ElementHandle::new(guard.disarm(), job.item.src.clone());
        Ok(LoadOutput::new(RawContent::Empty, Formatted::Element(handle)))
    }
}
