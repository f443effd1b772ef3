//! Transport strategies.
//!
//! Every strategy implements [`Loader`]: it receives a [`LoadJob`] and
//! resolves to the item's [`LoadOutput`]. Loaders write progress into the
//! job's watch channel and never touch queue state; the manager bridges
//! progress to events and enforces the timeout.
//!
//! - [`NetworkLoader`] fetches bytes through an [`HttpBackend`](preload_http::HttpBackend)
//!   and decodes them by type.
//! - [`HostElementLoader`] hands the source to a host element and watches
//!   its lifecycle signals.

mod decode;
mod host;
mod network;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use preload_core::{LoadItem, LoadOutput, LoadResult, ResourceType};

pub use decode::{format_body, parse_xml, probe_image};
pub use host::HostElementLoader;
pub use network::NetworkLoader;

/// Which loader family handles an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Network,
    HostElement,
}

impl Strategy {
    /// Pick the strategy for an item.
    ///
    /// Types with a single sensible transport always use it. Images,
    /// stylesheets, scripts and SVG follow the item's `prefer_network`
    /// override, falling back to the queue-wide preference.
    pub fn for_item(item: &LoadItem, prefer_network: bool) -> Self {
        match item.resource_type {
            ResourceType::Sound => Self::HostElement,
            ResourceType::Image | ResourceType::Css | ResourceType::Javascript | ResourceType::Svg => {
                if item.prefer_network.unwrap_or(prefer_network) {
                    Self::Network
                } else {
                    Self::HostElement
                }
            }
            ResourceType::Text
            | ResourceType::Json
            | ResourceType::Xml
            | ResourceType::Binary
            | ResourceType::Manifest => Self::Network,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HostElement => "host",
        }
    }
}

/// Progress update sent through the watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Bytes (or host units) loaded so far.
    pub loaded: u64,
    /// Expected total, `0` when unknown.
    pub total: u64,
    /// Monotonically increasing sequence number for change detection.
    pub seq: u64,
}

/// A load to be executed by a loader.
///
/// This is a value type containing everything a loader needs, with no
/// references back to the queue.
#[derive(Debug)]
pub struct LoadJob {
    pub item: Arc<LoadItem>,
    /// Cancelled when the item is removed, the queue closes, or the
    /// timeout expires.
    pub cancel: CancellationToken,
    progress_tx: watch::Sender<ProgressUpdate>,
}

impl LoadJob {
    pub const fn new(
        item: Arc<LoadItem>,
        cancel: CancellationToken,
        progress_tx: watch::Sender<ProgressUpdate>,
    ) -> Self {
        Self {
            item,
            cancel,
            progress_tx,
        }
    }

    /// Publish progress for this job.
    pub fn report_progress(&self, loaded: u64, total: u64) {
        self.progress_tx.send_modify(|update| {
            update.loaded = loaded;
            update.total = total;
            update.seq += 1;
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A transport strategy.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load the job's item.
    ///
    /// Implementations should return [`LoadError::Cancelled`](preload_core::LoadError::Cancelled)
    /// promptly once `job.cancel` fires.
    async fn load(&self, job: LoadJob) -> LoadResult<LoadOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with(resource_type: ResourceType, prefer: Option<bool>) -> LoadItem {
        let mut item = LoadItem::new("x", resource_type);
        item.prefer_network = prefer;
        item
    }

    #[test]
    fn test_fixed_strategies() {
        for resource_type in [
            ResourceType::Text,
            ResourceType::Json,
            ResourceType::Xml,
            ResourceType::Binary,
            ResourceType::Manifest,
        ] {
            assert_eq!(
                Strategy::for_item(&item_with(resource_type, Some(false)), false),
                Strategy::Network
            );
        }
        assert_eq!(
            Strategy::for_item(&item_with(ResourceType::Sound, Some(true)), true),
            Strategy::HostElement
        );
    }

    #[test]
    fn test_flexible_types_follow_preference() {
        let image = item_with(ResourceType::Image, None);
        assert_eq!(Strategy::for_item(&image, true), Strategy::Network);
        assert_eq!(Strategy::for_item(&image, false), Strategy::HostElement);

        let script = item_with(ResourceType::Javascript, Some(false));
        assert_eq!(Strategy::for_item(&script, true), Strategy::HostElement);

        let style = item_with(ResourceType::Css, Some(true));
        assert_eq!(Strategy::for_item(&style, false), Strategy::Network);
    }

    #[test]
    fn test_report_progress_bumps_sequence() {
        let (tx, rx) = watch::channel(ProgressUpdate::default());
        let job = LoadJob::new(
            Arc::new(LoadItem::new("a.bin", ResourceType::Binary)),
            CancellationToken::new(),
            tx,
        );

        job.report_progress(10, 100);
        job.report_progress(20, 100);

        let update = *rx.borrow();
        assert_eq!(update.loaded, 20);
        assert_eq!(update.total, 100);
        assert_eq!(update.seq, 2);
    }

    #[test]
    fn test_job_cancellation_wakes_waiter() {
        let (tx, _rx) = watch::channel(ProgressUpdate::default());
        let job = LoadJob::new(
            Arc::new(LoadItem::new("a.bin", ResourceType::Binary)),
            CancellationToken::new(),
            tx,
        );

        let mut waiter = tokio_test::task::spawn(job.cancel.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        job.cancel.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
        assert!(job.is_cancelled());
    }
}
