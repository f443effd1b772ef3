//! Load events - one enum for every notification the queue emits.

use std::sync::Arc;

use super::errors::LoadError;
use super::output::LoadOutput;
use super::types::LoadItem;

/// Single discriminated union for all queue notifications.
///
/// Observers receive these through
/// [`LoadEventEmitterPort`](crate::ports::LoadEventEmitterPort).
#[derive(Clone, Debug)]
pub enum LoadEvent {
    /// The first item of a run was dispatched.
    LoadStart,

    /// An item was handed to a transport.
    FileStart {
        item: Arc<LoadItem>,
    },

    /// Per-item byte progress.
    FileProgress {
        item: Arc<LoadItem>,
        loaded: u64,
        total: u64,
        /// Item progress in `[0, 1]`.
        fraction: f64,
    },

    /// An item finished and its results are available.
    FileLoaded {
        item: Arc<LoadItem>,
        output: Arc<LoadOutput>,
    },

    /// Aggregate queue progress in `[0, 1]`.
    Progress {
        fraction: f64,
    },

    /// Every enqueued item has finished.
    Complete,

    /// An item failed, or a descriptor was rejected before enqueue.
    Error {
        /// `None` for descriptors that never became items.
        item: Option<Arc<LoadItem>>,
        error: LoadError,
    },
}

impl LoadEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoadStart => "load_start",
            Self::FileStart { .. } => "file_start",
            Self::FileProgress { .. } => "file_progress",
            Self::FileLoaded { .. } => "file_loaded",
            Self::Progress { .. } => "progress",
            Self::Complete => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// The item this event concerns, if any.
    #[must_use]
    pub fn item(&self) -> Option<&Arc<LoadItem>> {
        match self {
            Self::FileStart { item }
            | Self::FileProgress { item, .. }
            | Self::FileLoaded { item, .. } => Some(item),
            Self::Error { item, .. } => item.as_ref(),
            Self::LoadStart | Self::Progress { .. } | Self::Complete => None,
        }
    }

    /// Create an error event for an item.
    #[must_use]
    pub const fn item_error(item: Arc<LoadItem>, error: LoadError) -> Self {
        Self::Error {
            item: Some(item),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::ResourceType;

    #[test]
    fn test_item_accessor() {
        let item = Arc::new(LoadItem::new("a.json", ResourceType::Json));
        let event = LoadEvent::FileStart { item: item.clone() };
        assert_eq!(event.item().unwrap().src, "a.json");
        assert_eq!(event.name(), "file_start");

        let rejected = LoadEvent::Error {
            item: None,
            error: LoadError::invalid_source(""),
        };
        assert!(rejected.item().is_none());
        assert!(LoadEvent::Complete.item().is_none());
    }
}
