//! Host element port.
//!
//! A host element is a host-provided placeholder that loads a resource by
//! itself once it is given a source (an audio element, an image element).
//! The scheduler never reads bytes for these; it only watches lifecycle
//! signals.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::load::TagKind;

/// Lifecycle signal reported by a host element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostSignal {
    /// Buffering progress.
    Progress { loaded: u64, total: u64 },
    /// The element can be used.
    Ready,
    /// The element failed to load its source.
    Error(String),
    /// The element stopped receiving data.
    Stalled,
}

/// A host-side element that loads a source natively.
pub trait HostElement: Send + Sync {
    /// The tag kind this element represents.
    fn kind(&self) -> TagKind;

    /// Assign a source and start loading.
    ///
    /// Lifecycle signals arrive on the returned receiver. Dropping the sender
    /// side without a terminal signal is treated as an error.
    fn assign_source(&self, src: &str) -> mpsc::UnboundedReceiver<HostSignal>;

    /// Abort the current load and detach the source.
    fn release(&self);
}

/// Creates host elements for items that did not bring their own.
pub trait HostElementFactory: Send + Sync {
    /// Create an element of the given kind, or `None` if the host cannot.
    fn create(&self, kind: TagKind) -> Option<Arc<dyn HostElement>>;
}
