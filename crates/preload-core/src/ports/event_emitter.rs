//! Load event emitter port.
//!
//! This port abstracts event delivery, allowing the queue to emit
//! notifications without coupling to how observers consume them.

use tokio::sync::mpsc;

use crate::load::LoadEvent;

/// Port for emitting load events.
///
/// The queue calls `emit` while it holds its state lock, so events arrive in
/// the exact order the queue produced them.
///
/// # Example
///
/// ```ignore
/// fn on_loaded(&self, emitter: &dyn LoadEventEmitterPort) {
///     emitter.emit(LoadEvent::FileLoaded { item, output });
/// }
/// ```
pub trait LoadEventEmitterPort: Send + Sync {
    /// Emit a load event.
    ///
    /// Implementations should hand the event off or buffer it.
    /// This method must not block and must not call back into the queue.
    fn emit(&self, event: LoadEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn LoadEventEmitterPort>;
}

/// A no-op emitter for tests and contexts that poll the queue instead.
#[derive(Debug, Clone, Default)]
pub struct NoopLoadEmitter;

impl NoopLoadEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LoadEventEmitterPort for NoopLoadEmitter {
    fn emit(&self, _event: LoadEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn LoadEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Emitter that forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<LoadEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver observers read from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LoadEventEmitterPort for ChannelEmitter {
    fn emit(&self, event: LoadEvent) {
        // A dropped receiver means nobody is listening anymore
        let _ = self.tx.send(event);
    }

    fn clone_box(&self) -> Box<dyn LoadEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Emitter that logs every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingEmitter;

impl TracingEmitter {
    /// Create a new tracing emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LoadEventEmitterPort for TracingEmitter {
    fn emit(&self, event: LoadEvent) {
        match &event {
            LoadEvent::FileProgress {
                item,
                loaded,
                total,
                ..
            } => {
                tracing::trace!(target: "preload.events", id = %item.id, loaded, total, "file_progress");
            }
            LoadEvent::Progress { fraction } => {
                tracing::debug!(target: "preload.events", fraction, "progress");
            }
            LoadEvent::Error { item, error } => {
                tracing::warn!(
                    target: "preload.events",
                    id = item.as_ref().map(|i| i.id.as_str()),
                    error = %error,
                    "error"
                );
            }
            other => {
                tracing::info!(
                    target: "preload.events",
                    id = other.item().map(|i| i.id.as_str()),
                    event = other.name(),
                    "load event"
                );
            }
        }
    }

    fn clone_box(&self) -> Box<dyn LoadEventEmitterPort> {
        Box::new(self.clone())
    }
}
