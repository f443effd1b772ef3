//! Shared fixtures for queue integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use preload_core::{ChannelEmitter, HostElement, HostSignal, LoadEvent, LoadQueueConfig, TagKind};
use preload_http::testing::FakeBackend;
use preload_queue::{LoadQueue, LoadQueueDeps, build_load_queue};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const CDN: &str = "https://cdn.test/";

// 1x1 transparent PNG
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0B, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x60,
    0x00, 0x02, 0x00, 0x00, 0x05, 0x00, 0x01, 0x7A, 0x5E, 0xAB, 0x3F, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Config rooted at the fake CDN.
pub fn config(max_connections: u32) -> LoadQueueConfig {
    LoadQueueConfig::new()
        .with_max_connections(max_connections)
        .with_base_path(Some(CDN.to_string()))
}

/// Build a queue over a fake backend with a channel emitter.
pub fn queue_with(
    backend: Arc<FakeBackend>,
    config: LoadQueueConfig,
) -> (LoadQueue, mpsc::UnboundedReceiver<LoadEvent>) {
    let (emitter, rx) = ChannelEmitter::new();
    let queue = build_load_queue(LoadQueueDeps {
        http_backend: backend,
        host_factory: None,
        event_emitter: Arc::new(emitter),
        config,
    })
    .expect("valid config");
    (queue, rx)
}

/// Receive events up to and including the next `Complete`.
pub async fn until_complete(rx: &mut mpsc::UnboundedReceiver<LoadEvent>) -> Vec<LoadEvent> {
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(60), async {
        while let Some(event) = rx.recv().await {
            let done = matches!(event, LoadEvent::Complete);
            events.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .expect("queue did not complete");
    events
}

/// Ids of `FileLoaded` events, in emission order.
pub fn loaded_ids(events: &[LoadEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            LoadEvent::FileLoaded { item, .. } => Some(item.id.clone()),
            _ => None,
        })
        .collect()
}

pub fn count(events: &[LoadEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}

pub fn progress_values(events: &[LoadEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            LoadEvent::Progress { fraction } => Some(*fraction),
            _ => None,
        })
        .collect()
}

/// Host element that replays a fixed list of signals.
///
/// Signal channels stay open after the replay, so an element with no
/// signals never settles on its own.
pub struct ScriptedElement {
    kind: TagKind,
    signals: Vec<HostSignal>,
    delay: Option<Duration>,
    assigned: Mutex<Vec<(String, Instant)>>,
    open: Mutex<Vec<mpsc::UnboundedSender<HostSignal>>>,
    released: AtomicUsize,
}

impl ScriptedElement {
    pub fn new(kind: TagKind, signals: Vec<HostSignal>) -> Arc<Self> {
        Self::build(kind, signals, None)
    }

    /// Replays the signals only after `delay` has elapsed.
    pub fn delayed(kind: TagKind, signals: Vec<HostSignal>, delay: Duration) -> Arc<Self> {
        Self::build(kind, signals, Some(delay))
    }

    fn build(kind: TagKind, signals: Vec<HostSignal>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            signals,
            delay,
            assigned: Mutex::new(Vec::new()),
            open: Mutex::new(Vec::new()),
            released: AtomicUsize::new(0),
        })
    }

    pub fn assigned(&self) -> Vec<String> {
        self.assigned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(src, _)| src.clone())
            .collect()
    }

    /// When the first source was assigned.
    pub fn assigned_at(&self) -> Option<Instant> {
        self.assigned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .map(|(_, at)| *at)
    }

    pub fn releases(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl HostElement for ScriptedElement {
    fn kind(&self) -> TagKind {
        self.kind
    }

    fn assign_source(&self, src: &str) -> mpsc::UnboundedReceiver<HostSignal> {
        self.assigned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((src.to_string(), Instant::now()));
        let (tx, rx) = mpsc::unbounded_channel();
        let signals = self.signals.clone();
        match self.delay {
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for signal in signals {
                        let _ = tx.send(signal);
                    }
                });
            }
            None => {
                for signal in signals {
                    let _ = tx.send(signal);
                }
                self.open
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(tx);
            }
        }
        rx
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
