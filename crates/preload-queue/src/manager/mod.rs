//! Load queue manager.
//!
//! This module owns the runtime side of the queue: the [`QueueState`] state
//! machine behind one lock, the loaders, the cancellation tokens of active
//! loads, and the driver tasks.
//!
//! # Architecture
//!
//! - **Manager** (`LoadQueue`): normalizes descriptors, runs commands on the
//!   state machine, applies the returned effects
//! - **Driver tasks**: one per dispatch; run a loader and report back
//! - **Loaders**: produce outputs, write only to a `watch::Sender`
//!
//! # Concurrency Model
//!
//! - Every mutation and every emitted event happens under the state lock, so
//!   observers see events in the exact order the state machine produced them
//! - Lease ids filter reports from cancelled or timed-out loads
//! - A successor queue is started only after the lock is released

mod driver;
mod manifest;
mod run;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use preload_core::{
    ConfigError, Descriptor, Formatted, HostElementFactory, LoadError, LoadEvent,
    LoadEventEmitterPort, LoadItem, LoadOutput, LoadQueueConfig, LoadResult, QueueSnapshot,
    RawContent, ResourceType,
};
use preload_http::HttpBackend;

use crate::normalizer::ItemNormalizer;
use crate::plugins::{PluginDescriptor, PluginRegistry};
use crate::queue::{LeaseId, QueueEffect, QueueSettings, QueueState};
use crate::transport::{HostElementLoader, Loader, NetworkLoader, ProgressUpdate, Strategy};

use manifest::manifest_entries;
use run::{RunOutcome, RunState};

/// Dependencies for building a [`LoadQueue`].
pub struct LoadQueueDeps<B, E>
where
    B: HttpBackend + 'static,
    E: LoadEventEmitterPort + 'static,
{
    /// Backend for the network strategy.
    pub http_backend: Arc<B>,
    /// Creates host elements for items without a placeholder element.
    pub host_factory: Option<Arc<dyn HostElementFactory>>,
    /// Port for emitting load events.
    pub event_emitter: Arc<E>,
    /// Configuration for the queue.
    pub config: LoadQueueConfig,
}

/// Build a load queue from its dependencies.
pub fn build_load_queue<B, E>(deps: LoadQueueDeps<B, E>) -> Result<LoadQueue, ConfigError>
where
    B: HttpBackend + 'static,
    E: LoadEventEmitterPort + 'static,
{
    let host = deps
        .host_factory
        .map_or_else(HostElementLoader::new, HostElementLoader::with_factory);
    LoadQueue::from_parts(
        deps.config,
        Arc::new(NetworkLoader::new(deps.http_backend)),
        Arc::new(host),
        deps.event_emitter,
    )
}

/// Outcome of [`LoadQueue::load_many`].
#[derive(Debug, Default)]
pub struct LoadBatch {
    /// Items appended to the queue, in order.
    pub enqueued: Vec<Arc<LoadItem>>,
    /// Descriptors a plugin skipped.
    pub skipped: usize,
    /// Descriptors rejected before enqueue.
    pub rejected: Vec<LoadError>,
}

/// State guarded by the queue lock.
struct Guarded {
    state: QueueState,
    tokens: HashMap<LeaseId, CancellationToken>,
    plugins: PluginRegistry,
    next: Option<LoadQueue>,
    run: Option<RunState>,
}

struct QueueInner {
    guarded: Mutex<Guarded>,
    normalizer: ItemNormalizer,
    network: Arc<dyn Loader>,
    host: Arc<dyn Loader>,
    emitter: Arc<dyn LoadEventEmitterPort>,
    config: LoadQueueConfig,
}

/// Handle to a load queue.
///
/// Cloning is cheap; every clone drives the same queue.
#[derive(Clone)]
pub struct LoadQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for LoadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadQueue")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl LoadQueue {
    /// Create a queue from explicit loaders.
    ///
    /// `network` serves [`Strategy::Network`] items and `host` serves
    /// [`Strategy::HostElement`] items.
    pub fn from_parts(
        config: LoadQueueConfig,
        network: Arc<dyn Loader>,
        host: Arc<dyn Loader>,
        emitter: Arc<dyn LoadEventEmitterPort>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let settings = QueueSettings {
            max_connections: config.max_connections,
            maintain_script_order: config.maintain_script_order,
            stop_on_error: config.stop_on_error,
        };
        let guarded = Guarded {
            state: QueueState::new(settings),
            tokens: HashMap::new(),
            plugins: PluginRegistry::new(),
            next: None,
            run: None,
        };

        Ok(Self {
            inner: Arc::new(QueueInner {
                guarded: Mutex::new(guarded),
                normalizer: ItemNormalizer::new(config.base_path.clone()),
                network,
                host,
                emitter,
                config,
            }),
        })
    }

    pub fn config(&self) -> &LoadQueueConfig {
        &self.inner.config
    }

    // =========================================================================
    // Enqueue
    // =========================================================================

    /// Normalize and append one descriptor.
    ///
    /// Returns `Ok(None)` when a plugin skipped it. A rejected descriptor is
    /// also reported as an `Error` event without an item. With `start_now`
    /// the queue is unpaused and dispatches immediately.
    pub async fn load_one(
        &self,
        descriptor: impl Into<Descriptor>,
        start_now: bool,
    ) -> LoadResult<Option<Arc<LoadItem>>> {
        let descriptor = descriptor.into();
        let (outcome, successor) = {
            let mut guarded = self.inner.guarded.lock().await;
            let outcome = self.inner.enqueue(&mut guarded, descriptor, None);
            let successor = if start_now {
                let effects = guarded.state.start();
                QueueInner::apply(&self.inner, &mut guarded, effects)
            } else {
                None
            };
            (outcome, successor)
        };
        start_successor(successor).await;
        outcome
    }

    /// Normalize and append several descriptors in order.
    pub async fn load_many<I, D>(&self, descriptors: I, start_now: bool) -> LoadBatch
    where
        I: IntoIterator<Item = D>,
        D: Into<Descriptor>,
    {
        let mut batch = LoadBatch::default();
        let successor = {
            let mut guarded = self.inner.guarded.lock().await;
            for descriptor in descriptors {
                match self.inner.enqueue(&mut guarded, descriptor.into(), None) {
                    Ok(Some(item)) => batch.enqueued.push(item),
                    Ok(None) => batch.skipped += 1,
                    Err(e) => batch.rejected.push(e),
                }
            }
            if start_now {
                let effects = guarded.state.start();
                QueueInner::apply(&self.inner, &mut guarded, effects)
            } else {
                None
            }
        };
        start_successor(successor).await;
        batch
    }

    /// Clear the pause flag and dispatch.
    pub async fn load(&self) {
        self.command(QueueState::start).await;
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up an item by id or src.
    pub async fn get_item(&self, key: &str) -> Option<Arc<LoadItem>> {
        self.inner.guarded.lock().await.state.item(key).cloned()
    }

    /// Formatted result of a loaded item, by id or src.
    pub async fn get_result(&self, key: &str) -> Option<Formatted> {
        self.get_output(key).await.map(|o| o.formatted.clone())
    }

    /// Raw result of a loaded item, by id or src.
    pub async fn get_raw_result(&self, key: &str) -> Option<RawContent> {
        self.get_output(key).await.map(|o| o.raw.clone())
    }

    /// Both results of a loaded item, by id or src.
    pub async fn get_output(&self, key: &str) -> Option<Arc<LoadOutput>> {
        self.inner.guarded.lock().await.state.result(key).cloned()
    }

    /// Error of a failed item, by id or src.
    pub async fn get_error(&self, key: &str) -> Option<LoadError> {
        self.inner.guarded.lock().await.state.error(key).cloned()
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        self.inner.guarded.lock().await.state.snapshot()
    }

    /// Aggregate progress in `[0, 1]`.
    pub async fn progress(&self) -> f64 {
        self.inner.guarded.lock().await.state.progress()
    }

    // =========================================================================
    // Control
    // =========================================================================

    pub async fn set_paused(&self, paused: bool) {
        self.command(|state| state.set_paused(paused)).await;
    }

    /// Change the concurrency ceiling; new capacity is filled immediately.
    pub async fn set_max_connections(&self, max: u32) {
        self.command(|state| state.set_max_connections(max)).await;
    }

    /// Remove items by id or src. An empty key list removes everything.
    pub async fn remove(&self, keys: &[&str]) {
        if keys.is_empty() {
            self.remove_all().await;
            return;
        }
        tracing::debug!(target: "preload.queue", ?keys, "removing items");
        self.command(|state| state.remove(keys)).await;
    }

    /// Cancel everything and return to an empty queue.
    pub async fn remove_all(&self) {
        let mut guarded = self.inner.guarded.lock().await;
        let effects = guarded.state.remove_all();
        QueueInner::apply(&self.inner, &mut guarded, effects);
        guarded.run = None;
        tracing::info!(target: "preload.queue", "queue emptied");
    }

    /// Cancel active loads and re-enqueue every known item, not started.
    pub async fn reset(&self) {
        let mut guarded = self.inner.guarded.lock().await;
        let effects = guarded.state.reset();
        QueueInner::apply(&self.inner, &mut guarded, effects);
        guarded.run = None;
        tracing::info!(
            target: "preload.queue",
            pending = guarded.state.pending_len(),
            "queue reset"
        );
    }

    /// Cancel active loads and drop pending ones. Results are kept.
    pub async fn close(&self) {
        let mut guarded = self.inner.guarded.lock().await;
        let effects = guarded.state.close();
        QueueInner::apply(&self.inner, &mut guarded, effects);
        guarded.run = None;
        tracing::info!(target: "preload.queue", "queue closed");
    }

    /// Queue to start when this one drains.
    ///
    /// The successor is not started when the run stopped on an error.
    pub async fn set_next_queue(&self, next: Self) {
        self.inner.guarded.lock().await.next = Some(next);
    }

    /// Register a plugin. Affects descriptors enqueued afterwards.
    pub async fn install_plugin(&self, plugin: PluginDescriptor) {
        tracing::debug!(target: "preload.queue", ?plugin, "installing plugin");
        self.inner.guarded.lock().await.plugins.install(plugin);
    }

    /// Run a state command and apply its effects.
    async fn command(&self, f: impl FnOnce(&mut QueueState) -> Vec<QueueEffect>) {
        let successor = {
            let mut guarded = self.inner.guarded.lock().await;
            let effects = f(&mut guarded.state);
            QueueInner::apply(&self.inner, &mut guarded, effects)
        };
        start_successor(successor).await;
    }
}

impl QueueInner {
    /// Normalize a descriptor and append the item.
    fn enqueue(
        &self,
        guarded: &mut Guarded,
        descriptor: Descriptor,
        prefix: Option<&str>,
    ) -> LoadResult<Option<Arc<LoadItem>>> {
        let item = match self
            .normalizer
            .normalize_in(descriptor, &guarded.plugins, prefix)
        {
            Ok(Some(item)) => Arc::new(item),
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(target: "preload.queue", error = %e, "descriptor rejected");
                self.emit(guarded, LoadEvent::Error {
                    item: None,
                    error: e.clone(),
                });
                return Err(e);
            }
        };

        let strategy = Strategy::for_item(&item, self.config.prefer_network);
        tracing::debug!(
            target: "preload.queue",
            id = %item.id,
            src = %item.src,
            resource_type = %item.resource_type,
            strategy = strategy.as_str(),
            "enqueued"
        );
        guarded.state.enqueue(Arc::clone(&item), strategy);
        Ok(Some(item))
    }

    /// Apply effects in order. Returns the successor queue to start, if any.
    fn apply(
        inner: &Arc<Self>,
        guarded: &mut Guarded,
        effects: Vec<QueueEffect>,
    ) -> Option<LoadQueue> {
        let mut successor = None;
        for effect in effects {
            match effect {
                QueueEffect::Emit(event) => inner.emit(guarded, event),
                QueueEffect::Start(dispatch) => {
                    let cancel = CancellationToken::new();
                    guarded.tokens.insert(dispatch.lease, cancel.clone());
                    tracing::debug!(
                        target: "preload.queue",
                        lease = %dispatch.lease,
                        id = %dispatch.item.id,
                        strategy = dispatch.strategy.as_str(),
                        "dispatching"
                    );
                    tokio::spawn(driver::drive(Arc::clone(inner), dispatch, cancel));
                }
                QueueEffect::Cancel(lease) => {
                    if let Some(token) = guarded.tokens.remove(&lease) {
                        tracing::debug!(target: "preload.queue", %lease, "cancelling load");
                        token.cancel();
                    }
                }
                QueueEffect::Drained { start_next } => {
                    Self::finish_run(guarded);
                    if start_next {
                        successor = guarded.next.clone();
                    }
                }
            }
        }
        successor
    }

    /// Deliver one event to observers.
    fn emit(&self, guarded: &mut Guarded, event: LoadEvent) {
        match &event {
            LoadEvent::LoadStart => {
                let run = RunState::new();
                tracing::info!(target: "preload.queue", run_id = %run.run_id, "queue run started");
                guarded.run = Some(run);
            }
            LoadEvent::FileLoaded { item, output } => {
                // Runs under the queue lock
                if let Some(handler) = &item.complete_handler {
                    handler.call(item, output);
                }
            }
            LoadEvent::Error {
                item: Some(item),
                error,
            } => {
                tracing::warn!(target: "preload.queue", id = %item.id, error = %error, "load failed");
            }
            _ => {}
        }
        if let Some(run) = guarded.run.as_mut() {
            run.observe(&event);
        }
        self.emitter.emit(event);
    }

    fn finish_run(guarded: &mut Guarded) {
        match guarded.run.take() {
            Some(run) => tracing::info!(
                target: "preload.queue",
                run_id = %run.run_id,
                loaded = run.count(RunOutcome::Loaded),
                failed = run.count(RunOutcome::Failed),
                failed_ids = ?run.failed_ids(),
                elapsed_ms = run.elapsed_ms(),
                "queue run complete"
            ),
            None => tracing::debug!(target: "preload.queue", "queue drained without a run"),
        }
    }

    /// Forward loader progress for a live lease.
    async fn report_progress(self: &Arc<Self>, lease: LeaseId, update: ProgressUpdate) {
        let mut guarded = self.guarded.lock().await;
        let effects = guarded
            .state
            .progress_update(lease, update.loaded, update.total);
        // Progress never finishes an item, so there is no successor here
        let _ = Self::apply(self, &mut guarded, effects);
    }

    /// Record a driver's result.
    async fn finish(
        inner: &Arc<Self>,
        lease: LeaseId,
        item: Arc<LoadItem>,
        result: LoadResult<LoadOutput>,
    ) {
        let successor = {
            let mut guarded = inner.guarded.lock().await;
            guarded.tokens.remove(&lease);

            if !guarded.state.is_active(lease) {
                tracing::debug!(target: "preload.queue", %lease, id = %item.id, "ignoring stale result");
                return;
            }

            let effects = match result {
                Ok(output) => {
                    if item.resource_type == ResourceType::Manifest {
                        inner.expand_manifest(&mut guarded, &item, &output);
                    }
                    guarded.state.complete(lease, output)
                }
                Err(error) => guarded.state.fail(lease, error),
            };
            Self::apply(inner, &mut guarded, effects)
        };
        start_successor(successor).await;
    }

    /// Enqueue the entries of a loaded manifest before it completes.
    fn expand_manifest(&self, guarded: &mut Guarded, item: &LoadItem, output: &LoadOutput) {
        let entries = manifest_entries(output);
        for error in entries.invalid {
            self.emit(guarded, LoadEvent::Error { item: None, error });
        }

        let count = entries.descriptors.len();
        for descriptor in entries.descriptors {
            // Rejections are already reported as events
            let _ = self.enqueue(guarded, descriptor, entries.path.as_deref());
        }
        tracing::debug!(target: "preload.queue", id = %item.id, entries = count, "manifest expanded");
    }
}

/// Start a successor queue.
///
/// Boxed so a chain of queues does not produce a recursive future type.
fn start_successor(next: Option<LoadQueue>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        if let Some(next) = next {
            tracing::info!(target: "preload.queue", "starting next queue");
            next.load().await;
        }
    })
}
