//! Load queue management.
//!
//! This module provides a pure state machine for the load queue. No I/O is
//! performed here; the manager (`LoadQueue`) owns the loaders and applies the
//! [`QueueEffect`]s each command returns.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Commands produce effects that the caller applies in order
//! - Deterministic: same inputs always produce same outputs
//!
//! # Item lifecycle
//!
//! `pending -> active -> finished`, where finished covers both loaded and
//! errored items. Removal takes an item out at any stage. An item is never
//! re-dispatched unless the whole queue is `reset`.

// Queue sizes are always well under u32::MAX in practice
#![allow(clippy::cast_possible_truncation)]

mod ledger;
mod types;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use preload_core::{LoadError, LoadEvent, LoadItem, LoadOutput, QueueSnapshot};

use crate::progress::{ProgressReporter, aggregate_progress, item_fraction};
use crate::transport::Strategy;

use ledger::{ScriptOrderLedger, Surfaced};
use types::{ActiveLoad, PendingLoad};

pub use types::{Dispatch, LeaseId, QueueEffect};

/// Static scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub max_connections: u32,
    pub maintain_script_order: bool,
    pub stop_on_error: bool,
}

/// Manages the load queue state.
///
/// This is a sync type with no internal locking. The caller (`LoadQueue`)
/// is responsible for synchronization.
#[derive(Debug)]
pub struct QueueState {
    settings: QueueSettings,
    paused: bool,
    pending: VecDeque<PendingLoad>,
    active: IndexMap<LeaseId, ActiveLoad>,
    /// Items by id and by src; last registered wins.
    registry: HashMap<String, Arc<LoadItem>>,
    /// Outputs keyed by item id.
    results: HashMap<String, Arc<LoadOutput>>,
    errors: HashMap<String, LoadError>,
    /// Every enqueued item, replayed by `reset`.
    backup: Vec<(Arc<LoadItem>, Strategy)>,
    ledger: ScriptOrderLedger,
    total: u32,
    finished: u32,
    next_lease: u64,
    /// A run spans first dispatch to drain.
    running: bool,
    errored: bool,
    reporter: ProgressReporter,
}

impl QueueState {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            settings,
            paused: false,
            pending: VecDeque::new(),
            active: IndexMap::new(),
            registry: HashMap::new(),
            results: HashMap::new(),
            errors: HashMap::new(),
            backup: Vec::new(),
            ledger: ScriptOrderLedger::new(),
            total: 0,
            finished: 0,
            next_lease: 1,
            running: false,
            errored: false,
            reporter: ProgressReporter::new(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub const fn total(&self) -> u32 {
        self.total
    }

    pub const fn finished(&self) -> u32 {
        self.finished
    }

    /// Check whether a lease is still live.
    pub fn is_active(&self, lease: LeaseId) -> bool {
        self.active.contains_key(&lease)
    }

    /// Look up an item by id or src.
    pub fn item(&self, key: &str) -> Option<&Arc<LoadItem>> {
        self.registry.get(key)
    }

    /// Output of a loaded item, by id or src.
    pub fn result(&self, key: &str) -> Option<&Arc<LoadOutput>> {
        self.item(key).and_then(|item| self.results.get(&item.id))
    }

    /// Error of a failed item, by id or src.
    pub fn error(&self, key: &str) -> Option<&LoadError> {
        self.item(key).and_then(|item| self.errors.get(&item.id))
    }

    /// Exact aggregate progress.
    pub fn progress(&self) -> f64 {
        aggregate_progress(
            self.total,
            self.finished,
            self.active.values().map(|a| a.fraction),
        )
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            total: self.total(),
            finished: self.finished(),
            pending: self.pending_len() as u32,
            active: self.active_len() as u32,
            progress: self.progress(),
            paused: self.is_paused(),
            max_connections: self.settings.max_connections,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Append an item to the pending queue.
    ///
    /// Registers the item under its id and src and reserves a ledger slot
    /// if it must surface in order. Does not dispatch.
    pub fn enqueue(&mut self, item: Arc<LoadItem>, strategy: Strategy) {
        self.backup.push((Arc::clone(&item), strategy));
        self.push_pending(item, strategy);
    }

    /// Clear the pause flag and fill free connections.
    pub fn start(&mut self) -> Vec<QueueEffect> {
        self.paused = false;
        let mut effects = Vec::new();
        self.dispatch(&mut effects);
        effects
    }

    pub fn set_paused(&mut self, paused: bool) -> Vec<QueueEffect> {
        if paused {
            self.paused = true;
            Vec::new()
        } else {
            self.start()
        }
    }

    /// Change the concurrency ceiling and fill any new capacity.
    ///
    /// Loads already active above a lowered ceiling keep running.
    pub fn set_max_connections(&mut self, max: u32) -> Vec<QueueEffect> {
        self.settings.max_connections = max.max(1);
        let mut effects = Vec::new();
        self.dispatch(&mut effects);
        effects
    }

    /// Record progress for an active load. Stale leases are ignored.
    pub fn progress_update(&mut self, lease: LeaseId, loaded: u64, total: u64) -> Vec<QueueEffect> {
        let Some(active) = self.active.get_mut(&lease) else {
            return Vec::new();
        };

        let fraction = item_fraction(loaded, total).max(active.fraction);
        active.fraction = fraction;
        let item = Arc::clone(&active.item);

        let mut effects = vec![QueueEffect::Emit(LoadEvent::FileProgress {
            item,
            loaded,
            total,
            fraction,
        })];
        self.push_progress(&mut effects);
        effects
    }

    /// Record a successful load. Stale leases are ignored.
    pub fn complete(&mut self, lease: LeaseId, output: LoadOutput) -> Vec<QueueEffect> {
        let Some(active) = self.active.shift_remove(&lease) else {
            return Vec::new();
        };

        let output = Arc::new(output);
        self.results
            .insert(active.item.id.clone(), Arc::clone(&output));
        self.errors.remove(&active.item.id);
        self.finished += 1;

        let mut effects = Vec::new();
        match active.slot {
            Some(slot) => {
                let surfaced = self.ledger.fill(slot, active.item, output);
                Self::push_surfaced(&mut effects, surfaced);
            }
            None => effects.push(QueueEffect::Emit(LoadEvent::FileLoaded {
                item: active.item,
                output,
            })),
        }

        self.after_finish(&mut effects);
        effects
    }

    /// Record a failed load. Stale leases are ignored.
    ///
    /// The item counts as finished. With `stop_on_error` the queue pauses;
    /// loads already active still finish.
    pub fn fail(&mut self, lease: LeaseId, error: LoadError) -> Vec<QueueEffect> {
        let Some(active) = self.active.shift_remove(&lease) else {
            return Vec::new();
        };

        self.errors.insert(active.item.id.clone(), error.clone());
        self.finished += 1;
        self.errored = true;

        let mut effects = vec![QueueEffect::Emit(LoadEvent::item_error(
            Arc::clone(&active.item),
            error,
        ))];
        if let Some(slot) = active.slot {
            let surfaced = self.ledger.fail(slot);
            Self::push_surfaced(&mut effects, surfaced);
        }
        if self.settings.stop_on_error {
            self.paused = true;
        }

        self.after_finish(&mut effects);
        effects
    }

    /// Remove items matching any key (id or src) from every stage.
    ///
    /// Active loads are cancelled, pending loads dropped, and results and
    /// registry entries disposed. Unfinished items leave the total so the
    /// queue can still drain.
    pub fn remove(&mut self, keys: &[&str]) -> Vec<QueueEffect> {
        let matches = |item: &LoadItem| keys.iter().any(|key| item.matches(key));
        let mut effects = Vec::new();
        // Finished but still held by the ledger
        let mut surfaced = self.ledger.discard(&matches);
        let mut unfinished: u32 = 0;

        let leases: Vec<LeaseId> = self
            .active
            .values()
            .filter(|a| matches(&a.item))
            .map(|a| a.lease)
            .collect();
        for lease in leases {
            if let Some(active) = self.active.shift_remove(&lease) {
                effects.push(QueueEffect::Cancel(lease));
                unfinished += 1;
                if let Some(slot) = active.slot {
                    surfaced.extend(self.ledger.fail(slot));
                }
            }
        }

        let (dropped, kept): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| matches(&p.item));
        self.pending = kept;
        for pending in dropped {
            unfinished += 1;
            if let Some(slot) = pending.slot {
                surfaced.extend(self.ledger.fail(slot));
            }
        }

        let removed_ids: HashSet<String> = self
            .backup
            .iter()
            .filter(|(item, _)| matches(item))
            .map(|(item, _)| item.id.clone())
            .collect();
        self.backup.retain(|(item, _)| !matches(item));
        self.registry.retain(|_, item| !matches(item));
        self.results.retain(|id, _| !removed_ids.contains(id));
        self.errors.retain(|id, _| !removed_ids.contains(id));

        self.total = self.total.saturating_sub(unfinished);
        Self::push_surfaced(&mut effects, surfaced);

        self.after_finish(&mut effects);
        effects
    }

    /// Cancel active loads and drop pending ones. Results are kept.
    pub fn close(&mut self) -> Vec<QueueEffect> {
        let mut effects = Vec::new();
        let mut surfaced = Vec::new();
        let dropped = (self.active.len() + self.pending.len()) as u32;

        for (lease, active) in std::mem::take(&mut self.active) {
            effects.push(QueueEffect::Cancel(lease));
            if let Some(slot) = active.slot {
                surfaced.extend(self.ledger.fail(slot));
            }
        }
        for pending in std::mem::take(&mut self.pending) {
            if let Some(slot) = pending.slot {
                surfaced.extend(self.ledger.fail(slot));
            }
        }
        Self::push_surfaced(&mut effects, surfaced);

        self.total = self.total.saturating_sub(dropped);
        self.running = false;
        effects
    }

    /// Close and return to an empty queue.
    pub fn remove_all(&mut self) -> Vec<QueueEffect> {
        let effects = self.cancel_active();
        self.pending.clear();
        self.registry.clear();
        self.results.clear();
        self.errors.clear();
        self.backup.clear();
        self.ledger.clear();
        self.total = 0;
        self.finished = 0;
        self.running = false;
        self.errored = false;
        self.paused = false;
        self.reporter.reset();
        effects
    }

    /// Cancel everything and re-enqueue every known item, not started.
    pub fn reset(&mut self) -> Vec<QueueEffect> {
        let effects = self.cancel_active();
        self.pending.clear();
        self.results.clear();
        self.errors.clear();
        self.ledger.clear();
        self.total = 0;
        self.finished = 0;
        self.running = false;
        self.errored = false;
        self.reporter.reset();

        for (item, strategy) in self.backup.clone() {
            self.push_pending(item, strategy);
        }
        effects
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn push_pending(&mut self, item: Arc<LoadItem>, strategy: Strategy) {
        self.registry.insert(item.src.clone(), Arc::clone(&item));
        self.registry.insert(item.id.clone(), Arc::clone(&item));

        let ordered = item.maintain_order
            || (self.settings.maintain_script_order && item.resource_type.is_script());
        let slot = ordered.then(|| self.ledger.reserve());

        self.pending.push_back(PendingLoad {
            item,
            strategy,
            slot,
        });
        self.total += 1;
    }

    fn cancel_active(&mut self) -> Vec<QueueEffect> {
        std::mem::take(&mut self.active)
            .into_keys()
            .map(QueueEffect::Cancel)
            .collect()
    }

    /// Host-element scripts load one at a time when order is maintained.
    fn is_eligible(&self, pending: &PendingLoad) -> bool {
        let host_script =
            pending.strategy == Strategy::HostElement && pending.item.resource_type.is_script();
        !(self.settings.maintain_script_order
            && host_script
            && self.active.values().any(ActiveLoad::is_host_script))
    }

    fn dispatch(&mut self, effects: &mut Vec<QueueEffect>) {
        if self.paused {
            return;
        }

        while (self.active.len() as u32) < self.settings.max_connections {
            let Some(index) = self.pending.iter().position(|p| self.is_eligible(p)) else {
                break;
            };
            let Some(next) = self.pending.remove(index) else {
                break;
            };

            if !self.running {
                self.running = true;
                self.errored = false;
                self.reporter.reset();
                effects.push(QueueEffect::Emit(LoadEvent::LoadStart));
            }

            let lease = LeaseId::new(self.next_lease);
            self.next_lease += 1;

            self.active.insert(
                lease,
                ActiveLoad {
                    lease,
                    item: Arc::clone(&next.item),
                    strategy: next.strategy,
                    slot: next.slot,
                    fraction: 0.0,
                },
            );
            effects.push(QueueEffect::Emit(LoadEvent::FileStart {
                item: Arc::clone(&next.item),
            }));
            effects.push(QueueEffect::Start(Dispatch {
                lease,
                item: next.item,
                strategy: next.strategy,
            }));
        }
    }

    fn push_progress(&mut self, effects: &mut Vec<QueueEffect>) {
        if let Some(fraction) = self.reporter.observe(self.progress()) {
            effects.push(QueueEffect::Emit(LoadEvent::Progress { fraction }));
        }
    }

    fn push_surfaced(effects: &mut Vec<QueueEffect>, surfaced: Vec<Surfaced>) {
        effects.extend(
            surfaced
                .into_iter()
                .map(|(item, output)| QueueEffect::Emit(LoadEvent::FileLoaded { item, output })),
        );
    }

    fn after_finish(&mut self, effects: &mut Vec<QueueEffect>) {
        self.push_progress(effects);
        self.dispatch(effects);

        if self.running && self.pending.is_empty() && self.active.is_empty() {
            self.running = false;
            effects.push(QueueEffect::Emit(LoadEvent::Complete));
            effects.push(QueueEffect::Drained {
                start_next: !(self.settings.stop_on_error && self.errored),
            });
        }
    }
}
