//! Queue item types (internal implementation).
//!
//! These types are used by the queue state machine and the manager. They
//! never leave the crate; observers see [`LoadEvent`]s and snapshots.

use std::sync::Arc;

use preload_core::{LoadEvent, LoadItem};

use super::ledger::SlotId;
use crate::transport::Strategy;

/// Lease ID for tracking active loads.
///
/// Used to drop stale progress and finish reports when a load is cancelled
/// or replaced while its task is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(u64);

impl LeaseId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lease#{}", self.0)
    }
}

/// A load waiting for a free connection.
#[derive(Clone, Debug)]
pub struct PendingLoad {
    pub item: Arc<LoadItem>,
    pub strategy: Strategy,
    /// Ledger slot if the item surfaces in enqueue order.
    pub slot: Option<SlotId>,
}

/// A dispatched load.
#[derive(Clone, Debug)]
pub struct ActiveLoad {
    pub lease: LeaseId,
    pub item: Arc<LoadItem>,
    pub strategy: Strategy,
    pub slot: Option<SlotId>,
    /// Last reported fraction, clamped to `[0, 1]` and never decreasing.
    pub fraction: f64,
}

impl ActiveLoad {
    pub(crate) fn is_host_script(&self) -> bool {
        self.strategy == Strategy::HostElement && self.item.resource_type.is_script()
    }
}

/// Work handed from the state machine to the manager.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub lease: LeaseId,
    pub item: Arc<LoadItem>,
    pub strategy: Strategy,
}

/// Side effects produced by queue commands.
///
/// The state machine performs no I/O; the manager applies these in order
/// while it still holds the state lock.
#[derive(Clone, Debug)]
pub enum QueueEffect {
    /// Deliver an event to observers.
    Emit(LoadEvent),
    /// Start a loader for this lease.
    Start(Dispatch),
    /// Cancel the loader holding this lease.
    Cancel(LeaseId),
    /// Everything enqueued has finished.
    Drained {
        /// Whether a chained successor may start.
        start_next: bool,
    },
}
