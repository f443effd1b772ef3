//! Point-in-time view of a queue.

use serde::{Deserialize, Serialize};

/// Counters describing a queue at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Items counted toward progress.
    pub total: u32,
    /// Items that completed or failed.
    pub finished: u32,
    /// Items waiting for dispatch.
    pub pending: u32,
    /// Items in flight.
    pub active: u32,
    /// Aggregate progress in `[0, 1]`.
    pub progress: f64,
    /// Whether dispatch is paused.
    pub paused: bool,
    /// Current concurrency ceiling.
    pub max_connections: u32,
}

impl QueueSnapshot {
    /// Nothing pending, nothing in flight.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.pending == 0 && self.active == 0
    }
}
