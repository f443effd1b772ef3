//! Aggregate progress computation.
//!
//! Finished items (loaded or errored) contribute a full unit each; the
//! fractions of active items are spread over the remaining share.

// Item counts stay far below 2^52
#![allow(clippy::cast_precision_loss)]

/// Compute the aggregate progress of a queue.
///
/// `progress = C/N + (sum / R) * (R/N)` with `N` total items, `C` finished
/// and `R = N - C`. Returns exactly `1.0` once every item has finished and
/// `0.0` for an empty queue.
pub fn aggregate_progress(total: u32, finished: u32, active_fractions: impl Iterator<Item = f64>) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let finished = finished.min(total);
    let remaining = total - finished;
    if remaining == 0 {
        return 1.0;
    }

    let n = f64::from(total);
    let r = f64::from(remaining);
    let sum: f64 = active_fractions.map(|f| f.clamp(0.0, 1.0)).sum();

    let value = f64::from(finished) / n + (sum / r) * (r / n);
    value.clamp(0.0, 1.0)
}

/// Fraction of a single item; unknown totals count as no progress.
pub fn item_fraction(loaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (loaded as f64 / total as f64).clamp(0.0, 1.0)
}

/// Tracks the last aggregate value reported to observers.
///
/// Only strictly larger values are reported, which keeps the observed
/// sequence non-decreasing when items are added or removed mid-run.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    last: f64,
}

impl ProgressReporter {
    pub const fn new() -> Self {
        Self { last: 0.0 }
    }

    /// Returns the value if it should be emitted.
    pub fn observe(&mut self, value: f64) -> Option<f64> {
        if value > self.last {
            self.last = value;
            Some(value)
        } else {
            None
        }
    }

    /// Last value reported.
    pub const fn last(&self) -> f64 {
        self.last
    }

    /// Start a new reporting run.
    pub const fn reset(&mut self) {
        self.last = 0.0;
    }
}
