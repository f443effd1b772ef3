//! Progress tracking.
//!
//! This module computes per-item and aggregate progress for load events.

mod aggregate;

pub use aggregate::{ProgressReporter, aggregate_progress, item_fraction};
