//! Queue run tracking (from first dispatch to drain).

use std::time::Instant;

use indexmap::IndexMap;

use preload_core::LoadEvent;

/// How an item of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RunOutcome {
    Loaded,
    Failed,
}

/// State for one queue run.
#[derive(Debug)]
pub(super) struct RunState {
    /// Unique identifier for this run.
    pub run_id: uuid::Uuid,
    started: Instant,
    /// Outcomes keyed by item id, in finish order.
    outcomes: IndexMap<String, RunOutcome>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            started: Instant::now(),
            outcomes: IndexMap::new(),
        }
    }

    /// Record the outcome carried by an event, if any.
    pub fn observe(&mut self, event: &LoadEvent) {
        match event {
            LoadEvent::FileLoaded { item, .. } => {
                self.outcomes.insert(item.id.clone(), RunOutcome::Loaded);
            }
            LoadEvent::Error {
                item: Some(item), ..
            } => {
                self.outcomes.insert(item.id.clone(), RunOutcome::Failed);
            }
            _ => {}
        }
    }

    pub fn count(&self, outcome: RunOutcome) -> usize {
        self.outcomes.values().filter(|o| **o == outcome).count()
    }

    /// Ids of failed items, in the order they failed.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| **o == RunOutcome::Failed)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}
