//! Ordered surfacing of completions.
//!
//! Each ordered item reserves a slot at enqueue time. Completions fill their
//! slot, and only the contiguous run of settled slots at the front is
//! released. A failed or removed slot is settled without producing output,
//! so it never blocks the items behind it.

use std::collections::BTreeMap;
use std::sync::Arc;

use preload_core::{LoadItem, LoadOutput};

/// Slot handle, allocated in enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

#[derive(Debug)]
enum SlotState {
    Waiting,
    Loaded {
        item: Arc<LoadItem>,
        output: Arc<LoadOutput>,
    },
    Failed,
}

/// A completion released by the ledger, in enqueue order.
pub type Surfaced = (Arc<LoadItem>, Arc<LoadOutput>);

/// Tracks ordered items until their turn to surface.
///
/// Surfaced slots are dropped from the map, so its first entry is always
/// the oldest slot not yet surfaced.
#[derive(Debug, Default)]
pub struct ScriptOrderLedger {
    slots: BTreeMap<SlotId, SlotState>,
    next: u64,
}

impl ScriptOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next slot.
    pub fn reserve(&mut self) -> SlotId {
        let id = SlotId(self.next);
        self.next += 1;
        self.slots.insert(id, SlotState::Waiting);
        id
    }

    /// Record a completion and release whatever is now contiguous.
    ///
    /// A slot that was already settled keeps its first value.
    pub fn fill(
        &mut self,
        slot: SlotId,
        item: Arc<LoadItem>,
        output: Arc<LoadOutput>,
    ) -> Vec<Surfaced> {
        if let Some(state) = self.slots.get_mut(&slot) {
            if matches!(state, SlotState::Waiting) {
                *state = SlotState::Loaded { item, output };
            }
        }
        self.release_front()
    }

    /// Settle a slot without output (error, cancellation or removal).
    pub fn fail(&mut self, slot: SlotId) -> Vec<Surfaced> {
        if let Some(state) = self.slots.get_mut(&slot) {
            if matches!(state, SlotState::Waiting) {
                *state = SlotState::Failed;
            }
        }
        self.release_front()
    }

    /// Settle every held completion whose item is being removed.
    ///
    /// Removed items must never surface, even when they finished before an
    /// earlier slot.
    pub fn discard(&mut self, removed: impl Fn(&LoadItem) -> bool) -> Vec<Surfaced> {
        for state in self.slots.values_mut() {
            if matches!(state, SlotState::Loaded { item, .. } if removed(item)) {
                *state = SlotState::Failed;
            }
        }
        self.release_front()
    }

    /// Number of slots not yet surfaced.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every slot. Slot ids keep increasing.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn release_front(&mut self) -> Vec<Surfaced> {
        let mut surfaced = Vec::new();
        while let Some(entry) = self.slots.first_entry() {
            match entry.get() {
                SlotState::Waiting => break,
                SlotState::Failed => {
                    entry.remove();
                }
                SlotState::Loaded { .. } => {
                    if let SlotState::Loaded { item, output } = entry.remove() {
                        surfaced.push((item, output));
                    }
                }
            }
        }
        surfaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preload_core::{Formatted, RawContent, ResourceType};

    fn loaded(src: &str) -> (Arc<LoadItem>, Arc<LoadOutput>) {
        let item = Arc::new(LoadItem::new(src, ResourceType::Javascript));
        let output = Arc::new(LoadOutput::new(
            RawContent::Empty,
            Formatted::Text(Arc::from(src)),
        ));
        (item, output)
    }

    fn ids(surfaced: &[Surfaced]) -> Vec<&str> {
        surfaced.iter().map(|(item, _)| item.id.as_str()).collect()
    }

    #[test]
    fn test_out_of_order_completion_surfaces_in_order() {
        let mut ledger = ScriptOrderLedger::new();
        let a = ledger.reserve();
        let b = ledger.reserve();
        let c = ledger.reserve();

        let (item, out) = loaded("c.js");
        assert!(ledger.fill(c, item, out).is_empty());

        let (item, out) = loaded("b.js");
        assert!(ledger.fill(b, item, out).is_empty());

        let (item, out) = loaded("a.js");
        let surfaced = ledger.fill(a, item, out);
        assert_eq!(ids(&surfaced), vec!["a.js", "b.js", "c.js"]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_failed_slot_unblocks_successors() {
        let mut ledger = ScriptOrderLedger::new();
        let a = ledger.reserve();
        let b = ledger.reserve();

        let (item, out) = loaded("b.js");
        assert!(ledger.fill(b, item, out).is_empty());

        let surfaced = ledger.fail(a);
        assert_eq!(ids(&surfaced), vec!["b.js"]);
    }

    #[test]
    fn test_fill_is_first_wins() {
        let mut ledger = ScriptOrderLedger::new();
        let a = ledger.reserve();
        let b = ledger.reserve();

        let (item, out) = loaded("first.js");
        ledger.fill(b, item, out);
        let (item, out) = loaded("second.js");
        ledger.fill(b, item, out);

        let surfaced = ledger.fail(a);
        assert_eq!(ids(&surfaced), vec!["first.js"]);
    }

    #[test]
    fn test_discarded_completion_never_surfaces() {
        let mut ledger = ScriptOrderLedger::new();
        let a = ledger.reserve();
        let b = ledger.reserve();
        let c = ledger.reserve();

        let (item, out) = loaded("b.js");
        ledger.fill(b, item, out);
        let (item, out) = loaded("c.js");
        ledger.fill(c, item, out);

        assert!(ledger.discard(|item| item.id == "b.js").is_empty());

        let (item, out) = loaded("a.js");
        let surfaced = ledger.fill(a, item, out);
        assert_eq!(ids(&surfaced), vec!["a.js", "c.js"]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unknown_slot_is_ignored() {
        let mut ledger = ScriptOrderLedger::new();
        let a = ledger.reserve();
        ledger.clear();

        let (item, out) = loaded("a.js");
        assert!(ledger.fill(a, item, out).is_empty());
        assert_eq!(ledger.len(), 0);
    }
}
