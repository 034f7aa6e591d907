use crate::id::Position;
use std::collections::BTreeSet;

/// Receives the "state changed here" signal after a committed transfer.
pub trait DirtySink {
    fn mark_dirty(&mut self, node: Position);
}

/// Records which interface nodes committed a transfer since the last clean
/// point. Call [`mark_clean`](DirtyTracker::mark_clean) once the persistence
/// or redraw layer has consumed the set.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_nodes: BTreeSet<Position>,
    marks: u64,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if anything has been marked dirty since the last clean.
    pub fn is_dirty(&self) -> bool {
        !self.dirty_nodes.is_empty()
    }

    pub fn is_node_dirty(&self, node: Position) -> bool {
        self.dirty_nodes.contains(&node)
    }

    pub fn dirty_nodes(&self) -> &BTreeSet<Position> {
        &self.dirty_nodes
    }

    /// Total `mark_dirty` calls received, including repeats.
    pub fn mark_count(&self) -> u64 {
        self.marks
    }

    pub fn mark_clean(&mut self) {
        self.dirty_nodes.clear();
    }
}

impl DirtySink for DirtyTracker {
    fn mark_dirty(&mut self, node: Position) {
        self.dirty_nodes.insert(node);
        self.marks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_initially_clean() {
        let tracker = DirtyTracker::new();
        assert!(!tracker.is_dirty());
        assert!(tracker.dirty_nodes().is_empty());
        assert_eq!(tracker.mark_count(), 0);
    }

    #[test]
    fn duplicate_marks_idempotent_but_counted() {
        let mut tracker = DirtyTracker::new();
        let node = Position::new(1, 2, 3);
        tracker.mark_dirty(node);
        tracker.mark_dirty(node);
        assert_eq!(tracker.dirty_nodes().len(), 1);
        assert_eq!(tracker.mark_count(), 2);
        assert!(tracker.is_node_dirty(node));
    }

    #[test]
    fn mark_clean_resets_set_not_count() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty(Position::new(0, 0, 0));
        tracker.mark_clean();
        assert!(!tracker.is_dirty());
        assert_eq!(tracker.mark_count(), 1);
    }
}
