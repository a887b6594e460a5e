//! Threads stopped at a breakpoint that nobody has looked at yet

use std::collections::{HashSet, VecDeque};

use crate::common::{Error, Result};
use crate::facade::ThreadId;

/// Ordered, deduplicated set of hit threads, most recent first
///
/// The membership set and the order are kept in lock-step: every member
/// appears exactly once in `order`, and `order` holds nothing else.
#[derive(Debug, Default, Clone)]
pub struct BreakpointHitSet {
    members: HashSet<ThreadId>,
    order: VecDeque<ThreadId>,
}

impl BreakpointHitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the order untouched if already present
    pub fn add(&mut self, thread: ThreadId) -> bool {
        if !self.members.insert(thread) {
            return false;
        }
        self.order.push_front(thread);
        true
    }

    pub fn remove(&mut self, thread: ThreadId) -> bool {
        if !self.members.remove(&thread) {
            return false;
        }
        self.order.retain(|t| *t != thread);
        true
    }

    pub fn contains(&self, thread: ThreadId) -> bool {
        self.members.contains(&thread)
    }

    /// The most recently hit thread
    pub fn most_recent(&self) -> Result<ThreadId> {
        self.order.front().copied().ok_or(Error::EmptyCollection)
    }

    /// Point-in-time copy, most recent first
    pub fn snapshot(&self) -> Vec<ThreadId> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: u64) -> ThreadId {
        ThreadId(id)
    }

    fn assert_consistent(hits: &BreakpointHitSet) {
        assert_eq!(hits.members.len(), hits.order.len());
        for thread in &hits.order {
            assert!(hits.members.contains(thread));
        }
    }

    #[test]
    fn test_most_recent_first() {
        let mut hits = BreakpointHitSet::new();
        assert!(hits.add(t(1)));
        assert!(hits.add(t(2)));
        assert!(hits.add(t(3)));
        assert_eq!(hits.snapshot(), vec![t(3), t(2), t(1)]);
        assert_eq!(hits.most_recent().unwrap(), t(3));
        assert_consistent(&hits);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut hits = BreakpointHitSet::new();
        assert!(hits.add(t(1)));
        assert!(hits.add(t(2)));
        assert!(!hits.add(t(1)));
        // A repeated add does not move the thread to the front
        assert_eq!(hits.snapshot(), vec![t(2), t(1)]);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut hits = BreakpointHitSet::new();
        hits.add(t(1));
        hits.add(t(2));
        assert!(hits.remove(t(2)));
        assert!(!hits.remove(t(2)));
        assert!(!hits.contains(t(2)));
        assert_eq!(hits.most_recent().unwrap(), t(1));
        assert_consistent(&hits);
    }

    #[test]
    fn test_readd_after_remove_goes_to_front() {
        let mut hits = BreakpointHitSet::new();
        hits.add(t(1));
        hits.add(t(2));
        hits.remove(t(1));
        assert!(hits.add(t(1)));
        assert_eq!(hits.snapshot(), vec![t(1), t(2)]);
    }

    #[test]
    fn test_most_recent_on_empty() {
        let mut hits = BreakpointHitSet::new();
        assert!(matches!(hits.most_recent(), Err(Error::EmptyCollection)));
        hits.add(t(5));
        hits.clear();
        assert!(hits.is_empty());
        assert!(matches!(hits.most_recent(), Err(Error::EmptyCollection)));
    }

    #[test]
    fn test_len_tracks_distinct_live_members() {
        // Pseudo-random add/remove sequence checked against a model
        let mut hits = BreakpointHitSet::new();
        let mut model: Vec<ThreadId> = Vec::new();
        let mut seed: u64 = 0x2545_f491;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let thread = t(seed % 8);
            if seed % 3 == 0 {
                let was = model.contains(&thread);
                model.retain(|x| *x != thread);
                assert_eq!(hits.remove(thread), was);
            } else {
                let fresh = !model.contains(&thread);
                if fresh {
                    model.insert(0, thread);
                }
                assert_eq!(hits.add(thread), fresh);
            }
            assert_eq!(hits.len(), model.len());
            assert_eq!(hits.snapshot(), model);
            assert_consistent(&hits);
        }
    }
}
