//! Most-recently-current threads

use std::collections::VecDeque;

use crate::facade::ThreadId;

/// Bounded MRU list of threads that have been made current
///
/// A thread appears at most once. Membership says nothing about whether the
/// thread is still suspended; callers filter that through the engine.
#[derive(Debug, Clone)]
pub struct CurrentThreadHistory {
    threads: VecDeque<ThreadId>,
    limit: usize,
}

impl CurrentThreadHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            threads: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Move (or insert) the thread to the front, dropping the oldest entry
    /// once the limit is exceeded
    pub fn touch(&mut self, thread: ThreadId) {
        self.threads.retain(|t| *t != thread);
        self.threads.push_front(thread);
        self.threads.truncate(self.limit);
    }

    pub fn remove(&mut self, thread: ThreadId) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| *t != thread);
        self.threads.len() != before
    }

    pub fn contains(&self, thread: ThreadId) -> bool {
        self.threads.contains(&thread)
    }

    pub fn snapshot(&self) -> Vec<ThreadId> {
        self.threads.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn clear(&mut self) {
        self.threads.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_dedups_and_moves_to_front() {
        let mut history = CurrentThreadHistory::new(8);
        history.touch(ThreadId(1));
        history.touch(ThreadId(2));
        history.touch(ThreadId(1));
        assert_eq!(history.snapshot(), vec![ThreadId(1), ThreadId(2)]);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = CurrentThreadHistory::new(2);
        history.touch(ThreadId(1));
        history.touch(ThreadId(2));
        history.touch(ThreadId(3));
        assert_eq!(history.snapshot(), vec![ThreadId(3), ThreadId(2)]);
        assert!(!history.contains(ThreadId(1)));
    }

    #[test]
    fn test_remove() {
        let mut history = CurrentThreadHistory::new(4);
        history.touch(ThreadId(1));
        assert!(history.remove(ThreadId(1)));
        assert!(!history.remove(ThreadId(1)));
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let mut history = CurrentThreadHistory::new(0);
        history.touch(ThreadId(1));
        assert_eq!(history.len(), 1);
    }
}
