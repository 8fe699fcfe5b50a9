//! Bounded duplicate suppression for delivered logs.

use std::collections::{HashSet, VecDeque};

use chainbind_core::LogKey;

/// Default number of keys a live subscription remembers.
pub const DEFAULT_SEEN_CAPACITY: usize = 4096;

/// Remembers the most recent `capacity` log keys, evicting the oldest first.
///
/// The window is counted in logs, not blocks: once a key has been evicted,
/// the same log is accepted again. Size it to cover every log a node may
/// replay, e.g. the logs of the block range a monitor sweeps.
///
/// A reorg removal marker and the log it retracts are tracked as a pair:
/// accepting one forgets the other, so a log re-included after a reorg is
/// accepted again, and so is a second retraction of it.
#[derive(Debug)]
pub struct SeenLogs {
    set: HashSet<LogKey>,
    order: VecDeque<LogKey>,
    capacity: usize,
}

impl SeenLogs {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            set: HashSet::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Record `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: LogKey) -> bool {
        if !self.set.insert(key) {
            return false;
        }
        let opposite = LogKey {
            removed: !key.removed,
            ..key
        };
        if self.set.remove(&opposite) {
            self.order.retain(|k| *k != opposite);
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, key: &LogKey) -> bool {
        self.set.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for SeenLogs {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}
