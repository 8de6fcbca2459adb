//! Cardinality guard for high-cardinality metric dimensions.
//!
//! The first `capacity` distinct values seen over the guard's lifetime are
//! admitted and stay admitted; every later value is rejected. There is no
//! eviction, so a tracked series never disappears from the exported metrics.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

/// Bounded admission set.
#[derive(Debug)]
pub struct CardinalityGuard {
    capacity: usize,
    tracked: RwLock<HashSet<String>>,
    saturated: AtomicBool,
}

impl CardinalityGuard {
    /// Creates a guard admitting at most `capacity` distinct values.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tracked: RwLock::new(HashSet::new()),
            saturated: AtomicBool::new(false),
        }
    }

    /// Decides whether `value` may be recorded individually.
    ///
    /// Already-tracked values are always admitted. A new value is admitted
    /// and marked tracked while fewer than `capacity` values are tracked.
    pub fn admit(&self, value: &str) -> bool {
        {
            let tracked = self.tracked.read();
            if tracked.contains(value) {
                return true;
            }
            if tracked.len() >= self.capacity {
                self.note_saturated();
                return false;
            }
        }

        // Re-check under the write lock: another writer may have inserted
        // this value or filled the last slot since the read above.
        let mut tracked = self.tracked.write();
        if tracked.contains(value) {
            return true;
        }
        if tracked.len() >= self.capacity {
            drop(tracked);
            self.note_saturated();
            return false;
        }
        tracked.insert(value.to_owned());
        true
    }

    /// Returns true if `value` is tracked.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.tracked.read().contains(value)
    }

    /// Number of tracked values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.read().len()
    }

    /// Returns true if nothing is tracked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.read().is_empty()
    }

    /// Maximum number of tracked values.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn note_saturated(&self) {
        if !self.saturated.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                capacity = self.capacity,
                "path cardinality limit reached, new paths are no longer tracked individually"
            );
        }
    }
}
