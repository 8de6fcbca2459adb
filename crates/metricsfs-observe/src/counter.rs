//! Lock-free counters.
//!
//! Labelled counters keep one `AtomicU64` cell per label set in a `DashMap`.
//! The hot path takes a shard read lock and does a single atomic add; a cell
//! is inserted under the shard write lock only the first time a label set
//! is seen.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Monotonic counter without labels.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Adds one.
    pub fn inc(&self) {
        self.add(1);
    }

    /// Adds `n`.
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Monotonic counters keyed by a label set.
#[derive(Debug)]
pub struct CounterVec<K: Eq + Hash> {
    cells: DashMap<K, AtomicU64>,
}

impl<K: Eq + Hash> Default for CounterVec<K> {
    fn default() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Ord> CounterVec<K> {
    /// Creates an empty counter family.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to the cell for `key`.
    pub fn inc(&self, key: K) {
        self.add(key, 1);
    }

    /// Adds `n` to the cell for `key`, creating it at zero first if needed.
    pub fn add(&self, key: K, n: u64) {
        if let Some(cell) = self.cells.get(&key) {
            cell.fetch_add(n, Ordering::Relaxed);
            return;
        }
        self.cells
            .entry(key)
            .or_default()
            .fetch_add(n, Ordering::Relaxed);
    }

    /// Value of the cell for `key`, zero if it was never touched.
    #[must_use]
    pub fn get(&self, key: &K) -> u64 {
        self.cells
            .get(key)
            .map_or(0, |cell| cell.load(Ordering::Relaxed))
    }

    /// Number of label sets seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if no cell exists yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells, sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, u64)> {
        let mut entries: Vec<_> = self
            .cells
            .iter()
            .map(|cell| (cell.key().clone(), cell.value().load(Ordering::Relaxed)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
