//! Fixed-bucket histograms.
//!
//! Bucket counts are stored per bucket (not cumulative) and accumulated when
//! a snapshot is taken. The sum is an `f64` kept as raw bits in an
//! `AtomicU64` and updated with a compare-and-swap loop.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::{ObserveError, Result};
use crate::snapshot::{Bucket, HistogramSnapshot};

/// Checks that `bounds` are non-empty, finite and strictly increasing.
pub fn validate_bounds(bounds: &[f64]) -> Result<()> {
    if bounds.is_empty() {
        return Err(ObserveError::invalid_buckets("no bucket bounds"));
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(ObserveError::invalid_buckets(format!(
            "bound {b} is not finite"
        )));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(ObserveError::invalid_buckets(format!(
            "bounds not strictly increasing at {} >= {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Histogram over fixed upper bounds, plus an implicit `+Inf` bucket.
#[derive(Debug)]
pub struct Histogram {
    bounds: Arc<[f64]>,
    buckets: Box<[AtomicU64]>,
    count: AtomicU64,
    sum: AtomicU64,
}

impl Histogram {
    /// Creates a histogram with the given upper bounds.
    ///
    /// # Errors
    /// Returns [`ObserveError::InvalidBuckets`] for unusable bounds.
    pub fn new(bounds: &[f64]) -> Result<Self> {
        validate_bounds(bounds)?;
        Ok(Self::with_bounds(bounds.into()))
    }

    fn with_bounds(bounds: Arc<[f64]>) -> Self {
        let buckets = (0..bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            buckets,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Records one observation.
    pub fn observe(&self, value: f64) {
        if let Some(bucket) = self
            .bounds
            .iter()
            .position(|bound| value <= *bound)
            .and_then(|i| self.buckets.get(i))
        {
            bucket.fetch_add(1, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Relaxed);

        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .sum
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Number of observations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of observations.
    #[must_use]
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Upper bounds, excluding `+Inf`.
    #[must_use]
    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Cumulative bucket counts, count and sum.
    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut cumulative = 0;
        let buckets = self
            .bounds
            .iter()
            .zip(self.buckets.iter())
            .map(|(bound, count)| {
                cumulative += count.load(Ordering::Relaxed);
                Bucket {
                    upper_bound: *bound,
                    cumulative_count: cumulative,
                }
            })
            .collect();
        HistogramSnapshot {
            buckets,
            count: self.count(),
            sum: self.sum(),
        }
    }
}

/// Histograms keyed by a label set, all sharing the same bounds.
#[derive(Debug)]
pub struct HistogramVec<K: Eq + Hash> {
    bounds: Arc<[f64]>,
    cells: DashMap<K, Histogram>,
}

impl<K: Eq + Hash + Clone + Ord> HistogramVec<K> {
    /// Creates an empty family with the given bounds.
    ///
    /// # Errors
    /// Returns [`ObserveError::InvalidBuckets`] for unusable bounds.
    pub fn new(bounds: &[f64]) -> Result<Self> {
        validate_bounds(bounds)?;
        Ok(Self {
            bounds: bounds.into(),
            cells: DashMap::new(),
        })
    }

    /// Records one observation for `key`.
    pub fn observe(&self, key: K, value: f64) {
        if let Some(cell) = self.cells.get(&key) {
            cell.observe(value);
            return;
        }
        self.cells
            .entry(key)
            .or_insert_with(|| Histogram::with_bounds(Arc::clone(&self.bounds)))
            .observe(value);
    }

    /// Snapshot of the histogram for `key`, if it has been observed.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<HistogramSnapshot> {
        self.cells.get(key).map(|cell| cell.snapshot())
    }

    /// All histograms, sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, HistogramSnapshot)> {
        let mut entries: Vec<_> = self
            .cells
            .iter()
            .map(|cell| (cell.key().clone(), cell.value().snapshot()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
