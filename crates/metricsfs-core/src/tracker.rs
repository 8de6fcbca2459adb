//! Open-handle concurrency tracking.
//!
//! Lock-free: `current` moves with a single atomic add, and the high-water
//! mark is raised with a compare-and-swap loop that only spins when a new
//! maximum is being set.

use std::sync::atomic::{AtomicI64, Ordering};

/// Current and historical-maximum count of open handles.
///
/// Every [`track_close`](Self::track_close) must pair with an earlier
/// [`track_open`](Self::track_open). Unpaired closes drive `current` negative;
/// the tracker does not detect or repair that.
#[derive(Debug, Default)]
pub struct ConcurrencyTracker {
    current: AtomicI64,
    max: AtomicI64,
}

impl ConcurrencyTracker {
    /// Creates a tracker with both counts at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: AtomicI64::new(0),
            max: AtomicI64::new(0),
        }
    }

    /// Records a handle open and raises the high-water mark if needed.
    pub fn track_open(&self) {
        let current = self.current.fetch_add(1, Ordering::AcqRel) + 1;

        let mut max = self.max.load(Ordering::Acquire);
        while current > max {
            match self
                .max
                .compare_exchange_weak(max, current, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }

    /// Records a handle close.
    pub fn track_close(&self) {
        self.current.fetch_sub(1, Ordering::AcqRel);
    }

    /// Handles open right now.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.current.load(Ordering::Acquire)
    }

    /// Most handles ever open at once.
    #[must_use]
    pub fn max(&self) -> i64 {
        self.max.load(Ordering::Acquire)
    }
}
