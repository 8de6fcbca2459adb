//! Popperian Falsification Tests for metricsfs
//!
//! # Reference
//! Popper, K. (1959). *The Logic of Scientific Discovery*. Routledge.
//!
//! > "A theory which is not refutable by any conceivable event is non-scientific."
//!
//! | Category | IDs | Claim under test |
//! |----------|-----|------------------|
//! | A | F001-F020 | End-to-end scenarios produce the documented metrics |
//! | B | F021-F030 | Failures are classified and reported, never altered |
//! | C | F031-F040 | Handle accounting holds under concurrent load |
//! | D | F041-F050 | Pull and push collectors agree and export cleanly |

// Allow test-specific patterns that are denied in production code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod concurrency;
mod export;
mod failures;
mod scenarios;

use std::sync::Arc;

use metricsfs_core::{MetricsConfig, MetricsFs};
use metricsfs_observe::Collector;
use metricsfs_test::MemFs;

/// Wraps a fresh [`MemFs`] with a collector built from `config`.
pub fn instrumented(config: MetricsConfig) -> (MetricsFs<MemFs, Collector>, Arc<Collector>, MemFs) {
    let mem = MemFs::new();
    let collector = Arc::new(Collector::new(config).unwrap());
    let fs = MetricsFs::with_observer(mem.clone(), Arc::clone(&collector));
    (fs, collector, mem)
}
