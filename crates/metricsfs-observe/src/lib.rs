// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # metricsfs-observe
//!
//! Pull-model aggregation for metricsfs.
//!
//! - [`Collector`] turns measurements into counters, gauges and histograms
//! - [`Snapshot`] is the point-in-time view used by tests and exporters
//! - [`Registry`] gathers several collectors under unique family names
//! - [`encode_text`] renders the text exposition format
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use metricsfs_core::{MetricsConfig, MetricsFs};
//! use metricsfs_observe::{Collector, Registry};
//!
//! let collector = Arc::new(Collector::new(MetricsConfig::default())?);
//! let fs = MetricsFs::with_observer(inner, Arc::clone(&collector));
//!
//! let registry = Registry::new();
//! registry.register(collector)?;
//! println!("{}", registry.encode());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collector;
pub mod counter;
pub mod error;
pub mod export;
pub mod histogram;
pub mod registry;
pub mod snapshot;

pub use collector::Collector;
pub use counter::{Counter, CounterVec};
pub use error::{ObserveError, Result};
pub use export::{TEXT_CONTENT_TYPE, encode_text, write_text};
pub use histogram::{Histogram, HistogramVec, validate_bounds};
pub use registry::{MetricSource, Registry};
pub use snapshot::{
    Bucket, HistogramSnapshot, Metric, MetricFamily, MetricKind, MetricValue, Snapshot,
};
