// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # metricsfs-otel
//!
//! OpenTelemetry backend for metricsfs.
//!
//! [`OtelCollector`] forwards every measurement to six instruments
//! (`fs.operations`, `fs.bytes.read`, `fs.bytes.written`,
//! `fs.operation.duration`, `fs.open_files`, `fs.errors`) and, with
//! tracing enabled, asks the interceptor for one `tracing` span per call.
//! Bridge those spans to OpenTelemetry with the subscriber layer of your
//! choice.
//!
//! ## Example
//!
//! ```rust,ignore
//! use metricsfs_core::MetricsFs;
//! use metricsfs_otel::{OtelCollector, OtelConfig};
//!
//! let fs = MetricsFs::new(inner, OtelCollector::new(OtelConfig::default().with_tracing()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collector;
pub mod instruments;

pub use collector::{DEFAULT_METER_NAME, OtelCollector, OtelConfig};
pub use instruments::{Instruments, OtelInstruments};
