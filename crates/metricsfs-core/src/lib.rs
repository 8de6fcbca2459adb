// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # metricsfs-core
//!
//! Measurement model and filesystem interceptor for metricsfs.
//!
//! - [`FileSystem`] and [`File`], the capability interface of the wrapped resource
//! - [`MetricsFs`] and [`MetricsFile`], the transparent decorator
//! - [`Measurement`], the record produced for every intercepted call
//! - [`OperationObserver`], the subscriber interface aggregators implement
//! - [`CardinalityGuard`], [`ConcurrencyTracker`] and [`classify`], the
//!   building blocks aggregators share
//! - [`MetricsConfig`], collector configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use metricsfs_core::{FileSystem, MetricsFs};
//!
//! let fs = MetricsFs::new(inner, observer);
//! let info = fs.stat("/data/a.txt")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod config;
pub mod error;
pub mod file;
pub mod fs;
pub mod guard;
pub mod interceptor;
pub mod observer;
#[cfg(test)]
pub mod tests;
pub mod tracker;
pub mod types;

pub use classify::classify;
pub use config::{ErrorHook, Hooks, MetricsConfig, OperationHook, exponential_buckets};
pub use error::{MetricsError, Result, UnsupportedOperation, is_unsupported, unsupported};
pub use file::MetricsFile;
pub use fs::{Capabilities, File, FileInfo, FileSystem};
pub use guard::CardinalityGuard;
pub use interceptor::MetricsFs;
pub use observer::OperationObserver;
pub use tracker::ConcurrencyTracker;
pub use types::{ErrorCategory, Measurement, OpenFlags, OpenMode, Operation, Status};
