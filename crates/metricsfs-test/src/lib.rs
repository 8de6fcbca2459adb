// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # metricsfs-test
//!
//! Testing infrastructure for metricsfs.
//!
//! This crate provides:
//! - **In-memory filesystem**: [`MemFs`], a complete delegate with every optional capability
//! - **Chaos injection**: [`ChaosFs`] injects latency and errors into any filesystem
//! - **Load testing**: [`LoadTester`] drives a filesystem from concurrent threads
//! - **Falsification tests**: Popperian tests for the interceptor and both collectors
//!
//! ## Example
//!
//! ```rust,ignore
//! use metricsfs_core::MetricsFs;
//! use metricsfs_observe::Collector;
//! use metricsfs_test::{ChaosConfig, ChaosFs, MemFs};
//!
//! let chaos = ChaosFs::new(MemFs::new(), ChaosConfig::errors(0.05))?;
//! chaos.injector().start();
//! let fs = MetricsFs::new(chaos, Collector::with_defaults()?);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod chaos;
pub mod error;
pub mod load;
pub mod memfs;

pub use chaos::{ChaosConfig, ChaosFile, ChaosFs, ChaosInjector};
pub use error::{Result, TestError};
pub use load::{LoadTestConfig, LoadTestReport, LoadTester, RequestHandler, file_workload};
pub use memfs::{MemFile, MemFs};
