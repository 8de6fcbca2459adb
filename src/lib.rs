// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! metricsfs: metrics and tracing for filesystem-like resources
//!
//! Wrap any [`FileSystem`](core::FileSystem) and every operation is timed,
//! classified and counted, without changing what the wrapped filesystem
//! returns.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use metricsfs::prelude::*;
//!
//! let (fs, collector) = metricsfs::wrap(my_fs)?;
//! let mut f = fs.create("/hello.txt")?;
//! f.write_str("hello world")?;
//! f.close()?;
//!
//! let registry = Registry::new();
//! registry.register(collector)?;
//! print!("{}", registry.encode());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub use metricsfs_core as core;
pub use metricsfs_observe as observe;
pub use metricsfs_otel as otel;

use metricsfs_core::{FileSystem, MetricsConfig, MetricsFs};
use metricsfs_observe::Collector;
use metricsfs_otel::{OtelCollector, OtelConfig};

/// Prelude module for common imports.
pub mod prelude {
    pub use metricsfs_core::{
        Capabilities, File, FileInfo, FileSystem, MetricsConfig, MetricsFile, MetricsFs, OpenFlags,
        OperationObserver,
    };
    pub use metricsfs_observe::{Collector, Registry, Snapshot};
    pub use metricsfs_otel::{OtelCollector, OtelConfig};
}

/// Filesystem reporting to both the pull and the push collector.
pub type DualFs<F> = MetricsFs<F, (Arc<Collector>, OtelCollector)>;

/// Wraps `inner` with a default pull collector.
///
/// # Errors
/// Never fails for the built-in defaults; mirrors [`wrap_with_config`].
pub fn wrap<F: FileSystem>(inner: F) -> observe::Result<(MetricsFs<F, Collector>, Arc<Collector>)> {
    wrap_with_config(inner, MetricsConfig::default())
}

/// Wraps `inner` with a pull collector built from `config`.
///
/// The returned collector is the one the filesystem reports to; register it
/// with a [`Registry`](observe::Registry) or read its snapshots directly.
///
/// # Errors
/// Returns an error if `config` does not validate.
pub fn wrap_with_config<F: FileSystem>(
    inner: F,
    config: MetricsConfig,
) -> observe::Result<(MetricsFs<F, Collector>, Arc<Collector>)> {
    let collector = Arc::new(Collector::new(config)?);
    let fs = MetricsFs::with_observer(inner, Arc::clone(&collector));
    Ok((fs, collector))
}

/// Wraps `inner` with a pull collector and a push collector on the global
/// meter provider.
///
/// # Errors
/// Returns an error if `config` does not validate.
pub fn wrap_with_otel<F: FileSystem>(
    inner: F,
    config: MetricsConfig,
    otel: OtelConfig,
) -> observe::Result<(DualFs<F>, Arc<Collector>)> {
    let collector = Arc::new(Collector::new(config)?);
    let fs = MetricsFs::new(inner, (Arc::clone(&collector), OtelCollector::new(otel)));
    Ok((fs, collector))
}
