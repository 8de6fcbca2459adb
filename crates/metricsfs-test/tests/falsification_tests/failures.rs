//! Falsification Tests: Category B - Failure paths (F021-F030)
//!
//! # Toyota Way: Jidoka (自働化)
//! Stop and surface every abnormality; never hide or rewrite it.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use metricsfs_core::{File, FileSystem, MetricsConfig, MetricsFs, Operation};
use metricsfs_observe::Collector;
use metricsfs_test::{ChaosConfig, ChaosFs, MemFs};

use super::instrumented;

const OPS: &str = "fs_operations_total";
const ERRORS: &str = "fs_errors_total";

fn chaos(config: ChaosConfig) -> (MetricsFs<ChaosFs<MemFs>, Collector>, Arc<Collector>) {
    let fs = ChaosFs::new(MemFs::new(), config).unwrap();
    let collector = Arc::new(Collector::with_defaults().unwrap());
    (MetricsFs::with_observer(fs, Arc::clone(&collector)), collector)
}

// =============================================================================
// F021-F025: Classification
// =============================================================================

/// F021: Opening a missing file is counted, classified and hooked once
///
/// # Falsification Attempt
/// The error hook must fire exactly once, with `open`, and the counters must
/// carry the not-found category.
#[test]
fn f021_open_missing_file() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let (fs, collector, _mem) = instrumented(
        MetricsConfig::default().with_on_error(move |op, err| sink.lock().push((op, err.kind()))),
    );

    let err = fs.open("/missing").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);

    let snap = collector.snapshot();
    assert_eq!(
        snap.counter(OPS, &[("operation", "open"), ("status", "error")]),
        1,
        "F021 FALSIFIED: operations_total{{open,error}}"
    );
    assert_eq!(
        snap.counter(ERRORS, &[("operation", "open"), ("error_type", "not_found")]),
        1,
        "F021 FALSIFIED: errors_total{{open,not_found}}"
    );
    assert_eq!(
        snap.counter("fs_not_found_errors_total", &[("operation", "open")]),
        1
    );
    assert_eq!(
        *calls.lock(),
        vec![(Operation::Open, io::ErrorKind::NotFound)],
        "F021 FALSIFIED: on_error not called exactly once"
    );
    assert_eq!(snap.gauge("fs_open_files", &[]), Some(0));
}

/// F022: Permission failures land in the permission family
#[test]
fn f022_permission_errors() {
    let (fs, collector, mem) = instrumented(MetricsConfig::default());
    mem.write_file("/ro", "x").unwrap();

    let mut f = fs.open("/ro").unwrap();
    assert!(f.write(b"y").is_err());
    f.close().unwrap();

    let snap = collector.snapshot();
    assert_eq!(
        snap.counter("fs_permission_errors_total", &[("operation", "write")]),
        1,
        "F022 FALSIFIED"
    );
    assert_eq!(
        snap.counter("fs_bytes_written_total", &[]),
        0,
        "F022 FALSIFIED: failed write counted bytes"
    );
}

/// F023: Injected timeouts land in the timeout family
#[test]
fn f023_timeout_errors() {
    let (fs, collector) = chaos(
        ChaosConfig::errors(1.0)
            .with_error_kind(io::ErrorKind::TimedOut)
            .only([Operation::Stat]),
    );
    fs.inner().injector().start();
    fs.mkdir("/d", 0o755).unwrap();
    assert_eq!(fs.stat("/d").unwrap_err().kind(), io::ErrorKind::TimedOut);

    let snap = collector.snapshot();
    assert_eq!(
        snap.counter("fs_timeout_errors_total", &[("operation", "stat")]),
        1,
        "F023 FALSIFIED"
    );
    assert_eq!(snap.counter(OPS, &[("operation", "mkdir"), ("status", "success")]), 1);
}

/// F024: Unrecognized failures are classified unknown and nowhere else
#[test]
fn f024_unknown_errors() {
    let (fs, collector) = chaos(ChaosConfig::errors(1.0).only([Operation::Rename]));
    fs.inner().injector().start();
    assert!(fs.rename("/a", "/b").is_err());

    let snap = collector.snapshot();
    assert_eq!(
        snap.counter(ERRORS, &[("operation", "rename"), ("error_type", "unknown")]),
        1,
        "F024 FALSIFIED"
    );
    for family in [
        "fs_not_found_errors_total",
        "fs_permission_errors_total",
        "fs_timeout_errors_total",
    ] {
        assert_eq!(snap.counter(family, &[]), 0, "F024 FALSIFIED: {family}");
    }
}

/// F025: The caller receives the delegate's error unchanged
#[test]
fn f025_error_passes_through() {
    let (fs, _collector) = chaos(ChaosConfig::errors(1.0).only([Operation::Chmod]));
    fs.inner().injector().start();
    let err = fs.chmod("/x", 0o600).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Other);
    assert_eq!(
        err.to_string(),
        "chaos: injected chmod failure",
        "F025 FALSIFIED: error rewritten"
    );
}

// =============================================================================
// F026-F030: Handles under failure
// =============================================================================

/// F026: A failed close still releases the handle
#[test]
fn f026_failed_close_releases_handle() {
    let (fs, collector) = chaos(ChaosConfig::errors(1.0).only([Operation::Close]));
    let f = fs.create("/a").unwrap();
    fs.inner().injector().start();
    assert!(f.close().is_err());

    let snap = collector.snapshot();
    assert_eq!(snap.gauge("fs_open_files", &[]), Some(0), "F026 FALSIFIED");
    assert_eq!(
        snap.counter(OPS, &[("operation", "close"), ("status", "error")]),
        1
    );
}

/// F027: A handle dropped without close releases its slot exactly once
#[test]
fn f027_drop_without_close() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    {
        let _a = fs.create("/a").unwrap();
        let _b = fs.create("/b").unwrap();
        assert_eq!(collector.tracker().current(), 2);
    }
    let snap = collector.snapshot();
    assert_eq!(snap.gauge("fs_open_files", &[]), Some(0), "F027 FALSIFIED");
    assert_eq!(snap.gauge("fs_open_files_max", &[]), Some(2));
    assert_eq!(
        snap.counter(OPS, &[("operation", "close")]),
        0,
        "F027 FALSIFIED: drop measured as close"
    );
}

/// F028: A failed open creates no handle
#[test]
fn f028_failed_open_no_handle() {
    let (fs, collector) = chaos(ChaosConfig::errors(1.0).only([Operation::OpenFile]));
    fs.inner().injector().start();
    assert!(
        fs.open_file("/a", metricsfs_core::OpenFlags::CREATE, 0o644)
            .is_err()
    );

    let snap = collector.snapshot();
    assert_eq!(snap.gauge("fs_open_files_max", &[]), Some(0), "F028 FALSIFIED");
    assert_eq!(
        snap.counter("fs_file_opens_total", &[("mode", "read")]),
        1,
        "F028 FALSIFIED: attempted open not counted"
    );
}

/// F029: Random failures keep success + error equal to total calls
#[test]
fn f029_random_failures_balance() {
    let (fs, collector) = chaos(
        ChaosConfig::errors(0.3)
            .with_seed(99)
            .only([Operation::Mkdir, Operation::Stat]),
    );
    fs.inner().injector().start();
    let mut failed = 0u64;
    for i in 0..200 {
        if fs.mkdir(&format!("/d{i}"), 0o755).is_err() {
            failed += 1;
        }
        if fs.stat(&format!("/d{i}")).is_err() {
            failed += 1;
        }
    }

    let snap = collector.snapshot();
    assert_eq!(snap.counter(OPS, &[]), 400, "F029 FALSIFIED: calls lost");
    assert_eq!(
        snap.counter(OPS, &[("status", "error")]),
        failed,
        "F029 FALSIFIED: error count"
    );
    assert_eq!(snap.counter(ERRORS, &[]), failed);
    assert!(fs.inner().injector().injected_errors() > 0);
}

/// F030: Injected latency shows up in the latency histogram
#[test]
fn f030_latency_visible() {
    let (fs, collector) = chaos(
        ChaosConfig::latency(1.0, std::time::Duration::from_millis(15)).only([Operation::Stat]),
    );
    fs.mkdir("/d", 0o755).unwrap();
    fs.inner().injector().start();
    fs.stat("/d").unwrap();

    let snap = collector.snapshot();
    let h = snap.histogram("fs_stat_duration_seconds", &[]).unwrap();
    assert_eq!(h.count, 1);
    assert!(h.sum >= 0.015, "F030 FALSIFIED: sum {}", h.sum);
    // 15ms falls above the 0.01 bound.
    assert_eq!(h.buckets[1].cumulative_count, 0, "F030 FALSIFIED");
}
