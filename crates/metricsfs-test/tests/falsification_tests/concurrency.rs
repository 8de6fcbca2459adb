//! Falsification Tests: Category C - Concurrency (F031-F040)
//!
//! # Toyota Way: Heijunka (平準化)
//! Level the load across many threads and check nothing is lost.

use std::sync::Arc;
use std::time::Duration;

use metricsfs_core::{ConcurrencyTracker, File, FileSystem, MetricsConfig};
use metricsfs_test::{LoadTestConfig, LoadTester, file_workload};

use super::instrumented;

fn load(users: u32, requests: u32) -> LoadTestConfig {
    LoadTestConfig {
        concurrent_users: users,
        ramp_up: Duration::from_millis(10),
        duration: Duration::from_secs(30),
        requests_per_user: Some(requests),
        target_rps: None,
        deadline: None,
    }
}

/// F031: Handle accounting returns to zero after a concurrent workload
///
/// # Falsification Attempt
/// Run full file lifecycles from many threads; the open-handle gauge must
/// return to zero and its high-water mark must stay within the user count.
#[test]
fn f031_open_files_balance_under_load() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    let fs = Arc::new(fs);

    let report = LoadTester::new(load(8, 25), file_workload(Arc::clone(&fs), 512))
        .run()
        .unwrap();
    assert_eq!(report.failed, 0, "F031 FALSIFIED: workload failed");

    let snap = collector.snapshot();
    assert_eq!(snap.gauge("fs_open_files", &[]), Some(0), "F031 FALSIFIED");
    let max = snap.gauge("fs_open_files_max", &[]).unwrap();
    assert!(
        (1..=8).contains(&max),
        "F031 FALSIFIED: open_files_max {max} outside 1..=8"
    );
}

/// F032: No operation is lost under contention
#[test]
fn f032_counters_exact_under_load() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    let fs = Arc::new(fs);

    LoadTester::new(load(6, 20), file_workload(Arc::clone(&fs), 100))
        .run()
        .unwrap();

    // Each request: mkdir_all, create, write, close, stat, open, read, close, remove.
    let requests = 6 * 20;
    let snap = collector.snapshot();
    let ops = "fs_operations_total";
    assert_eq!(snap.counter(ops, &[("operation", "close")]), 2 * requests, "F032 FALSIFIED");
    assert_eq!(snap.counter(ops, &[("operation", "create")]), requests);
    assert_eq!(snap.counter(ops, &[("operation", "open")]), requests);
    assert_eq!(snap.counter(ops, &[]), 9 * requests, "F032 FALSIFIED: total");
    assert_eq!(snap.counter("fs_bytes_written_total", &[]), 100 * requests);
    assert_eq!(snap.counter("fs_bytes_read_total", &[]), 100 * requests);
}

/// F033: The high-water mark equals the true peak when handles are held
#[test]
fn f033_max_tracks_held_handles() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    fs.mkdir("/held", 0o755).unwrap();
    let barrier = std::sync::Barrier::new(5);

    std::thread::scope(|scope| {
        for i in 0..5 {
            let fs = &fs;
            let barrier = &barrier;
            scope.spawn(move || {
                let f = fs.create(&format!("/held/{i}")).unwrap();
                barrier.wait();
                f.close().unwrap();
            });
        }
    });

    let snap = collector.snapshot();
    assert_eq!(snap.gauge("fs_open_files_max", &[]), Some(5), "F033 FALSIFIED");
    assert_eq!(snap.gauge("fs_open_files", &[]), Some(0));
}

/// F034: The documented open/close sequence yields current 0, max 3
#[test]
fn f034_tracker_sequence() {
    let tracker = ConcurrencyTracker::new();
    for _ in 0..3 {
        tracker.track_open();
    }
    tracker.track_close();
    tracker.track_close();
    assert_eq!(tracker.current(), 1, "F034 FALSIFIED");
    tracker.track_close();
    assert_eq!(tracker.current(), 0, "F034 FALSIFIED");
    assert_eq!(tracker.max(), 3, "F034 FALSIFIED");
}

/// F035: Concurrent admissions never exceed the path limit
#[test]
fn f035_path_guard_under_contention() {
    let (fs, collector, mem) = instrumented(MetricsConfig {
        enable_path_metrics: true,
        max_tracked_paths: 16,
        ..Default::default()
    });
    for i in 0..64 {
        mem.write_file(&format!("/p/{i}"), "x").unwrap();
    }

    std::thread::scope(|scope| {
        for t in 0..8 {
            let fs = &fs;
            scope.spawn(move || {
                for i in 0..64 {
                    fs.stat(&format!("/p/{}", (i + t * 8) % 64)).unwrap();
                }
            });
        }
    });

    assert_eq!(collector.guard().len(), 16, "F035 FALSIFIED");
    let snap = collector.snapshot();
    assert_eq!(
        snap.family("fs_path_access_total").unwrap().metrics.len(),
        16,
        "F035 FALSIFIED"
    );
    assert_eq!(snap.counter("fs_operations_total", &[("operation", "stat")]), 512);
}

/// F036: Handles can move between threads
#[test]
fn f036_handle_is_send() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    let mut f = fs.create("/moved").unwrap();
    f.write(b"abc").unwrap();

    let f = std::thread::spawn(move || {
        let mut f = f;
        f.write(b"def").unwrap();
        f
    })
    .join()
    .unwrap();
    f.close().unwrap();

    let snap = collector.snapshot();
    assert_eq!(snap.counter("fs_bytes_written_total", &[]), 6, "F036 FALSIFIED");
    assert_eq!(snap.gauge("fs_open_files", &[]), Some(0));
}
