//! Falsification Tests: Category A - End-to-end scenarios (F001-F020)
//!
//! # Toyota Way: Genchi Genbutsu (現地現物)
//! "Go and see" - run real workloads and read the metrics they produce.

use std::io::SeekFrom;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use metricsfs_core::{
    Capabilities, File, FileSystem, MetricsConfig, MetricsFs, OpenFlags, Operation,
};
use metricsfs_observe::Collector;
use metricsfs_test::MemFs;

use super::instrumented;

const OPS: &str = "fs_operations_total";

// =============================================================================
// F001-F005: Create / write / close / stat
// =============================================================================

/// F001: The documented write scenario produces the documented counters
///
/// # Falsification Attempt
/// create, write 11 bytes, close, stat; every counter must match exactly,
/// and the single handle must be visible while the write is measured.
#[test]
fn f001_create_write_close_stat() {
    let slot: Arc<OnceLock<Weak<Collector>>> = Arc::new(OnceLock::new());
    let at_write: Arc<Mutex<Vec<(i64, i64)>>> = Arc::default();
    let config = {
        let slot = Arc::clone(&slot);
        let at_write = Arc::clone(&at_write);
        MetricsConfig::default().with_on_operation(move |m| {
            if m.operation() != Operation::Write {
                return;
            }
            if let Some(collector) = slot.get().and_then(Weak::upgrade) {
                let snap = collector.snapshot();
                at_write.lock().push((
                    snap.gauge("fs_open_files", &[]).unwrap_or(-1),
                    snap.gauge("fs_open_files_max", &[]).unwrap_or(-1),
                ));
            }
        })
    };
    let (fs, collector, mem) = instrumented(config);
    slot.set(Arc::downgrade(&collector)).unwrap();

    let mut f = fs.create("/hello.txt").unwrap();
    assert_eq!(f.write_str("hello world").unwrap(), 11);
    f.close().unwrap();
    let info = fs.stat("/hello.txt").unwrap();

    assert_eq!(
        *at_write.lock(),
        vec![(1, 1)],
        "F001 FALSIFIED: open_files/open_files_max while writing"
    );

    let snap = collector.snapshot();
    for op in ["create", "write", "close", "stat"] {
        assert_eq!(
            snap.counter(OPS, &[("operation", op), ("status", "success")]),
            1,
            "F001 FALSIFIED: {op} not counted once"
        );
    }
    assert_eq!(
        snap.counter("fs_bytes_written_total", &[]),
        11,
        "F001 FALSIFIED: bytes written"
    );
    assert_eq!(
        snap.gauge("fs_open_files_max", &[]),
        Some(1),
        "F001 FALSIFIED: open_files_max"
    );
    assert_eq!(
        snap.gauge("fs_open_files", &[]),
        Some(0),
        "F001 FALSIFIED: open_files after close"
    );
    assert_eq!(info.size, 11, "F001 FALSIFIED: stat result altered");
    assert_eq!(mem.read_file("/hello.txt").unwrap(), b"hello world");
}

/// F002: Reads count bytes exactly once
#[test]
fn f002_read_bytes_counted() {
    let (fs, collector, mem) = instrumented(MetricsConfig::default());
    mem.write_file("/data", vec![7u8; 4096]).unwrap();

    let mut f = fs.open("/data").unwrap();
    let mut buf = vec![0u8; 1000];
    let mut total = 0;
    loop {
        let n = f.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }
    f.close().unwrap();

    let snap = collector.snapshot();
    assert_eq!(total, 4096);
    assert_eq!(
        snap.counter("fs_bytes_read_total", &[]),
        4096,
        "F002 FALSIFIED: bytes read"
    );
    // Four full reads, one short read, one zero-length read.
    assert_eq!(snap.counter(OPS, &[("operation", "read")]), 6);
    let sizes = snap
        .histogram("fs_read_size_bytes", &[("operation", "read")])
        .unwrap();
    assert_eq!(
        sizes.count, 5,
        "F002 FALSIFIED: zero-byte read entered the size histogram"
    );
}

/// F003: Positional and string variants count under their base operation
#[test]
fn f003_variant_operations_share_labels() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());

    let mut f = fs.create("/v").unwrap();
    f.write(b"abc").unwrap();
    f.write_at(b"def", 3).unwrap();
    f.write_str("ghi").unwrap();
    let mut buf = [0u8; 3];
    f.read_at(&mut buf, 0).unwrap();
    f.seek(SeekFrom::Start(0)).unwrap();
    f.read(&mut buf).unwrap();
    f.close().unwrap();

    let snap = collector.snapshot();
    assert_eq!(snap.counter(OPS, &[("operation", "write")]), 3, "F003 FALSIFIED");
    assert_eq!(snap.counter(OPS, &[("operation", "read")]), 2, "F003 FALSIFIED");
    assert_eq!(snap.counter(OPS, &[("operation", "seek")]), 1, "F003 FALSIFIED");
    assert_eq!(snap.counter("fs_bytes_written_total", &[]), 9);
    assert_eq!(snap.counter("fs_bytes_read_total", &[]), 6);
}

/// F004: Latency disabled means no latency histograms, counters still move
#[test]
fn f004_latency_disabled() {
    let (fs, collector, mem) = instrumented(MetricsConfig {
        enable_latency_metrics: false,
        ..Default::default()
    });
    mem.write_file("/a", "x").unwrap();
    fs.stat("/a").unwrap();
    fs.open("/a").unwrap().close().unwrap();

    let snap = collector.snapshot();
    for name in [
        "fs_operation_duration_seconds",
        "fs_read_duration_seconds",
        "fs_stat_duration_seconds",
        "fs_open_duration_seconds",
    ] {
        assert!(
            snap.family(name).is_none(),
            "F004 FALSIFIED: {name} present with latency disabled"
        );
    }
    assert_eq!(snap.counter(OPS, &[("operation", "stat")]), 1);
    assert_eq!(snap.counter(OPS, &[("operation", "open")]), 1);
}

/// F005: Latency enabled observes each operation once in its histograms
#[test]
fn f005_latency_observed() {
    let (fs, collector, mem) = instrumented(MetricsConfig::default());
    mem.write_file("/a", "x").unwrap();
    fs.stat("/a").unwrap();
    fs.stat("/a").unwrap();

    let snap = collector.snapshot();
    assert_eq!(
        snap.histogram("fs_stat_duration_seconds", &[]).unwrap().count,
        2,
        "F005 FALSIFIED: stat histogram"
    );
    assert_eq!(
        snap.histogram("fs_operation_duration_seconds", &[("operation", "stat")])
            .unwrap()
            .count,
        2,
        "F005 FALSIFIED: per-operation histogram"
    );
    assert_eq!(
        snap.histogram("fs_read_duration_seconds", &[]).unwrap().count,
        0
    );
}

// =============================================================================
// F006-F010: Supplemented bookkeeping
// =============================================================================

/// F006: Open modes are counted from the flags
#[test]
fn f006_open_modes() {
    let (fs, collector, mem) = instrumented(MetricsConfig::default());
    mem.write_file("/f", "x").unwrap();

    fs.open("/f").unwrap().close().unwrap();
    fs.open_file("/f", OpenFlags::WRITE_ONLY, 0).unwrap().close().unwrap();
    fs.open_file("/f", OpenFlags::READ_WRITE, 0).unwrap().close().unwrap();
    fs.open_file("/f", OpenFlags::READ_WRITE | OpenFlags::APPEND, 0)
        .unwrap()
        .close()
        .unwrap();
    fs.create("/g").unwrap().close().unwrap();

    let snap = collector.snapshot();
    let opens = |mode| snap.counter("fs_file_opens_total", &[("mode", mode)]);
    assert_eq!(opens("read"), 1, "F006 FALSIFIED: read");
    assert_eq!(opens("write"), 2, "F006 FALSIFIED: write (incl. create)");
    assert_eq!(opens("readwrite"), 1, "F006 FALSIFIED: readwrite");
    assert_eq!(opens("append"), 1, "F006 FALSIFIED: append");
    assert_eq!(snap.counter("fs_file_creates_total", &[]), 1);
}

/// F007: Directory operations are counted, including readdir
#[test]
fn f007_dir_operations() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());

    fs.mkdir("/d", 0o755).unwrap();
    fs.mkdir_all("/d/e/f", 0o755).unwrap();
    let mut dir = fs.open("/d").unwrap();
    let names = dir.readdir_names(None).unwrap();
    dir.close().unwrap();
    fs.remove("/d/e/f").unwrap();
    fs.remove_all("/d").unwrap();

    assert_eq!(names, vec!["e"]);
    let snap = collector.snapshot();
    for op in ["mkdir", "mkdirall", "remove", "removeall", "readdir"] {
        assert_eq!(
            snap.counter("fs_dir_operations_total", &[("operation", op)]),
            1,
            "F007 FALSIFIED: {op}"
        );
    }
}

/// F008: Path metrics stop admitting new paths at the configured limit
#[test]
fn f008_path_cardinality_bounded() {
    let (fs, collector, mem) = instrumented(MetricsConfig {
        enable_path_metrics: true,
        max_tracked_paths: 3,
        ..Default::default()
    });
    for i in 0..10 {
        mem.write_file(&format!("/p{i}"), "x").unwrap();
    }
    for round in 0..3 {
        for i in 0..10 {
            fs.stat(&format!("/p{i}")).unwrap();
        }
        let snap = collector.snapshot();
        let tracked = snap.family("fs_path_access_total").unwrap();
        assert_eq!(
            tracked.metrics.len(),
            3,
            "F008 FALSIFIED: cardinality exceeded in round {round}"
        );
    }
    let snap = collector.snapshot();
    assert_eq!(
        snap.counter(
            "fs_path_access_total",
            &[("path", "/p0"), ("operation", "stat")]
        ),
        3,
        "F008 FALSIFIED: tracked path rejected"
    );
    assert_eq!(snap.counter("fs_path_access_total", &[("path", "/p9")]), 0);
}

/// F009: Namespace, subsystem and constant labels shape every family
#[test]
fn f009_naming_and_const_labels() {
    let (fs, collector, _mem) = instrumented(
        MetricsConfig {
            namespace: "app".to_string(),
            subsystem: "storage".to_string(),
            ..Default::default()
        }
        .with_const_label("tier", "hot"),
    );
    fs.mkdir("/x", 0o755).unwrap();

    let snap = collector.snapshot();
    assert!(snap.families.iter().all(|f| f.name.starts_with("app_storage_")));
    assert!(
        snap.families
            .iter()
            .flat_map(|f| &f.metrics)
            .all(|m| m.labels.get("tier").map(String::as_str) == Some("hot")),
        "F009 FALSIFIED: constant label missing"
    );
    assert_eq!(
        snap.counter("app_storage_operations_total", &[("operation", "mkdir")]),
        1
    );
}

/// F010: The operation hook sees every measurement
#[test]
fn f010_operation_hook() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let (fs, _collector, _mem) = instrumented(MetricsConfig::default().with_on_operation(
        move |m| {
            assert!(!m.is_error());
            counter.fetch_add(1, Ordering::SeqCst);
        },
    ));
    fs.mkdir("/a", 0o755).unwrap();
    fs.stat("/a").unwrap();
    fs.chmod("/a", 0o700).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3, "F010 FALSIFIED");
}

// =============================================================================
// F011-F015: Transparency
// =============================================================================

/// F011: Every filesystem operation returns what the delegate returns
#[test]
fn f011_results_pass_through() {
    let (fs, _collector, mem) = instrumented(MetricsConfig::default());
    mem.write_file("/work/target", "abc").unwrap();

    fs.symlink("/work/target", "/work/link").unwrap();
    assert_eq!(fs.readlink("/work/link").unwrap(), mem.readlink("/work/link").unwrap());
    assert_eq!(fs.lstat("/work/link").unwrap(), mem.lstat("/work/link").unwrap());
    fs.chdir("/work").unwrap();
    assert_eq!(fs.getwd().unwrap(), "/work");
    fs.rename("target", "renamed").unwrap();
    assert!(mem.exists("/work/renamed"));
    FileSystem::truncate(&fs, "/work/renamed", 1).unwrap();
    assert_eq!(mem.read_file("/work/renamed").unwrap(), b"a");
    fs.chown("/work/renamed", 0, 0).unwrap();
    let epoch = std::time::SystemTime::UNIX_EPOCH;
    fs.chtimes("/work/renamed", epoch, epoch).unwrap();
    assert_eq!(fs.stat("/work/renamed").unwrap().modified, epoch);
    assert_eq!(fs.temp_dir(), "/tmp");
    assert_eq!(fs.separator(), '/');
    assert_eq!(fs.list_separator(), ':');
}

/// F012: Unmeasured calls leave no trace
#[test]
fn f012_temp_dir_unmeasured() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    let _ = fs.temp_dir();
    let _ = fs.separator();
    assert_eq!(
        collector.snapshot().counter(OPS, &[]),
        0,
        "F012 FALSIFIED: pass-through call measured"
    );
}

/// F013: Unsupported capabilities are measured and reported, not delegated
#[test]
fn f013_unsupported_capability() {
    let mem = MemFs::new().with_capabilities(Capabilities::NONE);
    let collector = Arc::new(Collector::with_defaults().unwrap());
    let fs = MetricsFs::with_observer(mem.clone(), Arc::clone(&collector));
    mem.write_file("/t", "x").unwrap();

    let err = fs.readlink("/t").unwrap_err();
    assert!(metricsfs_core::is_unsupported(&err), "F013 FALSIFIED: {err}");
    assert!(fs.getwd().is_err());
    assert!(FileSystem::truncate(&fs, "/t", 0).is_err());
    assert_eq!(mem.read_file("/t").unwrap(), b"x", "F013 FALSIFIED: delegated");

    let snap = collector.snapshot();
    for op in [Operation::Readlink, Operation::Getwd, Operation::Truncate] {
        assert_eq!(
            snap.counter(OPS, &[("operation", op.as_str()), ("status", "error")]),
            1,
            "F013 FALSIFIED: {op} not measured"
        );
        assert_eq!(
            snap.counter(
                "fs_errors_total",
                &[("operation", op.as_str()), ("error_type", "unknown")]
            ),
            1
        );
    }
}

/// F014: Handle stat and sync are measured on the handle
#[test]
fn f014_handle_stat_sync_truncate() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    let mut f = fs.create("/h").unwrap();
    f.write(b"12345").unwrap();
    f.sync().unwrap();
    File::truncate(&mut f, 2).unwrap();
    assert_eq!(File::stat(&f).unwrap().size, 2);
    assert_eq!(f.name(), "/h");
    f.close().unwrap();

    let snap = collector.snapshot();
    for op in ["sync", "truncate", "stat"] {
        assert_eq!(
            snap.counter(OPS, &[("operation", op)]),
            1,
            "F014 FALSIFIED: {op}"
        );
    }
}

/// F015: Snapshots serialize and deserialize without loss
#[test]
fn f015_snapshot_serializes() {
    let (fs, collector, _mem) = instrumented(MetricsConfig::default());
    fs.create("/a").unwrap().close().unwrap();

    let snap = collector.snapshot();
    let json = serde_json::to_string(&snap).unwrap();
    let back: metricsfs_observe::Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap, "F015 FALSIFIED");
}
