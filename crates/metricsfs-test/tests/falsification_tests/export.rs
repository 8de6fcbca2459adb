//! Falsification Tests: Category D - Dual export (F041-F050)
//!
//! # Toyota Way: Hansei (反省)
//! Two independent views of the same workload must tell the same story.

use std::collections::BTreeMap;
use std::sync::Arc;

use opentelemetry::KeyValue;
use parking_lot::Mutex;

use metricsfs_core::{File, FileSystem, MetricsConfig, MetricsFs, OperationObserver};
use metricsfs_observe::{Collector, Registry, TEXT_CONTENT_TYPE, encode_text};
use metricsfs_otel::{Instruments, OtelCollector, OtelConfig};
use metricsfs_test::MemFs;

/// Sums every instrument call by (instrument, operation attribute).
#[derive(Default)]
struct Totals {
    values: Mutex<BTreeMap<(&'static str, String), f64>>,
}

impl Totals {
    fn add(&self, instrument: &'static str, value: f64, attributes: &[KeyValue]) {
        let op = attributes
            .iter()
            .find(|kv| kv.key.as_str() == "operation")
            .map(|kv| kv.value.as_str().into_owned())
            .unwrap_or_default();
        *self.values.lock().entry((instrument, op)).or_default() += value;
    }

    fn get(&self, instrument: &'static str, op: &str) -> f64 {
        self.values
            .lock()
            .get(&(instrument, op.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn total(&self, instrument: &'static str) -> f64 {
        self.values
            .lock()
            .iter()
            .filter(|((name, _), _)| *name == instrument)
            .map(|(_, v)| v)
            .sum()
    }
}

impl Instruments for Totals {
    fn add_operation(&self, attributes: &[KeyValue]) {
        self.add("operations", 1.0, attributes);
    }

    fn record_duration(&self, _seconds: f64, attributes: &[KeyValue]) {
        self.add("duration", 1.0, attributes);
    }

    fn add_bytes_read(&self, bytes: u64, attributes: &[KeyValue]) {
        self.add("bytes_read", bytes as f64, attributes);
    }

    fn add_bytes_written(&self, bytes: u64, attributes: &[KeyValue]) {
        self.add("bytes_written", bytes as f64, attributes);
    }

    fn add_error(&self, attributes: &[KeyValue]) {
        self.add("errors", 1.0, attributes);
    }

    fn add_open_files(&self, delta: i64, attributes: &[KeyValue]) {
        self.add("open_files", delta as f64, attributes);
    }
}

type Dual = (Arc<Collector>, OtelCollector<Arc<Totals>>);

fn dual() -> (MetricsFs<MemFs, Dual>, Arc<Collector>, Arc<Totals>) {
    let collector = Arc::new(Collector::with_defaults().unwrap());
    let totals = Arc::new(Totals::default());
    let otel = OtelCollector::with_instruments(OtelConfig::default(), Arc::clone(&totals));
    let fs = MetricsFs::new(MemFs::new(), (Arc::clone(&collector), otel));
    (fs, collector, totals)
}

fn workload<F: FileSystem>(fs: &F) {
    fs.mkdir_all("/w/x", 0o755).unwrap();
    for i in 0..5 {
        let mut f = fs.create(&format!("/w/x/{i}")).unwrap();
        f.write(&vec![1u8; 100 * (i + 1)]).unwrap();
        f.close().unwrap();
    }
    let mut f = fs.open("/w/x/4").unwrap();
    let mut buf = vec![0u8; 1024];
    f.read(&mut buf).unwrap();
    f.close().unwrap();
    let _ = fs.stat("/w/missing");
    let _ = fs.remove("/w");
}

/// F041: Pull and push collectors count the same operations
#[test]
fn f041_operation_counts_agree() {
    let (fs, collector, totals) = dual();
    workload(&fs);

    let snap = collector.snapshot();
    for op in ["mkdirall", "create", "write", "close", "open", "read", "stat", "remove"] {
        assert_eq!(
            snap.counter("fs_operations_total", &[("operation", op)]) as f64,
            totals.get("operations", op),
            "F041 FALSIFIED: {op}"
        );
    }
    assert_eq!(
        snap.counter("fs_operations_total", &[]) as f64,
        totals.total("duration"),
        "F041 FALSIFIED: durations"
    );
}

/// F042: Byte totals agree
#[test]
fn f042_bytes_agree() {
    let (fs, collector, totals) = dual();
    workload(&fs);

    let snap = collector.snapshot();
    assert_eq!(snap.counter("fs_bytes_written_total", &[]), 1500);
    assert_eq!(totals.total("bytes_written"), 1500.0, "F042 FALSIFIED");
    assert_eq!(snap.counter("fs_bytes_read_total", &[]), 500);
    assert_eq!(totals.total("bytes_read"), 500.0, "F042 FALSIFIED");
}

/// F043: Error totals agree
#[test]
fn f043_errors_agree() {
    let (fs, collector, totals) = dual();
    workload(&fs);

    let snap = collector.snapshot();
    // stat of a missing path and remove of a non-empty directory.
    assert_eq!(snap.counter("fs_errors_total", &[]), 2);
    assert_eq!(totals.total("errors"), 2.0, "F043 FALSIFIED");
    assert_eq!(totals.get("errors", "stat"), 1.0);
    assert_eq!(totals.get("errors", "remove"), 1.0);
}

/// F044: Both open-file views return to zero
#[test]
fn f044_open_files_agree() {
    let (fs, collector, totals) = dual();
    let a = fs.create("/a").unwrap();
    let b = fs.create("/b").unwrap();
    assert_eq!(totals.total("open_files"), 2.0);
    assert_eq!(collector.tracker().current(), 2);
    a.close().unwrap();
    drop(b);

    assert_eq!(totals.total("open_files"), 0.0, "F044 FALSIFIED: push");
    assert_eq!(collector.tracker().current(), 0, "F044 FALSIFIED: pull");
    assert_eq!(collector.tracker().max(), 2);
}

/// F045: The registry renders a scrape with every family exactly once
#[test]
fn f045_registry_exposition() {
    let (fs, collector, _totals) = dual();
    workload(&fs);

    let registry = Registry::new();
    registry.register(collector).unwrap();
    let text = registry.encode();

    assert_eq!(TEXT_CONTENT_TYPE, "text/plain; version=0.0.4");
    for family in registry.gather() {
        let header = format!("# TYPE {} ", family.name);
        assert_eq!(
            text.matches(&header).count(),
            1,
            "F045 FALSIFIED: {} rendered {} times",
            family.name,
            text.matches(&header).count()
        );
    }
    assert!(text.contains("fs_bytes_written_total 1500\n"), "F045 FALSIFIED");
    assert!(text.contains("fs_operations_total{operation=\"create\",status=\"success\"} 5\n"));
    assert!(text.contains("fs_write_size_bytes_bucket{operation=\"write\",le=\"+Inf\"} 5\n"));
}

/// F046: A second collector under the same names is rejected
#[test]
fn f046_duplicate_registration() {
    let registry = Registry::new();
    registry
        .register(Arc::new(Collector::with_defaults().unwrap()))
        .unwrap();
    assert!(
        registry
            .register(Arc::new(Collector::with_defaults().unwrap()))
            .is_err(),
        "F046 FALSIFIED"
    );
    let other = Collector::new(MetricsConfig {
        namespace: "other".to_string(),
        ..Default::default()
    })
    .unwrap();
    registry.register(Arc::new(other)).unwrap();
    assert_eq!(registry.len(), 2);
}

/// F047: Rendering a snapshot directly matches the registry for one collector
#[test]
fn f047_encode_matches_registry() {
    let (fs, collector, _totals) = dual();
    workload(&fs);

    let mut families = collector.snapshot().families;
    families.sort_by(|a, b| a.name.cmp(&b.name));

    let registry = Registry::new();
    registry.register(collector).unwrap();
    assert_eq!(encode_text(&families), registry.encode(), "F047 FALSIFIED");
}

/// F048: The push collector alone works on the global no-op meter
#[test]
fn f048_otel_only_on_noop_meter() {
    let fs = MetricsFs::new(MemFs::new(), OtelCollector::new(OtelConfig::default()));
    workload(&fs);
    assert!(!fs.observer().traces());
}
