//! Pull-model collector.
//!
//! Aggregates measurements into counters, gauges and histograms held in
//! process memory. Nothing is exported on its own: callers take a
//! [`Snapshot`] or register the collector with a [`Registry`](crate::Registry)
//! and scrape that.

use std::collections::BTreeMap;

use metricsfs_core::{
    CardinalityGuard, ConcurrencyTracker, ErrorCategory, Measurement, MetricsConfig, OpenMode,
    Operation, OperationObserver, Status, classify,
};

use crate::counter::{Counter, CounterVec};
use crate::error::Result;
use crate::histogram::{Histogram, HistogramVec};
use crate::registry::MetricSource;
use crate::snapshot::{HistogramSnapshot, MetricFamily, MetricKind, MetricValue, Snapshot};

/// Latency histograms, present when latency metrics are enabled.
#[derive(Debug)]
struct Latency {
    operation: HistogramVec<Operation>,
    read: Histogram,
    write: Histogram,
    stat: Histogram,
    open: Histogram,
}

/// Byte counters and size histograms, present when bandwidth metrics are
/// enabled.
#[derive(Debug)]
struct Bandwidth {
    bytes_read: Counter,
    bytes_written: Counter,
    read_size: HistogramVec<Operation>,
    write_size: HistogramVec<Operation>,
}

/// In-memory metrics collector for [`MetricsFs`](metricsfs_core::MetricsFs).
///
/// Thread-safe; share it with `Arc` to read snapshots while the decorated
/// filesystem is in use.
#[derive(Debug)]
pub struct Collector {
    config: MetricsConfig,

    operations: CounterVec<(Operation, Status)>,
    file_opens: CounterVec<OpenMode>,
    file_creates: Counter,
    dir_operations: CounterVec<Operation>,

    latency: Option<Latency>,
    bandwidth: Option<Bandwidth>,

    errors: CounterVec<(Operation, ErrorCategory)>,
    permission_errors: CounterVec<Operation>,
    not_found_errors: CounterVec<Operation>,
    timeout_errors: CounterVec<Operation>,

    path_access: Option<CounterVec<(String, Operation)>>,
    guard: CardinalityGuard,
    tracker: ConcurrencyTracker,
}

impl Collector {
    /// Creates a collector, filling in defaults for unset configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration does not validate.
    pub fn new(mut config: MetricsConfig) -> Result<Self> {
        config.apply_defaults();
        config.validate()?;

        let latency = if config.enable_latency_metrics {
            let buckets = &config.latency_buckets;
            Some(Latency {
                operation: HistogramVec::new(buckets)?,
                read: Histogram::new(buckets)?,
                write: Histogram::new(buckets)?,
                stat: Histogram::new(buckets)?,
                open: Histogram::new(buckets)?,
            })
        } else {
            None
        };

        let bandwidth = if config.enable_bandwidth_metrics {
            Some(Bandwidth {
                bytes_read: Counter::new(),
                bytes_written: Counter::new(),
                read_size: HistogramVec::new(&config.size_buckets)?,
                write_size: HistogramVec::new(&config.size_buckets)?,
            })
        } else {
            None
        };

        let path_access = config.enable_path_metrics.then(CounterVec::new);

        tracing::debug!(
            namespace = %config.namespace,
            subsystem = %config.subsystem,
            latency = config.enable_latency_metrics,
            bandwidth = config.enable_bandwidth_metrics,
            paths = config.enable_path_metrics,
            "metrics collector created"
        );

        Ok(Self {
            guard: CardinalityGuard::new(config.max_tracked_paths),
            config,
            operations: CounterVec::new(),
            file_opens: CounterVec::new(),
            file_creates: Counter::new(),
            dir_operations: CounterVec::new(),
            latency,
            bandwidth,
            errors: CounterVec::new(),
            permission_errors: CounterVec::new(),
            not_found_errors: CounterVec::new(),
            timeout_errors: CounterVec::new(),
            path_access,
            tracker: ConcurrencyTracker::new(),
        })
    }

    /// Creates a collector with the default configuration.
    ///
    /// # Errors
    /// Never fails for the built-in defaults; the `Result` mirrors [`new`](Self::new).
    pub fn with_defaults() -> Result<Self> {
        Self::new(MetricsConfig::default())
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Open-handle tracker.
    #[must_use]
    pub fn tracker(&self) -> &ConcurrencyTracker {
        &self.tracker
    }

    /// Path cardinality guard.
    #[must_use]
    pub fn guard(&self) -> &CardinalityGuard {
        &self.guard
    }

    /// Fully qualified metric name: namespace, subsystem and `name` joined by
    /// `_`, empty parts skipped.
    #[must_use]
    pub fn metric_name(&self, name: &str) -> String {
        [
            self.config.namespace.as_str(),
            self.config.subsystem.as_str(),
            name,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Recording
    // ═══════════════════════════════════════════════════════════════════════════

    fn record_latency(&self, op: Operation, seconds: f64) {
        let Some(latency) = &self.latency else {
            return;
        };
        latency.operation.observe(op, seconds);
        match op {
            Operation::Read => latency.read.observe(seconds),
            Operation::Write => latency.write.observe(seconds),
            Operation::Stat => latency.stat.observe(seconds),
            Operation::Open => latency.open.observe(seconds),
            _ => {}
        }
    }

    fn record_bandwidth(&self, op: Operation, bytes: i64) {
        let Some(bandwidth) = &self.bandwidth else {
            return;
        };
        let Ok(bytes) = u64::try_from(bytes) else {
            return;
        };
        if bytes == 0 {
            return;
        }
        match op {
            Operation::Read => {
                bandwidth.bytes_read.add(bytes);
                bandwidth.read_size.observe(op, bytes as f64);
            }
            Operation::Write => {
                bandwidth.bytes_written.add(bytes);
                bandwidth.write_size.observe(op, bytes as f64);
            }
            _ => {}
        }
    }

    fn record_path(&self, op: Operation, path: &str) {
        let Some(path_access) = &self.path_access else {
            return;
        };
        if path.is_empty() || !self.guard.admit(path) {
            return;
        }
        path_access.inc((path.to_string(), op));
    }

    fn record_error(&self, op: Operation, category: ErrorCategory) {
        self.errors.inc((op, category));
        match category {
            ErrorCategory::NotFound => self.not_found_errors.inc(op),
            ErrorCategory::Permission => self.permission_errors.inc(op),
            ErrorCategory::Timeout => self.timeout_errors.inc(op),
            ErrorCategory::None | ErrorCategory::Unknown => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Snapshot
    // ═══════════════════════════════════════════════════════════════════════════

    fn labels(&self, pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut labels = self.config.const_labels.clone();
        labels.extend(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        );
        labels
    }

    fn family(&self, name: &str, help: &str, kind: MetricKind) -> MetricFamily {
        MetricFamily::new(self.metric_name(name), help, kind)
    }

    fn counter(&self, name: &str, help: &str, value: u64) -> MetricFamily {
        let mut family = self.family(name, help, MetricKind::Counter);
        family.push(self.labels(&[]), MetricValue::Counter(value));
        family
    }

    fn gauge(&self, name: &str, help: &str, value: i64) -> MetricFamily {
        let mut family = self.family(name, help, MetricKind::Gauge);
        family.push(self.labels(&[]), MetricValue::Gauge(value));
        family
    }

    fn histogram(&self, name: &str, help: &str, value: HistogramSnapshot) -> MetricFamily {
        let mut family = self.family(name, help, MetricKind::Histogram);
        family.push(self.labels(&[]), MetricValue::Histogram(value));
        family
    }

    fn by_operation(
        &self,
        name: &str,
        help: &str,
        counters: &CounterVec<Operation>,
    ) -> MetricFamily {
        let mut family = self.family(name, help, MetricKind::Counter);
        for (op, n) in counters.entries() {
            family.push(
                self.labels(&[("operation", op.as_str())]),
                MetricValue::Counter(n),
            );
        }
        family
    }

    fn histograms_by_operation(
        &self,
        name: &str,
        help: &str,
        histograms: &HistogramVec<Operation>,
    ) -> MetricFamily {
        let mut family = self.family(name, help, MetricKind::Histogram);
        for (op, h) in histograms.entries() {
            family.push(
                self.labels(&[("operation", op.as_str())]),
                MetricValue::Histogram(h),
            );
        }
        family
    }

    /// Current state of every enabled metric family.
    ///
    /// The open-file gauges are read from the tracker first, so they reflect
    /// the moment of the call.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let open_files = self.tracker.current();
        let open_files_max = self.tracker.max();

        let mut families = Vec::new();

        let mut operations = self.family(
            "operations_total",
            "Total filesystem operations by type and status",
            MetricKind::Counter,
        );
        for ((op, status), n) in self.operations.entries() {
            operations.push(
                self.labels(&[("operation", op.as_str()), ("status", status.as_str())]),
                MetricValue::Counter(n),
            );
        }
        families.push(operations);

        let mut opens = self.family("file_opens_total", "File opens by mode", MetricKind::Counter);
        for (mode, n) in self.file_opens.entries() {
            opens.push(
                self.labels(&[("mode", mode.as_str())]),
                MetricValue::Counter(n),
            );
        }
        families.push(opens);
        families.push(self.counter(
            "file_creates_total",
            "File creation count",
            self.file_creates.get(),
        ));
        families.push(self.by_operation(
            "dir_operations_total",
            "Directory operations",
            &self.dir_operations,
        ));

        if let Some(latency) = &self.latency {
            families.push(self.histograms_by_operation(
                "operation_duration_seconds",
                "Operation duration distribution",
                &latency.operation,
            ));
            families.push(self.histogram(
                "read_duration_seconds",
                "Read operation latency",
                latency.read.snapshot(),
            ));
            families.push(self.histogram(
                "write_duration_seconds",
                "Write operation latency",
                latency.write.snapshot(),
            ));
            families.push(self.histogram(
                "stat_duration_seconds",
                "Stat operation latency",
                latency.stat.snapshot(),
            ));
            families.push(self.histogram(
                "open_duration_seconds",
                "Open operation latency",
                latency.open.snapshot(),
            ));
        }

        if let Some(bandwidth) = &self.bandwidth {
            families.push(self.counter(
                "bytes_read_total",
                "Total bytes read",
                bandwidth.bytes_read.get(),
            ));
            families.push(self.counter(
                "bytes_written_total",
                "Total bytes written",
                bandwidth.bytes_written.get(),
            ));
            families.push(self.histograms_by_operation(
                "read_size_bytes",
                "Distribution of read sizes",
                &bandwidth.read_size,
            ));
            families.push(self.histograms_by_operation(
                "write_size_bytes",
                "Distribution of write sizes",
                &bandwidth.write_size,
            ));
        }

        let mut errors = self.family(
            "errors_total",
            "Errors by operation and type",
            MetricKind::Counter,
        );
        for ((op, category), n) in self.errors.entries() {
            errors.push(
                self.labels(&[("operation", op.as_str()), ("error_type", category.as_str())]),
                MetricValue::Counter(n),
            );
        }
        families.push(errors);
        families.push(self.by_operation(
            "permission_errors_total",
            "Permission denied errors",
            &self.permission_errors,
        ));
        families.push(self.by_operation(
            "not_found_errors_total",
            "File/directory not found errors",
            &self.not_found_errors,
        ));
        families.push(self.by_operation(
            "timeout_errors_total",
            "Timeout errors",
            &self.timeout_errors,
        ));

        families.push(self.gauge("open_files", "Currently open files", open_files));
        families.push(self.gauge(
            "open_files_max",
            "Maximum concurrent open files observed",
            open_files_max,
        ));

        if let Some(path_access) = &self.path_access {
            let mut paths = self.family(
                "path_access_total",
                "Access counts for specific paths",
                MetricKind::Counter,
            );
            for ((path, op), n) in path_access.entries() {
                paths.push(
                    self.labels(&[("path", path.as_str()), ("operation", op.as_str())]),
                    MetricValue::Counter(n),
                );
            }
            families.push(paths);
        }

        Snapshot { families }
    }
}

impl OperationObserver for Collector {
    fn observe(&self, m: &Measurement<'_>) {
        let op = m.operation();
        self.operations.inc((op, m.status()));
        self.record_latency(op, m.duration().as_secs_f64());
        self.record_bandwidth(op, m.bytes());
        self.record_path(op, m.path());
        if m.is_error() {
            self.record_error(op, classify(m.outcome()));
        }

        let hooks = &self.config.hooks;
        if let Some(hook) = &hooks.on_operation {
            hook(m);
        }
        if let (Some(hook), Some(err)) = (&hooks.on_error, m.outcome()) {
            hook(op, err);
        }
    }

    fn handle_opened(&self) {
        self.tracker.track_open();
    }

    fn handle_closed(&self) {
        self.tracker.track_close();
    }

    fn file_opened(&self, mode: OpenMode) {
        self.file_opens.inc(mode);
    }

    fn file_created(&self) {
        self.file_creates.inc();
    }

    fn dir_operation(&self, op: Operation) {
        self.dir_operations.inc(op);
    }
}

impl MetricSource for Collector {
    fn collect(&self) -> Vec<MetricFamily> {
        self.snapshot().families
    }
}
