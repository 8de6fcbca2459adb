//! OpenTelemetry instruments.
//!
//! [`Instruments`] is the seam between the push collector and the metrics
//! API: [`OtelInstruments`] forwards to a [`Meter`], tests substitute a
//! recorder.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};

/// Operation counter name.
pub const OPERATIONS: &str = "fs.operations";
/// Bytes-read counter name.
pub const BYTES_READ: &str = "fs.bytes.read";
/// Bytes-written counter name.
pub const BYTES_WRITTEN: &str = "fs.bytes.written";
/// Duration histogram name.
pub const OPERATION_DURATION: &str = "fs.operation.duration";
/// Open-files up-down counter name.
pub const OPEN_FILES: &str = "fs.open_files";
/// Error counter name.
pub const ERRORS: &str = "fs.errors";

/// Sink for push-model measurements.
pub trait Instruments: Send + Sync {
    /// One operation.
    fn add_operation(&self, attributes: &[KeyValue]);

    /// Duration of one operation, in seconds.
    fn record_duration(&self, seconds: f64, attributes: &[KeyValue]);

    /// Bytes read.
    fn add_bytes_read(&self, bytes: u64, attributes: &[KeyValue]);

    /// Bytes written.
    fn add_bytes_written(&self, bytes: u64, attributes: &[KeyValue]);

    /// One failed operation.
    fn add_error(&self, attributes: &[KeyValue]);

    /// Change in the number of open handles.
    fn add_open_files(&self, delta: i64, attributes: &[KeyValue]);
}

impl<I: Instruments + ?Sized> Instruments for std::sync::Arc<I> {
    fn add_operation(&self, attributes: &[KeyValue]) {
        (**self).add_operation(attributes);
    }

    fn record_duration(&self, seconds: f64, attributes: &[KeyValue]) {
        (**self).record_duration(seconds, attributes);
    }

    fn add_bytes_read(&self, bytes: u64, attributes: &[KeyValue]) {
        (**self).add_bytes_read(bytes, attributes);
    }

    fn add_bytes_written(&self, bytes: u64, attributes: &[KeyValue]) {
        (**self).add_bytes_written(bytes, attributes);
    }

    fn add_error(&self, attributes: &[KeyValue]) {
        (**self).add_error(attributes);
    }

    fn add_open_files(&self, delta: i64, attributes: &[KeyValue]) {
        (**self).add_open_files(delta, attributes);
    }
}

/// Instruments created from an OpenTelemetry [`Meter`].
#[derive(Clone)]
pub struct OtelInstruments {
    operations: Counter<u64>,
    bytes_read: Counter<u64>,
    bytes_written: Counter<u64>,
    duration: Histogram<f64>,
    open_files: UpDownCounter<i64>,
    errors: Counter<u64>,
}

impl OtelInstruments {
    /// Creates the instrument set on `meter`.
    pub fn new(meter: &Meter) -> Self {
        Self {
            operations: meter
                .u64_counter(OPERATIONS)
                .with_description("Total filesystem operations")
                .with_unit("{operation}")
                .build(),
            bytes_read: meter
                .u64_counter(BYTES_READ)
                .with_description("Total bytes read")
                .with_unit("By")
                .build(),
            bytes_written: meter
                .u64_counter(BYTES_WRITTEN)
                .with_description("Total bytes written")
                .with_unit("By")
                .build(),
            duration: meter
                .f64_histogram(OPERATION_DURATION)
                .with_description("Filesystem operation duration")
                .with_unit("s")
                .build(),
            open_files: meter
                .i64_up_down_counter(OPEN_FILES)
                .with_description("Currently open files")
                .with_unit("{file}")
                .build(),
            errors: meter
                .u64_counter(ERRORS)
                .with_description("Filesystem errors")
                .with_unit("{error}")
                .build(),
        }
    }
}

impl Instruments for OtelInstruments {
    fn add_operation(&self, attributes: &[KeyValue]) {
        self.operations.add(1, attributes);
    }

    fn record_duration(&self, seconds: f64, attributes: &[KeyValue]) {
        self.duration.record(seconds, attributes);
    }

    fn add_bytes_read(&self, bytes: u64, attributes: &[KeyValue]) {
        self.bytes_read.add(bytes, attributes);
    }

    fn add_bytes_written(&self, bytes: u64, attributes: &[KeyValue]) {
        self.bytes_written.add(bytes, attributes);
    }

    fn add_error(&self, attributes: &[KeyValue]) {
        self.errors.add(1, attributes);
    }

    fn add_open_files(&self, delta: i64, attributes: &[KeyValue]) {
        self.open_files.add(delta, attributes);
    }
}

impl std::fmt::Debug for OtelInstruments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtelInstruments").finish_non_exhaustive()
    }
}
