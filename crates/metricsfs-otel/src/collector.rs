//! Push-model collector.
//!
//! Every measurement is forwarded to OpenTelemetry instruments as it
//! happens; aggregation and export belong to the SDK the application
//! installs. When tracing is enabled the interceptor also opens a
//! `fs.operation` span around each call.

use opentelemetry::metrics::Meter;
use opentelemetry::{KeyValue, global};

use metricsfs_core::{Measurement, Operation, OperationObserver, classify};

use crate::instruments::{Instruments, OtelInstruments};

/// Default meter name.
pub const DEFAULT_METER_NAME: &str = "metricsfs";

/// Push collector configuration.
#[derive(Debug, Clone)]
pub struct OtelConfig {
    /// Name of the meter obtained from the global provider.
    pub meter_name: &'static str,
    /// Open a span around every intercepted call.
    pub enable_tracing: bool,
    /// Attributes added to every measurement.
    pub const_attributes: Vec<KeyValue>,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            meter_name: DEFAULT_METER_NAME,
            enable_tracing: false,
            const_attributes: Vec::new(),
        }
    }
}

impl OtelConfig {
    /// Enables span creation.
    #[must_use]
    pub fn with_tracing(mut self) -> Self {
        self.enable_tracing = true;
        self
    }

    /// Adds a constant attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: KeyValue) -> Self {
        self.const_attributes.push(attribute);
        self
    }
}

/// OpenTelemetry collector for [`MetricsFs`](metricsfs_core::MetricsFs).
#[derive(Debug)]
pub struct OtelCollector<I = OtelInstruments> {
    instruments: I,
    enable_tracing: bool,
    const_attributes: Vec<KeyValue>,
}

impl OtelCollector {
    /// Creates a collector on the global meter provider.
    pub fn new(config: OtelConfig) -> Self {
        let meter = global::meter(config.meter_name);
        Self::with_meter(config, &meter)
    }

    /// Creates a collector on `meter`.
    pub fn with_meter(config: OtelConfig, meter: &Meter) -> Self {
        Self::with_instruments(config, OtelInstruments::new(meter))
    }
}

impl<I: Instruments> OtelCollector<I> {
    /// Creates a collector reporting to `instruments`.
    pub fn with_instruments(config: OtelConfig, instruments: I) -> Self {
        tracing::debug!(
            meter = config.meter_name,
            tracing = config.enable_tracing,
            attributes = config.const_attributes.len(),
            "otel collector created"
        );
        Self {
            instruments,
            enable_tracing: config.enable_tracing,
            const_attributes: config.const_attributes,
        }
    }

    /// The instruments measurements are forwarded to.
    pub fn instruments(&self) -> &I {
        &self.instruments
    }

    /// Attributes for one measurement: constant attributes, `operation`,
    /// `path` when non-empty, then `status=success` or `error.type`.
    pub fn attributes(&self, m: &Measurement<'_>) -> Vec<KeyValue> {
        let mut attributes = Vec::with_capacity(self.const_attributes.len() + 3);
        attributes.extend_from_slice(&self.const_attributes);
        attributes.push(KeyValue::new("operation", m.operation().as_str()));
        if !m.path().is_empty() {
            attributes.push(KeyValue::new("path", m.path().to_string()));
        }
        match m.outcome() {
            Some(err) => attributes.push(KeyValue::new(
                "error.type",
                classify(Some(err)).as_str(),
            )),
            None => attributes.push(KeyValue::new("status", "success")),
        }
        attributes
    }
}

impl<I: Instruments> OperationObserver for OtelCollector<I> {
    fn observe(&self, m: &Measurement<'_>) {
        let attributes = self.attributes(m);
        self.instruments.add_operation(&attributes);
        self.instruments
            .record_duration(m.duration().as_secs_f64(), &attributes);

        if let Ok(bytes @ 1..) = u64::try_from(m.bytes()) {
            match m.operation() {
                Operation::Read => self.instruments.add_bytes_read(bytes, &attributes),
                Operation::Write => self.instruments.add_bytes_written(bytes, &attributes),
                _ => {}
            }
        }

        if m.is_error() {
            self.instruments.add_error(&attributes);
        }
    }

    fn handle_opened(&self) {
        self.instruments.add_open_files(1, &self.const_attributes);
    }

    fn handle_closed(&self) {
        self.instruments.add_open_files(-1, &self.const_attributes);
    }

    fn traces(&self) -> bool {
        self.enable_tracing
    }
}
