//! Collector configuration.
//!
//! Built once, defaults filled in for anything left unset, read-only after
//! the collector is constructed. Loadable from TOML; hooks are code-only.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::types::{Measurement, Operation};

/// Called after every measured operation, once internal bookkeeping is done.
pub type OperationHook = Arc<dyn Fn(&Measurement<'_>) + Send + Sync>;

/// Called after every failed operation, once internal bookkeeping is done.
pub type ErrorHook = Arc<dyn Fn(Operation, &io::Error) + Send + Sync>;

/// User callbacks.
///
/// Hooks run on the caller's thread. A panicking hook unwinds through the
/// intercepted call; counters are already updated by then.
#[derive(Clone, Default)]
pub struct Hooks {
    /// See [`OperationHook`].
    pub on_operation: Option<OperationHook>,
    /// See [`ErrorHook`].
    pub on_error: Option<ErrorHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_operation", &self.on_operation.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Pull-model collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metric name prefix.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Metric name infix, after the namespace.
    #[serde(default)]
    pub subsystem: String,

    /// Labels applied to every metric.
    #[serde(default)]
    pub const_labels: BTreeMap<String, String>,

    /// Collect latency histograms.
    #[serde(default = "default_true")]
    pub enable_latency_metrics: bool,

    /// Collect byte counters and size histograms.
    #[serde(default = "default_true")]
    pub enable_bandwidth_metrics: bool,

    /// Collect per-path access counts.
    ///
    /// High cardinality; bounded by `max_tracked_paths`.
    #[serde(default)]
    pub enable_path_metrics: bool,

    /// Latency histogram bounds, in seconds.
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,

    /// Size histogram bounds, in bytes.
    #[serde(default = "default_size_buckets")]
    pub size_buckets: Vec<f64>,

    /// Distinct paths tracked individually when path metrics are on.
    ///
    /// Zero means unset and is replaced by the default of 100 in
    /// [`apply_defaults`](Self::apply_defaults). To track no paths, leave
    /// `enable_path_metrics` off.
    #[serde(default = "default_max_tracked_paths")]
    pub max_tracked_paths: usize,

    /// Sampling rate for path metrics, in `(0, 1]`.
    ///
    /// Advisory: recorded in the configuration but not applied. Admission of
    /// paths is governed by `max_tracked_paths` alone.
    #[serde(default = "default_path_sample_rate")]
    pub path_sample_rate: f64,

    /// User callbacks.
    #[serde(skip)]
    pub hooks: Hooks,
}

fn default_namespace() -> String {
    "fs".to_string()
}

fn default_true() -> bool {
    true
}

fn default_latency_buckets() -> Vec<f64> {
    vec![0.001, 0.01, 0.1, 1.0, 10.0]
}

fn default_size_buckets() -> Vec<f64> {
    exponential_buckets(1024.0, 2.0, 10)
}

fn default_max_tracked_paths() -> usize {
    100
}

fn default_path_sample_rate() -> f64 {
    0.01
}

/// Returns `count` bounds starting at `start`, each `factor` times the last.
///
/// Returns an empty vector for non-positive `start`, `factor <= 1` or
/// `count == 0`.
#[must_use]
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    if start <= 0.0 || factor <= 1.0 || count == 0 {
        return Vec::new();
    }
    std::iter::successors(Some(start), |b| Some(b * factor))
        .take(count)
        .collect()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            subsystem: String::new(),
            const_labels: BTreeMap::new(),
            enable_latency_metrics: true,
            enable_bandwidth_metrics: true,
            enable_path_metrics: false,
            latency_buckets: default_latency_buckets(),
            size_buckets: default_size_buckets(),
            max_tracked_paths: default_max_tracked_paths(),
            path_sample_rate: default_path_sample_rate(),
            hooks: Hooks::default(),
        }
    }
}

impl MetricsConfig {
    /// Sets the operation hook.
    #[must_use]
    pub fn with_on_operation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Measurement<'_>) + Send + Sync + 'static,
    {
        self.hooks.on_operation = Some(Arc::new(hook));
        self
    }

    /// Sets the error hook.
    #[must_use]
    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(Operation, &io::Error) + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(hook));
        self
    }

    /// Adds a constant label.
    #[must_use]
    pub fn with_const_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.const_labels.insert(name.into(), value.into());
        self
    }

    /// Fills in defaults for empty or zero fields.
    pub fn apply_defaults(&mut self) {
        if self.namespace.is_empty() {
            self.namespace = default_namespace();
        }
        if self.latency_buckets.is_empty() {
            self.latency_buckets = default_latency_buckets();
        }
        if self.size_buckets.is_empty() {
            self.size_buckets = default_size_buckets();
        }
        if self.max_tracked_paths == 0 {
            self.max_tracked_paths = default_max_tracked_paths();
        }
        if self.path_sample_rate == 0.0 {
            self.path_sample_rate = default_path_sample_rate();
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if names, buckets or rates are invalid.
    pub fn validate(&self) -> Result<()> {
        if !is_metric_name(&self.namespace) {
            return Err(MetricsError::config(format!(
                "invalid namespace: {:?}",
                self.namespace
            )));
        }
        if !self.subsystem.is_empty() && !is_metric_name(&self.subsystem) {
            return Err(MetricsError::config(format!(
                "invalid subsystem: {:?}",
                self.subsystem
            )));
        }
        for name in self.const_labels.keys() {
            if !is_label_name(name) {
                return Err(MetricsError::config(format!("invalid label name: {name:?}")));
            }
        }
        validate_buckets("latency_buckets", &self.latency_buckets)?;
        validate_buckets("size_buckets", &self.size_buckets)?;
        if !(self.path_sample_rate > 0.0 && self.path_sample_rate <= 1.0) {
            return Err(MetricsError::config(
                "path_sample_rate must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Loads configuration from a TOML file, applying defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MetricsError::config(format!("failed to read config: {e}")))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| MetricsError::config(format!("failed to parse config: {e}")))?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }
}

fn validate_buckets(field: &str, buckets: &[f64]) -> Result<()> {
    if buckets.iter().any(|b| !b.is_finite()) {
        return Err(MetricsError::config(format!("{field} must be finite")));
    }
    if buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(MetricsError::config(format!(
            "{field} must be strictly increasing"
        )));
    }
    Ok(())
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, not starting with `__`.
fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    !name.starts_with("__")
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
