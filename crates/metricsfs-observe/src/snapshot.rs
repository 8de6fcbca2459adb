//! Point-in-time metric snapshots.
//!
//! A [`Snapshot`] is a plain value: families of metrics with their labels
//! already resolved. It can be inspected in tests, serialized with serde, or
//! rendered with [`encode_text`](crate::encode_text).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic counter.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Bucketed distribution.
    Histogram,
}

impl MetricKind {
    /// Exposition type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

/// One histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Inclusive upper bound.
    pub upper_bound: f64,
    /// Observations less than or equal to the bound.
    pub cumulative_count: u64,
}

/// Histogram state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    /// Cumulative buckets in bound order, `+Inf` excluded.
    pub buckets: Vec<Bucket>,
    /// Total observations, equal to the `+Inf` bucket.
    pub count: u64,
    /// Sum of observed values.
    pub sum: f64,
}

impl HistogramSnapshot {
    /// Mean observation, zero when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    /// Counter value.
    Counter(u64),
    /// Gauge value.
    Gauge(i64),
    /// Histogram state.
    Histogram(HistogramSnapshot),
}

/// One labelled metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Labels, constant labels included.
    pub labels: BTreeMap<String, String>,
    /// Value.
    pub value: MetricValue,
}

impl Metric {
    /// Returns true if every pair in `labels` is present with that value.
    #[must_use]
    pub fn matches(&self, labels: &[(&str, &str)]) -> bool {
        labels
            .iter()
            .all(|(k, v)| self.labels.get(*k).is_some_and(|actual| actual == v))
    }
}

/// Metrics sharing a name, help text and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    /// Fully qualified name.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Type.
    pub kind: MetricKind,
    /// Members.
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    /// Creates an empty family.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            metrics: Vec::new(),
        }
    }

    /// Adds a member.
    pub fn push(&mut self, labels: BTreeMap<String, String>, value: MetricValue) {
        self.metrics.push(Metric { labels, value });
    }
}

/// All families reported by a collector at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Families in collection order.
    pub families: Vec<MetricFamily>,
}

impl Snapshot {
    /// Family named `name`.
    #[must_use]
    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Members of `name` whose labels include `labels`.
    pub fn find<'a, 'b>(
        &'a self,
        name: &str,
        labels: &'b [(&'b str, &'b str)],
    ) -> impl Iterator<Item = &'a Metric> + use<'a, 'b> {
        self.family(name)
            .into_iter()
            .flat_map(|f| f.metrics.iter())
            .filter(move |m| m.matches(labels))
    }

    /// Sum of the counters of `name` whose labels include `labels`.
    ///
    /// Zero when nothing matches.
    #[must_use]
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.find(name, labels)
            .filter_map(|m| match m.value {
                MetricValue::Counter(v) => Some(v),
                _ => None,
            })
            .sum()
    }

    /// First gauge of `name` whose labels include `labels`.
    #[must_use]
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<i64> {
        self.find(name, labels).find_map(|m| match m.value {
            MetricValue::Gauge(v) => Some(v),
            _ => None,
        })
    }

    /// First histogram of `name` whose labels include `labels`.
    #[must_use]
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<&HistogramSnapshot> {
        self.find(name, labels).find_map(|m| match &m.value {
            MetricValue::Histogram(h) => Some(h),
            _ => None,
        })
    }
}
