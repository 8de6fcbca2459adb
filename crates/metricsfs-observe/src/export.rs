//! Text exposition format (version 0.0.4).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;

use crate::error::{ObserveError, Result};
use crate::snapshot::{MetricFamily, MetricValue};

/// Content type of [`encode_text`] output.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Renders families in text exposition format.
#[must_use]
pub fn encode_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());
        for metric in &family.metrics {
            match &metric.value {
                MetricValue::Counter(v) => {
                    sample(&mut out, &family.name, &metric.labels, None, &v.to_string());
                }
                MetricValue::Gauge(v) => {
                    sample(&mut out, &family.name, &metric.labels, None, &v.to_string());
                }
                MetricValue::Histogram(h) => {
                    let bucket = format!("{}_bucket", family.name);
                    for b in &h.buckets {
                        let le = format_float(b.upper_bound);
                        sample(
                            &mut out,
                            &bucket,
                            &metric.labels,
                            Some(&le),
                            &b.cumulative_count.to_string(),
                        );
                    }
                    sample(
                        &mut out,
                        &bucket,
                        &metric.labels,
                        Some("+Inf"),
                        &h.count.to_string(),
                    );
                    sample(
                        &mut out,
                        &format!("{}_sum", family.name),
                        &metric.labels,
                        None,
                        &format_float(h.sum),
                    );
                    sample(
                        &mut out,
                        &format!("{}_count", family.name),
                        &metric.labels,
                        None,
                        &h.count.to_string(),
                    );
                }
            }
        }
    }
    out
}

/// Renders families into `writer`.
///
/// # Errors
/// Returns [`ObserveError::Export`] if the writer fails.
pub fn write_text<W: io::Write>(mut writer: W, families: &[MetricFamily]) -> Result<()> {
    writer
        .write_all(encode_text(families).as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| ObserveError::export(e.to_string()))
}

fn sample(
    out: &mut String,
    name: &str,
    labels: &BTreeMap<String, String>,
    le: Option<&str>,
    value: &str,
) {
    out.push_str(name);
    if !labels.is_empty() || le.is_some() {
        out.push('{');
        let pairs = labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(le.map(|le| ("le", le)));
        for (i, (k, v)) in pairs.enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{k}=\"{}\"", escape_label(v));
        }
        out.push('}');
    }
    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let inf = if v > 0.0 { "+Inf" } else { "-Inf" };
        inf.to_string()
    } else {
        v.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
