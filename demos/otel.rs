//! Dual-export Example
//!
//! Reports every operation to the pull collector and to OpenTelemetry at
//! the same time, with one `fs.operation` span per call nested under the
//! request that made it.
//!
//! No meter provider is installed here, so the OpenTelemetry side records
//! into the global no-op provider; an application installs its SDK provider
//! before wrapping. Spans are printed by the `fmt` subscriber.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=metricsfs=info cargo run --example otel
//! ```

use metricsfs::prelude::*;
use metricsfs_test::MemFs;
use opentelemetry::KeyValue;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let otel = OtelConfig::default()
        .with_tracing()
        .with_attribute(KeyValue::new("service.name", "metricsfs-demo"));
    let (fs, collector) =
        metricsfs::wrap_with_otel(MemFs::new(), MetricsConfig::default(), otel)?;

    for user in ["alice", "bob"] {
        let request = tracing::info_span!("upload", user);
        let path = format!("/uploads/{user}.bin");

        fs.mkdir_all_with_context(&request, "/uploads", 0o755)?;
        let mut f = fs.create_with_context(&request, &path)?;
        f.write(&[0u8; 4096])?;
        f.sync()?;
        f.close()?;
    }

    if let Err(err) = fs.open("/uploads/carol.bin") {
        tracing::info!(error = %err, "expected failure");
    }

    let snap = collector.snapshot();
    println!(
        "operations: {}, bytes written: {}, open files now: {}",
        snap.counter("fs_operations_total", &[]),
        snap.counter("fs_bytes_written_total", &[]),
        snap.gauge("fs_open_files", &[]).unwrap_or_default(),
    );

    Ok(())
}
