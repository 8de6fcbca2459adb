//! Pull-model Example
//!
//! Wraps an in-memory filesystem, runs a small workload and prints the
//! resulting metrics in text exposition format.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic
//!
//! # Track per-path access counts
//! cargo run --example basic -- --paths
//!
//! # Load the collector configuration from TOML
//! cargo run --example basic -- --config metricsfs.toml
//!
//! # Show collector debug events
//! RUST_LOG=metricsfs=debug cargo run --example basic
//! ```

use metricsfs::prelude::*;
use metricsfs_test::MemFs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).ok_or("--config needs a path")?;
            MetricsConfig::load(path)?
        }
        None => MetricsConfig::default(),
    };
    if args.iter().any(|a| a == "--paths") {
        config.enable_path_metrics = true;
    }
    let config = config.with_on_error(|op, err| {
        tracing::warn!(operation = %op, error = %err, "filesystem operation failed");
    });

    let (fs, collector) = metricsfs::wrap_with_config(MemFs::new(), config)?;

    println!("=== metricsfs basic example ===\n");

    fs.mkdir_all("/var/log/app", 0o755)?;
    for day in 1..=3 {
        let mut f = fs.create(&format!("/var/log/app/{day}.log"))?;
        for line in 0..day * 10 {
            f.write_str(&format!("day {day} line {line}\n"))?;
        }
        f.close()?;
    }

    let mut f = fs.open("/var/log/app/3.log")?;
    let mut buf = vec![0u8; 256];
    while f.read(&mut buf)? > 0 {}
    f.close()?;

    let mut dir = fs.open("/var/log/app")?;
    println!("log files: {:?}", dir.readdir_names(None)?);
    dir.close()?;

    // Expected failures: missing file and non-empty directory.
    let _ = fs.stat("/var/log/app/4.log");
    let _ = fs.remove("/var/log");

    let snap = collector.snapshot();
    println!(
        "bytes written: {}, bytes read: {}, errors: {}, max open files: {}\n",
        snap.counter("fs_bytes_written_total", &[]),
        snap.counter("fs_bytes_read_total", &[]),
        snap.counter("fs_errors_total", &[]),
        snap.gauge("fs_open_files_max", &[]).unwrap_or_default(),
    );

    let registry = Registry::new();
    registry.register(collector)?;
    print!("{}", registry.encode());

    Ok(())
}
