//! Load testing for instrumented filesystems.
//!
//! # Toyota Way: Heijunka (平準化)
//! Level loading to understand capacity limits.
//!
//! # Implementation
//! Uses one OS thread per simulated user, so intercepted calls, handle
//! bookkeeping and observer updates race the way they do in production.
//! Collects latency metrics and computes percentiles.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use metricsfs_core::{File, FileSystem};

use crate::error::{Result, TestError};

/// Load test configuration.
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    /// Number of concurrent users/workers.
    pub concurrent_users: u32,
    /// Ramp-up duration (time to reach full concurrency).
    pub ramp_up: Duration,
    /// Test duration (after ramp-up completes).
    pub duration: Duration,
    /// Requests per user (if set, stops after this many requests per user).
    pub requests_per_user: Option<u32>,
    /// Target requests per second (rate limiting).
    pub target_rps: Option<f64>,
    /// Fail the run if it takes longer than this.
    pub deadline: Option<Duration>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            concurrent_users: 10,
            ramp_up: Duration::from_secs(1),
            duration: Duration::from_secs(10),
            requests_per_user: None,
            target_rps: None,
            deadline: None,
        }
    }
}

impl LoadTestConfig {
    /// Creates a light load test config.
    #[must_use]
    pub fn light() -> Self {
        Self {
            concurrent_users: 5,
            duration: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Creates a heavy load test config.
    #[must_use]
    pub fn heavy() -> Self {
        Self {
            concurrent_users: 64,
            ramp_up: Duration::from_secs(5),
            duration: Duration::from_secs(60),
            ..Default::default()
        }
    }

    /// Creates a quick config for testing (short durations).
    #[must_use]
    pub fn quick() -> Self {
        Self {
            concurrent_users: 4,
            ramp_up: Duration::from_millis(20),
            duration: Duration::from_secs(5),
            requests_per_user: Some(10),
            target_rps: None,
            deadline: None,
        }
    }
}

/// Shared metrics for concurrent load test workers.
#[derive(Default)]
struct LoadMetrics {
    total_requests: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    latencies_us: Mutex<Vec<u64>>,
}

impl LoadMetrics {
    fn record(&self, success: bool, latency_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
            self.latencies_us.lock().push(latency_us);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Request handler function type.
/// Takes a user_id and request_id, returns success (true) or failure (false).
pub type RequestHandler = Arc<dyn Fn(u32, u64) -> bool + Send + Sync>;

/// Handler running one file lifecycle per request against `fs`:
/// create, write, close, stat, open, read, close, remove.
///
/// Each user works under `/load/<user_id>`.
pub fn file_workload<F>(fs: Arc<F>, payload: usize) -> RequestHandler
where
    F: FileSystem + 'static,
{
    let data = vec![b'x'; payload];
    Arc::new(move |user_id, request_id| {
        let dir = format!("/load/{user_id}");
        let path = format!("{dir}/{request_id}");
        let cycle = || -> std::io::Result<()> {
            fs.mkdir_all(&dir, 0o755)?;
            let mut f = fs.create(&path)?;
            f.write(&data)?;
            f.close()?;
            fs.stat(&path)?;
            let mut f = fs.open(&path)?;
            let mut buf = vec![0u8; data.len()];
            f.read(&mut buf)?;
            f.close()?;
            fs.remove(&path)
        };
        cycle().is_ok()
    })
}

/// Load tester for filesystems.
pub struct LoadTester {
    config: LoadTestConfig,
    handler: RequestHandler,
}

impl LoadTester {
    /// Creates a load tester calling `handler` for each request.
    #[must_use]
    pub fn new(config: LoadTestConfig, handler: RequestHandler) -> Self {
        Self { config, handler }
    }

    /// Runs the load test with concurrent workers.
    ///
    /// # Load Test Phases (Toyota Way: Heijunka)
    /// 1. Ramp-up: Gradually start workers to avoid thundering herd
    /// 2. Steady-state: All workers active, collecting metrics
    /// 3. Cool-down: Workers complete, aggregate results
    ///
    /// # Errors
    /// Returns an error if the config has no users, a worker panics, or the
    /// run exceeds its deadline.
    pub fn run(&self) -> Result<LoadTestReport> {
        if self.config.concurrent_users == 0 {
            return Err(TestError::load_test("concurrent_users must be positive"));
        }

        tracing::info!(
            users = self.config.concurrent_users,
            duration = ?self.config.duration,
            ramp_up = ?self.config.ramp_up,
            "starting load test"
        );

        let metrics = LoadMetrics::default();
        let start_time = Instant::now();
        let test_end = start_time + self.config.ramp_up + self.config.duration;
        let users = self.config.concurrent_users;
        let ramp_delay = self.config.ramp_up / (users - 1).max(1);
        let interval = self
            .config
            .target_rps
            .filter(|rps| *rps > 0.0)
            .map(|rps| Duration::from_secs_f64(f64::from(users) / rps));

        let panicked = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..users)
                .map(|user_id| {
                    let metrics = &metrics;
                    let handler = &self.handler;
                    let requests_per_user = self.config.requests_per_user;
                    scope.spawn(move || {
                        std::thread::sleep(ramp_delay * user_id);

                        let mut request_id = 0u64;
                        loop {
                            if Instant::now() >= test_end {
                                break;
                            }
                            if requests_per_user.is_some_and(|max| request_id >= u64::from(max)) {
                                break;
                            }

                            let req_start = Instant::now();
                            let success = handler(user_id, request_id);
                            let latency_us = req_start.elapsed().as_micros() as u64;
                            metrics.record(success, latency_us);
                            request_id += 1;

                            if let Some(delay) = interval {
                                std::thread::sleep(delay);
                            }
                        }
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|w| w.join())
                .filter(std::result::Result::is_err)
                .count()
        });

        if panicked > 0 {
            return Err(TestError::load_test(format!("{panicked} workers panicked")));
        }

        let elapsed = start_time.elapsed();
        if let Some(deadline) = self.config.deadline
            && elapsed > deadline
        {
            return Err(TestError::Timeout(deadline));
        }

        let total_requests = metrics.total_requests.load(Ordering::Relaxed);
        let successful = metrics.successful.load(Ordering::Relaxed);
        let failed = metrics.failed.load(Ordering::Relaxed);

        let mut latencies = metrics.latencies_us.into_inner();
        latencies.sort_unstable();

        let throughput_rps = if elapsed.as_secs_f64() > 0.0 {
            total_requests as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let error_rate = if total_requests > 0 {
            failed as f64 / total_requests as f64
        } else {
            0.0
        };

        let report = LoadTestReport {
            total_requests,
            successful,
            failed,
            latency_p50_us: percentile(&latencies, 50),
            latency_p95_us: percentile(&latencies, 95),
            latency_p99_us: percentile(&latencies, 99),
            throughput_rps,
            error_rate,
        };

        tracing::info!(
            total = report.total_requests,
            successful = report.successful,
            failed = report.failed,
            throughput_rps = format!("{throughput_rps:.2}"),
            p50_us = report.latency_p50_us,
            p99_us = report.latency_p99_us,
            "load test completed"
        );

        Ok(report)
    }

    /// Returns the test config.
    #[must_use]
    pub const fn config(&self) -> &LoadTestConfig {
        &self.config
    }
}

/// Computes percentile from sorted slice.
fn percentile(sorted: &[u64], p: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (sorted.len() * p / 100).min(sorted.len() - 1);
    sorted[idx]
}

/// Load test report.
#[derive(Debug, Clone)]
pub struct LoadTestReport {
    /// Total requests made.
    pub total_requests: u64,
    /// Successful requests.
    pub successful: u64,
    /// Failed requests.
    pub failed: u64,
    /// P50 latency in microseconds.
    pub latency_p50_us: u64,
    /// P95 latency in microseconds.
    pub latency_p95_us: u64,
    /// P99 latency in microseconds.
    pub latency_p99_us: u64,
    /// Throughput in requests per second.
    pub throughput_rps: f64,
    /// Error rate (0.0 to 1.0).
    pub error_rate: f64,
}

impl LoadTestReport {
    /// Returns true if the test passed (error rate below 1%).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error_rate < 0.01
    }

    /// Returns success rate (0.0 to 1.0).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests > 0 {
            self.successful as f64 / self.total_requests as f64
        } else {
            0.0
        }
    }
}
