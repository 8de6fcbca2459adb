//! Chaos injection for filesystem resilience testing.
//!
//! [`ChaosFs`] wraps any [`FileSystem`] and, while its [`ChaosInjector`] is
//! active, delays calls and replaces their outcome with an injected error.
//! Wrapping a `ChaosFs` in a `MetricsFs` exercises the error paths of the
//! interceptor against realistic, randomly timed failures.
//!
//! # Reference
//! Netflix. (2012). Chaos Monkey. GitHub.
//! <https://github.com/Netflix/chaosmonkey>

use std::io::{self, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use metricsfs_core::{Capabilities, File, FileInfo, FileSystem, OpenFlags, Operation};

use crate::error::{Result, TestError};

/// Chaos injection configuration.
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    /// Latency injection: (probability, delay).
    pub latency_injection: Option<(f64, Duration)>,
    /// Error injection probability.
    pub error_injection: Option<f64>,
    /// Kind of the injected errors.
    pub error_kind: io::ErrorKind,
    /// Operations eligible for injection; all when empty.
    pub operations: Vec<Operation>,
    /// Seed of the injection decisions.
    pub seed: u64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            latency_injection: None,
            error_injection: None,
            error_kind: io::ErrorKind::Other,
            operations: Vec::new(),
            seed: 0x5eed,
        }
    }
}

impl ChaosConfig {
    /// Creates a new chaos config with latency injection.
    #[must_use]
    pub fn latency(probability: f64, delay: Duration) -> Self {
        Self {
            latency_injection: Some((probability, delay)),
            ..Default::default()
        }
    }

    /// Creates a new chaos config with error injection.
    #[must_use]
    pub fn errors(probability: f64) -> Self {
        Self {
            error_injection: Some(probability),
            ..Default::default()
        }
    }

    /// Sets the kind of injected errors.
    #[must_use]
    pub fn with_error_kind(mut self, kind: io::ErrorKind) -> Self {
        self.error_kind = kind;
        self
    }

    /// Limits injection to `operations`.
    #[must_use]
    pub fn only(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    /// Sets the decision seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates probabilities.
    ///
    /// # Errors
    /// Returns [`TestError::Chaos`] if a probability is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let probabilities = self
            .latency_injection
            .map(|(p, _)| ("latency", p))
            .into_iter()
            .chain(self.error_injection.map(|p| ("error", p)));
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(TestError::chaos(format!(
                    "{name} probability {p} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    fn targets(&self, op: Operation) -> bool {
        self.operations.is_empty() || self.operations.contains(&op)
    }
}

/// Decides, per call, whether to inject latency or an error.
#[derive(Debug)]
pub struct ChaosInjector {
    config: ChaosConfig,
    active: AtomicBool,
    state: AtomicU64,
    latencies: AtomicU64,
    errors: AtomicU64,
}

impl ChaosInjector {
    /// Creates an inactive injector.
    ///
    /// # Errors
    /// Returns [`TestError::Chaos`] if the config is invalid.
    pub fn new(config: ChaosConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: AtomicU64::new(config.seed),
            config,
            active: AtomicBool::new(false),
            latencies: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    /// Starts chaos injection.
    pub fn start(&self) {
        tracing::warn!(config = ?self.config, "starting chaos injection");
        self.active.store(true, Ordering::SeqCst);
    }

    /// Stops chaos injection.
    pub fn stop(&self) {
        tracing::info!("stopping chaos injection");
        self.active.store(false, Ordering::SeqCst);
    }

    /// Returns true if chaos injection is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns the chaos config.
    #[must_use]
    pub const fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Latencies injected so far.
    #[must_use]
    pub fn injected_latencies(&self) -> u64 {
        self.latencies.load(Ordering::Relaxed)
    }

    /// Errors injected so far.
    #[must_use]
    pub fn injected_errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Applies chaos to one call of `op`.
    ///
    /// Sleeps if latency is injected, then returns the injected error, if any.
    pub fn inject(&self, op: Operation) -> io::Result<()> {
        if !self.is_active() || !self.config.targets(op) {
            return Ok(());
        }

        if let Some((probability, delay)) = self.config.latency_injection
            && self.roll(probability)
        {
            tracing::debug!(operation = %op, ?delay, "injecting latency");
            self.latencies.fetch_add(1, Ordering::Relaxed);
            std::thread::sleep(delay);
        }

        if let Some(probability) = self.config.error_injection
            && self.roll(probability)
        {
            tracing::debug!(operation = %op, kind = ?self.config.error_kind, "injecting error");
            self.errors.fetch_add(1, Ordering::Relaxed);
            return Err(io::Error::new(
                self.config.error_kind,
                format!("chaos: injected {op} failure"),
            ));
        }

        Ok(())
    }

    /// Returns true with probability `p`.
    fn roll(&self, p: f64) -> bool {
        if p >= 1.0 {
            return true;
        }
        if p <= 0.0 {
            return false;
        }
        let x = splitmix64(self.state.fetch_add(GOLDEN_GAMMA, Ordering::Relaxed));
        ((x >> 11) as f64 / (1u64 << 53) as f64) < p
    }
}

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// SplitMix64 finalizer (not cryptographically secure).
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filesystem wrapper
// ═══════════════════════════════════════════════════════════════════════════════

/// Filesystem that injects faults into a delegate.
#[derive(Debug, Clone)]
pub struct ChaosFs<F> {
    inner: F,
    injector: Arc<ChaosInjector>,
}

impl<F: FileSystem> ChaosFs<F> {
    /// Wraps `inner`. The injector starts inactive.
    ///
    /// # Errors
    /// Returns [`TestError::Chaos`] if the config is invalid.
    pub fn new(inner: F, config: ChaosConfig) -> Result<Self> {
        Ok(Self {
            inner,
            injector: Arc::new(ChaosInjector::new(config)?),
        })
    }

    /// Injector shared by the filesystem and its handles.
    #[must_use]
    pub fn injector(&self) -> &Arc<ChaosInjector> {
        &self.injector
    }

    /// The wrapped filesystem.
    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }

    fn wrap(&self, file: F::File) -> ChaosFile<F::File> {
        ChaosFile {
            file,
            injector: Arc::clone(&self.injector),
        }
    }
}

impl<F: FileSystem> FileSystem for ChaosFs<F> {
    type File = ChaosFile<F::File>;

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn open(&self, path: &str) -> io::Result<Self::File> {
        self.injector.inject(Operation::Open)?;
        self.inner.open(path).map(|f| self.wrap(f))
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> io::Result<Self::File> {
        self.injector.inject(Operation::OpenFile)?;
        self.inner.open_file(path, flags, perm).map(|f| self.wrap(f))
    }

    fn create(&self, path: &str) -> io::Result<Self::File> {
        self.injector.inject(Operation::Create)?;
        self.inner.create(path).map(|f| self.wrap(f))
    }

    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()> {
        self.injector.inject(Operation::Mkdir)?;
        self.inner.mkdir(path, perm)
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()> {
        self.injector.inject(Operation::MkdirAll)?;
        self.inner.mkdir_all(path, perm)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.injector.inject(Operation::Remove)?;
        self.inner.remove(path)
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        self.injector.inject(Operation::RemoveAll)?;
        self.inner.remove_all(path)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.injector.inject(Operation::Rename)?;
        self.inner.rename(from, to)
    }

    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        self.injector.inject(Operation::Stat)?;
        self.inner.stat(path)
    }

    fn lstat(&self, path: &str) -> io::Result<FileInfo> {
        self.injector.inject(Operation::Lstat)?;
        self.inner.lstat(path)
    }

    fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        self.injector.inject(Operation::Chmod)?;
        self.inner.chmod(path, mode)
    }

    fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        self.injector.inject(Operation::Chown)?;
        self.inner.chown(path, uid, gid)
    }

    fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        self.injector.inject(Operation::Chtimes)?;
        self.inner.chtimes(path, atime, mtime)
    }

    fn readlink(&self, path: &str) -> io::Result<String> {
        self.injector.inject(Operation::Readlink)?;
        self.inner.readlink(path)
    }

    fn symlink(&self, original: &str, link: &str) -> io::Result<()> {
        self.injector.inject(Operation::Symlink)?;
        self.inner.symlink(original, link)
    }

    fn chdir(&self, dir: &str) -> io::Result<()> {
        self.injector.inject(Operation::Chdir)?;
        self.inner.chdir(dir)
    }

    fn getwd(&self) -> io::Result<String> {
        self.injector.inject(Operation::Getwd)?;
        self.inner.getwd()
    }

    fn temp_dir(&self) -> String {
        self.inner.temp_dir()
    }

    fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        self.injector.inject(Operation::Truncate)?;
        self.inner.truncate(path, size)
    }

    fn separator(&self) -> char {
        self.inner.separator()
    }

    fn list_separator(&self) -> char {
        self.inner.list_separator()
    }
}

/// Handle of a [`ChaosFs`].
#[derive(Debug)]
pub struct ChaosFile<H> {
    file: H,
    injector: Arc<ChaosInjector>,
}

impl<H: File> File for ChaosFile<H> {
    fn name(&self) -> &str {
        self.file.name()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.injector.inject(Operation::Read)?;
        self.file.read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.injector.inject(Operation::Read)?;
        self.file.read_at(buf, offset)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.injector.inject(Operation::Write)?;
        self.file.write(buf)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.injector.inject(Operation::Write)?;
        self.file.write_at(buf, offset)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.injector.inject(Operation::Seek)?;
        self.file.seek(pos)
    }

    fn stat(&self) -> io::Result<FileInfo> {
        self.injector.inject(Operation::Stat)?;
        self.file.stat()
    }

    fn sync(&mut self) -> io::Result<()> {
        self.injector.inject(Operation::Sync)?;
        self.file.sync()
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.injector.inject(Operation::Truncate)?;
        self.file.truncate(size)
    }

    fn readdir(&mut self, limit: Option<usize>) -> io::Result<Vec<FileInfo>> {
        self.injector.inject(Operation::Readdir)?;
        self.file.readdir(limit)
    }

    /// The delegate is closed even when a failure is injected.
    fn close(self) -> io::Result<()> {
        let injected = self.injector.inject(Operation::Close);
        let closed = self.file.close();
        injected.and(closed)
    }
}
