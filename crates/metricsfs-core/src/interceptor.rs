//! Filesystem interceptor.
//!
//! [`MetricsFs`] presents the same [`FileSystem`] surface as the resource it
//! wraps. Each call is timed, turned into a [`Measurement`] and handed to the
//! observer; the delegate's result, including the exact `io::Error` value,
//! is returned unchanged. Handles come back wrapped in [`MetricsFile`].
//!
//! Every operation also has a `*_with_context` form taking a parent
//! [`Span`]. The plain forms parent their spans on [`Span::current`].

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::Span;

use crate::error::unsupported;
use crate::file::MetricsFile;
use crate::fs::{Capabilities, FileInfo, FileSystem};
use crate::observer::OperationObserver;
use crate::types::{Measurement, OpenFlags, OpenMode, Operation};

/// One intercepted call: span, timing and the resulting measurement.
pub(crate) struct Call<'a, O: ?Sized> {
    observer: &'a O,
    op: Operation,
    span: Span,
}

impl<'a, O: OperationObserver + ?Sized> Call<'a, O> {
    pub(crate) fn begin(observer: &'a O, parent: &Span, op: Operation, path: &str) -> Self {
        let call = Self::unresolved(observer, parent, op);
        call.record_path(path);
        call
    }

    /// Starts a call whose path is only known once the delegate returns.
    pub(crate) fn unresolved(observer: &'a O, parent: &Span, op: Operation) -> Self {
        let span = if observer.traces() {
            tracing::info_span!(
                target: "metricsfs",
                parent: parent,
                "fs.operation",
                fs.operation = op.as_str(),
                fs.path = tracing::field::Empty,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        } else {
            Span::none()
        };
        Self { observer, op, span }
    }

    pub(crate) fn record_path(&self, path: &str) {
        self.span.record("fs.path", path);
    }

    pub(crate) fn run<T>(&self, f: impl FnOnce() -> io::Result<T>) -> (io::Result<T>, Duration) {
        self.span.in_scope(|| {
            let start = Instant::now();
            let result = f();
            (result, start.elapsed())
        })
    }

    /// Records the measurement, marks the span failed on error, then closes
    /// the span by dropping it.
    pub(crate) fn finish<T>(self, elapsed: Duration, path: &str, bytes: i64, result: &io::Result<T>) {
        let _entered = self.span.enter();
        let outcome = result.as_ref().err();
        self.observer
            .observe(&Measurement::new(self.op, elapsed, bytes, path, outcome));
        if let Some(err) = outcome {
            self.span.record("otel.status_code", "ERROR");
            self.span
                .record("error.message", tracing::field::display(err));
        }
    }
}

/// Runs `f` as `op` on `path` and records it.
pub(crate) fn instrument<O, T>(
    observer: &O,
    parent: &Span,
    op: Operation,
    path: &str,
    bytes: impl FnOnce(&io::Result<T>) -> i64,
    f: impl FnOnce() -> io::Result<T>,
) -> io::Result<T>
where
    O: OperationObserver + ?Sized,
{
    let call = Call::begin(observer, parent, op, path);
    let (result, elapsed) = call.run(f);
    call.finish(elapsed, path, bytes(&result), &result);
    result
}

pub(crate) fn no_bytes<T>(_: &io::Result<T>) -> i64 {
    0
}

/// Filesystem decorator recording every operation.
pub struct MetricsFs<F, O: ?Sized> {
    inner: F,
    observer: Arc<O>,
    capabilities: Capabilities,
}

impl<F: FileSystem, O: OperationObserver> MetricsFs<F, O> {
    /// Wraps `inner`, reporting to `observer`.
    pub fn new(inner: F, observer: O) -> Self {
        Self::with_observer(inner, Arc::new(observer))
    }
}

impl<F: FileSystem, O: OperationObserver + ?Sized> MetricsFs<F, O> {
    /// Wraps `inner`, reporting to a shared observer.
    pub fn with_observer(inner: F, observer: Arc<O>) -> Self {
        let capabilities = inner.capabilities();
        tracing::debug!(?capabilities, "wrapping filesystem");
        Self {
            inner,
            observer,
            capabilities,
        }
    }

    /// The observer receiving measurements.
    pub fn observer(&self) -> &Arc<O> {
        &self.observer
    }

    /// The wrapped filesystem.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Unwraps the filesystem.
    pub fn into_inner(self) -> F {
        self.inner
    }

    fn wrap(&self, file: F::File, path: &str, cx: &Span) -> MetricsFile<F::File, O> {
        MetricsFile::new(file, Arc::clone(&self.observer), path.to_owned(), cx.clone())
    }

    fn optional<T>(
        &self,
        cx: &Span,
        op: Operation,
        path: &str,
        bytes: impl FnOnce(&io::Result<T>) -> i64,
        f: impl FnOnce() -> io::Result<T>,
    ) -> io::Result<T> {
        if self.capabilities.supports(op) {
            instrument(&*self.observer, cx, op, path, bytes, f)
        } else {
            tracing::debug!(operation = %op, "wrapped filesystem does not support operation");
            instrument(&*self.observer, cx, op, path, bytes, || Err(unsupported(op)))
        }
    }

    /// [`FileSystem::open`] under `cx`.
    pub fn open_with_context(&self, cx: &Span, path: &str) -> io::Result<MetricsFile<F::File, O>> {
        let result = instrument(&*self.observer, cx, Operation::Open, path, no_bytes, || {
            self.inner.open(path)
        });
        self.observer.file_opened(OpenMode::Read);
        result.map(|file| self.wrap(file, path, cx))
    }

    /// [`FileSystem::open_file`] under `cx`.
    pub fn open_file_with_context(
        &self,
        cx: &Span,
        path: &str,
        flags: OpenFlags,
        perm: u32,
    ) -> io::Result<MetricsFile<F::File, O>> {
        let result = instrument(&*self.observer, cx, Operation::OpenFile, path, no_bytes, || {
            self.inner.open_file(path, flags, perm)
        });
        self.observer.file_opened(OpenMode::from_flags(flags));
        result.map(|file| self.wrap(file, path, cx))
    }

    /// [`FileSystem::create`] under `cx`.
    pub fn create_with_context(&self, cx: &Span, path: &str) -> io::Result<MetricsFile<F::File, O>> {
        let result = instrument(&*self.observer, cx, Operation::Create, path, no_bytes, || {
            self.inner.create(path)
        });
        self.observer.file_created();
        self.observer.file_opened(OpenMode::Write);
        result.map(|file| self.wrap(file, path, cx))
    }

    /// [`FileSystem::mkdir`] under `cx`.
    pub fn mkdir_with_context(&self, cx: &Span, path: &str, perm: u32) -> io::Result<()> {
        let result = instrument(&*self.observer, cx, Operation::Mkdir, path, no_bytes, || {
            self.inner.mkdir(path, perm)
        });
        self.observer.dir_operation(Operation::Mkdir);
        result
    }

    /// [`FileSystem::mkdir_all`] under `cx`.
    pub fn mkdir_all_with_context(&self, cx: &Span, path: &str, perm: u32) -> io::Result<()> {
        let result = instrument(&*self.observer, cx, Operation::MkdirAll, path, no_bytes, || {
            self.inner.mkdir_all(path, perm)
        });
        self.observer.dir_operation(Operation::MkdirAll);
        result
    }

    /// [`FileSystem::remove`] under `cx`.
    pub fn remove_with_context(&self, cx: &Span, path: &str) -> io::Result<()> {
        let result = instrument(&*self.observer, cx, Operation::Remove, path, no_bytes, || {
            self.inner.remove(path)
        });
        self.observer.dir_operation(Operation::Remove);
        result
    }

    /// [`FileSystem::remove_all`] under `cx`.
    pub fn remove_all_with_context(&self, cx: &Span, path: &str) -> io::Result<()> {
        let result = instrument(&*self.observer, cx, Operation::RemoveAll, path, no_bytes, || {
            self.inner.remove_all(path)
        });
        self.observer.dir_operation(Operation::RemoveAll);
        result
    }

    /// [`FileSystem::rename`] under `cx`. Recorded against `from`.
    pub fn rename_with_context(&self, cx: &Span, from: &str, to: &str) -> io::Result<()> {
        instrument(&*self.observer, cx, Operation::Rename, from, no_bytes, || {
            self.inner.rename(from, to)
        })
    }

    /// [`FileSystem::stat`] under `cx`.
    pub fn stat_with_context(&self, cx: &Span, path: &str) -> io::Result<FileInfo> {
        instrument(&*self.observer, cx, Operation::Stat, path, no_bytes, || {
            self.inner.stat(path)
        })
    }

    /// [`FileSystem::lstat`] under `cx`.
    pub fn lstat_with_context(&self, cx: &Span, path: &str) -> io::Result<FileInfo> {
        instrument(&*self.observer, cx, Operation::Lstat, path, no_bytes, || {
            self.inner.lstat(path)
        })
    }

    /// [`FileSystem::chmod`] under `cx`.
    pub fn chmod_with_context(&self, cx: &Span, path: &str, mode: u32) -> io::Result<()> {
        instrument(&*self.observer, cx, Operation::Chmod, path, no_bytes, || {
            self.inner.chmod(path, mode)
        })
    }

    /// [`FileSystem::chown`] under `cx`.
    pub fn chown_with_context(&self, cx: &Span, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        instrument(&*self.observer, cx, Operation::Chown, path, no_bytes, || {
            self.inner.chown(path, uid, gid)
        })
    }

    /// [`FileSystem::chtimes`] under `cx`.
    pub fn chtimes_with_context(
        &self,
        cx: &Span,
        path: &str,
        atime: SystemTime,
        mtime: SystemTime,
    ) -> io::Result<()> {
        instrument(&*self.observer, cx, Operation::Chtimes, path, no_bytes, || {
            self.inner.chtimes(path, atime, mtime)
        })
    }

    /// [`FileSystem::readlink`] under `cx`.
    pub fn readlink_with_context(&self, cx: &Span, path: &str) -> io::Result<String> {
        self.optional(cx, Operation::Readlink, path, no_bytes, || {
            self.inner.readlink(path)
        })
    }

    /// [`FileSystem::symlink`] under `cx`. Recorded against `link`.
    pub fn symlink_with_context(&self, cx: &Span, original: &str, link: &str) -> io::Result<()> {
        self.optional(cx, Operation::Symlink, link, no_bytes, || {
            self.inner.symlink(original, link)
        })
    }

    /// [`FileSystem::chdir`] under `cx`.
    pub fn chdir_with_context(&self, cx: &Span, dir: &str) -> io::Result<()> {
        self.optional(cx, Operation::Chdir, dir, no_bytes, || self.inner.chdir(dir))
    }

    /// [`FileSystem::getwd`] under `cx`. Recorded against the returned
    /// directory, or an empty path on failure.
    pub fn getwd_with_context(&self, cx: &Span) -> io::Result<String> {
        let call = Call::unresolved(&*self.observer, cx, Operation::Getwd);
        let (result, elapsed) = if self.capabilities.supports(Operation::Getwd) {
            call.run(|| self.inner.getwd())
        } else {
            tracing::debug!(operation = %Operation::Getwd, "wrapped filesystem does not support operation");
            call.run(|| Err(unsupported(Operation::Getwd)))
        };
        let path = result.as_deref().unwrap_or_default();
        if result.is_ok() {
            call.record_path(path);
        }
        call.finish(elapsed, path, 0, &result);
        result
    }

    /// [`FileSystem::truncate`] under `cx`. The target size is reported as
    /// the measurement's byte count.
    pub fn truncate_with_context(&self, cx: &Span, path: &str, size: u64) -> io::Result<()> {
        let bytes = i64::try_from(size).unwrap_or(i64::MAX);
        self.optional(cx, Operation::Truncate, path, |_| bytes, || {
            self.inner.truncate(path, size)
        })
    }
}

impl<F, O> FileSystem for MetricsFs<F, O>
where
    F: FileSystem,
    O: OperationObserver + ?Sized,
{
    type File = MetricsFile<F::File, O>;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn open(&self, path: &str) -> io::Result<Self::File> {
        self.open_with_context(&Span::current(), path)
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> io::Result<Self::File> {
        self.open_file_with_context(&Span::current(), path, flags, perm)
    }

    fn create(&self, path: &str) -> io::Result<Self::File> {
        self.create_with_context(&Span::current(), path)
    }

    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()> {
        self.mkdir_with_context(&Span::current(), path, perm)
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()> {
        self.mkdir_all_with_context(&Span::current(), path, perm)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.remove_with_context(&Span::current(), path)
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        self.remove_all_with_context(&Span::current(), path)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.rename_with_context(&Span::current(), from, to)
    }

    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        self.stat_with_context(&Span::current(), path)
    }

    fn lstat(&self, path: &str) -> io::Result<FileInfo> {
        self.lstat_with_context(&Span::current(), path)
    }

    fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        self.chmod_with_context(&Span::current(), path, mode)
    }

    fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        self.chown_with_context(&Span::current(), path, uid, gid)
    }

    fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        self.chtimes_with_context(&Span::current(), path, atime, mtime)
    }

    fn readlink(&self, path: &str) -> io::Result<String> {
        self.readlink_with_context(&Span::current(), path)
    }

    fn symlink(&self, original: &str, link: &str) -> io::Result<()> {
        self.symlink_with_context(&Span::current(), original, link)
    }

    fn chdir(&self, dir: &str) -> io::Result<()> {
        self.chdir_with_context(&Span::current(), dir)
    }

    fn getwd(&self) -> io::Result<String> {
        self.getwd_with_context(&Span::current())
    }

    fn temp_dir(&self) -> String {
        if self.capabilities.temp_dir {
            self.inner.temp_dir()
        } else {
            std::env::temp_dir().to_string_lossy().into_owned()
        }
    }

    fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        self.truncate_with_context(&Span::current(), path, size)
    }

    fn separator(&self) -> char {
        self.inner.separator()
    }

    fn list_separator(&self) -> char {
        self.inner.list_separator()
    }
}
