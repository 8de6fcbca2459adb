//! Instrumented file handle.

use std::io::{self, SeekFrom};
use std::sync::Arc;

use tracing::Span;

use crate::fs::{File, FileInfo};
use crate::interceptor::{instrument, no_bytes};
use crate::observer::OperationObserver;
use crate::types::Operation;

/// Byte count of a read or write outcome.
pub(crate) fn transferred(result: &io::Result<usize>) -> i64 {
    result
        .as_ref()
        .map_or(0, |n| i64::try_from(*n).unwrap_or(i64::MAX))
}

/// Reports the handle closed exactly once, on drop.
struct OpenGuard<O: OperationObserver + ?Sized> {
    observer: Arc<O>,
}

impl<O: OperationObserver + ?Sized> Drop for OpenGuard<O> {
    fn drop(&mut self) {
        self.observer.handle_closed();
    }
}

/// A handle returned by [`MetricsFs`](crate::MetricsFs).
///
/// Every call is measured against the path the handle was opened with and
/// traced under the context it was opened in. Closing consumes the handle;
/// dropping it without closing still releases its open-handle count.
pub struct MetricsFile<F, O: OperationObserver + ?Sized> {
    file: F,
    guard: OpenGuard<O>,
    path: String,
    context: Span,
}

impl<F: File, O: OperationObserver + ?Sized> MetricsFile<F, O> {
    pub(crate) fn new(file: F, observer: Arc<O>, path: String, context: Span) -> Self {
        observer.handle_opened();
        Self {
            file,
            guard: OpenGuard { observer },
            path,
            context,
        }
    }

    /// Path the handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Tracing context captured when the handle was opened.
    pub fn context(&self) -> &Span {
        &self.context
    }

    /// The wrapped handle.
    pub fn inner(&self) -> &F {
        &self.file
    }

    fn record<T>(
        &mut self,
        op: Operation,
        bytes: impl FnOnce(&io::Result<T>) -> i64,
        f: impl FnOnce(&mut F) -> io::Result<T>,
    ) -> io::Result<T> {
        let Self {
            file,
            guard,
            path,
            context,
        } = self;
        instrument(&*guard.observer, context, op, path, bytes, || f(file))
    }
}

impl<F: File, O: OperationObserver + ?Sized> File for MetricsFile<F, O> {
    fn name(&self) -> &str {
        self.file.name()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.record(Operation::Read, transferred, |f| f.read(buf))
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.record(Operation::Read, transferred, |f| f.read_at(buf, offset))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.record(Operation::Write, transferred, |f| f.write(buf))
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.record(Operation::Write, transferred, |f| f.write_at(buf, offset))
    }

    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.record(Operation::Write, transferred, |f| f.write_str(s))
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.record(Operation::Seek, no_bytes, |f| f.seek(pos))
    }

    fn stat(&self) -> io::Result<FileInfo> {
        instrument(
            &*self.guard.observer,
            &self.context,
            Operation::Stat,
            &self.path,
            no_bytes,
            || self.file.stat(),
        )
    }

    fn sync(&mut self) -> io::Result<()> {
        self.record(Operation::Sync, no_bytes, |f| f.sync())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        let bytes = i64::try_from(size).unwrap_or(i64::MAX);
        self.record(Operation::Truncate, |_| bytes, |f| f.truncate(size))
    }

    fn readdir(&mut self, limit: Option<usize>) -> io::Result<Vec<FileInfo>> {
        let result = self.record(Operation::Readdir, no_bytes, |f| f.readdir(limit));
        self.guard.observer.dir_operation(Operation::Readdir);
        result
    }

    fn readdir_names(&mut self, limit: Option<usize>) -> io::Result<Vec<String>> {
        let result = self.record(Operation::Readdir, no_bytes, |f| f.readdir_names(limit));
        self.guard.observer.dir_operation(Operation::Readdir);
        result
    }

    fn close(self) -> io::Result<()> {
        let Self {
            file,
            guard,
            path,
            context,
        } = self;
        let result = instrument(&*guard.observer, &context, Operation::Close, &path, no_bytes, || {
            file.close()
        });
        drop(guard);
        result
    }
}

impl<F: File, O: OperationObserver + ?Sized> io::Read for MetricsFile<F, O> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf)
    }
}

impl<F: File, O: OperationObserver + ?Sized> io::Write for MetricsFile<F, O> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        File::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F: File, O: OperationObserver + ?Sized> io::Seek for MetricsFile<F, O> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        File::seek(self, pos)
    }
}

impl<F, O: OperationObserver + ?Sized> std::fmt::Debug for MetricsFile<F, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
