//! Capability interface of the wrapped filesystem.
//!
//! The interceptor treats implementations as black boxes. Optional
//! capabilities are declared once through [`FileSystem::capabilities`] so
//! the interceptor can decide at construction time which calls to delegate
//! and which to answer with the unsupported outcome.

use std::io::{self, SeekFrom};
use std::time::SystemTime;

use crate::error::unsupported;
use crate::types::{OpenFlags, Operation};

/// File metadata returned by `stat`, `lstat` and `readdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits.
    pub mode: u32,
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether this is a directory.
    pub is_dir: bool,
}

/// Optional operations a filesystem implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `readlink` and `symlink`.
    pub symlinks: bool,
    /// `chdir` and `getwd`.
    pub working_dir: bool,
    /// `temp_dir`.
    pub temp_dir: bool,
    /// Path-based `truncate`.
    pub truncate: bool,
}

impl Capabilities {
    /// No optional capabilities.
    pub const NONE: Self = Self {
        symlinks: false,
        working_dir: false,
        temp_dir: false,
        truncate: false,
    };

    /// Every optional capability.
    pub const ALL: Self = Self {
        symlinks: true,
        working_dir: true,
        temp_dir: true,
        truncate: true,
    };

    /// Returns true if `op` can be delegated.
    ///
    /// Operations outside the optional set are always supported.
    #[must_use]
    pub const fn supports(&self, op: Operation) -> bool {
        match op {
            Operation::Readlink | Operation::Symlink => self.symlinks,
            Operation::Chdir | Operation::Getwd => self.working_dir,
            Operation::Truncate => self.truncate,
            _ => true,
        }
    }
}

/// An open file or directory handle.
pub trait File: Send {
    /// Name the handle was opened with.
    fn name(&self) -> &str;

    /// Reads into `buf` at the current offset.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Reads into `buf` at `offset` without moving the current offset.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Writes `buf` at the current offset.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Writes `buf` at `offset` without moving the current offset.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Writes a string at the current offset.
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.write(s.as_bytes())
    }

    /// Moves the current offset.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Metadata of the open file.
    fn stat(&self) -> io::Result<FileInfo>;

    /// Flushes to stable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Changes the file size.
    fn truncate(&mut self, size: u64) -> io::Result<()>;

    /// Reads up to `limit` directory entries, or all remaining when `None`.
    fn readdir(&mut self, limit: Option<usize>) -> io::Result<Vec<FileInfo>>;

    /// Reads up to `limit` directory entry names.
    fn readdir_names(&mut self, limit: Option<usize>) -> io::Result<Vec<String>> {
        Ok(self.readdir(limit)?.into_iter().map(|e| e.name).collect())
    }

    /// Closes the handle.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// A filesystem-like resource.
pub trait FileSystem: Send + Sync {
    /// Handle type returned by `open`, `open_file` and `create`.
    type File: File;

    /// Optional capabilities implemented by this filesystem.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Opens `path` for reading.
    fn open(&self, path: &str) -> io::Result<Self::File>;

    /// Opens `path` with `flags`, creating it with `perm` if requested.
    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> io::Result<Self::File>;

    /// Creates or truncates `path`.
    fn create(&self, path: &str) -> io::Result<Self::File>;

    /// Creates a directory.
    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()>;

    /// Creates a directory and any missing parents.
    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()>;

    /// Removes a file or empty directory.
    fn remove(&self, path: &str) -> io::Result<()>;

    /// Removes `path` and everything below it.
    fn remove_all(&self, path: &str) -> io::Result<()>;

    /// Renames `from` to `to`.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Metadata of `path`, following symlinks.
    fn stat(&self, path: &str) -> io::Result<FileInfo>;

    /// Metadata of `path` without following symlinks.
    fn lstat(&self, path: &str) -> io::Result<FileInfo> {
        self.stat(path)
    }

    /// Changes permission bits.
    fn chmod(&self, path: &str, mode: u32) -> io::Result<()>;

    /// Changes ownership.
    fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()>;

    /// Changes access and modification times.
    fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> io::Result<()>;

    /// Reads a symlink target. Requires [`Capabilities::symlinks`].
    fn readlink(&self, _path: &str) -> io::Result<String> {
        Err(unsupported(Operation::Readlink))
    }

    /// Creates `link` pointing at `original`. Requires [`Capabilities::symlinks`].
    fn symlink(&self, _original: &str, _link: &str) -> io::Result<()> {
        Err(unsupported(Operation::Symlink))
    }

    /// Changes the working directory. Requires [`Capabilities::working_dir`].
    fn chdir(&self, _dir: &str) -> io::Result<()> {
        Err(unsupported(Operation::Chdir))
    }

    /// Current working directory. Requires [`Capabilities::working_dir`].
    fn getwd(&self) -> io::Result<String> {
        Err(unsupported(Operation::Getwd))
    }

    /// Temporary directory. Requires [`Capabilities::temp_dir`].
    fn temp_dir(&self) -> String {
        std::env::temp_dir().to_string_lossy().into_owned()
    }

    /// Truncates `path` to `size`. Requires [`Capabilities::truncate`].
    fn truncate(&self, _path: &str, _size: u64) -> io::Result<()> {
        Err(unsupported(Operation::Truncate))
    }

    /// Path separator.
    fn separator(&self) -> char {
        std::path::MAIN_SEPARATOR
    }

    /// Separator for lists of paths.
    fn list_separator(&self) -> char {
        if cfg!(windows) { ';' } else { ':' }
    }
}
