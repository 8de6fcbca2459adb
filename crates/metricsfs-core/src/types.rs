//! Measurement data model.
//!
//! A [`Measurement`] is produced once per completed call by the interceptor
//! and handed, by reference, to every active observer. Observers copy out
//! whatever they want to keep; nothing mutates a measurement after it has
//! been built.

use std::fmt;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::classify;

/// A filesystem or file-handle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Open a file for reading.
    Open,
    /// Open a file with explicit flags and permissions.
    OpenFile,
    /// Create (or truncate) a file.
    Create,
    /// Create a directory.
    Mkdir,
    /// Create a directory and any missing parents.
    MkdirAll,
    /// Remove a file or empty directory.
    Remove,
    /// Remove a path and everything below it.
    RemoveAll,
    /// Rename a path.
    Rename,
    /// Stat a path.
    Stat,
    /// Stat a path without following symlinks.
    Lstat,
    /// Change permissions.
    Chmod,
    /// Change ownership.
    Chown,
    /// Change access and modification times.
    Chtimes,
    /// Read a symlink target.
    Readlink,
    /// Create a symlink.
    Symlink,
    /// Change the working directory.
    Chdir,
    /// Query the working directory.
    Getwd,
    /// Truncate a file.
    Truncate,
    /// Read from a handle.
    Read,
    /// Write to a handle.
    Write,
    /// Seek a handle.
    Seek,
    /// Close a handle.
    Close,
    /// Flush a handle to stable storage.
    Sync,
    /// List directory entries through a handle.
    Readdir,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 24] = [
        Self::Open,
        Self::OpenFile,
        Self::Create,
        Self::Mkdir,
        Self::MkdirAll,
        Self::Remove,
        Self::RemoveAll,
        Self::Rename,
        Self::Stat,
        Self::Lstat,
        Self::Chmod,
        Self::Chown,
        Self::Chtimes,
        Self::Readlink,
        Self::Symlink,
        Self::Chdir,
        Self::Getwd,
        Self::Truncate,
        Self::Read,
        Self::Write,
        Self::Seek,
        Self::Close,
        Self::Sync,
        Self::Readdir,
    ];

    /// Returns the metric label for this operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::OpenFile => "openfile",
            Self::Create => "create",
            Self::Mkdir => "mkdir",
            Self::MkdirAll => "mkdirall",
            Self::Remove => "remove",
            Self::RemoveAll => "removeall",
            Self::Rename => "rename",
            Self::Stat => "stat",
            Self::Lstat => "lstat",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Chtimes => "chtimes",
            Self::Readlink => "readlink",
            Self::Symlink => "symlink",
            Self::Chdir => "chdir",
            Self::Getwd => "getwd",
            Self::Truncate => "truncate",
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::Close => "close",
            Self::Sync => "sync",
            Self::Readdir => "readdir",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The delegate returned `Ok`.
    Success,
    /// The delegate returned `Err`.
    Error,
}

impl Status {
    /// Returns the metric label for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded error taxonomy used as a metric dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No error.
    None,
    /// The path does not exist.
    NotFound,
    /// Permission denied.
    Permission,
    /// A deadline or timeout was exceeded.
    Timeout,
    /// Anything else.
    Unknown,
}

impl ErrorCategory {
    /// Returns the metric label for this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NotFound => "not_found",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed operation.
#[derive(Debug, Clone, Copy)]
pub struct Measurement<'a> {
    operation: Operation,
    duration: Duration,
    bytes: i64,
    path: &'a str,
    outcome: Option<&'a io::Error>,
}

impl<'a> Measurement<'a> {
    /// Builds a measurement.
    #[must_use]
    pub const fn new(
        operation: Operation,
        duration: Duration,
        bytes: i64,
        path: &'a str,
        outcome: Option<&'a io::Error>,
    ) -> Self {
        Self {
            operation,
            duration,
            bytes,
            path,
            outcome,
        }
    }

    /// The operation that completed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Wall time spent in the delegate.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Bytes transferred, 0 when not applicable.
    #[must_use]
    pub const fn bytes(&self) -> i64 {
        self.bytes
    }

    /// Path the operation targeted; may be empty.
    #[must_use]
    pub const fn path(&self) -> &'a str {
        self.path
    }

    /// The error returned by the delegate, if any.
    #[must_use]
    pub const fn outcome(&self) -> Option<&'a io::Error> {
        self.outcome
    }

    /// Returns true if the delegate failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.outcome.is_some()
    }

    /// Success or error.
    #[must_use]
    pub const fn status(&self) -> Status {
        if self.is_error() {
            Status::Error
        } else {
            Status::Success
        }
    }

    /// Classified error category.
    #[must_use]
    pub fn error_category(&self) -> ErrorCategory {
        classify(self.outcome)
    }
}

/// Flags for [`crate::FileSystem::open_file`].
///
/// Bit values follow Linux `open(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenFlags(u32);

impl OpenFlags {
    /// Open for reading only.
    pub const READ_ONLY: Self = Self(0);
    /// Open for writing only.
    pub const WRITE_ONLY: Self = Self(0o1);
    /// Open for reading and writing.
    pub const READ_WRITE: Self = Self(0o2);
    /// Create the file if it does not exist.
    pub const CREATE: Self = Self(0o100);
    /// Fail if the file exists (with `CREATE`).
    pub const EXCLUSIVE: Self = Self(0o200);
    /// Truncate on open.
    pub const TRUNCATE: Self = Self(0o1000);
    /// Append on each write.
    pub const APPEND: Self = Self(0o2000);
    /// Synchronous writes.
    pub const SYNC: Self = Self(0o4010000);

    /// Builds flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    ///
    /// `READ_ONLY` has no bits and is therefore contained in every set.
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// How a handle was opened, used as the `mode` label of file-open counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    ReadWrite,
    /// Append.
    Append,
}

impl OpenMode {
    /// Classifies open flags.
    ///
    /// Checks run write-only, then read-write, then append; each later match
    /// overrides the earlier one, so `READ_WRITE | APPEND` is `Append`.
    #[must_use]
    pub const fn from_flags(flags: OpenFlags) -> Self {
        let mut mode = Self::Read;
        if flags.contains(OpenFlags::WRITE_ONLY) {
            mode = Self::Write;
        }
        if flags.contains(OpenFlags::READ_WRITE) {
            mode = Self::ReadWrite;
        }
        if flags.contains(OpenFlags::APPEND) {
            mode = Self::Append;
        }
        mode
    }

    /// Returns the metric label for this mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "readwrite",
            Self::Append => "append",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
