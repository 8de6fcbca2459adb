//! Error types for metricsfs-core.
//!
//! Errors coming back from the wrapped filesystem are never converted: they
//! travel through the interceptor as the original [`std::io::Error`]. The
//! types here only cover failures of this crate's own surface (configuration)
//! and the fixed outcome reported for optional capabilities the wrapped
//! filesystem does not implement.

use std::io;

use crate::types::Operation;

/// Result type alias for metricsfs operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised by metricsfs itself.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MetricsError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Outcome for an optional operation the wrapped filesystem does not support.
///
/// Carried inside an [`io::Error`] of kind [`io::ErrorKind::InvalidInput`];
/// callers can recover it with [`io::Error::get_ref`] and `downcast_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation: {op} is not supported by the wrapped filesystem")]
pub struct UnsupportedOperation {
    /// The operation that was attempted.
    pub op: Operation,
}

/// Builds the "invalid operation" outcome for an unsupported capability.
#[must_use]
pub fn unsupported(op: Operation) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, UnsupportedOperation { op })
}

/// Returns true if `err` is the outcome produced by [`unsupported`].
#[must_use]
pub fn is_unsupported(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<UnsupportedOperation>())
}
