//! Collector and export error types.

use metricsfs_core::MetricsError;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, ObserveError>;

/// Collector, registry and export errors.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// Invalid collector configuration.
    #[error(transparent)]
    Config(#[from] MetricsError),

    /// A metric family with this name is already registered.
    #[error("metric family already registered: {0}")]
    AlreadyRegistered(String),

    /// Histogram bucket bounds are unusable.
    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),

    /// Export error.
    #[error("export error: {0}")]
    Export(String),
}

impl ObserveError {
    /// Creates a duplicate-registration error.
    #[must_use]
    pub fn already_registered(name: impl Into<String>) -> Self {
        Self::AlreadyRegistered(name.into())
    }

    /// Creates an invalid-buckets error.
    #[must_use]
    pub fn invalid_buckets(msg: impl Into<String>) -> Self {
        Self::InvalidBuckets(msg.into())
    }

    /// Creates an export error.
    #[must_use]
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}
