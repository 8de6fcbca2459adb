//! Test error types.

use std::time::Duration;

/// Result type alias for test infrastructure.
pub type Result<T> = std::result::Result<T, TestError>;

/// Testing errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Chaos injection misconfigured.
    #[error("chaos injection error: {0}")]
    Chaos(String),

    /// Load test error.
    #[error("load test error: {0}")]
    LoadTest(String),

    /// Load test exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl TestError {
    /// Creates a chaos error.
    #[must_use]
    pub fn chaos(msg: impl Into<String>) -> Self {
        Self::Chaos(msg.into())
    }

    /// Creates a load test error.
    #[must_use]
    pub fn load_test(msg: impl Into<String>) -> Self {
        Self::LoadTest(msg.into())
    }
}
