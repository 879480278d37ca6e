//! Error types for rxsemaphore.
//!
//! The lock-state operator itself never fails: every boolean input is valid and
//! upstream errors travel through the stream as values of the source's own
//! error type. The errors here cover the plumbing around it, namely pull-based
//! consumption and configuration.

use thiserror::Error;

/// Configuration errors raised while building or parsing a `SemaphoreConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Field '{field}' must be greater than zero")]
    ZeroCapacity {
        field: String,
    },

    #[error("Failed to parse configuration: {message}")]
    Parse {
        message: String,
    },
}

/// Top-level error type for rxsemaphore.
#[derive(Debug, Error)]
pub enum SemaphoreError {
    #[error("Stream disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Receive timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SemaphoreError {
    /// Creates a disconnection error for the named endpoint.
    #[must_use]
    pub fn disconnected(path: impl Into<String>) -> Self {
        Self::Disconnected { path: path.into() }
    }

    /// Returns true if the producing side has gone away.
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    /// Returns true if this is a receive timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for rxsemaphore operations.
pub type SemaphoreResult<T> = Result<T, SemaphoreError>;
