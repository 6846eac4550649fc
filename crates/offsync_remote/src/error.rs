//! Error types for remote operations.

use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors from the remote row store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote could not be reached, or the connection dropped mid-call.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the connector timeout.
    #[error("remote call timed out")]
    Timeout,

    /// The remote was reached but refused the write.
    #[error("remote rejected the write: {0}")]
    Rejected(String),

    /// A message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No remote URL or credential is configured.
    #[error("remote store not configured")]
    NotConfigured,
}

impl RemoteError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Returns true if the error means the remote is unreachable.
    ///
    /// These errors flip the connector's availability flag.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Timeout)
    }

    /// Returns true if the same call may succeed on a later cycle.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RemoteError::NotConfigured)
    }
}
