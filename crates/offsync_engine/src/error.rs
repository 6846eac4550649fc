//! Error types for the sync engine.

use offsync_core::{CoreError, RecordId};
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the engine.
///
/// Remote failures never appear here: push, pull and full sync turn them
/// into outcome values. What remains is local: bad input, or a local store
/// that can no longer be trusted.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Local store error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A pet was created for an account that does not exist locally.
    #[error("unknown owner: no live account {0}")]
    UnknownOwner(RecordId),

    /// An account with this username already exists locally.
    #[error("username {0:?} is already taken")]
    DuplicateUsername(String),

    /// An environment setting could not be parsed.
    #[error("invalid setting {key}: {reason}")]
    Config {
        /// The offending variable.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The scheduler was started outside a tokio runtime.
    #[error("scheduler needs a tokio runtime: {0}")]
    Runtime(String),
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error is rejected user input. Nothing was written.
    pub fn is_validation(&self) -> bool {
        match self {
            SyncError::Core(err) => err.is_validation(),
            SyncError::UnknownOwner(_) | SyncError::DuplicateUsername(_) => true,
            _ => false,
        }
    }

    /// Returns true if local storage is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Core(err) if err.is_fatal())
    }
}
