//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another handle holds the exclusive lock on the log.
    #[error("storage locked: {path:?} is already open elsewhere")]
    Locked {
        /// Path of the locked file.
        path: PathBuf,
    },

    /// Attempted to truncate past the end of the log.
    #[error("cannot truncate to {requested} bytes, log is {size} bytes")]
    TruncatePastEnd {
        /// The requested size.
        requested: u64,
        /// The current size.
        size: u64,
    },

    /// The backend has been made unavailable (tests only inject this).
    #[error("storage unavailable")]
    Unavailable,
}
