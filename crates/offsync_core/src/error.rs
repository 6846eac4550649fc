//! Error types for the local store.

use crate::types::Table;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in local store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] offsync_storage::StorageError),

    /// The record log is damaged at `offset`.
    #[error("log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Byte offset of the bad frame.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A log frame failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Byte offset of the bad frame.
        offset: u64,
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed from the frame.
        actual: u32,
    },

    /// A frame could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// Input to a mutation was malformed. Nothing was written.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A record was written to a table that does not hold its kind.
    #[error("record of table {actual} written to table {expected}")]
    TableMismatch {
        /// Table named by the caller.
        expected: Table,
        /// Table the record belongs to.
        actual: Table,
    },

    /// The store does not exist and `create_if_missing` is off.
    #[error("no store found at {path:?}")]
    StoreMissing {
        /// Path that was probed.
        path: PathBuf,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Returns true if the local store itself is unusable.
    ///
    /// Fatal errors are never retried: there is no offline mode without
    /// local storage.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::Storage(_)
                | CoreError::LogCorruption { .. }
                | CoreError::ChecksumMismatch { .. }
                | CoreError::Encode(_)
                | CoreError::StoreMissing { .. }
        )
    }

    /// Returns true if this is rejected user input.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(CoreError::from(offsync_storage::StorageError::Unavailable).is_fatal());
        assert!(CoreError::log_corruption(12, "bad magic").is_fatal());
        assert!(!CoreError::validation("name", "must not be empty").is_fatal());
        assert!(CoreError::validation("name", "must not be empty").is_validation());
    }

    #[test]
    fn display() {
        let err = CoreError::validation("weight", "must be finite");
        assert_eq!(err.to_string(), "invalid weight: must be finite");

        let err = CoreError::ChecksumMismatch {
            offset: 40,
            expected: 0xdead_beef,
            actual: 1,
        };
        assert!(err.to_string().contains("deadbeef"));
    }
}
