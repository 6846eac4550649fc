//! Storage backend trait definition.

use crate::error::StorageResult;

/// A durable append-only byte log.
///
/// The local store writes one framed entry per mutation with [`append`],
/// replays the whole log with [`read_all`] on open, cuts a torn tail with
/// [`truncate`] and rewrites the log during compaction with [`replace`].
///
/// # Invariants
///
/// - `append` returns the offset where the data starts
/// - after `sync` returns, everything appended so far survives a crash
/// - `replace` is all-or-nothing: a crash leaves either the old or the new log
///
/// [`append`]: StorageBackend::append
/// [`read_all`]: StorageBackend::read_all
/// [`truncate`]: StorageBackend::truncate
/// [`replace`]: StorageBackend::replace
pub trait StorageBackend: Send + Sync {
    /// Reads the complete log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Flushes appended data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the log back to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` is past the end or the truncation fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Atomically replaces the whole log with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the new contents cannot be written. The old log
    /// is left intact in that case.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;
}
