//! In-memory storage backend for tests and ephemeral stores.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory log.
///
/// Cloning an `InMemoryBackend` yields a second handle onto the same buffer.
/// Tests use this to reopen a store over the bytes an earlier store wrote,
/// or to flip the backend into a failing state and observe how the layers
/// above react to a dead disk.
///
/// # Example
///
/// ```rust
/// use offsync_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let handle = backend.clone();
/// backend.append(b"abc").unwrap();
/// assert_eq!(handle.size().unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding pre-existing bytes.
    ///
    /// Useful for replaying hand-built or damaged logs.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a copy of the bytes currently in the log.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Makes every subsequent operation fail with [`StorageError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        self.check()?;
        Ok(self.data.read().clone())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        self.check()?;
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        self.check()?;
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.check()?;
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn replace(&mut self, new_data: &[u8]) -> StorageResult<()> {
        self.check()?;
        *self.data.write() = new_data.to_vec();
        Ok(())
    }
}
