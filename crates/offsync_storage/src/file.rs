//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A log stored in a single file.
///
/// The file is held under an exclusive advisory lock for the lifetime of the
/// backend, so two stores can never interleave writes to the same log.
///
/// # Durability
///
/// - `append` writes through to the OS but does not fsync
/// - `sync` calls `File::sync_all()`
/// - `replace` writes and locks a sibling `.tmp` file, syncs it and renames
///   it over the log; the lock is held throughout
///
/// # Example
///
/// ```no_run
/// use offsync_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("data/offsync.log")).unwrap();
/// backend.append(b"frame").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    size: u64,
}

impl FileBackend {
    /// Opens or creates the log at `path` and locks it.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock,
    /// or an I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = Self::open_locked(path)?;
        let size = file.metadata()?.len();
        debug!(path = %path.display(), size, "opened log file");

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_locked(path: &Path) -> StorageResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        file.try_lock_exclusive().map_err(|_| StorageError::Locked {
            path: path.to_path_buf(),
        })?;

        Ok(file)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        self.size += data.len() as u64;

        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn sync(&mut self) -> StorageResult<()> {
        let mut file = self.file.lock();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size > self.size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: self.size,
            });
        }

        let file = self.file.lock();
        file.set_len(new_size)?;
        file.sync_all()?;
        drop(file);
        self.size = new_size;

        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let tmp = self.tmp_path();
        let staged = match Self::stage(&tmp, data) {
            Ok(staged) => staged,
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                return Err(err);
            }
        };

        // The staged file is already locked, so the log path is never
        // unlocked. On failure the old handle is still the live log.
        if let Err(err) = fs::rename(&tmp, &self.path) {
            drop(staged);
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        let old = std::mem::replace(&mut *self.file.lock(), staged);
        let _ = FileExt::unlock(&old);
        self.size = data.len() as u64;
        debug!(path = %self.path.display(), size = self.size, "replaced log file");

        Ok(())
    }
}

impl FileBackend {
    fn stage(tmp: &Path, data: &[u8]) -> StorageResult<File> {
        let mut staged = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp)?;
        staged.try_lock_exclusive().map_err(|_| StorageError::Locked {
            path: tmp.to_path_buf(),
        })?;
        staged.write_all(data)?;
        staged.sync_all()?;
        Ok(staged)
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        let file = self.file.lock();
        let _ = FileExt::unlock(&*file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_new_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("offsync.log");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(path.exists());
        assert_eq!(backend.path(), path);
    }

    #[test]
    fn append_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offsync.log");

        let mut backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.read_all().unwrap(), b"hello world");
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offsync.log");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"persistent").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 10);
        assert_eq!(backend.read_all().unwrap(), b"persistent");
    }

    #[test]
    fn second_open_is_locked_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offsync.log");

        let _first = FileBackend::open(&path).unwrap();
        let second = FileBackend::open(&path);
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn truncate_drops_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offsync.log");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"keep|drop").unwrap();
        backend.truncate(4).unwrap();
        assert_eq!(backend.read_all().unwrap(), b"keep");
        assert!(backend.truncate(100).is_err());
    }

    #[test]
    fn replace_rewrites_and_keeps_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offsync.log");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"a long history of frames").unwrap();
        backend.replace(b"snapshot").unwrap();

        assert_eq!(backend.size().unwrap(), 8);
        assert_eq!(backend.read_all().unwrap(), b"snapshot");
        assert!(!dir.path().join("offsync.log.tmp").exists());
        assert!(matches!(
            FileBackend::open(&path),
            Err(StorageError::Locked { .. })
        ));

        backend.append(b"+next").unwrap();
        assert_eq!(backend.read_all().unwrap(), b"snapshot+next");
    }

    #[test]
    fn failed_replace_leaves_live_log_locked_and_writable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offsync.log");
        fs::create_dir(dir.path().join("offsync.log.tmp")).unwrap();

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"frames").unwrap();
        assert!(backend.replace(b"snapshot").is_err());

        assert!(matches!(
            FileBackend::open(&path),
            Err(StorageError::Locked { .. })
        ));
        backend.append(b"+next").unwrap();
        backend.sync().unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.read_all().unwrap(), b"frames+next");
    }
}
