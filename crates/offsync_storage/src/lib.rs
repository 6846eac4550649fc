//! # offsync storage
//!
//! Byte-level storage backends underneath the offsync local store.
//!
//! A backend holds one append-only log. It does not interpret the bytes:
//! framing, checksums and replay belong to `offsync_core`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral stores. Clones share the
//!   same buffer, so a test can "reopen" a store or make it fail on demand.
//! - [`FileBackend`] - A single file guarded by an exclusive advisory lock.
//!
//! ## Example
//!
//! ```rust
//! use offsync_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(offset, 0);
//! assert_eq!(backend.read_all().unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
