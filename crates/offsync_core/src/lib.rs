//! # offsync core
//!
//! The local half of an offline-first store.
//!
//! This crate provides:
//! - The record model shared by every synchronizable table
//! - Typed entity payloads (accounts, pets) with input validation
//! - The append-only change journal
//! - [`LocalStore`]: durable CRUD over all tables, backed by a framed,
//!   checksummed record log
//! - A [`Clock`] abstraction so timestamps can be driven by tests
//!
//! ## Key Invariants
//!
//! - Exactly one row per id per table (upsert semantics)
//! - Rows are never removed; deletion is the `is_deleted` flag
//! - A row write and its journal entry land in one log frame
//! - `sync_status` is `pending` until the remote store confirms the row
//!
//! ## Example
//!
//! ```rust
//! use offsync_core::{LocalStore, Operation, Record, Table, PetFields, RecordId};
//! use chrono::Utc;
//!
//! let store = LocalStore::open_in_memory().unwrap();
//! let owner = RecordId::new();
//! let pet = Record::new_pet(owner, PetFields::new("Rex", "dog"), Utc::now());
//! store.upsert_with_journal(Table::Pets, pet.clone(), Operation::Insert).unwrap();
//!
//! assert_eq!(store.count_pending(Table::Pets), 1);
//! assert_eq!(store.list(Table::Pets, owner).len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod entity;
mod error;
mod journal;
mod log;
mod record;
mod store;
mod types;

pub use clock::{next_timestamp, Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use entity::{NewAccount, NewPet, PetPatch, MIN_USERNAME_LEN};
pub use error::{CoreError, CoreResult};
pub use journal::JournalEntry;
pub use log::{compute_crc32, LogFrame, LOG_FILE_NAME, LOG_MAGIC, LOG_VERSION};
pub use record::{AccountFields, Fields, PetFields, Record};
pub use store::{LocalStore, StoreStats};
pub use types::{Operation, RecordId, SyncStatus, Table};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
