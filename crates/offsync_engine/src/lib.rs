//! # offsync engine
//!
//! Keeps a device's local store and a remote row store in agreement.
//!
//! This crate provides:
//! - [`SyncEngine`]: validated local mutations, push, pull with
//!   last-write-wins, full sync, and the sync status snapshot
//! - [`SyncScheduler`]: a cancellable fixed-period task that re-checks
//!   connectivity and runs a full sync for the signed-in owner
//! - [`Settings`]: environment-level configuration
//!
//! ## Sync model
//!
//! Every local mutation lands in the local store first and is marked
//! `pending`. Push sends pending rows to the remote and marks them `synced`
//! once the remote confirms them. Pull overwrites a local row only when the
//! remote copy is strictly newer. Remote failures never surface as errors;
//! they show up as outcome values and in the pending counts.
//!
//! ## Example
//!
//! ```rust
//! use offsync_core::{LocalStore, NewAccount, NewPet};
//! use offsync_engine::{EngineConfig, SyncEngine};
//! use offsync_remote::{MemoryRemote, RemoteConnector, RemoteSettings};
//! use std::sync::Arc;
//!
//! let remote = Arc::new(MemoryRemote::new());
//! let connector = RemoteConnector::new(RemoteSettings::new("memory://", "token"), remote);
//! let store = Arc::new(LocalStore::open_in_memory().unwrap());
//! let engine = SyncEngine::new(store, connector, EngineConfig::default());
//!
//! let owner = engine.create_account(NewAccount::new("alice", "hash")).unwrap();
//! engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
//! assert_eq!(engine.sync_status().total_pending, 2);
//!
//! let report = engine.sync_now(owner).unwrap();
//! assert_eq!(report.summary(), "pushed 2, pulled 0");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod report;
mod scheduler;

pub use config::{
    EngineConfig, Settings, DEFAULT_DATA_DIR, DEFAULT_MAX_REJECTIONS, DEFAULT_SYNC_INTERVAL,
    ENV_DATA_DIR, ENV_REMOTE_TIMEOUT, ENV_REMOTE_TOKEN, ENV_REMOTE_URL, ENV_SYNC_INTERVAL,
};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use report::{
    FailureKind, FullSyncReport, PullOutcome, PushOutcome, PushSummary, SyncStatusSnapshot,
};
pub use scheduler::{SchedulerState, SyncReport, SyncScheduler};
