//! # offsync remote
//!
//! The possibly-unreachable remote row store.
//!
//! This crate provides:
//! - [`RemoteStore`]: the three calls the sync engine makes against a remote
//! - [`RemoteConnector`]: settings, an optional store, and the shared
//!   "available" flag that push and pull consult
//! - [`MemoryRemote`]: an in-process remote for tests and demos
//! - [`HttpRemote`]: CBOR-over-HTTP remote with a pluggable [`HttpClient`]
//! - [`ReqwestClient`]: the production [`HttpClient`]
//! - [`RowServer`]: the server side of the wire protocol, for loopback tests
//!
//! ## Example
//!
//! ```rust
//! use offsync_remote::{MemoryRemote, RemoteConnector, RemoteSettings};
//! use std::sync::Arc;
//!
//! let remote = Arc::new(MemoryRemote::new());
//! let connector = RemoteConnector::new(
//!     RemoteSettings::new("memory://", "token"),
//!     Arc::clone(&remote),
//! );
//! assert!(connector.connect());
//!
//! remote.set_reachable(false);
//! assert!(!connector.connect());
//! assert!(!connector.is_available());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connector;
mod error;
mod http;
mod memory;
mod protocol;
mod reqwest_client;
mod server;
mod settings;
mod store;

pub use connector::RemoteConnector;
pub use error::{RemoteError, RemoteResult};
pub use http::{HttpClient, HttpRemote, HttpResponse, LoopbackClient, LoopbackServer};
pub use memory::MemoryRemote;
pub use protocol::{
    ErrorBody, FetchRequest, FetchResponse, HealthResponse, UpsertRequest, UpsertResponse,
    FETCH_PATH, HEALTH_PATH, UPSERT_PATH,
};
pub use reqwest_client::ReqwestClient;
pub use server::RowServer;
pub use settings::{RemoteSettings, DEFAULT_TIMEOUT};
pub use store::RemoteStore;
