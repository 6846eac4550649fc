//! Test fixtures.
//!
//! [`TestHarness`] wires a local store, an in-memory remote and an engine
//! driven by a [`ManualClock`], so tests control the network and time.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use offsync_core::{
    LocalStore, ManualClock, NewAccount, NewPet, Record, RecordId, StoreConfig, Table,
};
use offsync_engine::{EngineConfig, SyncEngine, SyncScheduler};
use offsync_remote::{
    HttpRemote, LoopbackClient, MemoryRemote, RemoteConnector, RemoteSettings, RowServer,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Engine type used by [`TestHarness`].
pub type HarnessEngine = SyncEngine<Arc<MemoryRemote>>;

/// Engine speaking the HTTP wire format to an in-process row server.
pub type WireEngine = SyncEngine<HttpRemote<LoopbackClient<RowServer>>>;

/// Bearer credential shared by harness connectors and row servers.
pub const TEST_TOKEN: &str = "test-token";

/// Base URL used for loopback connections.
pub const TEST_URL: &str = "http://rows.test";

/// The time every harness clock starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid start time")
}

/// A store, a remote and an engine with a controllable clock.
pub struct TestHarness {
    /// The in-memory remote row store.
    pub remote: Arc<MemoryRemote>,
    /// Clock stamping every mutation.
    pub clock: Arc<ManualClock>,
    /// The engine under test.
    pub engine: Arc<HarnessEngine>,
    _temp_dir: Option<TempDir>,
}

impl TestHarness {
    /// Creates a harness over an in-memory store with default configuration.
    pub fn memory() -> Self {
        Self::memory_with(EngineConfig::default())
    }

    /// Creates a harness over an in-memory store.
    pub fn memory_with(config: EngineConfig) -> Self {
        let store = LocalStore::open_in_memory().expect("Failed to open in-memory store");
        Self::build(store, config, None)
    }

    /// Creates a harness over a store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = LocalStore::open(temp_dir.path(), StoreConfig::default())
            .expect("Failed to open file store");
        Self::build(store, EngineConfig::default(), Some(temp_dir))
    }

    fn build(store: LocalStore, config: EngineConfig, temp_dir: Option<TempDir>) -> Self {
        let remote = Arc::new(MemoryRemote::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let connector =
            RemoteConnector::new(RemoteSettings::new(TEST_URL, TEST_TOKEN), Arc::clone(&remote));
        let engine = SyncEngine::new(Arc::new(store), connector, config).with_clock(clock.clone());
        Self {
            remote,
            clock,
            engine: Arc::new(engine),
            _temp_dir: temp_dir,
        }
    }

    /// Returns the local store.
    pub fn store(&self) -> &LocalStore {
        self.engine.store()
    }

    /// Brings the network up and re-checks connectivity.
    pub fn go_online(&self) -> bool {
        self.remote.set_reachable(true);
        self.engine.refresh_connectivity()
    }

    /// Takes the network down and marks the connector unavailable.
    pub fn go_offline(&self) {
        self.remote.set_reachable(false);
        self.engine.connector().disconnect();
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Creates an account, panicking on failure.
    pub fn account(&self, username: &str) -> RecordId {
        self.engine
            .create_account(NewAccount::new(username, "hash"))
            .expect("Failed to create account")
    }

    /// Creates a pet with just a name and species, panicking on failure.
    pub fn pet(&self, owner_id: RecordId, name: &str) -> RecordId {
        self.engine
            .create_pet(owner_id, NewPet::new(name, "dog"))
            .expect("Failed to create pet")
    }

    /// Returns a local row, soft-deleted or not.
    pub fn local(&self, table: Table, id: RecordId) -> Record {
        self.store()
            .get_any(table, id)
            .expect("Row should exist locally")
    }

    /// Writes a copy of a local row to the remote as if another device had
    /// edited it `ahead` later, with `edit` applied to the copy.
    pub fn remote_edit<F>(&self, table: Table, id: RecordId, ahead: Duration, edit: F) -> Record
    where
        F: FnOnce(&mut Record),
    {
        let mut row = self.local(table, id);
        row.updated_at += ChronoDuration::from_std(ahead).expect("Duration fits");
        edit(&mut row);
        self.remote.put_row(table, row.clone());
        row
    }

    /// Creates an idle scheduler over the harness engine.
    pub fn scheduler(&self) -> SyncScheduler<Arc<MemoryRemote>> {
        SyncScheduler::new(Arc::clone(&self.engine))
    }
}

/// Builds an engine that reaches `rows` through the HTTP wire format.
pub fn wire_engine(rows: Arc<MemoryRemote>, clock: Arc<ManualClock>) -> WireEngine {
    let server = RowServer::new(rows, TEST_TOKEN);
    let remote = HttpRemote::new(TEST_URL, TEST_TOKEN, LoopbackClient::new(server));
    let connector = RemoteConnector::new(RemoteSettings::new(TEST_URL, TEST_TOKEN), remote);
    let store = LocalStore::open_in_memory().expect("Failed to open in-memory store");
    SyncEngine::new(Arc::new(store), connector, EngineConfig::default()).with_clock(clock)
}
