//! In-process remote row store.

use crate::error::{RemoteError, RemoteResult};
use crate::store::RemoteStore;
use offsync_core::{Fields, Record, RecordId, SyncStatus, Table};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A remote row store kept in memory.
///
/// Behaves like the real remote: rows are replaced by id, the `users` table
/// enforces unique usernames among live accounts, and every stored row is
/// `synced`. Tests can cut the "network" with [`set_reachable`] and make
/// writes of chosen rows fail with [`reject`].
///
/// [`set_reachable`]: MemoryRemote::set_reachable
/// [`reject`]: MemoryRemote::reject
#[derive(Debug)]
pub struct MemoryRemote {
    rows: RwLock<BTreeMap<(Table, RecordId), Record>>,
    rejected: RwLock<HashSet<RecordId>>,
    reachable: AtomicBool,
    writes: AtomicU64,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Creates an empty, reachable remote.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            rejected: RwLock::new(HashSet::new()),
            reachable: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }

    /// Switches the simulated network on or off.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Returns whether the simulated network is up.
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Makes every write of `id` fail with [`RemoteError::Rejected`].
    pub fn reject(&self, id: RecordId) {
        self.rejected.write().insert(id);
    }

    /// Accepts writes of `id` again.
    pub fn accept(&self, id: RecordId) {
        self.rejected.write().remove(&id);
    }

    /// Stores a row directly, as if another device had written it.
    ///
    /// Bypasses reachability, constraints and the write counter.
    pub fn put_row(&self, table: Table, record: Record) {
        let row = record.with_status(SyncStatus::Synced);
        self.rows.write().insert((table, row.id), row);
    }

    /// Returns a stored row.
    pub fn row(&self, table: Table, id: RecordId) -> Option<Record> {
        self.rows.read().get(&(table, id)).cloned()
    }

    /// Returns every row of a table.
    pub fn rows(&self, table: Table) -> Vec<Record> {
        self.rows
            .read()
            .iter()
            .filter(|((t, _), _)| *t == table)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Returns how many writes have been accepted through [`RemoteStore::upsert`].
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> RemoteResult<()> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(RemoteError::unavailable("connection refused"))
        }
    }

    fn check_username(
        rows: &BTreeMap<(Table, RecordId), Record>,
        record: &Record,
    ) -> RemoteResult<()> {
        let Fields::Account(account) = &record.fields else {
            return Ok(());
        };
        if record.is_deleted {
            return Ok(());
        }
        let taken = rows.values().any(|other| {
            other.id != record.id
                && !other.is_deleted
                && matches!(&other.fields, Fields::Account(a) if a.username == account.username)
        });
        if taken {
            return Err(RemoteError::rejected(format!(
                "username {:?} already exists",
                account.username
            )));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    fn ping(&self) -> RemoteResult<()> {
        self.check_reachable()
    }

    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()> {
        self.check_reachable()?;
        if record.table() != table {
            return Err(RemoteError::rejected(format!(
                "{} row sent to table {table}",
                record.table()
            )));
        }
        if self.rejected.read().contains(&record.id) {
            return Err(RemoteError::rejected(format!("row {} refused", record.id)));
        }

        let mut rows = self.rows.write();
        Self::check_username(&rows, record)?;
        rows.insert((table, record.id), record.clone().with_status(SyncStatus::Synced));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        self.check_reachable()?;
        let rows = self.rows.read();
        Ok(rows
            .iter()
            .filter(|((t, id), r)| {
                *t == table
                    && match table {
                        Table::Users => *id == owner_id,
                        Table::Pets => r.owner_id == Some(owner_id),
                    }
            })
            .map(|(_, r)| r.clone())
            .collect())
    }
}
