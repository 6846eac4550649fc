//! The remote row store abstraction.

use crate::error::RemoteResult;
use offsync_core::{Record, RecordId, Table};
use std::sync::Arc;

/// A remote key/row store reachable over some network.
///
/// Implementations must be idempotent on `upsert`: writing the same row
/// twice leaves the remote in the same state as writing it once.
pub trait RemoteStore: Send + Sync {
    /// Checks that the remote answers.
    fn ping(&self) -> RemoteResult<()>;

    /// Inserts or replaces a row by id.
    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()>;

    /// Returns every row of `table` owned by `owner_id`, soft-deleted rows
    /// included. For `users` this is the owner's own account row.
    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    fn ping(&self) -> RemoteResult<()> {
        (**self).ping()
    }

    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()> {
        (**self).upsert(table, record)
    }

    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        (**self).fetch_for_owner(table, owner_id)
    }
}

impl<S: RemoteStore + ?Sized> RemoteStore for Box<S> {
    fn ping(&self) -> RemoteResult<()> {
        (**self).ping()
    }

    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()> {
        (**self).upsert(table, record)
    }

    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        (**self).fetch_for_owner(table, owner_id)
    }
}
