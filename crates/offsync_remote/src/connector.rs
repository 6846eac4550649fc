//! Connectivity tracking around a remote store.

use crate::error::{RemoteError, RemoteResult};
use crate::settings::RemoteSettings;
use crate::store::RemoteStore;
use offsync_core::{Record, RecordId, SyncStatus, Table};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// The sync engine's view of the remote store.
///
/// Holds one atomic `available` flag. `connect()` writes it after a ping;
/// any call that fails for connectivity reasons clears it. Push and pull
/// read it before touching the network.
///
/// An unconfigured connector has no store and never becomes available.
pub struct RemoteConnector<S> {
    settings: RemoteSettings,
    store: Option<S>,
    available: AtomicBool,
}

impl<S: RemoteStore> RemoteConnector<S> {
    /// Creates a connector. The store is dropped if `settings` are
    /// incomplete. Starts unavailable until `connect()` succeeds.
    pub fn new(settings: RemoteSettings, store: S) -> Self {
        let store = if settings.is_configured() {
            Some(store)
        } else {
            info!("remote not configured; running local-only");
            None
        };
        Self {
            settings,
            store,
            available: AtomicBool::new(false),
        }
    }

    /// Creates a connector for local-only mode.
    #[must_use]
    pub fn local_only() -> Self {
        Self {
            settings: RemoteSettings::unconfigured(),
            store: None,
            available: AtomicBool::new(false),
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// Returns true iff connection parameters are present.
    ///
    /// Says nothing about reachability.
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the last known availability.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Pings the remote and records the result.
    ///
    /// Never fails: every error maps to "unavailable".
    pub fn connect(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        let reachable = match store.ping() {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "remote ping failed");
                false
            }
        };
        let was = self.available.swap(reachable, Ordering::SeqCst);
        if was != reachable {
            if reachable {
                info!("remote store available");
            } else {
                warn!("remote store unavailable");
            }
        }
        reachable
    }

    /// Marks the remote unavailable until the next successful `connect()`.
    pub fn disconnect(&self) {
        if self.available.swap(false, Ordering::SeqCst) {
            warn!("remote store marked unavailable");
        }
    }

    fn ready(&self) -> RemoteResult<&S> {
        let store = self.store.as_ref().ok_or(RemoteError::NotConfigured)?;
        if !self.is_available() {
            return Err(RemoteError::unavailable("offline"));
        }
        Ok(store)
    }

    fn observe<T>(&self, result: RemoteResult<T>) -> RemoteResult<T> {
        if let Err(err) = &result {
            if err.is_connectivity() {
                self.disconnect();
            }
        }
        result
    }

    /// Writes a row to the remote, always as `synced`.
    ///
    /// # Errors
    ///
    /// Returns the remote's error. Connectivity errors also clear the
    /// availability flag.
    pub fn upsert_remote(&self, table: Table, record: &Record) -> RemoteResult<()> {
        let store = self.ready()?;
        let mut row = record.clone();
        row.sync_status = SyncStatus::Synced;
        self.observe(store.upsert(table, &row))
    }

    /// Fetches every remote row of `table` for an owner.
    ///
    /// # Errors
    ///
    /// Returns the remote's error. Connectivity errors also clear the
    /// availability flag.
    pub fn fetch_all(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        let store = self.ready()?;
        self.observe(store.fetch_for_owner(table, owner_id))
    }
}

impl<S> std::fmt::Debug for RemoteConnector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConnector")
            .field("configured", &self.store.is_some())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;
    use chrono::Utc;
    use offsync_core::PetFields;
    use std::sync::Arc;

    fn connector(remote: &Arc<MemoryRemote>) -> RemoteConnector<Arc<MemoryRemote>> {
        RemoteConnector::new(RemoteSettings::new("memory://", "token"), Arc::clone(remote))
    }

    #[test]
    fn starts_unavailable_until_connected() {
        let remote = Arc::new(MemoryRemote::new());
        let connector = connector(&remote);
        assert!(connector.is_configured());
        assert!(!connector.is_available());

        assert!(connector.connect());
        assert!(connector.is_available());
    }

    #[test]
    fn unconfigured_never_available() {
        let remote = Arc::new(MemoryRemote::new());
        let connector = RemoteConnector::new(RemoteSettings::unconfigured(), Arc::clone(&remote));
        assert!(!connector.is_configured());
        assert!(!connector.connect());

        let local = RemoteConnector::<Arc<MemoryRemote>>::local_only();
        assert!(!local.connect());
        let pet = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());
        assert_eq!(
            local.upsert_remote(Table::Pets, &pet),
            Err(RemoteError::NotConfigured)
        );
    }

    #[test]
    fn calls_refused_while_offline() {
        let remote = Arc::new(MemoryRemote::new());
        let connector = connector(&remote);
        let pet = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());

        let err = connector.upsert_remote(Table::Pets, &pet).unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(remote.write_count(), 0);
    }

    #[test]
    fn remote_copy_is_always_synced() {
        let remote = Arc::new(MemoryRemote::new());
        let connector = connector(&remote);
        connector.connect();

        let pet = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());
        assert!(pet.is_pending());
        connector.upsert_remote(Table::Pets, &pet).unwrap();

        let stored = remote.row(Table::Pets, pet.id).unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Synced);
        assert!(stored.same_content(&pet));
    }

    #[test]
    fn lost_connection_clears_flag() {
        let remote = Arc::new(MemoryRemote::new());
        let connector = connector(&remote);
        connector.connect();

        remote.set_reachable(false);
        let owner = RecordId::new();
        assert!(connector.fetch_all(Table::Pets, owner).is_err());
        assert!(!connector.is_available());

        remote.set_reachable(true);
        assert!(connector.connect());
        assert!(connector.fetch_all(Table::Pets, owner).unwrap().is_empty());
    }

    #[test]
    fn rejection_keeps_flag() {
        let remote = Arc::new(MemoryRemote::new());
        let connector = connector(&remote);
        connector.connect();

        let pet = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());
        remote.reject(pet.id);
        let err = connector.upsert_remote(Table::Pets, &pet).unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
        assert!(connector.is_available());
    }
}
