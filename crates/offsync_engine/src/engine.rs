//! The sync engine: local mutations, push, pull and full sync.

use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::report::{
    FailureKind, FullSyncReport, PullOutcome, PushOutcome, PushSummary, SyncStatusSnapshot,
};
use offsync_core::{
    next_timestamp, Clock, Fields, LocalStore, NewAccount, NewPet, Operation, PetPatch, Record,
    RecordId, SyncStatus, SystemClock, Table,
};
use offsync_remote::{RemoteConnector, RemoteError, RemoteStore};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reconciles the local store with the remote store.
///
/// The engine owns conflict resolution (last-write-wins on `updated_at`, ties
/// keep the local row) and every `sync_status` transition. Remote failures
/// never escape as errors; they come back as outcome values and the rows
/// involved stay `pending`.
///
/// Local mutations also go through the engine so that each one can be pushed
/// right away while the remote is reachable.
pub struct SyncEngine<S> {
    store: Arc<LocalStore>,
    connector: RemoteConnector<S>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    rejections: Mutex<HashMap<(Table, RecordId), u32>>,
}

impl<S: RemoteStore> SyncEngine<S> {
    /// Creates an engine using the system clock.
    pub fn new(store: Arc<LocalStore>, connector: RemoteConnector<S>, config: EngineConfig) -> Self {
        Self {
            store,
            connector,
            clock: Arc::new(SystemClock),
            config,
            rejections: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the clock used to stamp mutations.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Returns the remote connector.
    pub fn connector(&self) -> &RemoteConnector<S> {
        &self.connector
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates an account and pushes it if the remote is available.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input or a username already used
    /// by a live local account, and fatal errors from the local store.
    pub fn create_account(&self, account: NewAccount) -> SyncResult<RecordId> {
        let fields = account.validate()?;
        if self.store.find_account_by_username(&fields.username).is_some() {
            return Err(SyncError::DuplicateUsername(fields.username));
        }

        let record = Record::new_account(fields, next_timestamp(self.clock.as_ref(), None));
        let id = record.id;
        self.store
            .upsert_with_journal(Table::Users, record, Operation::Insert)?;
        info!(table = %Table::Users, %id, "account created");

        self.push_if_online(Table::Users, id)?;
        Ok(id)
    }

    /// Creates a pet for an existing account and pushes it if the remote is
    /// available.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input or an unknown owner, and
    /// fatal errors from the local store.
    pub fn create_pet(&self, owner_id: RecordId, pet: NewPet) -> SyncResult<RecordId> {
        let fields = pet.validate()?;
        if self.store.get(Table::Users, owner_id).is_none() {
            return Err(SyncError::UnknownOwner(owner_id));
        }

        let record = Record::new_pet(owner_id, fields, next_timestamp(self.clock.as_ref(), None));
        let id = record.id;
        self.store
            .upsert_with_journal(Table::Pets, record, Operation::Insert)?;
        info!(table = %Table::Pets, %id, %owner_id, "pet created");

        self.push_if_online(Table::Pets, id)?;
        Ok(id)
    }

    /// Applies a partial update to a live pet.
    ///
    /// Returns false if there is no live pet with that id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or malformed patch, and fatal
    /// errors from the local store.
    pub fn update_pet(&self, id: RecordId, patch: &PetPatch) -> SyncResult<bool> {
        patch.validate()?;
        let clock = self.clock.as_ref();
        let updated = self
            .store
            .modify(Table::Pets, id, Operation::Update, |record| {
                if let Fields::Pet(pet) = &mut record.fields {
                    patch.apply(pet);
                }
                record.updated_at = next_timestamp(clock, Some(record.updated_at));
                Ok(())
            })?;
        self.after_local_change(Table::Pets, id, updated.is_some(), "pet updated")
    }

    /// Soft-deletes a live pet.
    ///
    /// Returns false if there is no live pet with that id.
    ///
    /// # Errors
    ///
    /// Returns fatal errors from the local store.
    pub fn delete_pet(&self, id: RecordId) -> SyncResult<bool> {
        let clock = self.clock.as_ref();
        let deleted = self
            .store
            .modify(Table::Pets, id, Operation::Delete, |record| {
                record.is_deleted = true;
                record.updated_at = next_timestamp(clock, Some(record.updated_at));
                Ok(())
            })?;
        self.after_local_change(Table::Pets, id, deleted.is_some(), "pet deleted")
    }

    fn after_local_change(
        &self,
        table: Table,
        id: RecordId,
        changed: bool,
        message: &str,
    ) -> SyncResult<bool> {
        if !changed {
            return Ok(false);
        }
        debug!(%table, %id, "{message}");
        self.rejections.lock().remove(&(table, id));
        self.push_if_online(table, id)?;
        Ok(true)
    }

    fn push_if_online(&self, table: Table, id: RecordId) -> SyncResult<()> {
        if self.connector.is_available() {
            let outcome = self.push_record(table, id)?;
            debug!(%table, %id, ?outcome, "immediate push");
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns a live pet.
    pub fn get_pet(&self, id: RecordId) -> Option<Record> {
        self.store.get(Table::Pets, id)
    }

    /// Returns an owner's live pets ordered by name.
    pub fn list_pets(&self, owner_id: RecordId) -> Vec<Record> {
        self.store.list(Table::Pets, owner_id)
    }

    /// Returns a live account.
    pub fn get_account(&self, id: RecordId) -> Option<Record> {
        self.store.get(Table::Users, id)
    }

    /// Finds a live account by username.
    pub fn find_account(&self, username: &str) -> Option<Record> {
        self.store.find_account_by_username(username.trim())
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Pushes one row to the remote store.
    ///
    /// The row is read including soft-deleted state so deletions propagate.
    /// The remote copy is always written as `synced`. Locally the row becomes
    /// `synced` only if it was not mutated while the push was in flight.
    ///
    /// # Errors
    ///
    /// Only fatal local-storage errors. Remote failures are outcomes.
    pub fn push_record(&self, table: Table, id: RecordId) -> SyncResult<PushOutcome> {
        if !self.connector.is_available() {
            return Ok(PushOutcome::SkippedOffline);
        }
        let Some(record) = self.store.get_any(table, id) else {
            return Ok(PushOutcome::NotFound);
        };

        match self.connector.upsert_remote(table, &record) {
            Ok(()) => {
                self.rejections.lock().remove(&(table, id));
                let current = self
                    .store
                    .mark_synced_if_current(table, id, record.updated_at)?;
                debug!(%table, %id, current, "row pushed");
                Ok(PushOutcome::Pushed)
            }
            Err(RemoteError::NotConfigured) => Ok(PushOutcome::SkippedOffline),
            Err(RemoteError::Rejected(message)) => Ok(self.note_rejection(table, id, message)),
            Err(err) => {
                debug!(%table, %id, error = %err, "push failed");
                Ok(PushOutcome::Failed {
                    kind: FailureKind::Unavailable,
                    message: err.to_string(),
                })
            }
        }
    }

    fn note_rejection(&self, table: Table, id: RecordId, message: String) -> PushOutcome {
        let count = {
            let mut rejections = self.rejections.lock();
            let count = rejections.entry((table, id)).or_insert(0);
            *count += 1;
            *count
        };
        let max = self.config.max_rejections;
        if max > 0 && count >= max {
            warn!(%table, %id, rejections = count, reason = %message, "row parked after repeated rejections");
            PushOutcome::Parked
        } else {
            warn!(%table, %id, rejections = count, reason = %message, "remote rejected row");
            PushOutcome::Failed {
                kind: FailureKind::Rejected,
                message,
            }
        }
    }

    /// Pushes every `pending` row of a table.
    ///
    /// Rows are independent: a failure never stops the loop. Parked rows are
    /// skipped and counted separately.
    ///
    /// # Errors
    ///
    /// Only fatal local-storage errors.
    pub fn push_all_pending(&self, table: Table) -> SyncResult<PushSummary> {
        let mut summary = PushSummary::default();
        if !self.connector.is_available() {
            return Ok(summary);
        }

        for id in self.store.pending_ids(table) {
            if self.is_parked(table, id) {
                summary.parked += 1;
                continue;
            }
            match self.push_record(table, id)? {
                PushOutcome::Pushed => summary.pushed += 1,
                PushOutcome::Parked => summary.parked += 1,
                PushOutcome::NotFound => {}
                PushOutcome::SkippedOffline | PushOutcome::Failed { .. } => summary.failed += 1,
            }
        }

        if summary != PushSummary::default() {
            debug!(
                %table,
                pushed = summary.pushed,
                failed = summary.failed,
                parked = summary.parked,
                "push pass finished"
            );
        }
        Ok(summary)
    }

    // =========================================================================
    // Pull
    // =========================================================================

    /// Pulls an owner's rows from the remote store, last write wins.
    ///
    /// A remote row replaces the local one only if there is no local row or
    /// the remote `updated_at` is strictly newer. Equal timestamps keep the
    /// local row. A fetch failure of any kind stops the pull and marks the
    /// remote unavailable; rows already applied stay and are counted.
    ///
    /// # Errors
    ///
    /// Only fatal local-storage errors.
    pub fn pull_for_owner(&self, owner_id: RecordId) -> SyncResult<PullOutcome> {
        if !self.connector.is_available() {
            return Ok(PullOutcome::SkippedOffline);
        }

        let mut counts: BTreeMap<Table, u64> = Table::OWNED.iter().map(|t| (*t, 0)).collect();
        for table in Table::OWNED {
            let rows = match self.connector.fetch_all(table, owner_id) {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(%table, %owner_id, error = %err, "pull interrupted");
                    self.connector.disconnect();
                    break;
                }
            };

            let mut pulled = 0;
            for remote in rows {
                if remote.table() != table || remote.owner_id != Some(owner_id) {
                    warn!(%table, id = %remote.id, "ignoring foreign row from remote");
                    continue;
                }
                let id = remote.id;
                let remote_updated_at = remote.updated_at;
                let applied = self.store.upsert_if(
                    table,
                    remote.with_status(SyncStatus::Synced),
                    None,
                    |local| local.map_or(true, |l| l.updated_at < remote_updated_at),
                )?;
                if applied {
                    self.rejections.lock().remove(&(table, id));
                    pulled += 1;
                }
            }
            counts.insert(table, pulled);
        }

        Ok(PullOutcome::Pulled(counts))
    }

    // =========================================================================
    // Full sync
    // =========================================================================

    /// Pushes every table, then pulls the owner's rows.
    ///
    /// Push runs first so a fresh local edit overwrites its stale remote copy
    /// instead of being pulled over.
    ///
    /// # Errors
    ///
    /// Only fatal local-storage errors.
    pub fn full_sync(&self, owner_id: RecordId) -> SyncResult<FullSyncReport> {
        let mut pushed = BTreeMap::new();
        for table in Table::ALL {
            pushed.insert(table, self.push_all_pending(table)?.pushed);
        }

        let pulled = match self.pull_for_owner(owner_id)? {
            PullOutcome::Pulled(counts) => counts,
            PullOutcome::SkippedOffline => Table::OWNED.iter().map(|t| (*t, 0)).collect(),
        };

        let report = FullSyncReport {
            pushed,
            pulled,
            is_online: self.connector.is_available(),
        };
        info!(
            %owner_id,
            pushed = report.total_pushed(),
            pulled = report.total_pulled(),
            online = report.is_online,
            "full sync finished"
        );
        Ok(report)
    }

    /// Re-checks connectivity. Returns the new availability.
    pub fn refresh_connectivity(&self) -> bool {
        self.connector.connect()
    }

    /// Re-checks connectivity, then runs a full sync.
    ///
    /// # Errors
    ///
    /// Only fatal local-storage errors.
    pub fn sync_now(&self, owner_id: RecordId) -> SyncResult<FullSyncReport> {
        self.refresh_connectivity();
        self.full_sync(owner_id)
    }

    /// Runs one scheduled attempt: re-check connectivity, and sync only if
    /// the remote is available.
    ///
    /// # Errors
    ///
    /// Only fatal local-storage errors.
    pub fn sync_attempt(&self, owner_id: RecordId) -> SyncResult<Option<FullSyncReport>> {
        if !self.refresh_connectivity() {
            debug!(%owner_id, "remote unavailable; skipping sync attempt");
            return Ok(None);
        }
        self.full_sync(owner_id).map(Some)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Returns the current sync status.
    pub fn sync_status(&self) -> SyncStatusSnapshot {
        let pending: BTreeMap<Table, u64> = Table::ALL
            .iter()
            .map(|t| (*t, self.store.count_pending(*t) as u64))
            .collect();
        let parked = self
            .parked_rows()
            .into_iter()
            .filter(|(table, id)| {
                self.store
                    .get_any(*table, *id)
                    .map_or(false, |r| r.is_pending())
            })
            .count() as u64;

        SyncStatusSnapshot {
            is_online: self.connector.is_available(),
            total_pending: pending.values().sum(),
            pending,
            parked,
        }
    }

    /// Returns true if the row is parked after repeated rejections.
    pub fn is_parked(&self, table: Table, id: RecordId) -> bool {
        let max = self.config.max_rejections;
        max > 0
            && self
                .rejections
                .lock()
                .get(&(table, id))
                .is_some_and(|count| *count >= max)
    }

    /// Forgets every rejection count, so parked rows are pushed again.
    ///
    /// Returns how many rows were parked.
    pub fn unpark_all(&self) -> usize {
        let parked = self.parked_rows().len();
        self.rejections.lock().clear();
        if parked > 0 {
            info!(parked, "parked rows released");
        }
        parked
    }

    fn parked_rows(&self) -> Vec<(Table, RecordId)> {
        let max = self.config.max_rejections;
        if max == 0 {
            return Vec::new();
        }
        self.rejections
            .lock()
            .iter()
            .filter(|(_, count)| **count >= max)
            .map(|(key, _)| *key)
            .collect()
    }
}

impl<S> std::fmt::Debug for SyncEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("store", &self.store)
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use offsync_core::ManualClock;
    use offsync_remote::{MemoryRemote, RemoteSettings};
    use std::time::Duration;

    struct Fixture {
        remote: Arc<MemoryRemote>,
        clock: Arc<ManualClock>,
        engine: SyncEngine<Arc<MemoryRemote>>,
    }

    fn fixture(config: EngineConfig) -> Fixture {
        let remote = Arc::new(MemoryRemote::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let connector =
            RemoteConnector::new(RemoteSettings::new("memory://", "token"), Arc::clone(&remote));
        let engine = SyncEngine::new(
            Arc::new(LocalStore::open_in_memory().unwrap()),
            connector,
            config,
        )
        .with_clock(clock.clone());
        Fixture {
            remote,
            clock,
            engine,
        }
    }

    fn offline_owner(f: &Fixture) -> RecordId {
        f.engine
            .create_account(NewAccount::new("alice", "hash"))
            .unwrap()
    }

    #[test]
    fn mutations_offline_stay_pending() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();

        assert_eq!(f.engine.get_pet(pet).unwrap().sync_status, SyncStatus::Pending);
        let status = f.engine.sync_status();
        assert!(!status.is_online);
        assert_eq!(status.pending_for(Table::Users), 1);
        assert_eq!(status.pending_for(Table::Pets), 1);
        assert_eq!(status.total_pending, 2);
        assert_eq!(f.remote.write_count(), 0);
    }

    #[test]
    fn mutations_online_push_immediately() {
        let f = fixture(EngineConfig::default());
        assert!(f.engine.refresh_connectivity());

        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();

        assert_eq!(f.engine.get_pet(pet).unwrap().sync_status, SyncStatus::Synced);
        assert!(f.remote.row(Table::Pets, pet).is_some());
        assert_eq!(f.engine.sync_status().total_pending, 0);
    }

    #[test]
    fn create_pet_requires_live_owner() {
        let f = fixture(EngineConfig::default());
        let err = f
            .engine
            .create_pet(RecordId::new(), NewPet::new("Rex", "dog"))
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownOwner(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn duplicate_username_rejected_locally() {
        let f = fixture(EngineConfig::default());
        offline_owner(&f);
        let err = f
            .engine
            .create_account(NewAccount::new("  alice ", "other"))
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateUsername(name) if name == "alice"));
        assert_eq!(f.engine.store().list_all(Table::Users).len(), 1);
    }

    #[test]
    fn invalid_input_writes_nothing() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        let before = f.engine.store().journal(None).len();

        assert!(f.engine.create_pet(owner, NewPet::new("", "dog")).is_err());
        assert!(f
            .engine
            .create_pet(owner, NewPet::new("Rex", "dog").weight(-1.0))
            .is_err());
        assert!(f.engine.create_account(NewAccount::new("al", "h")).is_err());

        assert_eq!(f.engine.store().journal(None).len(), before);
    }

    #[test]
    fn update_advances_timestamp_even_with_stalled_clock() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        let before = f.engine.get_pet(pet).unwrap().updated_at;

        assert!(f
            .engine
            .update_pet(pet, &PetPatch::new().name("Max").age(4))
            .unwrap());
        let after = f.engine.get_pet(pet).unwrap();
        assert!(after.updated_at > before);
        assert_eq!(after.pet().unwrap().name, "Max");
        assert_eq!(after.pet().unwrap().age, 4);
        assert_eq!(after.pet().unwrap().species, "dog");
    }

    #[test]
    fn update_and_delete_of_missing_pet_return_false() {
        let f = fixture(EngineConfig::default());
        let missing = RecordId::new();
        assert!(!f.engine.update_pet(missing, &PetPatch::new().name("x")).unwrap());
        assert!(!f.engine.delete_pet(missing).unwrap());
    }

    #[test]
    fn empty_patch_is_rejected() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        let err = f.engine.update_pet(pet, &PetPatch::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn each_mutation_journals_once() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        f.engine.update_pet(pet, &PetPatch::new().notes("vet on monday")).unwrap();
        f.engine.delete_pet(pet).unwrap();

        let ops: Vec<Operation> = f
            .engine
            .store()
            .journal(Some(pet))
            .into_iter()
            .map(|e| e.operation)
            .collect();
        assert_eq!(ops, vec![Operation::Insert, Operation::Update, Operation::Delete]);
    }

    #[test]
    fn push_marks_journal_synced() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        f.engine.refresh_connectivity();

        assert_eq!(
            f.engine.push_record(Table::Users, owner).unwrap(),
            PushOutcome::Pushed
        );
        assert!(f.engine.store().journal(Some(owner)).iter().all(|e| e.synced));
    }

    #[test]
    fn push_of_unknown_row_is_not_found() {
        let f = fixture(EngineConfig::default());
        f.engine.refresh_connectivity();
        assert_eq!(
            f.engine.push_record(Table::Pets, RecordId::new()).unwrap(),
            PushOutcome::NotFound
        );
    }

    #[test]
    fn lost_connection_fails_push_and_goes_offline() {
        let f = fixture(EngineConfig::default());
        let owner = offline_owner(&f);
        f.engine.refresh_connectivity();
        f.remote.set_reachable(false);

        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        assert_eq!(f.engine.get_pet(pet).unwrap().sync_status, SyncStatus::Pending);
        assert!(!f.engine.connector().is_available());
        assert_eq!(
            f.engine.push_record(Table::Pets, pet).unwrap(),
            PushOutcome::SkippedOffline
        );
    }

    #[test]
    fn rejected_rows_park_after_threshold() {
        let f = fixture(EngineConfig::default().with_max_rejections(2));
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        f.remote.reject(pet);
        f.engine.refresh_connectivity();

        let first = f.engine.push_all_pending(Table::Pets).unwrap();
        assert_eq!(first.failed, 1);
        let second = f.engine.push_all_pending(Table::Pets).unwrap();
        assert_eq!(second.parked, 1);
        assert!(f.engine.is_parked(Table::Pets, pet));

        let third = f.engine.push_all_pending(Table::Pets).unwrap();
        assert_eq!(third, PushSummary { pushed: 0, failed: 0, parked: 1 });
        assert_eq!(f.engine.sync_status().parked, 1);
        assert_eq!(f.engine.get_pet(pet).unwrap().sync_status, SyncStatus::Pending);
    }

    #[test]
    fn local_edit_unparks() {
        let f = fixture(EngineConfig::default().with_max_rejections(1));
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        f.remote.reject(pet);
        f.engine.refresh_connectivity();
        f.engine.push_all_pending(Table::Pets).unwrap();
        assert!(f.engine.is_parked(Table::Pets, pet));

        f.remote.accept(pet);
        f.clock.advance(Duration::from_secs(1));
        f.engine.update_pet(pet, &PetPatch::new().breed("beagle")).unwrap();
        assert!(!f.engine.is_parked(Table::Pets, pet));
        assert_eq!(f.engine.get_pet(pet).unwrap().sync_status, SyncStatus::Synced);
    }

    #[test]
    fn unpark_all_releases_rows() {
        let f = fixture(EngineConfig::default().with_max_rejections(1));
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        f.remote.reject(pet);
        f.engine.refresh_connectivity();
        f.engine.push_all_pending(Table::Pets).unwrap();

        f.remote.accept(pet);
        assert_eq!(f.engine.unpark_all(), 1);
        let summary = f.engine.push_all_pending(Table::Pets).unwrap();
        assert_eq!(summary.pushed, 1);
    }

    #[test]
    fn zero_threshold_never_parks() {
        let f = fixture(EngineConfig::default().with_max_rejections(0));
        let owner = offline_owner(&f);
        let pet = f.engine.create_pet(owner, NewPet::new("Rex", "dog")).unwrap();
        f.remote.reject(pet);
        f.engine.refresh_connectivity();

        for _ in 0..10 {
            let summary = f.engine.push_all_pending(Table::Pets).unwrap();
            assert_eq!(summary.failed, 1);
        }
        assert!(!f.engine.is_parked(Table::Pets, pet));
    }

    #[test]
    fn sync_attempt_skips_when_unreachable() {
        let f = fixture(EngineConfig::default());
        f.remote.set_reachable(false);
        let owner = offline_owner(&f);
        assert_eq!(f.engine.sync_attempt(owner).unwrap(), None);

        f.remote.set_reachable(true);
        let report = f.engine.sync_attempt(owner).unwrap().unwrap();
        assert_eq!(report.pushed[&Table::Users], 1);
    }

    /// Accepts writes but refuses every fetch.
    struct RefusesFetch(MemoryRemote);

    impl offsync_remote::RemoteStore for RefusesFetch {
        fn ping(&self) -> offsync_remote::RemoteResult<()> {
            self.0.ping()
        }

        fn upsert(
            &self,
            table: Table,
            record: &offsync_core::Record,
        ) -> offsync_remote::RemoteResult<()> {
            self.0.upsert(table, record)
        }

        fn fetch_for_owner(
            &self,
            _table: Table,
            _owner_id: RecordId,
        ) -> offsync_remote::RemoteResult<Vec<offsync_core::Record>> {
            Err(offsync_remote::RemoteError::rejected("403 forbidden"))
        }
    }

    #[test]
    fn refused_fetch_stops_pull_and_goes_offline() {
        let engine = SyncEngine::new(
            Arc::new(LocalStore::open_in_memory().unwrap()),
            RemoteConnector::new(
                RemoteSettings::new("memory://", "token"),
                RefusesFetch(MemoryRemote::new()),
            ),
            EngineConfig::default(),
        );
        assert!(engine.refresh_connectivity());
        let owner = engine.create_account(NewAccount::new("alice", "h")).unwrap();

        let outcome = engine.pull_for_owner(owner).unwrap();
        assert_eq!(outcome.total(), 0);
        assert!(!engine.connector().is_available());
        assert!(!engine.sync_status().is_online);
    }

    #[test]
    fn local_only_engine_never_syncs() {
        let engine: SyncEngine<Arc<MemoryRemote>> = SyncEngine::new(
            Arc::new(LocalStore::open_in_memory().unwrap()),
            RemoteConnector::local_only(),
            EngineConfig::default(),
        );
        let owner = engine.create_account(NewAccount::new("carol", "h")).unwrap();
        let report = engine.sync_now(owner).unwrap();
        assert!(!report.is_online);
        assert_eq!(report.summary(), "offline, changes saved locally");
        assert_eq!(engine.sync_status().total_pending, 1);
    }
}
