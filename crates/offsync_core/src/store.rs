//! The local store.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::JournalEntry;
use crate::log::{decode_all, LogFrame, LOG_FILE_NAME};
use crate::record::{Fields, Record};
use crate::types::{Operation, RecordId, SyncStatus, Table};
use chrono::{DateTime, Utc};
use offsync_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Counters describing a store's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Live rows per table, soft-deleted rows excluded.
    pub rows: BTreeMap<Table, usize>,
    /// Soft-deleted rows across all tables.
    pub deleted: usize,
    /// Pending rows across all tables.
    pub pending: usize,
    /// Journal entries.
    pub journal_entries: usize,
    /// Journal entries not yet confirmed by the remote store.
    pub unsynced_journal: usize,
    /// Frames currently in the log.
    pub log_frames: u64,
    /// Log size in bytes.
    pub log_bytes: u64,
}

/// Durable storage for every synchronizable table plus the change journal.
///
/// All tables live in memory; every write is appended to the record log
/// before it becomes visible, so a crash never loses an acknowledged write.
///
/// Access is serialized through one lock. The conditional writers
/// ([`upsert_if`], [`modify`], [`mark_synced_if_current`]) evaluate their
/// condition and write under that lock, so a background sync and a
/// foreground mutation never interleave on the same row.
///
/// [`upsert_if`]: LocalStore::upsert_if
/// [`modify`]: LocalStore::modify
/// [`mark_synced_if_current`]: LocalStore::mark_synced_if_current
pub struct LocalStore {
    inner: Mutex<StoreInner>,
    path: Option<PathBuf>,
}

struct StoreInner {
    backend: Box<dyn StorageBackend>,
    config: StoreConfig,
    tables: BTreeMap<Table, HashMap<RecordId, Record>>,
    journal: Vec<JournalEntry>,
    log_frames: u64,
}

impl LocalStore {
    /// Opens the store in `dir`, creating it if allowed.
    ///
    /// # Errors
    ///
    /// Fails if the store is missing and `create_if_missing` is off, if
    /// another handle holds the lock, or if the log is corrupt.
    pub fn open(dir: impl AsRef<Path>, config: StoreConfig) -> CoreResult<Self> {
        let path = dir.as_ref().join(LOG_FILE_NAME);
        if !path.exists() && !config.create_if_missing {
            return Err(CoreError::StoreMissing { path });
        }
        let backend = FileBackend::open(&path)?;
        let mut store = Self::open_with_backend(Box::new(backend), config)?;
        store.path = Some(path);
        Ok(store)
    }

    /// Opens an empty store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other openers.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Box::new(InMemoryBackend::new()), StoreConfig::default())
    }

    /// Opens a store over an arbitrary backend, replaying its log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or is corrupt.
    pub fn open_with_backend(
        mut backend: Box<dyn StorageBackend>,
        config: StoreConfig,
    ) -> CoreResult<Self> {
        let bytes = backend.read_all()?;
        let decoded = decode_all(&bytes)?;

        if decoded.torn {
            warn!(
                valid_len = decoded.valid_len,
                dropped = bytes.len() as u64 - decoded.valid_len,
                "dropping torn frame at end of record log"
            );
            backend.truncate(decoded.valid_len)?;
            backend.sync()?;
        }

        let mut inner = StoreInner {
            backend,
            config,
            tables: Table::ALL.iter().map(|t| (*t, HashMap::new())).collect(),
            journal: Vec::new(),
            log_frames: decoded.frames.len() as u64,
        };
        for (_, frame) in decoded.frames {
            inner.apply(frame);
        }

        info!(
            frames = inner.log_frames,
            rows = inner.tables.values().map(HashMap::len).sum::<usize>(),
            journal = inner.journal.len(),
            "local store opened"
        );

        Ok(Self {
            inner: Mutex::new(inner),
            path: None,
        })
    }

    /// Returns the log file path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes or replaces a row, without a journal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the row belongs to another table or the write
    /// cannot be persisted.
    pub fn upsert(&self, table: Table, record: Record) -> CoreResult<()> {
        check_table(table, &record)?;
        self.inner.lock().write(LogFrame::Upsert {
            table,
            record,
            journal: None,
        })
    }

    /// Writes a row and its journal entry as one atomic unit.
    ///
    /// The entry is stamped with the row's `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row belongs to another table or the write
    /// cannot be persisted. Neither the row nor the entry lands in that case.
    pub fn upsert_with_journal(
        &self,
        table: Table,
        record: Record,
        operation: Operation,
    ) -> CoreResult<JournalEntry> {
        check_table(table, &record)?;
        let entry = JournalEntry::new(table, record.id, operation, record.updated_at);
        self.inner.lock().write(LogFrame::Upsert {
            table,
            record,
            journal: Some(entry.clone()),
        })?;
        Ok(entry)
    }

    /// Writes a row only if `accept` approves of the current one.
    ///
    /// `accept` sees the existing row, soft-deleted rows included, or `None`.
    /// Returns whether the write happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the row belongs to another table or the write
    /// cannot be persisted.
    pub fn upsert_if<F>(
        &self,
        table: Table,
        record: Record,
        operation: Option<Operation>,
        accept: F,
    ) -> CoreResult<bool>
    where
        F: FnOnce(Option<&Record>) -> bool,
    {
        check_table(table, &record)?;
        let mut inner = self.inner.lock();
        if !accept(inner.row(table, record.id)) {
            return Ok(false);
        }
        let journal =
            operation.map(|op| JournalEntry::new(table, record.id, op, record.updated_at));
        inner.write(LogFrame::Upsert {
            table,
            record,
            journal,
        })?;
        Ok(true)
    }

    /// Mutates a live row in place and journals the change.
    ///
    /// The row handed to `f` is a copy; nothing is written if `f` fails. The
    /// result is always stored as `pending`. Returns the new row, or `None`
    /// if there is no live row with that id.
    ///
    /// # Errors
    ///
    /// Propagates errors from `f` and persistence errors.
    pub fn modify<F>(
        &self,
        table: Table,
        id: RecordId,
        operation: Operation,
        f: F,
    ) -> CoreResult<Option<Record>>
    where
        F: FnOnce(&mut Record) -> CoreResult<()>,
    {
        let mut inner = self.inner.lock();
        let Some(mut record) = inner.row(table, id).filter(|r| !r.is_deleted).cloned() else {
            return Ok(None);
        };
        f(&mut record)?;
        if record.id != id {
            return Err(CoreError::validation("id", "cannot be changed"));
        }
        check_table(table, &record)?;
        record.sync_status = SyncStatus::Pending;

        let entry = JournalEntry::new(table, id, operation, record.updated_at);
        inner.write(LogFrame::Upsert {
            table,
            record: record.clone(),
            journal: Some(entry),
        })?;
        Ok(Some(record))
    }

    /// Writes a pulled row as `synced`, without a journal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn apply_remote(&self, table: Table, record: Record) -> CoreResult<()> {
        self.upsert(table, record.with_status(SyncStatus::Synced))
    }

    /// Returns a live row.
    #[must_use]
    pub fn get(&self, table: Table, id: RecordId) -> Option<Record> {
        self.get_any(table, id).filter(|r| !r.is_deleted)
    }

    /// Returns a row, soft-deleted or not.
    #[must_use]
    pub fn get_any(&self, table: Table, id: RecordId) -> Option<Record> {
        self.inner.lock().row(table, id).cloned()
    }

    /// Returns an owner's live rows ordered by display key, then id.
    #[must_use]
    pub fn list(&self, table: Table, owner_id: RecordId) -> Vec<Record> {
        self.collect_sorted(table, |r| r.owner_id == Some(owner_id))
    }

    /// Returns every live row of a table ordered by display key, then id.
    #[must_use]
    pub fn list_all(&self, table: Table) -> Vec<Record> {
        self.collect_sorted(table, |_| true)
    }

    fn collect_sorted(&self, table: Table, keep: impl Fn(&Record) -> bool) -> Vec<Record> {
        let inner = self.inner.lock();
        let mut rows: Vec<Record> = inner
            .rows(table)
            .filter(|r| !r.is_deleted && keep(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.fields
                .display_key()
                .cmp(b.fields.display_key())
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }

    /// Finds a live account by username.
    #[must_use]
    pub fn find_account_by_username(&self, username: &str) -> Option<Record> {
        let inner = self.inner.lock();
        let found = inner
            .rows(Table::Users)
            .find(|r| {
                !r.is_deleted
                    && matches!(&r.fields, Fields::Account(a) if a.username == username)
            })
            .cloned();
        found
    }

    /// Sets a row's status and nothing else.
    ///
    /// Returns false if the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn mark_status(&self, table: Table, id: RecordId, status: SyncStatus) -> CoreResult<bool> {
        let mut inner = self.inner.lock();
        if inner.row(table, id).is_none() {
            return Ok(false);
        }
        inner.write(LogFrame::Status {
            table,
            id,
            status,
            ack_journal: false,
        })?;
        Ok(true)
    }

    /// Marks a row `synced` if it still has the `updated_at` that was pushed.
    ///
    /// A row mutated while its push was in flight stays `pending`. On
    /// success the row's journal entries are flagged as synced too.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn mark_synced_if_current(
        &self,
        table: Table,
        id: RecordId,
        pushed_updated_at: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let mut inner = self.inner.lock();
        match inner.row(table, id) {
            Some(row) if row.updated_at == pushed_updated_at => {}
            Some(_) => {
                debug!(%table, %id, "row changed during push; leaving it pending");
                return Ok(false);
            }
            None => return Ok(false),
        }
        inner.write(LogFrame::Status {
            table,
            id,
            status: SyncStatus::Synced,
            ack_journal: true,
        })?;
        Ok(true)
    }

    /// Appends a standalone journal entry with `synced=false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn append_journal(
        &self,
        table: Table,
        id: RecordId,
        operation: Operation,
    ) -> CoreResult<JournalEntry> {
        let mut inner = self.inner.lock();
        let timestamp = inner.row(table, id).map_or_else(Utc::now, |r| r.updated_at);
        let entry = JournalEntry::new(table, id, operation, timestamp);
        inner.write(LogFrame::Journal {
            entry: entry.clone(),
        })?;
        Ok(entry)
    }

    /// Flags every journal entry of a row as synced.
    ///
    /// Returns how many entries changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    pub fn mark_journal_synced(&self, table: Table, id: RecordId) -> CoreResult<usize> {
        let mut inner = self.inner.lock();
        let unsynced = inner
            .journal
            .iter()
            .filter(|e| e.table == table && e.record_id == id && !e.synced)
            .count();
        if unsynced > 0 {
            inner.write(LogFrame::JournalAck {
                table,
                record_id: id,
            })?;
        }
        Ok(unsynced)
    }

    /// Returns journal entries in append order, optionally for one row.
    #[must_use]
    pub fn journal(&self, record_id: Option<RecordId>) -> Vec<JournalEntry> {
        let inner = self.inner.lock();
        inner
            .journal
            .iter()
            .filter(|e| record_id.map_or(true, |id| e.record_id == id))
            .cloned()
            .collect()
    }

    /// Counts `pending` rows, soft-deleted ones included.
    #[must_use]
    pub fn count_pending(&self, table: Table) -> usize {
        self.inner.lock().rows(table).filter(|r| r.is_pending()).count()
    }

    /// Returns the ids of `pending` rows, oldest change first.
    #[must_use]
    pub fn pending_ids(&self, table: Table) -> Vec<RecordId> {
        let inner = self.inner.lock();
        let mut pending: Vec<(DateTime<Utc>, RecordId)> = inner
            .rows(table)
            .filter(|r| r.is_pending())
            .map(|r| (r.updated_at, r.id))
            .collect();
        pending.sort();
        pending.into_iter().map(|(_, id)| id).collect()
    }

    /// Rewrites the log as a snapshot of current rows and journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written; the old log is
    /// kept in that case.
    pub fn compact(&self) -> CoreResult<()> {
        self.inner.lock().compact()
    }

    /// Returns content counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the log size cannot be read.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let inner = self.inner.lock();
        let mut stats = StoreStats {
            journal_entries: inner.journal.len(),
            unsynced_journal: inner.journal.iter().filter(|e| !e.synced).count(),
            log_frames: inner.log_frames,
            log_bytes: inner.backend.size()?,
            ..StoreStats::default()
        };
        for (table, rows) in &inner.tables {
            let live = rows.values().filter(|r| !r.is_deleted).count();
            stats.rows.insert(*table, live);
            stats.deleted += rows.len() - live;
            stats.pending += rows.values().filter(|r| r.is_pending()).count();
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn check_table(table: Table, record: &Record) -> CoreResult<()> {
    let actual = record.table();
    if actual != table {
        return Err(CoreError::TableMismatch {
            expected: table,
            actual,
        });
    }
    Ok(())
}

impl StoreInner {
    fn row(&self, table: Table, id: RecordId) -> Option<&Record> {
        self.tables.get(&table).and_then(|rows| rows.get(&id))
    }

    fn rows(&self, table: Table) -> impl Iterator<Item = &Record> {
        self.tables.get(&table).into_iter().flat_map(HashMap::values)
    }

    /// Persists a frame, then makes it visible.
    ///
    /// Due automatic compaction runs first. If it fails the frame is not
    /// written and the error is returned as a storage failure.
    fn write(&mut self, frame: LogFrame) -> CoreResult<()> {
        let bytes = frame.encode()?;
        self.maybe_compact()?;
        let before = self.backend.size()?;

        let persisted = self.backend.append(&bytes).and_then(|_| {
            if self.config.sync_on_write {
                self.backend.sync()
            } else {
                Ok(())
            }
        });
        if let Err(err) = persisted {
            if let Err(undo) = self.backend.truncate(before) {
                warn!(error = %undo, "could not cut back partially written frame");
            }
            return Err(err.into());
        }

        self.apply(frame);
        self.log_frames += 1;
        Ok(())
    }

    fn apply(&mut self, frame: LogFrame) {
        match frame {
            LogFrame::Upsert {
                table,
                record,
                journal,
            } => {
                self.tables.entry(table).or_default().insert(record.id, record);
                if let Some(entry) = journal {
                    self.journal.push(entry);
                }
            }
            LogFrame::Status {
                table,
                id,
                status,
                ack_journal,
            } => {
                if let Some(row) = self.tables.get_mut(&table).and_then(|rows| rows.get_mut(&id)) {
                    row.sync_status = status;
                }
                if ack_journal {
                    self.ack_journal(table, id);
                }
            }
            LogFrame::Journal { entry } => self.journal.push(entry),
            LogFrame::JournalAck { table, record_id } => self.ack_journal(table, record_id),
        }
    }

    fn ack_journal(&mut self, table: Table, id: RecordId) {
        for entry in &mut self.journal {
            if entry.table == table && entry.record_id == id {
                entry.synced = true;
            }
        }
    }

    fn live_frames(&self) -> u64 {
        let rows: usize = self.tables.values().map(HashMap::len).sum();
        (rows + self.journal.len()) as u64
    }

    fn maybe_compact(&mut self) -> CoreResult<()> {
        let threshold = self.config.compact_after;
        if threshold == 0 || self.log_frames.saturating_sub(self.live_frames()) < threshold {
            return Ok(());
        }
        self.compact().map_err(|err| {
            error!(error = %err, "automatic log compaction failed");
            err
        })
    }

    fn compact(&mut self) -> CoreResult<()> {
        let mut snapshot = Vec::new();
        let mut frames = 0u64;

        for (table, rows) in &self.tables {
            let mut ids: Vec<&RecordId> = rows.keys().collect();
            ids.sort();
            for id in ids {
                let frame = LogFrame::Upsert {
                    table: *table,
                    record: rows[id].clone(),
                    journal: None,
                };
                snapshot.extend(frame.encode()?);
                frames += 1;
            }
        }
        for entry in &self.journal {
            snapshot.extend(
                LogFrame::Journal {
                    entry: entry.clone(),
                }
                .encode()?,
            );
            frames += 1;
        }

        self.backend.replace(&snapshot)?;
        info!(before = self.log_frames, after = frames, bytes = snapshot.len(), "record log compacted");
        self.log_frames = frames;
        Ok(())
    }
}
