//! Change journal entries.

use crate::types::{Operation, RecordId, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of the append-only change journal.
///
/// Every status-changing local mutation writes exactly one entry. The sync
/// engine does not replay the journal; it exists so the change stream can be
/// audited against the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// Table of the mutated record.
    pub table: Table,
    /// The mutated record.
    pub record_id: RecordId,
    /// What happened.
    pub operation: Operation,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Set once the mutation has been confirmed by the remote store.
    pub synced: bool,
}

impl JournalEntry {
    /// Creates an unsynced entry.
    #[must_use]
    pub fn new(
        table: Table,
        record_id: RecordId,
        operation: Operation,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            table,
            record_id,
            operation,
            timestamp,
            synced: false,
        }
    }
}
