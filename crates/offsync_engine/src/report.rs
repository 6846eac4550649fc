//! Results of push, pull and full sync, and the status snapshot.

use offsync_core::Table;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Why a single-row push did not land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The remote could not be reached; the connector is now offline.
    Unavailable,
    /// The remote refused the row.
    Rejected,
}

/// Result of pushing one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    /// The remote holds the row.
    Pushed,
    /// The connector reports unavailable; nothing was attempted.
    SkippedOffline,
    /// No local row with that id.
    NotFound,
    /// The row was rejected once too often and will no longer be pushed
    /// by `push_all_pending` until it is mutated again.
    Parked,
    /// The push failed; the row stays `pending`.
    Failed {
        /// Failure class.
        kind: FailureKind,
        /// Remote error message.
        message: String,
    },
}

impl PushOutcome {
    /// Returns true if the remote accepted the row.
    #[must_use]
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed)
    }
}

/// Per-table result of `push_all_pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    /// Rows the remote accepted.
    pub pushed: u64,
    /// Rows that failed and stay pending.
    pub failed: u64,
    /// Pending rows skipped because they are parked.
    pub parked: u64,
}

/// Result of `pull_for_owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "counts", rename_all = "snake_case")]
pub enum PullOutcome {
    /// The connector reports unavailable; nothing was fetched.
    SkippedOffline,
    /// Rows overwritten locally, per table.
    Pulled(BTreeMap<Table, u64>),
}

impl PullOutcome {
    /// Returns the number of rows pulled into `table`.
    #[must_use]
    pub fn count(&self, table: Table) -> u64 {
        match self {
            PullOutcome::SkippedOffline => 0,
            PullOutcome::Pulled(counts) => counts.get(&table).copied().unwrap_or(0),
        }
    }

    /// Returns the total number of rows pulled.
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            PullOutcome::SkippedOffline => 0,
            PullOutcome::Pulled(counts) => counts.values().sum(),
        }
    }
}

/// Result of `full_sync`, shaped `{pushed: {table: n}, pulled: {table: n}, is_online}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullSyncReport {
    /// Rows pushed per synchronizable table.
    pub pushed: BTreeMap<Table, u64>,
    /// Rows pulled per owner-scoped table.
    pub pulled: BTreeMap<Table, u64>,
    /// Connector availability when the sync finished.
    pub is_online: bool,
}

impl FullSyncReport {
    /// Returns the total rows pushed.
    #[must_use]
    pub fn total_pushed(&self) -> u64 {
        self.pushed.values().sum()
    }

    /// Returns the total rows pulled.
    #[must_use]
    pub fn total_pulled(&self) -> u64 {
        self.pulled.values().sum()
    }

    /// Returns the line shown after a user-requested sync.
    ///
    /// If the connection dropped partway, whatever landed is still reported.
    #[must_use]
    pub fn summary(&self) -> String {
        let (pushed, pulled) = (self.total_pushed(), self.total_pulled());
        if self.is_online {
            format!("pushed {pushed}, pulled {pulled}")
        } else if pushed + pulled > 0 {
            format!(
                "pushed {pushed}, pulled {pulled}, then went offline; remaining changes saved locally"
            )
        } else {
            "offline, changes saved locally".to_string()
        }
    }
}

/// Sync status surfaced to callers.
///
/// Serializes flat: `{is_online, pending_users, pending_pets, total_pending, parked}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatusSnapshot {
    /// Connector availability.
    pub is_online: bool,
    /// Pending rows per table.
    pub pending: BTreeMap<Table, u64>,
    /// Sum of `pending`.
    pub total_pending: u64,
    /// Pending rows that are parked after repeated rejections.
    pub parked: u64,
}

impl SyncStatusSnapshot {
    /// Returns the pending count for a table.
    #[must_use]
    pub fn pending_for(&self, table: Table) -> u64 {
        self.pending.get(&table).copied().unwrap_or(0)
    }
}

impl Serialize for SyncStatusSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pending.len() + 3))?;
        map.serialize_entry("is_online", &self.is_online)?;
        for (table, count) in &self.pending {
            map.serialize_entry(&format!("pending_{table}"), count)?;
        }
        map.serialize_entry("total_pending", &self.total_pending)?;
        map.serialize_entry("parked", &self.parked)?;
        map.end()
    }
}
