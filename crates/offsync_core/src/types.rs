//! Core type definitions shared by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a record.
///
/// Record IDs are v4 UUIDs generated on the device at creation time.
/// They are never assigned by the remote store and never change.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a record ID from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A synchronizable entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    /// User accounts. Account rows have no owner.
    Users,
    /// Pets, each owned by an account.
    Pets,
}

impl Table {
    /// Every synchronizable table, in push order.
    pub const ALL: [Table; 2] = [Table::Users, Table::Pets];

    /// Tables whose rows carry an `owner_id` and are pulled per owner.
    pub const OWNED: [Table; 1] = [Table::Pets];

    /// Returns the table name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Pets => "pets",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Table::Users),
            "pets" => Ok(Table::Pets),
            other => Err(format!("unknown table: {other}")),
        }
    }
}

/// Whether the remote store has confirmed a row's current local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local state has not been confirmed written to the remote store.
    Pending,
    /// Local state matches what the remote store holds.
    Synced,
}

impl SyncStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of local mutation recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Record was created.
    Insert,
    /// Record fields were changed.
    Update,
    /// Record was soft-deleted.
    Delete,
}

impl Operation {
    /// Returns the journal spelling of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
    }

    #[test]
    fn id_parses_its_display() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<RecordId>().is_err());
    }

    #[test]
    fn table_names() {
        assert_eq!(Table::Pets.to_string(), "pets");
        assert_eq!("users".parse::<Table>().unwrap(), Table::Users);
        assert!("owners".parse::<Table>().is_err());
        assert!(Table::OWNED.iter().all(|t| Table::ALL.contains(t)));
    }

    #[test]
    fn operation_spelling() {
        assert_eq!(Operation::Delete.to_string(), "DELETE");
        assert_eq!(SyncStatus::Pending.to_string(), "pending");
    }
}
