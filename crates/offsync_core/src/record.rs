//! The record model shared by every synchronizable table.

use crate::types::{RecordId, SyncStatus, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload of an account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFields {
    /// Login name, unique among live accounts.
    pub username: String,
    /// Opaque credential hash produced by the authentication layer.
    pub password_hash: String,
}

/// Payload of a pet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetFields {
    /// Display name, also the list ordering key.
    pub name: String,
    /// Species, e.g. "dog".
    pub species: String,
    /// Breed, may be empty.
    pub breed: String,
    /// Age in years.
    pub age: u32,
    /// Weight in kilograms.
    pub weight: f64,
    /// Free-form notes.
    pub notes: String,
}

impl PetFields {
    /// Creates pet fields with a name and species and empty extras.
    pub fn new(name: impl Into<String>, species: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            species: species.into(),
            breed: String::new(),
            age: 0,
            weight: 0.0,
            notes: String::new(),
        }
    }
}

/// Entity-specific payload of a record.
///
/// The sync engine never looks inside; it only moves whole rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fields {
    /// An account row.
    Account(AccountFields),
    /// A pet row.
    Pet(PetFields),
}

impl Fields {
    /// Returns the table rows with this payload live in.
    #[must_use]
    pub fn table(&self) -> Table {
        match self {
            Fields::Account(_) => Table::Users,
            Fields::Pet(_) => Table::Pets,
        }
    }

    /// Returns the stable key `list` orders by.
    #[must_use]
    pub fn display_key(&self) -> &str {
        match self {
            Fields::Account(account) => &account.username,
            Fields::Pet(pet) => &pet.name,
        }
    }
}

/// One row of a synchronizable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Client-generated identifier.
    pub id: RecordId,
    /// Owning account; `None` for account rows.
    pub owner_id: Option<RecordId>,
    /// Entity payload.
    pub fields: Fields,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last mutation; strictly advances on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag. Terminal once set.
    pub is_deleted: bool,
    /// Local bookkeeping; the remote copy is always `synced`.
    pub sync_status: SyncStatus,
}

impl Record {
    /// Creates a fresh `pending` account row.
    #[must_use]
    pub fn new_account(fields: AccountFields, now: DateTime<Utc>) -> Self {
        Self::with_fields(None, Fields::Account(fields), now)
    }

    /// Creates a fresh `pending` pet row owned by `owner_id`.
    #[must_use]
    pub fn new_pet(owner_id: RecordId, fields: PetFields, now: DateTime<Utc>) -> Self {
        Self::with_fields(Some(owner_id), Fields::Pet(fields), now)
    }

    fn with_fields(owner_id: Option<RecordId>, fields: Fields, now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            owner_id,
            fields,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            sync_status: SyncStatus::Pending,
        }
    }

    /// Returns the table this record belongs to.
    #[must_use]
    pub fn table(&self) -> Table {
        self.fields.table()
    }

    /// Returns true if the row awaits confirmation from the remote store.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }

    /// Returns the record with its status replaced.
    #[must_use]
    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = status;
        self
    }

    /// Returns the pet payload, if this is a pet.
    #[must_use]
    pub fn pet(&self) -> Option<&PetFields> {
        match &self.fields {
            Fields::Pet(pet) => Some(pet),
            Fields::Account(_) => None,
        }
    }

    /// Returns the account payload, if this is an account.
    #[must_use]
    pub fn account(&self) -> Option<&AccountFields> {
        match &self.fields {
            Fields::Account(account) => Some(account),
            Fields::Pet(_) => None,
        }
    }

    /// Returns true if the two rows carry the same replicated state.
    ///
    /// `sync_status` is ignored: it never leaves the device.
    #[must_use]
    pub fn same_content(&self, other: &Record) -> bool {
        self.id == other.id
            && self.owner_id == other.owner_id
            && self.fields == other.fields
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.is_deleted == other.is_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_start_pending() {
        let now = Utc::now();
        let owner = RecordId::new();
        let pet = Record::new_pet(owner, PetFields::new("Rex", "dog"), now);

        assert_eq!(pet.table(), Table::Pets);
        assert_eq!(pet.owner_id, Some(owner));
        assert!(pet.is_pending());
        assert_eq!(pet.created_at, pet.updated_at);
        assert!(!pet.is_deleted);
    }

    #[test]
    fn accounts_have_no_owner() {
        let account = Record::new_account(
            AccountFields {
                username: "alice".into(),
                password_hash: "h".into(),
            },
            Utc::now(),
        );
        assert_eq!(account.table(), Table::Users);
        assert!(account.owner_id.is_none());
        assert_eq!(account.fields.display_key(), "alice");
        assert!(account.pet().is_none());
    }

    #[test]
    fn same_content_ignores_status() {
        let pet = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());
        let synced = pet.clone().with_status(SyncStatus::Synced);
        assert!(pet.same_content(&synced));

        let mut renamed = synced.clone();
        renamed.fields = Fields::Pet(PetFields::new("Max", "dog"));
        assert!(!pet.same_content(&renamed));
    }
}
