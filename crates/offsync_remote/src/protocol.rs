//! Wire messages of the remote row protocol.
//!
//! Every endpoint takes a CBOR request body via POST and answers with a
//! CBOR body. Errors carry an [`ErrorBody`] and a 4xx/5xx status.

use crate::error::{RemoteError, RemoteResult};
use offsync_core::{Record, RecordId, Table};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/v1/health";

/// Row write endpoint.
pub const UPSERT_PATH: &str = "/v1/rows/upsert";

/// Row fetch endpoint.
pub const FETCH_PATH: &str = "/v1/rows/fetch";

/// Answer to a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server is accepting requests.
    pub ok: bool,
}

/// Insert-or-replace one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRequest {
    /// Target table.
    pub table: Table,
    /// Full row.
    pub record: Record,
}

/// Acknowledges a row write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertResponse {
    /// The id that was written.
    pub id: RecordId,
}

/// Fetch every row of a table for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Table to read.
    pub table: Table,
    /// Owning account.
    pub owner_id: RecordId,
}

/// Rows returned by a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Matching rows.
    pub rows: Vec<Record>,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> RemoteResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| RemoteError::Protocol(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> RemoteResult<T> {
    ciborium::from_reader(bytes).map_err(|e| RemoteError::Protocol(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use offsync_core::PetFields;

    #[test]
    fn upsert_request_carries_whole_row() {
        let record = Record::new_pet(RecordId::new(), PetFields::new("Rex", "dog"), Utc::now());
        let request = UpsertRequest {
            table: Table::Pets,
            record: record.clone(),
        };
        let decoded: UpsertRequest = decode(&encode(&request).unwrap()).unwrap();
        assert_eq!(decoded.record, record);
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        let err = decode::<FetchResponse>(&[0xFF, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }
}
