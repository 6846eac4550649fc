//! Record log framing.
//!
//! Every store write becomes one frame:
//!
//! ```text
//! | magic "OSLG" (4) | version u16 (2) | kind u8 (1) | len u32 (4) | CBOR payload (len) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The CRC covers header and payload.

use crate::error::{CoreError, CoreResult};
use crate::journal::JournalEntry;
use crate::record::Record;
use crate::types::{RecordId, SyncStatus, Table};
use serde::{Deserialize, Serialize};

/// Name of the log file inside a store directory.
pub const LOG_FILE_NAME: &str = "offsync.log";

/// Magic bytes identifying a log frame.
pub const LOG_MAGIC: [u8; 4] = *b"OSLG";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + kind (1) + length (4)
const HEADER_SIZE: usize = 11;

const CRC_SIZE: usize = 4;

/// Type byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum FrameKind {
    Upsert = 1,
    Status = 2,
    Journal = 3,
    JournalAck = 4,
}

impl FrameKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Upsert),
            2 => Some(Self::Status),
            3 => Some(Self::Journal),
            4 => Some(Self::JournalAck),
            _ => None,
        }
    }
}

/// One durable store write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogFrame {
    /// A row write, with the journal entry it produced, if any.
    Upsert {
        /// Target table.
        table: Table,
        /// Full row contents.
        record: Record,
        /// Journal entry appended together with the row.
        journal: Option<JournalEntry>,
    },
    /// A status-only change.
    Status {
        /// Target table.
        table: Table,
        /// Row id.
        id: RecordId,
        /// New status.
        status: SyncStatus,
        /// Also flag the row's journal entries as synced.
        ack_journal: bool,
    },
    /// A standalone journal entry.
    Journal {
        /// The entry.
        entry: JournalEntry,
    },
    /// Flags a row's journal entries as synced.
    JournalAck {
        /// Target table.
        table: Table,
        /// Row id.
        record_id: RecordId,
    },
}

impl LogFrame {
    pub(crate) fn kind(&self) -> FrameKind {
        match self {
            Self::Upsert { .. } => FrameKind::Upsert,
            Self::Status { .. } => FrameKind::Status,
            Self::Journal { .. } => FrameKind::Journal,
            Self::JournalAck { .. } => FrameKind::JournalAck,
        }
    }

    /// Serializes the frame with envelope and checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded or is too large.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload)
            .map_err(|e| CoreError::Encode(e.to_string()))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::Encode(format!("frame too large: {} bytes", payload.len())))?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        buf.extend_from_slice(&LOG_MAGIC);
        buf.extend_from_slice(&LOG_VERSION.to_le_bytes());
        buf.push(self.kind() as u8);
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&payload);
        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }
}

/// Result of decoding a whole log.
#[derive(Debug, Default)]
pub(crate) struct DecodedLog {
    /// Frames with their starting offsets.
    pub frames: Vec<(u64, LogFrame)>,
    /// Length of the intact prefix.
    pub valid_len: u64,
    /// Whether an incomplete trailing frame was found.
    pub torn: bool,
}

/// Decodes every frame in `bytes`.
///
/// An incomplete frame at the very end is a torn write and stops decoding
/// without error. Anything else malformed is corruption.
pub(crate) fn decode_all(bytes: &[u8]) -> CoreResult<DecodedLog> {
    let mut decoded = DecodedLog::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let offset = pos as u64;
        let rest = &bytes[pos..];

        if rest.len() < HEADER_SIZE {
            decoded.torn = true;
            break;
        }
        let header = &rest[..HEADER_SIZE];

        if header[0..4] != LOG_MAGIC {
            return Err(CoreError::log_corruption(offset, "invalid magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            return Err(CoreError::log_corruption(
                offset,
                format!("unsupported version {version}"),
            ));
        }
        let kind = FrameKind::from_byte(header[6]).ok_or_else(|| {
            CoreError::log_corruption(offset, format!("unknown frame kind {}", header[6]))
        })?;
        let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

        let total = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < total {
            decoded.torn = true;
            break;
        }

        let body_end = HEADER_SIZE + len;
        let expected = u32::from_le_bytes([
            rest[body_end],
            rest[body_end + 1],
            rest[body_end + 2],
            rest[body_end + 3],
        ]);
        let actual = compute_crc32(&rest[..body_end]);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let frame: LogFrame = ciborium::from_reader(&rest[HEADER_SIZE..body_end])
            .map_err(|e| CoreError::log_corruption(offset, format!("bad payload: {e}")))?;
        if frame.kind() != kind {
            return Err(CoreError::log_corruption(
                offset,
                "frame kind does not match payload",
            ));
        }

        decoded.frames.push((offset, frame));
        pos += total;
        decoded.valid_len = pos as u64;
    }

    Ok(decoded)
}

/// Computes the IEEE CRC32 of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}
