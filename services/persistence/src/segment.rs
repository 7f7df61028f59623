//! Table segments: one immutable file per flush
//!
//! # Binary Format
//! ```text
//! [magic:       4 bytes "LOBT"]
//! [payload_len: u64]
//! [payload:     zstd(bincode(TableSegment))]
//! [checksum:    u32]  // CRC32C over payload
//! ```
//!
//! The frame CRC catches torn or corrupt files before decompression.
//! The SHA-256 inside the segment covers the encoded columns.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

use crate::error::TableError;
use crate::table::Columnar;

/// Current segment format version
pub const SEGMENT_VERSION: u32 = 1;

pub const SEGMENT_MAGIC: &[u8; 4] = b"LOBT";

/// File extension of segment files
pub const SEGMENT_EXTENSION: &str = "tbl.zst";

const HEADER_LEN: usize = 4 + 8;
const TRAILER_LEN: usize = 4;

/// Default zstd level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// One flushed batch of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSegment {
    pub version: u32,
    pub table: String,
    /// Run that produced the segment
    pub run_id: Uuid,
    /// Position of the segment within its table directory
    pub sequence: u64,
    pub rows: u64,
    /// bincode-encoded columnar table
    pub columns: Vec<u8>,
    /// SHA-256 hex digest of `columns`
    pub checksum: String,
}

impl TableSegment {
    pub fn new<T: Columnar>(table: &T, run_id: Uuid, sequence: u64) -> Result<Self, TableError> {
        table.check_shape()?;
        let columns = bincode::serialize(table).map_err(|e| TableError::Serialization(e.to_string()))?;
        let checksum = compute_hash(&columns);
        Ok(Self {
            version: SEGMENT_VERSION,
            table: T::NAME.to_string(),
            run_id,
            sequence,
            rows: table.len() as u64,
            columns,
            checksum,
        })
    }

    pub fn verify_integrity(&self) -> bool {
        self.checksum == compute_hash(&self.columns)
    }

    /// Decode the columns as table `T`, checking tag, hash and shape
    pub fn decode<T: Columnar>(&self) -> Result<T, TableError> {
        if self.table != T::NAME {
            return Err(TableError::TableMismatch {
                expected: T::NAME,
                found: self.table.clone(),
            });
        }
        if !self.verify_integrity() {
            return Err(TableError::IntegrityFailure {
                expected: self.checksum.clone(),
                actual: compute_hash(&self.columns),
            });
        }
        let table: T =
            bincode::deserialize(&self.columns).map_err(|e| TableError::Serialization(e.to_string()))?;
        table.check_shape()?;
        if table.len() as u64 != self.rows {
            return Err(TableError::RaggedColumns {
                table: T::NAME,
                expected: self.rows as usize,
                found: table.len(),
            });
        }
        Ok(table)
    }

    /// Serialize, compress and frame the segment
    pub fn to_frame(&self, level: i32) -> Result<Vec<u8>, TableError> {
        let encoded = bincode::serialize(self).map_err(|e| TableError::Serialization(e.to_string()))?;
        let payload =
            zstd::encode_all(encoded.as_slice(), level).map_err(|e| TableError::Compression(e.to_string()))?;

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
        buf.extend_from_slice(SEGMENT_MAGIC);
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf.extend_from_slice(&crc32c::crc32c(&payload).to_le_bytes());
        Ok(buf)
    }

    /// Parse a frame read from `path`
    pub fn from_frame(data: &[u8], path: &Path) -> Result<Self, TableError> {
        if data.len() < HEADER_LEN + TRAILER_LEN || &data[..4] != SEGMENT_MAGIC {
            return Err(TableError::BadMagic { path: path.to_path_buf() });
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&data[4..HEADER_LEN]);
        let payload_len = u64::from_le_bytes(len_bytes) as usize;
        if data.len() != HEADER_LEN + payload_len + TRAILER_LEN {
            return Err(TableError::Serialization(format!(
                "{}: frame declares {} payload bytes, file holds {}",
                path.display(),
                payload_len,
                data.len().saturating_sub(HEADER_LEN + TRAILER_LEN)
            )));
        }

        let payload = &data[HEADER_LEN..HEADER_LEN + payload_len];
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&data[HEADER_LEN + payload_len..]);
        let stored = u32::from_le_bytes(crc_bytes);
        let computed = crc32c::crc32c(payload);
        if stored != computed {
            return Err(TableError::FrameChecksum {
                path: path.to_path_buf(),
                stored,
                computed,
            });
        }

        let decoded = zstd::decode_all(payload).map_err(|e| TableError::Compression(e.to_string()))?;
        let segment: TableSegment =
            bincode::deserialize(&decoded).map_err(|e| TableError::Serialization(e.to_string()))?;
        if segment.version > SEGMENT_VERSION {
            return Err(TableError::UnsupportedVersion(segment.version));
        }
        Ok(segment)
    }
}

/// Segment file name for a sequence number
pub fn segment_file_name(sequence: u64) -> String {
    format!("segment-{:06}.{}", sequence, SEGMENT_EXTENSION)
}

/// Sequence number from a segment file name
pub fn parse_segment_sequence(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("segment-")?
        .strip_suffix(&format!(".{}", SEGMENT_EXTENSION))?
        .parse()
        .ok()
}

fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ── Tests ───────────────────────────────────────────────────────────
