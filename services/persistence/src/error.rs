//! Table store errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Not a table segment: {path}")]
    BadMagic { path: PathBuf },

    #[error("Frame checksum mismatch in {path}: stored {stored:08x}, computed {computed:08x}")]
    FrameChecksum { path: PathBuf, stored: u32, computed: u32 },

    #[error("Integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },

    #[error("Unsupported segment version: {0}")]
    UnsupportedVersion(u32),

    #[error("Segment holds table {found}, expected {expected}")]
    TableMismatch { expected: &'static str, found: String },

    #[error("Table {table} column length {found} does not match row count {expected}")]
    RaggedColumns { table: &'static str, expected: usize, found: usize },

    #[error("Table {table} row {row} is invalid: {reason}")]
    InvalidRow { table: &'static str, row: usize, reason: String },
}
