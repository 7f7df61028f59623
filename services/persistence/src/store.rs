//! Table store: writes history flushes as segment files
//!
//! Layout: `<root>/<table>/segment-<n>.tbl.zst`, with `n` counting up per
//! table. Opening an existing directory continues the numbering, so a
//! table's segments read back in flush order.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use matching_engine::HistorySink;
use types::market::TopOfBook;
use types::order::Order;
use types::trade::Trade;

use crate::error::TableError;
use crate::reader::list_segments;
use crate::segment::{segment_file_name, TableSegment, DEFAULT_COMPRESSION_LEVEL};
use crate::table::{Columnar, OrdersTable, TopOfBookTable, TradesTable};

/// Writes columnar segments under a root directory
#[derive(Debug)]
pub struct TableStore {
    root: PathBuf,
    run_id: Uuid,
    compression_level: i32,
    /// Next sequence number per table
    next_sequence: BTreeMap<&'static str, u64>,
}

impl TableStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TableError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut next_sequence = BTreeMap::new();
        for name in [OrdersTable::NAME, TradesTable::NAME, TopOfBookTable::NAME] {
            let next = list_segments(&root.join(name))?
                .last()
                .map_or(0, |(seq, _)| seq + 1);
            next_sequence.insert(name, next);
        }

        let run_id = Uuid::now_v7();
        info!(root = %root.display(), run_id = %run_id, "table store opened");
        Ok(Self {
            root,
            run_id,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            next_sequence,
        })
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Write one table as a new segment
    ///
    /// Empty tables produce no file and return `None`.
    pub fn write_table<T: Columnar>(&mut self, table: &T) -> Result<Option<PathBuf>, TableError> {
        if table.is_empty() {
            debug!(table = T::NAME, "empty flush skipped");
            return Ok(None);
        }
        let sequence = match self.next_sequence.get(T::NAME) {
            Some(next) => *next,
            // Tables defined outside this crate are discovered on first write
            None => list_segments(&self.root.join(T::NAME))?
                .last()
                .map_or(0, |(seq, _)| seq + 1),
        };
        let segment = TableSegment::new(table, self.run_id, sequence)?;
        let frame = segment.to_frame(self.compression_level)?;

        let dir = self.root.join(T::NAME);
        fs::create_dir_all(&dir)?;
        let file_name = segment_file_name(sequence);
        let path = dir.join(&file_name);
        let tmp_path = dir.join(format!("{}.tmp", file_name));

        // Atomic write: write to tmp, fsync, rename
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&frame)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        self.next_sequence.insert(T::NAME, sequence + 1);
        info!(
            table = T::NAME,
            sequence,
            rows = table.len(),
            bytes = frame.len(),
            "segment written"
        );
        Ok(Some(path))
    }
}

impl HistorySink for TableStore {
    type Error = TableError;

    fn write_orders(&mut self, orders: &[Order]) -> Result<(), TableError> {
        self.write_table(&OrdersTable::from_rows(orders)).map(|_| ())
    }

    fn write_trades(&mut self, trades: &[Trade]) -> Result<(), TableError> {
        self.write_table(&TradesTable::from_rows(trades)).map(|_| ())
    }

    fn write_top_of_book(&mut self, snapshots: &[TopOfBook]) -> Result<(), TableError> {
        self.write_table(&TopOfBookTable::from_rows(snapshots)).map(|_| ())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
