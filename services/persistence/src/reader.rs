//! Table reader: loads and verifies segment files
//!
//! Segments of one table are read in sequence order and concatenated back
//! into a single table. Any frame, version or integrity failure aborts the
//! read; nothing is silently skipped.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use types::market::TopOfBook;
use types::order::Order;
use types::trade::Trade;

use crate::error::TableError;
use crate::segment::{parse_segment_sequence, TableSegment};
use crate::table::{Columnar, OrdersTable, TopOfBookTable, TradesTable};

/// `(sequence, path)` of every segment in `dir`, ascending
pub fn list_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>, TableError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(seq) = parse_segment_sequence(&name) {
            segments.push((seq, entry.path()));
        }
    }
    segments.sort_by_key(|(seq, _)| *seq);
    Ok(segments)
}

/// Reads tables written by [`crate::TableStore`]
#[derive(Debug, Clone)]
pub struct TableReader {
    root: PathBuf,
}

impl TableReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load and verify one segment file
    pub fn load_segment(&self, path: &Path) -> Result<TableSegment, TableError> {
        let data = fs::read(path)?;
        TableSegment::from_frame(&data, path)
    }

    /// Segments of table `T`, verified, in sequence order
    pub fn segments<T: Columnar>(&self) -> Result<Vec<TableSegment>, TableError> {
        list_segments(&self.root.join(T::NAME))?
            .iter()
            .map(|(_, path)| self.load_segment(path))
            .collect()
    }

    /// Every segment of table `T` concatenated
    pub fn read_table<T: Columnar>(&self) -> Result<T, TableError> {
        let mut table = T::default();
        let segments = self.segments::<T>()?;
        for segment in &segments {
            table.extend(segment.decode::<T>()?);
        }
        debug!(table = T::NAME, segments = segments.len(), rows = table.len(), "table loaded");
        Ok(table)
    }

    pub fn read_orders(&self) -> Result<Vec<Order>, TableError> {
        self.read_table::<OrdersTable>()?.to_rows()
    }

    pub fn read_trades(&self) -> Result<Vec<Trade>, TableError> {
        self.read_table::<TradesTable>()?.to_rows()
    }

    pub fn read_top_of_book(&self) -> Result<Vec<TopOfBook>, TableError> {
        self.read_table::<TopOfBookTable>()?.to_rows()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;
    use matching_engine::HistorySink;
    use tempfile::TempDir;
    use types::ids::OrderId;
    use types::numeric::{Price, Quantity};
    use types::order::Side;

    fn trade(i: i64) -> Trade {
        Trade {
            resting_order_id: OrderId::from(format!("p1_{i}").as_str()),
            resting_timestamp: i,
            incoming_order_id: OrderId::from(format!("t1_{i}").as_str()),
            timestamp: i + 1,
            price: Price::new(50 + i),
            quantity: Quantity::new(1),
            side: Side::Sell,
        }
    }

    #[test]
    fn test_read_concatenates_in_order() {
        let tmp = TempDir::new().unwrap();
        let mut store = TableStore::open(tmp.path()).unwrap();
        store.write_trades(&[trade(0), trade(1)]).unwrap();
        store.write_trades(&[trade(2)]).unwrap();

        let reader = TableReader::new(tmp.path());
        let trades = reader.read_trades().unwrap();
        assert_eq!(trades, vec![trade(0), trade(1), trade(2)]);

        let segments = reader.segments::<TradesTable>().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].run_id, store.run_id());
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let reader = TableReader::new(tmp.path());
        assert!(reader.read_orders().unwrap().is_empty());
        assert!(list_segments(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_segment_fails_read() {
        let tmp = TempDir::new().unwrap();
        let mut store = TableStore::open(tmp.path()).unwrap();
        store.write_trades(&[trade(0)]).unwrap();

        let path = tmp.path().join("trades").join("segment-000000.tbl.zst");
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = TableReader::new(tmp.path()).read_trades().unwrap_err();
        assert!(matches!(err, TableError::FrameChecksum { .. }));
    }

    #[test]
    fn test_segment_in_wrong_directory_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = TableStore::open(tmp.path()).unwrap();
        store.write_trades(&[trade(0)]).unwrap();
        fs::create_dir_all(tmp.path().join("tob")).unwrap();
        fs::copy(
            tmp.path().join("trades").join("segment-000000.tbl.zst"),
            tmp.path().join("tob").join("segment-000000.tbl.zst"),
        )
        .unwrap();

        let err = TableReader::new(tmp.path()).read_top_of_book().unwrap_err();
        assert!(matches!(err, TableError::TableMismatch { expected: "tob", .. }));
    }
}
