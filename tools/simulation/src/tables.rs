//! Run-level tables written next to the engine history
//!
//! - `qtl`: the `q_take` / `lambda_t` path, one row per tick
//! - `mmp`: market maker cash flow and position after every fill

use serde::{Deserialize, Serialize};

use persistence::table::check_columns;
use persistence::{Columnar, TableError};
use types::ids::TraderId;

use crate::bots::CashFlowRow;

/// Order-flow signal at one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub step: i64,
    pub q_take: f64,
    pub lambda_t: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    pub step: Vec<i64>,
    pub q_take: Vec<f64>,
    pub lambda_t: Vec<f64>,
}

impl Columnar for SignalTable {
    type Row = SignalRow;
    const NAME: &'static str = "qtl";

    fn from_rows(rows: &[SignalRow]) -> Self {
        Self {
            step: rows.iter().map(|r| r.step).collect(),
            q_take: rows.iter().map(|r| r.q_take).collect(),
            lambda_t: rows.iter().map(|r| r.lambda_t).collect(),
        }
    }

    fn to_rows(&self) -> Result<Vec<SignalRow>, TableError> {
        self.check_shape()?;
        Ok((0..self.len())
            .map(|i| SignalRow {
                step: self.step[i],
                q_take: self.q_take[i],
                lambda_t: self.lambda_t[i],
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.step.len()
    }

    fn extend(&mut self, other: Self) {
        self.step.extend(other.step);
        self.q_take.extend(other.q_take);
        self.lambda_t.extend(other.lambda_t);
    }

    fn check_shape(&self) -> Result<(), TableError> {
        check_columns(Self::NAME, self.len(), &[self.q_take.len(), self.lambda_t.len()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowTable {
    pub mmid: Vec<String>,
    pub timestamp: Vec<i64>,
    pub cash_flow: Vec<i64>,
    pub position: Vec<i64>,
}

impl Columnar for CashFlowTable {
    type Row = CashFlowRow;
    const NAME: &'static str = "mmp";

    fn from_rows(rows: &[CashFlowRow]) -> Self {
        Self {
            mmid: rows.iter().map(|r| r.mmid.to_string()).collect(),
            timestamp: rows.iter().map(|r| r.timestamp).collect(),
            cash_flow: rows.iter().map(|r| r.cash_flow).collect(),
            position: rows.iter().map(|r| r.position).collect(),
        }
    }

    fn to_rows(&self) -> Result<Vec<CashFlowRow>, TableError> {
        self.check_shape()?;
        Ok((0..self.len())
            .map(|i| CashFlowRow {
                mmid: TraderId::new(self.mmid[i].as_str()),
                timestamp: self.timestamp[i],
                cash_flow: self.cash_flow[i],
                position: self.position[i],
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.mmid.len()
    }

    fn extend(&mut self, other: Self) {
        self.mmid.extend(other.mmid);
        self.timestamp.extend(other.timestamp);
        self.cash_flow.extend(other.cash_flow);
        self.position.extend(other.position);
    }

    fn check_shape(&self) -> Result<(), TableError> {
        check_columns(
            Self::NAME,
            self.len(),
            &[self.timestamp.len(), self.cash_flow.len(), self.position.len()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::{TableReader, TableStore};
    use tempfile::TempDir;

    #[test]
    fn test_ragged_signal_table_rejected() {
        let mut table = SignalTable::from_rows(&[SignalRow { step: 0, q_take: 0.5, lambda_t: -100.0 }]);
        table.lambda_t.clear();
        assert!(matches!(table.check_shape(), Err(TableError::RaggedColumns { table: "qtl", .. })));
    }

    #[test]
    fn test_tables_written_beside_history() {
        let tmp = TempDir::new().unwrap();
        let mut store = TableStore::open(tmp.path()).unwrap();
        let rows = vec![
            CashFlowRow { mmid: TraderId::from("m0"), timestamp: 30, cash_flow: -999, position: 1 },
            CashFlowRow { mmid: TraderId::from("m0"), timestamp: 41, cash_flow: 12, position: 0 },
        ];
        store.write_table(&CashFlowTable::from_rows(&rows)).unwrap();
        store.write_table(&CashFlowTable::from_rows(&rows[..1])).unwrap();

        assert!(tmp.path().join("mmp").join("segment-000001.tbl.zst").exists());
        let back = TableReader::new(tmp.path()).read_table::<CashFlowTable>().unwrap().to_rows().unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[..2], rows[..]);
    }
}
