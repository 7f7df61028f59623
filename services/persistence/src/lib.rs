//! Persisted table store for simulation history
//!
//! Exports the engine's order log, trade tape and top-of-book snapshots
//! as compressed columnar segment files, and reads them back.
//!
//! - `table`: columnar layouts for `orders`, `trades`, `tob`
//! - `segment`: framed, checksummed on-disk segment format
//! - `store`: segment writer, implements the engine's history sink
//! - `reader`: segment listing, verification and concatenation

pub mod error;
pub mod table;
pub mod segment;
pub mod store;
pub mod reader;

pub use error::TableError;
pub use reader::TableReader;
pub use store::TableStore;
pub use table::{Columnar, OrdersTable, TopOfBookTable, TradesTable};
