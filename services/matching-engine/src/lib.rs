//! Matching Engine Service
//!
//! Price-time priority limit order book for a single instrument, with a
//! lagged top-of-book signal and an append-only history ledger.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced
//! - Deterministic matching (same inputs → same outputs)
//! - Level size always equals the sum of its resting quantities
//! - Best bid strictly below best ask after every processed order

pub mod book;
pub mod matching;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod top_of_book;

pub use engine::{EngineConfig, MatchingEngine};
pub use events::{ProcessOutcome, Route};
pub use ledger::{FlushMode, HistoryLedger, HistorySink, MemorySink};
