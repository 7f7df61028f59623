//! Zero-Intelligence Order Flow Simulation
//!
//! Populations of simple random agents trading through the matching
//! engine, with history exported through the table store.
//!
//! # Modules
//! - `bots`: Taker, Provider, MarketMaker, PennyJumper, InformedTrader
//! - `runner`: Seeding, priming and the main tick loop
//! - `config`: Run parameters (JSON)
//! - `tables`: `qtl` and `mmp` run tables
//! - `error`: Simulation error type

pub mod bots;
pub mod config;
pub mod error;
pub mod runner;
pub mod tables;

pub use config::SimConfig;
pub use error::SimError;
pub use runner::{run_to_directory, RunSummary, Runner};

/// Crate version constant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
