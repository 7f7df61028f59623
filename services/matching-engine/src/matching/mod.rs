//! Matching logic module
//!
//! Implements price-time priority matching: marketability checks and
//! turning each fill into a trade plus both confirmations.

pub mod crossing;
pub mod executor;

pub use crossing::is_marketable;
pub use executor::{Execution, MatchExecutor};
