//! Types library for the limit order book simulator
//!
//! This library provides the value types shared by the matching engine,
//! the table store and the simulation agents.
//!
//! # Modules
//! - `ids`: Identifiers (TraderId, OrderId)
//! - `numeric`: Integer tick prices and quantities
//! - `order`: Order messages and their wire form
//! - `trade`: Trade records and confirmations
//! - `market`: Top-of-book snapshot handed to agents
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod market;
pub mod errors;
