//! Error types for the matching engine
//!
//! Error taxonomy using thiserror. Unknown order references on cancel/modify
//! are deliberately absent: the engine treats them as silent no-ops.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("Book invariant violated: {0}")]
    BookInvariantViolation(#[from] InvariantViolation),

    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Order validation errors, raised before any book mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Unknown side: {0}")]
    UnknownSide(String),

    #[error("Unknown order type: {0}")]
    UnknownType(String),

    #[error("Empty order id")]
    EmptyOrderId,

    #[error("Order id already resting on this side: {order_id}")]
    DuplicateOrderId { order_id: String },

    #[error("Market-priced order cannot rest: {order_id}")]
    MarketOrderCannotRest { order_id: String },

    #[error("Seed order would cross the book: {order_id}")]
    SeedWouldCross { order_id: String },

    #[error("Resting size at price {price} would overflow")]
    LevelSizeOverflow { price: i64 },
}

/// Aggregate bookkeeping mismatch found inside the book
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("Level {price} size {recorded} does not match resting sum {actual}")]
    LevelSize { price: i64, recorded: u64, actual: u64 },

    #[error("Level {price} order count {recorded} does not match resting count {actual}")]
    LevelCount { price: i64, recorded: usize, actual: usize },

    #[error("Empty level {price} still active")]
    EmptyLevel { price: i64 },

    #[error("Order {order_id} indexed at {indexed} but not resting there")]
    IndexMismatch { order_id: String, indexed: i64 },

    #[error("Book crossed: best bid {best_bid} >= best ask {best_ask}")]
    Crossed { best_bid: i64, best_ask: i64 },
}
