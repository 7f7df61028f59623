//! Top-of-book snapshot
//!
//! The only view of market state an agent ever receives.

use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Best prices, sizes at those prices, and trailing averages
///
/// `bid_size`/`ask_size` are the aggregate size at the best price only.
/// Lag fields average the `lag_window` snapshots before this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub timestamp: i64,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub bid_size: Quantity,
    pub ask_size: Quantity,
    pub lag_spread: Option<f64>,
    pub lag_bid_depth: Option<f64>,
    pub lag_ask_depth: Option<f64>,
}

impl TopOfBook {
    /// No market on either side
    pub fn empty(timestamp: i64) -> Self {
        Self {
            timestamp,
            best_bid: None,
            best_ask: None,
            bid_size: Quantity::ZERO,
            ask_size: Quantity::ZERO,
            lag_spread: None,
            lag_bid_depth: None,
            lag_ask_depth: None,
        }
    }

    /// `best_ask - best_bid` when both sides are quoted
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask.ticks_from(bid)),
            _ => None,
        }
    }

    pub fn is_two_sided(&self) -> bool {
        self.best_bid.is_some() && self.best_ask.is_some()
    }
}
