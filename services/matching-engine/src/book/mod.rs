//! Order book infrastructure module
//!
//! Contains price levels and the per-side price-level book.

pub mod price_level;
pub mod side_book;

pub use price_level::{PriceLevel, Reduction, RestingOrder};
pub use side_book::{LevelFill, SideBook};

use types::errors::InvariantViolation;
use types::numeric::Price;
use types::order::Side;

/// Both sides of the single-instrument book
#[derive(Debug, Clone)]
pub struct OrderBook {
    bids: SideBook,
    asks: SideBook,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: SideBook::new(Side::Buy),
            asks: SideBook::new(Side::Sell),
        }
    }

    pub fn side(&self, side: Side) -> &SideBook {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub fn bids(&self) -> &SideBook {
        &self.bids
    }

    pub fn asks(&self) -> &SideBook {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Both sides consistent and best bid strictly below best ask
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        self.bids.verify_invariants()?;
        self.asks.verify_invariants()?;
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid >= ask {
                return Err(InvariantViolation::Crossed {
                    best_bid: bid.ticks(),
                    best_ask: ask.ticks(),
                });
            }
        }
        Ok(())
    }
}
