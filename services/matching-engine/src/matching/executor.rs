//! Trade execution logic
//!
//! Turns one fill into the trade record and the two confirmations

use types::numeric::Quantity;
use types::order::Order;
use types::trade::{Confirmation, Trade, TradeConfirmation};

use crate::book::RestingOrder;

/// Everything a single fill produces
#[derive(Debug, Clone)]
pub struct Execution {
    pub trade: Trade,
    /// Resting party first, then the incoming party
    pub confirmations: [Confirmation; 2],
}

/// Match executor for handling trade generation
#[derive(Debug, Default)]
pub struct MatchExecutor {
    fills: u64,
}

impl MatchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fills executed so far
    pub fn fill_count(&self) -> u64 {
        self.fills
    }

    /// Execute a fill of `quantity` between a resting and an incoming order
    ///
    /// The trade prints at the resting order's price and carries its side.
    pub fn execute(&mut self, resting: &RestingOrder, incoming: &Order, quantity: Quantity, timestamp: i64) -> Execution {
        debug_assert!(!quantity.is_zero());
        debug_assert!(quantity <= resting.quantity);
        self.fills += 1;

        let trade = Trade {
            resting_order_id: resting.order_id.clone(),
            resting_timestamp: resting.timestamp,
            incoming_order_id: incoming.order_id.clone(),
            timestamp,
            price: resting.price,
            quantity,
            side: resting.side,
        };
        let confirmations = [
            Confirmation::Trade(TradeConfirmation::new(
                timestamp,
                resting.order_id.clone(),
                quantity,
                resting.side,
                resting.price,
            )),
            Confirmation::Trade(TradeConfirmation::new(
                timestamp,
                incoming.order_id.clone(),
                quantity,
                incoming.side,
                resting.price,
            )),
        ];
        Execution { trade, confirmations }
    }
}
