//! Zero-intelligence trading agents
//!
//! Agents see only the latest top-of-book snapshot and emit order
//! messages; the driver submits them and routes confirmations back.
//! Each agent owns a seeded `ChaCha8Rng`, so a run is a pure function
//! of its config.

pub mod informed;
pub mod market_maker;
pub mod penny_jumper;
pub mod provider;
pub mod taker;

use rand::Rng;
use std::collections::BTreeMap;
use types::ids::{OrderId, TraderId};
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::{ModifyConfirmation, TradeConfirmation};

pub use informed::InformedTrader;
pub use market_maker::{CashFlowRow, MarketMaker, QuoteGrid};
pub use penny_jumper::{JumpDecision, PennyJumper};
pub use provider::{Provider, ProviderPricing};
pub use taker::Taker;

/// Order sizes an agent may be assigned
pub const ORDER_SIZES: [u64; 5] = [1, 5, 10, 25, 50];

/// Sizes in [`ORDER_SIZES`] not above `maxq`
pub fn eligible_sizes(maxq: u64) -> Vec<u64> {
    ORDER_SIZES.iter().copied().filter(|size| *size <= maxq).collect()
}

/// Callbacks the driver uses to keep an agent's private state current
pub trait Agent {
    fn trader_id(&self) -> &TraderId;

    /// One of this agent's orders traded
    fn confirm_trade_local(&mut self, confirm: &TradeConfirmation);

    /// The engine removed size from one of this agent's orders
    fn confirm_cancel_local(&mut self, _confirm: &ModifyConfirmation) {}

    /// The engine refused one of this agent's orders
    fn reject_local(&mut self, _order_id: &OrderId) {}
}

/// Issues `<trader>_<n>` order ids, `n` starting at 1
#[derive(Debug, Clone)]
pub struct QuoteSequence {
    trader: TraderId,
    last: u64,
}

impl QuoteSequence {
    pub fn new(trader: TraderId) -> Self {
        Self { trader, last: 0 }
    }

    pub fn trader(&self) -> &TraderId {
        &self.trader
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u64 {
        self.last
    }

    pub fn add(&mut self, timestamp: i64, side: Side, quantity: Quantity, price: OrderPrice) -> Order {
        self.last += 1;
        Order::add(OrderId::new(&self.trader, self.last), timestamp, side, quantity, price)
    }
}

/// Outstanding orders of a liquidity-providing agent
///
/// Iteration is in order-id order so cancel draws are reproducible.
#[derive(Debug, Clone, Default)]
pub struct LocalBook {
    orders: BTreeMap<OrderId, Order>,
}

impl LocalBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.order_id.clone(), order);
    }

    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        self.orders.remove(order_id)
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Apply a fill: drop the order when fully filled, else shrink it
    ///
    /// Fills for unknown ids are ignored.
    pub fn apply_fill(&mut self, confirm: &TradeConfirmation) {
        let Some(order) = self.orders.get_mut(&confirm.order_id) else {
            return;
        };
        match order.quantity.checked_sub(confirm.quantity) {
            Some(rest) if !rest.is_zero() => order.quantity = rest,
            _ => {
                self.orders.remove(&confirm.order_id);
            }
        }
    }

    /// Cancel messages for a random subset, each order picked with probability `delta`
    ///
    /// One uniform draw per outstanding order, picked or not. The local
    /// book is left as is until the engine confirms.
    pub fn cancel_candidates<R: Rng>(&self, rng: &mut R, delta: f64, timestamp: i64) -> Vec<Order> {
        self.orders
            .values()
            .filter(|_| rng.gen::<f64>() < delta)
            .map(|order| order.to_cancel(timestamp))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use types::numeric::Price;

    fn quote(seq: &mut QuoteSequence, qty: u64) -> Order {
        seq.add(1, Side::Buy, Quantity::new(qty), OrderPrice::limit(100))
    }

    #[test]
    fn test_eligible_sizes() {
        assert_eq!(eligible_sizes(1), vec![1]);
        assert_eq!(eligible_sizes(24), vec![1, 5, 10]);
        assert_eq!(eligible_sizes(50), ORDER_SIZES.to_vec());
        assert!(eligible_sizes(0).is_empty());
    }

    #[test]
    fn test_quote_sequence_ids() {
        let mut seq = QuoteSequence::new(TraderId::from("p3"));
        let first = quote(&mut seq, 1);
        let second = quote(&mut seq, 1);
        assert_eq!(first.order_id.as_str(), "p3_1");
        assert_eq!(second.order_id.as_str(), "p3_2");
        assert_eq!(second.order_id.trader(), TraderId::from("p3"));
        assert_eq!(seq.issued(), 2);
    }

    #[test]
    fn test_local_book_partial_then_full_fill() {
        let mut seq = QuoteSequence::new(TraderId::from("p1"));
        let order = quote(&mut seq, 3);
        let mut book = LocalBook::new();
        book.insert(order.clone());

        let fill = |qty| TradeConfirmation::new(5, order.order_id.clone(), Quantity::new(qty), Side::Buy, Price::new(100));
        book.apply_fill(&fill(1));
        assert_eq!(book.get(&order.order_id).unwrap().quantity, Quantity::new(2));
        book.apply_fill(&fill(2));
        assert!(book.is_empty());

        // Unknown ids are ignored
        book.apply_fill(&fill(1));
        assert!(book.is_empty());
    }

    #[test]
    fn test_cancel_candidates_bounds() {
        let mut seq = QuoteSequence::new(TraderId::from("p1"));
        let mut book = LocalBook::new();
        for _ in 0..20 {
            book.insert(quote(&mut seq, 1));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(book.cancel_candidates(&mut rng, 0.0, 9).is_empty());

        let all = book.cancel_candidates(&mut rng, 1.0, 9);
        assert_eq!(all.len(), 20);
        assert!(all.iter().all(|c| c.order_type == types::order::OrderType::Cancel && c.timestamp == 9));
        // Candidates are not removed until confirmed
        assert_eq!(book.len(), 20);
    }
}
