//! Liquidity taker
//!
//! Sends one market order per arrival. The side follows the prevailing
//! `q_take`: above 0.5 buys are more likely than sells.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use types::ids::TraderId;
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::TradeConfirmation;

use super::{Agent, QuoteSequence};

#[derive(Debug, Clone)]
pub struct Taker {
    quotes: QuoteSequence,
    quantity: Quantity,
    /// Total size filled so far
    pub filled: Quantity,
    rng: ChaCha8Rng,
}

impl Taker {
    pub fn new(trader: TraderId, quantity: u64, seed: u64) -> Self {
        Self {
            quotes: QuoteSequence::new(trader),
            quantity: Quantity::new(quantity),
            filled: Quantity::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Market buy with probability `q_take`, market sell otherwise
    pub fn process_signal(&mut self, timestamp: i64, q_take: f64) -> Order {
        let side = if self.rng.gen::<f64>() < q_take { Side::Buy } else { Side::Sell };
        self.quotes.add(timestamp, side, self.quantity, OrderPrice::Market)
    }
}

impl Agent for Taker {
    fn trader_id(&self) -> &TraderId {
        self.quotes.trader()
    }

    fn confirm_trade_local(&mut self, confirm: &TradeConfirmation) {
        self.filled = self.filled + confirm.quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_follows_q_take() {
        let mut taker = Taker::new(TraderId::from("t0"), 5, 3);
        let buy = taker.process_signal(10, 1.0);
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.price, OrderPrice::Market);
        assert_eq!(buy.quantity, Quantity::new(5));
        assert_eq!(buy.order_id.as_str(), "t0_1");
        assert_eq!(taker.process_signal(11, 0.0).side, Side::Sell);
    }

    #[test]
    fn test_same_seed_same_orders() {
        let mut a = Taker::new(TraderId::from("t0"), 1, 42);
        let mut b = Taker::new(TraderId::from("t0"), 1, 42);
        for t in 0..50 {
            assert_eq!(a.process_signal(t, 0.5), b.process_signal(t, 0.5));
        }
    }
}
