//! Informed trader
//!
//! Trades market orders on one fixed side during a handful of randomly
//! scheduled bursts.

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use types::ids::TraderId;
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::TradeConfirmation;

use super::{Agent, QuoteSequence};

/// Burst start ticks are drawn from `1..SCHEDULE_HORIZON`
pub const SCHEDULE_HORIZON: i64 = 100_000;

#[derive(Debug, Clone)]
pub struct InformedTrader {
    quotes: QuoteSequence,
    quantity: Quantity,
    side: Side,
    schedule: BTreeSet<i64>,
    pub filled: Quantity,
}

impl InformedTrader {
    /// `bursts` start ticks, each followed by `runlength` more ticks when
    /// `runlength > 1`; the side is drawn once
    pub fn new(trader: TraderId, quantity: u64, bursts: usize, runlength: i64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let starts: Vec<i64> = (0..bursts).map(|_| rng.gen_range(1..SCHEDULE_HORIZON)).collect();
        let mut schedule: BTreeSet<i64> = starts.iter().copied().collect();
        if runlength > 1 {
            for start in &starts {
                schedule.extend((1..=runlength).map(|i| start + i));
            }
        }
        let side = *[Side::Buy, Side::Sell].choose(&mut rng).unwrap_or(&Side::Buy);
        Self {
            quotes: QuoteSequence::new(trader),
            quantity: Quantity::new(quantity),
            side,
            schedule,
            filled: Quantity::ZERO,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn schedule(&self) -> &BTreeSet<i64> {
        &self.schedule
    }

    pub fn is_scheduled(&self, tick: i64) -> bool {
        self.schedule.contains(&tick)
    }

    pub fn process_signal(&mut self, timestamp: i64) -> Order {
        self.quotes.add(timestamp, self.side, self.quantity, OrderPrice::Market)
    }
}

impl Agent for InformedTrader {
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
    fn test_schedule_within_horizon() {
        let trader = InformedTrader::new(TraderId::from("i0"), 1, 10, 1, 4);
        assert!(!trader.schedule().is_empty() && trader.schedule().len() <= 10);
        assert!(trader.schedule().iter().all(|t| (1..SCHEDULE_HORIZON).contains(t)));
    }

    #[test]
    fn test_runlength_extends_bursts() {
        let single = InformedTrader::new(TraderId::from("i0"), 1, 1, 1, 4);
        let burst = InformedTrader::new(TraderId::from("i0"), 1, 1, 3, 4);
        let start = *single.schedule().iter().next().unwrap();
        let ticks: Vec<i64> = burst.schedule().iter().copied().collect();
        assert_eq!(ticks, vec![start, start + 1, start + 2, start + 3]);
    }

    #[test]
    fn test_orders_keep_fixed_side() {
        let mut trader = InformedTrader::new(TraderId::from("i0"), 5, 3, 1, 21);
        let side = trader.side();
        for t in 0..5 {
            let order = trader.process_signal(t);
            assert_eq!(order.side, side);
            assert!(order.price.is_market());
            assert_eq!(order.quantity, Quantity::new(5));
        }
    }
}
