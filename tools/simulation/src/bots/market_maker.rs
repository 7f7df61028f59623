//! Market maker
//!
//! Quotes a batch of orders on one side per arrival, drawn from a price
//! grid anchored at the inside. It never joins a best price that shows
//! size 1 and steps one `mpi` behind it instead. Cash flow and position
//! are tracked per fill.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use types::ids::{OrderId, TraderId};
use types::market::TopOfBook;
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::{ModifyConfirmation, TradeConfirmation};

use super::{Agent, LocalBook, QuoteSequence};

/// Bid weights for a 13-point grid, far edge first
const WEIGHTED5_BID: [f64; 13] = [
    1.0 / 30.0,
    1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0,
    1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0,
    1.0 / 20.0,
];

/// Ask weights for a 13-point grid, inside first
const WEIGHTED5_ASK: [f64; 13] = [
    1.0 / 20.0,
    1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0,
    1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0, 1.0 / 12.0,
    1.0 / 30.0,
];

/// Price grid a market maker draws its quotes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteGrid {
    /// `quote_range / mpi` points ending at the anchor, equally likely
    Uniform,
    /// `quote_range / mpi + 1` points including both ends, weighted
    /// lightly at the far edge and the inside
    Weighted5,
}

/// Running cash flow and position after one fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub mmid: TraderId,
    pub timestamp: i64,
    pub cash_flow: i64,
    pub position: i64,
}

#[derive(Debug, Clone)]
pub struct MarketMaker {
    quotes: QuoteSequence,
    quantity: Quantity,
    mpi: i64,
    delta: f64,
    num_quotes: usize,
    quote_range: i64,
    grid: QuoteGrid,
    local_book: LocalBook,
    position: i64,
    cash_flow: i64,
    cash_flow_collector: Vec<CashFlowRow>,
    rng: ChaCha8Rng,
}

impl MarketMaker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trader: TraderId,
        quantity: u64,
        mpi: i64,
        delta: f64,
        num_quotes: usize,
        quote_range: i64,
        grid: QuoteGrid,
        seed: u64,
    ) -> Self {
        Self {
            quotes: QuoteSequence::new(trader),
            quantity: Quantity::new(quantity),
            mpi,
            delta,
            num_quotes,
            quote_range,
            grid,
            local_book: LocalBook::new(),
            position: 0,
            cash_flow: 0,
            cash_flow_collector: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn cash_flow(&self) -> i64 {
        self.cash_flow
    }

    pub fn cash_flow_rows(&self) -> &[CashFlowRow] {
        &self.cash_flow_collector
    }

    pub fn local_book(&self) -> &LocalBook {
        &self.local_book
    }

    /// Quote `num_quotes` bids with probability `q_provide`, else asks
    pub fn process_signal(&mut self, timestamp: i64, signal: &TopOfBook, q_provide: f64) -> Vec<Order> {
        let side = if self.rng.gen::<f64>() < q_provide { Side::Buy } else { Side::Sell };
        let grid = match side {
            Side::Buy => match signal.best_bid {
                Some(best) => {
                    let max_bid = if signal.bid_size.units() > 1 { best.ticks() } else { best.ticks() - self.mpi };
                    self.bid_grid(max_bid)
                }
                None => return Vec::new(),
            },
            Side::Sell => match signal.best_ask {
                Some(best) => {
                    let min_ask = if signal.ask_size.units() > 1 { best.ticks() } else { best.ticks() + self.mpi };
                    self.ask_grid(min_ask)
                }
                None => return Vec::new(),
            },
        };
        if grid.is_empty() {
            return Vec::new();
        }

        let prices = self.draw_prices(&grid, side);
        prices
            .into_iter()
            .map(|price| {
                let order = self.quotes.add(timestamp, side, self.quantity, OrderPrice::limit(price));
                self.local_book.insert(order.clone());
                order
            })
            .collect()
    }

    /// Cancel messages for roughly `delta` of the outstanding quotes
    pub fn bulk_cancel(&mut self, timestamp: i64) -> Vec<Order> {
        self.local_book.cancel_candidates(&mut self.rng, self.delta, timestamp)
    }

    fn bid_grid(&self, max_bid: i64) -> Vec<i64> {
        let step = self.mpi.max(1) as usize;
        match self.grid {
            QuoteGrid::Uniform => (max_bid - self.quote_range + 1..=max_bid).step_by(step).collect(),
            QuoteGrid::Weighted5 => (max_bid - self.quote_range..=max_bid).step_by(step).collect(),
        }
    }

    fn ask_grid(&self, min_ask: i64) -> Vec<i64> {
        let step = self.mpi.max(1) as usize;
        match self.grid {
            QuoteGrid::Uniform => (min_ask..min_ask + self.quote_range).step_by(step).collect(),
            QuoteGrid::Weighted5 => (min_ask..=min_ask + self.quote_range).step_by(step).collect(),
        }
    }

    /// `num_quotes` draws with replacement from `grid`
    fn draw_prices(&mut self, grid: &[i64], side: Side) -> Vec<i64> {
        let weights = match side {
            Side::Buy => &WEIGHTED5_BID,
            Side::Sell => &WEIGHTED5_ASK,
        };
        let weighted = match self.grid {
            QuoteGrid::Weighted5 if grid.len() == weights.len() => WeightedIndex::new(weights.iter().copied()).ok(),
            // Any other grid length falls back to uniform draws
            _ => None,
        };
        (0..self.num_quotes)
            .map(|_| match &weighted {
                Some(dist) => grid[dist.sample(&mut self.rng)],
                None => grid[self.rng.gen_range(0..grid.len())],
            })
            .collect()
    }
}

impl Agent for MarketMaker {
    fn trader_id(&self) -> &TraderId {
        self.quotes.trader()
    }

    fn confirm_trade_local(&mut self, confirm: &TradeConfirmation) {
        let qty = confirm.quantity.units() as i64;
        let notional = confirm.price.ticks() * qty;
        match confirm.side {
            Side::Buy => {
                self.cash_flow -= notional;
                self.position += qty;
            }
            Side::Sell => {
                self.cash_flow += notional;
                self.position -= qty;
            }
        }
        self.local_book.apply_fill(confirm);
        self.cash_flow_collector.push(CashFlowRow {
            mmid: self.quotes.trader().clone(),
            timestamp: confirm.timestamp,
            cash_flow: self.cash_flow,
            position: self.position,
        });
    }

    fn confirm_cancel_local(&mut self, confirm: &ModifyConfirmation) {
        self.local_book.remove(&confirm.order_id);
    }

    fn reject_local(&mut self, order_id: &OrderId) {
        self.local_book.remove(order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::Price;

    fn signal(bid: i64, bid_size: u64, ask: i64, ask_size: u64) -> TopOfBook {
        TopOfBook {
            best_bid: Some(Price::new(bid)),
            best_ask: Some(Price::new(ask)),
            bid_size: Quantity::new(bid_size),
            ask_size: Quantity::new(ask_size),
            ..TopOfBook::empty(0)
        }
    }

    fn mm(grid: QuoteGrid, mpi: i64) -> MarketMaker {
        MarketMaker::new(TraderId::from("m0"), 1, mpi, 0.025, 12, 60, grid, 99)
    }

    #[test]
    fn test_uniform_bids_stay_on_grid() {
        let mut m = mm(QuoteGrid::Uniform, 1);
        let quotes = m.process_signal(5, &signal(1000, 3, 1010, 3), 1.0);
        assert_eq!(quotes.len(), 12);
        for q in &quotes {
            let px = q.price.as_limit().unwrap().ticks();
            assert_eq!(q.side, Side::Buy);
            assert!((941..=1000).contains(&px), "{px} off grid");
        }
        assert_eq!(m.local_book().len(), 12);
        assert_eq!(quotes[11].order_id.as_str(), "m0_12");
    }

    #[test]
    fn test_never_joins_best_of_size_one() {
        let mut m = mm(QuoteGrid::Uniform, 1);
        for t in 0..20 {
            for q in m.process_signal(t, &signal(1000, 1, 1010, 1), 0.5) {
                let px = q.price.as_limit().unwrap().ticks();
                match q.side {
                    Side::Buy => assert!(px <= 999),
                    Side::Sell => assert!(px >= 1011),
                }
            }
        }
    }

    #[test]
    fn test_weighted5_grid_includes_both_edges() {
        let m = mm(QuoteGrid::Weighted5, 5);
        let bids = m.bid_grid(1000);
        assert_eq!(bids.len(), 13);
        assert_eq!((bids[0], bids[12]), (940, 1000));
        let asks = m.ask_grid(1010);
        assert_eq!((asks[0], asks[12]), (1010, 1070));

        let mut m = mm(QuoteGrid::Weighted5, 5);
        for q in m.process_signal(1, &signal(1000, 2, 1010, 2), 0.0) {
            let px = q.price.as_limit().unwrap().ticks();
            assert!((1010..=1070).contains(&px) && px % 5 == 0);
        }
    }

    #[test]
    fn test_uniform_grid_sizes() {
        let m = mm(QuoteGrid::Uniform, 5);
        assert_eq!(m.bid_grid(1000), (941..=1000).step_by(5).collect::<Vec<_>>());
        assert_eq!(m.ask_grid(1010).len(), 12);
    }

    #[test]
    fn test_fills_update_cash_flow_and_position() {
        let mut m = mm(QuoteGrid::Uniform, 1);
        let bids = m.process_signal(1, &signal(1000, 2, 1010, 2), 1.0);
        let id = bids[0].order_id.clone();
        let px = bids[0].price.as_limit().unwrap();

        m.confirm_trade_local(&TradeConfirmation::new(7, id.clone(), Quantity::new(1), Side::Buy, px));
        assert_eq!(m.position(), 1);
        assert_eq!(m.cash_flow(), -px.ticks());
        assert!(!m.local_book().contains(&id));

        m.confirm_trade_local(&TradeConfirmation::new(8, OrderId::from("m0_99"), Quantity::new(1), Side::Sell, Price::new(1010)));
        assert_eq!(m.position(), 0);
        assert_eq!(m.cash_flow(), 1010 - px.ticks());
        let rows = m.cash_flow_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].timestamp, 8);
        assert_eq!(rows[1].mmid, TraderId::from("m0"));
    }

    #[test]
    fn test_one_sided_book_makes_no_quotes() {
        let mut m = mm(QuoteGrid::Uniform, 1);
        let asks_only = TopOfBook {
            best_ask: Some(Price::new(1010)),
            ask_size: Quantity::new(1),
            ..TopOfBook::empty(0)
        };
        assert!(m.process_signal(1, &asks_only, 1.0).is_empty());
    }
}
