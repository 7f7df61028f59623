//! Top-of-book snapshots and lagged averages
//!
//! Each refresh reads the best prices and the size resting at them, then
//! averages spread and depth over the previous `window` refreshes. The
//! refresh being produced never contributes to its own lag fields.

use std::collections::VecDeque;
use types::market::TopOfBook;
use types::numeric::Quantity;

use crate::book::OrderBook;

/// Raw inputs kept for the trailing window
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    spread: Option<i64>,
    bid_size: Quantity,
    ask_size: Quantity,
}

/// Rolling analytics over the last `window` snapshots
#[derive(Debug, Clone)]
pub struct TopOfBookTracker {
    window: usize,
    history: VecDeque<WindowEntry>,
    latest: TopOfBook,
}

impl TopOfBookTracker {
    /// `window` must be at least 1; the engine validates it
    pub fn new(window: usize) -> Self {
        Self {
            window,
            history: VecDeque::with_capacity(window + 1),
            latest: TopOfBook::empty(0),
        }
    }

    /// The most recent snapshot, or the empty one before any refresh
    pub fn latest(&self) -> &TopOfBook {
        &self.latest
    }

    /// Snapshot `book` at `timestamp` and return it
    pub fn refresh(&mut self, book: &OrderBook, timestamp: i64) -> &TopOfBook {
        let bid_level = book.bids().best_level();
        let ask_level = book.asks().best_level();

        let mut snapshot = TopOfBook {
            timestamp,
            best_bid: bid_level.map(|l| l.price()),
            best_ask: ask_level.map(|l| l.price()),
            bid_size: bid_level.map_or(Quantity::ZERO, |l| l.size()),
            ask_size: ask_level.map_or(Quantity::ZERO, |l| l.size()),
            lag_spread: None,
            lag_bid_depth: None,
            lag_ask_depth: None,
        };

        snapshot.lag_spread = mean(self.history.iter().filter_map(|e| e.spread.map(|s| s as f64)));
        snapshot.lag_bid_depth = mean(self.history.iter().map(|e| e.bid_size.units() as f64));
        snapshot.lag_ask_depth = mean(self.history.iter().map(|e| e.ask_size.units() as f64));

        self.history.push_back(WindowEntry {
            spread: snapshot.spread(),
            bid_size: snapshot.bid_size,
            ask_size: snapshot.ask_size,
        });
        while self.history.len() > self.window {
            self.history.pop_front();
        }

        self.latest = snapshot;
        &self.latest
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::RestingOrder;
    use types::ids::OrderId;
    use types::numeric::Price;
    use types::order::Side;

    fn rest(book: &mut OrderBook, side: Side, id: &str, price: i64, qty: u64) {
        book.side_mut(side)
            .add(RestingOrder {
                order_id: OrderId::from(id),
                timestamp: 1,
                side,
                price: Price::new(price),
                quantity: Quantity::new(qty),
                exid: None,
            })
            .unwrap();
    }

    #[test]
    fn test_empty_book_snapshot() {
        let mut tracker = TopOfBookTracker::new(5);
        assert_eq!(tracker.latest(), &TopOfBook::empty(0));

        let tob = tracker.refresh(&OrderBook::new(), 1).clone();
        assert_eq!(tob.best_bid, None);
        assert_eq!(tob.best_ask, None);
        assert_eq!(tob.bid_size, Quantity::ZERO);
        assert_eq!(tob.lag_spread, None);
        assert_eq!(tob.lag_bid_depth, None);
    }

    #[test]
    fn test_first_snapshot_has_no_lag() {
        let mut book = OrderBook::new();
        rest(&mut book, Side::Buy, "t1_1", 50, 1);
        rest(&mut book, Side::Sell, "t1_2", 52, 1);

        let mut tracker = TopOfBookTracker::new(5);
        let tob = tracker.refresh(&book, 1);
        assert_eq!(tob.best_bid, Some(Price::new(50)));
        assert_eq!(tob.best_ask, Some(Price::new(52)));
        assert_eq!(tob.lag_spread, None);

        let tob = tracker.refresh(&book, 2);
        assert_eq!(tob.lag_spread, Some(2.0));
        assert_eq!(tob.lag_bid_depth, Some(1.0));
    }

    #[test]
    fn test_lag_excludes_current_and_respects_window() {
        let mut book = OrderBook::new();
        let mut tracker = TopOfBookTracker::new(5);
        let buys = [("t1_0", 50, 1), ("t1_1", 50, 1), ("t1_2", 50, 1), ("t10_1", 49, 3), ("t11_1", 47, 3), ("t12_1", 47, 3)];
        let sells = [("t1_5", 52, 1), ("t1_3", 52, 1), ("t1_4", 52, 1), ("t10_2", 53, 3), ("t11_2", 55, 3), ("t12_2", 53, 3)];

        for (j, (buy, sell)) in buys.iter().zip(sells.iter()).enumerate() {
            rest(&mut book, Side::Buy, buy.0, buy.1, buy.2);
            rest(&mut book, Side::Sell, sell.0, sell.1, sell.2);
            tracker.refresh(&book, j as i64 + 1);
        }

        let tob = tracker.latest();
        assert_eq!(tob.timestamp, 6);
        assert_eq!(tob.best_bid, Some(Price::new(50)));
        assert_eq!(tob.best_ask, Some(Price::new(52)));
        assert_eq!(tob.bid_size, Quantity::new(3));
        assert_eq!(tob.ask_size, Quantity::new(3));
        assert_eq!(tob.lag_spread, Some(2.0));
        assert!((tob.lag_bid_depth.unwrap() - 2.4).abs() < 1e-12);
        assert!((tob.lag_ask_depth.unwrap() - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_lag_spread_skips_one_sided_snapshots() {
        let mut book = OrderBook::new();
        let mut tracker = TopOfBookTracker::new(3);
        rest(&mut book, Side::Buy, "t1_1", 50, 1);
        tracker.refresh(&book, 1);
        tracker.refresh(&book, 2);
        assert_eq!(tracker.latest().lag_spread, None);
        assert_eq!(tracker.latest().lag_ask_depth, Some(0.0));

        rest(&mut book, Side::Sell, "t1_2", 54, 1);
        tracker.refresh(&book, 3);
        let tob = tracker.refresh(&book, 4);
        assert_eq!(tob.lag_spread, Some(4.0));
    }

    #[test]
    fn test_window_of_one_uses_previous_snapshot_only() {
        let mut book = OrderBook::new();
        let mut tracker = TopOfBookTracker::new(1);
        rest(&mut book, Side::Buy, "t1_1", 50, 5);
        tracker.refresh(&book, 1);
        rest(&mut book, Side::Buy, "t1_2", 50, 1);
        tracker.refresh(&book, 2);
        let tob = tracker.refresh(&book, 3);
        assert_eq!(tob.lag_bid_depth, Some(6.0));
    }
}
