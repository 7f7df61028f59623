//! History ledger
//!
//! Three append-only logs: orders as submitted, executed trades, and
//! top-of-book snapshots. Each log is exported independently to a
//! [`HistorySink`], optionally truncating it afterwards.

use serde::{Deserialize, Serialize};
use types::market::TopOfBook;
use types::order::Order;
use types::trade::Trade;

/// What happens to a log after a successful flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// Truncate the log once it has been written
    Clear,
    /// Keep the log in memory
    Retain,
}

/// Destination for exported history
///
/// A failed write leaves the log untouched regardless of the flush mode.
pub trait HistorySink {
    type Error;

    fn write_orders(&mut self, orders: &[Order]) -> Result<(), Self::Error>;
    fn write_trades(&mut self, trades: &[Trade]) -> Result<(), Self::Error>;
    fn write_top_of_book(&mut self, snapshots: &[TopOfBook]) -> Result<(), Self::Error>;
}

/// Append-only history owned by the engine
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    orders: Vec<Order>,
    trades: Vec<Trade>,
    top_of_book: Vec<TopOfBook>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_order(&mut self, order: &Order) {
        self.orders.push(order.clone());
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_top_of_book(&mut self, snapshot: TopOfBook) {
        self.top_of_book.push(snapshot);
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn top_of_book(&self) -> &[TopOfBook] {
        &self.top_of_book
    }

    /// Export the order log; returns the number of rows written
    pub fn flush_orders<S: HistorySink>(&mut self, sink: &mut S, mode: FlushMode) -> Result<usize, S::Error> {
        sink.write_orders(&self.orders)?;
        Ok(finish(&mut self.orders, mode))
    }

    /// Export the trade tape; returns the number of rows written
    pub fn flush_trades<S: HistorySink>(&mut self, sink: &mut S, mode: FlushMode) -> Result<usize, S::Error> {
        sink.write_trades(&self.trades)?;
        Ok(finish(&mut self.trades, mode))
    }

    /// Export the snapshot log; returns the number of rows written
    pub fn flush_top_of_book<S: HistorySink>(&mut self, sink: &mut S, mode: FlushMode) -> Result<usize, S::Error> {
        sink.write_top_of_book(&self.top_of_book)?;
        Ok(finish(&mut self.top_of_book, mode))
    }
}

fn finish<T>(log: &mut Vec<T>, mode: FlushMode) -> usize {
    let written = log.len();
    if mode == FlushMode::Clear {
        log.clear();
    }
    written
}

/// Sink that accumulates everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub orders: Vec<Order>,
    pub trades: Vec<Trade>,
    pub top_of_book: Vec<TopOfBook>,
    /// Number of write calls received per table, in call order
    pub batches: Vec<(&'static str, usize)>,
}

impl HistorySink for MemorySink {
    type Error = std::convert::Infallible;

    fn write_orders(&mut self, orders: &[Order]) -> Result<(), Self::Error> {
        self.orders.extend_from_slice(orders);
        self.batches.push(("orders", orders.len()));
        Ok(())
    }

    fn write_trades(&mut self, trades: &[Trade]) -> Result<(), Self::Error> {
        self.trades.extend_from_slice(trades);
        self.batches.push(("trades", trades.len()));
        Ok(())
    }

    fn write_top_of_book(&mut self, snapshots: &[TopOfBook]) -> Result<(), Self::Error> {
        self.top_of_book.extend_from_slice(snapshots);
        self.batches.push(("tob", snapshots.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::OrderId;
    use types::numeric::{Price, Quantity};
    use types::order::{OrderPrice, Side};

    fn order(id: &str) -> Order {
        Order::add(OrderId::from(id), 1, Side::Buy, Quantity::new(1), OrderPrice::limit(50))
    }

    fn trade() -> Trade {
        Trade {
            resting_order_id: OrderId::from("p1_1"),
            resting_timestamp: 1,
            incoming_order_id: OrderId::from("t1_1"),
            timestamp: 2,
            price: Price::new(50),
            quantity: Quantity::new(1),
            side: Side::Buy,
        }
    }

    /// Sink whose writes always fail
    struct FailingSink;

    impl HistorySink for FailingSink {
        type Error = &'static str;

        fn write_orders(&mut self, _: &[Order]) -> Result<(), Self::Error> {
            Err("disk full")
        }
        fn write_trades(&mut self, _: &[Trade]) -> Result<(), Self::Error> {
            Err("disk full")
        }
        fn write_top_of_book(&mut self, _: &[TopOfBook]) -> Result<(), Self::Error> {
            Err("disk full")
        }
    }

    #[test]
    fn test_flush_clear_truncates() {
        let mut ledger = HistoryLedger::new();
        ledger.record_order(&order("t1_1"));
        ledger.record_order(&order("t1_2"));
        let mut sink = MemorySink::default();

        let written = ledger.flush_orders(&mut sink, FlushMode::Clear).unwrap();
        assert_eq!(written, 2);
        assert!(ledger.orders().is_empty());
        assert_eq!(sink.orders.len(), 2);
    }

    #[test]
    fn test_flush_retain_keeps_log() {
        let mut ledger = HistoryLedger::new();
        ledger.record_trade(trade());
        let mut sink = MemorySink::default();

        ledger.flush_trades(&mut sink, FlushMode::Retain).unwrap();
        assert_eq!(ledger.trades().len(), 1);
        ledger.record_trade(trade());
        ledger.flush_trades(&mut sink, FlushMode::Retain).unwrap();
        assert_eq!(ledger.trades().len(), 2);
        assert_eq!(sink.trades.len(), 3);
    }

    #[test]
    fn test_failed_flush_keeps_log() {
        let mut ledger = HistoryLedger::new();
        ledger.record_order(&order("t1_1"));
        ledger.record_top_of_book(TopOfBook::empty(1));

        assert!(ledger.flush_orders(&mut FailingSink, FlushMode::Clear).is_err());
        assert!(ledger.flush_top_of_book(&mut FailingSink, FlushMode::Clear).is_err());
        assert_eq!(ledger.orders().len(), 1);
        assert_eq!(ledger.top_of_book().len(), 1);
    }

    #[test]
    fn test_logs_are_independent() {
        let mut ledger = HistoryLedger::new();
        ledger.record_order(&order("t1_1"));
        ledger.record_trade(trade());
        ledger.record_top_of_book(TopOfBook::empty(1));
        let mut sink = MemorySink::default();

        ledger.flush_top_of_book(&mut sink, FlushMode::Clear).unwrap();
        assert!(ledger.top_of_book().is_empty());
        assert_eq!(ledger.orders().len(), 1);
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(sink.batches, vec![("tob", 1)]);
    }
}
