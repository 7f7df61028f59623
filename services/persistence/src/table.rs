//! Columnar tables for the three history logs
//!
//! Each table stores one vector per column. Rows are converted in and out
//! through the [`Columnar`] trait so the store and reader stay generic.
//! Orders keep their legacy integer price column (with market sentinels)
//! so exported tables line up with existing analysis tooling.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use types::ids::OrderId;
use types::market::TopOfBook;
use types::numeric::{Price, Quantity};
use types::errors::OrderError;
use types::order::{Order, OrderPrice, OrderType, PriceBand, RawOrder, Side};
use types::trade::Trade;

use crate::error::TableError;

/// A table that can be built from rows and turned back into rows
pub trait Columnar: Serialize + DeserializeOwned + Default {
    type Row;

    /// Directory name and segment tag
    const NAME: &'static str;

    fn from_rows(rows: &[Self::Row]) -> Self;
    fn to_rows(&self) -> Result<Vec<Self::Row>, TableError>;
    fn len(&self) -> usize;
    fn extend(&mut self, other: Self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every column must have `len()` entries
    fn check_shape(&self) -> Result<(), TableError>;
}

/// Fails with `RaggedColumns` when any length differs from `expected`
pub fn check_columns(table: &'static str, expected: usize, lens: &[usize]) -> Result<(), TableError> {
    match lens.iter().find(|len| **len != expected) {
        Some(found) => Err(TableError::RaggedColumns {
            table,
            expected,
            found: *found,
        }),
        None => Ok(()),
    }
}

// ── Orders ──────────────────────────────────────────────────────────

/// Order log in its legacy wire layout plus an explicit `market` flag
///
/// The integer `price` column carries the market sentinels analysis
/// tooling expects; `market` decides the price kind on the way back, so
/// a limit price outside the sentinel band is not mistaken for `Market`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdersTable {
    pub order_id: Vec<String>,
    pub timestamp: Vec<i64>,
    pub order_type: Vec<String>,
    pub side: Vec<String>,
    pub quantity: Vec<u64>,
    pub price: Vec<i64>,
    pub market: Vec<bool>,
    pub exid: Vec<Option<u64>>,
}

impl Columnar for OrdersTable {
    type Row = Order;
    const NAME: &'static str = "orders";

    fn from_rows(rows: &[Order]) -> Self {
        let band = PriceBand::default();
        let mut table = Self::default();
        for order in rows {
            table.order_id.push(order.order_id.to_string());
            table.timestamp.push(order.timestamp);
            table.order_type.push(order.order_type.as_str().to_string());
            table.side.push(order.side.as_str().to_string());
            table.quantity.push(order.quantity.units());
            table.price.push(band.encode(order.side, order.price));
            table.market.push(order.price.is_market());
            table.exid.push(order.exid);
        }
        table
    }

    /// Rejected orders are logged as submitted, so a row may fail to decode
    fn to_rows(&self) -> Result<Vec<Order>, TableError> {
        self.check_shape()?;
        (0..self.len())
            .map(|i| {
                self.order_at(i).map_err(|source| TableError::InvalidRow {
                    table: Self::NAME,
                    row: i,
                    reason: source.to_string(),
                })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.order_id.len()
    }

    fn extend(&mut self, other: Self) {
        self.order_id.extend(other.order_id);
        self.timestamp.extend(other.timestamp);
        self.order_type.extend(other.order_type);
        self.side.extend(other.side);
        self.quantity.extend(other.quantity);
        self.price.extend(other.price);
        self.market.extend(other.market);
        self.exid.extend(other.exid);
    }

    fn check_shape(&self) -> Result<(), TableError> {
        check_columns(
            Self::NAME,
            self.len(),
            &[
                self.timestamp.len(),
                self.order_type.len(),
                self.side.len(),
                self.quantity.len(),
                self.price.len(),
                self.market.len(),
                self.exid.len(),
            ],
        )
    }
}

impl OrdersTable {
    fn order_at(&self, i: usize) -> Result<Order, OrderError> {
        let price = if self.market[i] {
            OrderPrice::Market
        } else {
            OrderPrice::limit(self.price[i])
        };
        let order = Order {
            order_id: OrderId::from_raw(self.order_id[i].clone()),
            timestamp: self.timestamp[i],
            order_type: self.order_type[i].parse::<OrderType>()?,
            side: self.side[i].parse::<Side>()?,
            quantity: Quantity::new(self.quantity[i]),
            price,
            exid: self.exid[i],
        };
        order.validate()?;
        Ok(order)
    }

    /// Raw records, including ones that would fail validation
    pub fn raw_rows(&self) -> Result<Vec<RawOrder>, TableError> {
        self.check_shape()?;
        (0..self.len())
            .map(|i| {
                let quantity = i64::try_from(self.quantity[i]).map_err(|_| TableError::InvalidRow {
                    table: Self::NAME,
                    row: i,
                    reason: format!("quantity {} does not fit the wire form", self.quantity[i]),
                })?;
                Ok(RawOrder {
                    order_id: self.order_id[i].clone(),
                    timestamp: self.timestamp[i],
                    order_type: self.order_type[i].clone(),
                    side: self.side[i].clone(),
                    quantity,
                    price: self.price[i],
                    exid: self.exid[i],
                })
            })
            .collect()
    }
}

// ── Trades ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradesTable {
    pub resting_order_id: Vec<String>,
    pub resting_timestamp: Vec<i64>,
    pub incoming_order_id: Vec<String>,
    pub timestamp: Vec<i64>,
    pub price: Vec<i64>,
    pub quantity: Vec<u64>,
    pub side: Vec<String>,
}

impl Columnar for TradesTable {
    type Row = Trade;
    const NAME: &'static str = "trades";

    fn from_rows(rows: &[Trade]) -> Self {
        let mut table = Self::default();
        for trade in rows {
            table.resting_order_id.push(trade.resting_order_id.to_string());
            table.resting_timestamp.push(trade.resting_timestamp);
            table.incoming_order_id.push(trade.incoming_order_id.to_string());
            table.timestamp.push(trade.timestamp);
            table.price.push(trade.price.ticks());
            table.quantity.push(trade.quantity.units());
            table.side.push(trade.side.as_str().to_string());
        }
        table
    }

    fn to_rows(&self) -> Result<Vec<Trade>, TableError> {
        self.check_shape()?;
        (0..self.len())
            .map(|i| {
                let side: Side = self.side[i].parse().map_err(|e: OrderError| {
                    TableError::InvalidRow {
                        table: Self::NAME,
                        row: i,
                        reason: e.to_string(),
                    }
                })?;
                Ok(Trade {
                    resting_order_id: OrderId::from_raw(self.resting_order_id[i].clone()),
                    resting_timestamp: self.resting_timestamp[i],
                    incoming_order_id: OrderId::from_raw(self.incoming_order_id[i].clone()),
                    timestamp: self.timestamp[i],
                    price: Price::new(self.price[i]),
                    quantity: Quantity::new(self.quantity[i]),
                    side,
                })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.resting_order_id.len()
    }

    fn extend(&mut self, other: Self) {
        self.resting_order_id.extend(other.resting_order_id);
        self.resting_timestamp.extend(other.resting_timestamp);
        self.incoming_order_id.extend(other.incoming_order_id);
        self.timestamp.extend(other.timestamp);
        self.price.extend(other.price);
        self.quantity.extend(other.quantity);
        self.side.extend(other.side);
    }

    fn check_shape(&self) -> Result<(), TableError> {
        check_columns(
            Self::NAME,
            self.len(),
            &[
                self.resting_timestamp.len(),
                self.incoming_order_id.len(),
                self.timestamp.len(),
                self.price.len(),
                self.quantity.len(),
                self.side.len(),
            ],
        )
    }
}

// ── Top of book ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopOfBookTable {
    pub timestamp: Vec<i64>,
    pub best_bid: Vec<Option<i64>>,
    pub best_ask: Vec<Option<i64>>,
    pub bid_size: Vec<u64>,
    pub ask_size: Vec<u64>,
    pub lag_spread: Vec<Option<f64>>,
    pub lag_bid_depth: Vec<Option<f64>>,
    pub lag_ask_depth: Vec<Option<f64>>,
}

impl Columnar for TopOfBookTable {
    type Row = TopOfBook;
    const NAME: &'static str = "tob";

    fn from_rows(rows: &[TopOfBook]) -> Self {
        let mut table = Self::default();
        for tob in rows {
            table.timestamp.push(tob.timestamp);
            table.best_bid.push(tob.best_bid.map(|p| p.ticks()));
            table.best_ask.push(tob.best_ask.map(|p| p.ticks()));
            table.bid_size.push(tob.bid_size.units());
            table.ask_size.push(tob.ask_size.units());
            table.lag_spread.push(tob.lag_spread);
            table.lag_bid_depth.push(tob.lag_bid_depth);
            table.lag_ask_depth.push(tob.lag_ask_depth);
        }
        table
    }

    fn to_rows(&self) -> Result<Vec<TopOfBook>, TableError> {
        self.check_shape()?;
        Ok((0..self.len())
            .map(|i| TopOfBook {
                timestamp: self.timestamp[i],
                best_bid: self.best_bid[i].map(Price::new),
                best_ask: self.best_ask[i].map(Price::new),
                bid_size: Quantity::new(self.bid_size[i]),
                ask_size: Quantity::new(self.ask_size[i]),
                lag_spread: self.lag_spread[i],
                lag_bid_depth: self.lag_bid_depth[i],
                lag_ask_depth: self.lag_ask_depth[i],
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.timestamp.len()
    }

    fn extend(&mut self, other: Self) {
        self.timestamp.extend(other.timestamp);
        self.best_bid.extend(other.best_bid);
        self.best_ask.extend(other.best_ask);
        self.bid_size.extend(other.bid_size);
        self.ask_size.extend(other.ask_size);
        self.lag_spread.extend(other.lag_spread);
        self.lag_bid_depth.extend(other.lag_bid_depth);
        self.lag_ask_depth.extend(other.lag_ask_depth);
    }

    fn check_shape(&self) -> Result<(), TableError> {
        check_columns(
            Self::NAME,
            self.len(),
            &[
                self.best_bid.len(),
                self.best_ask.len(),
                self.bid_size.len(),
                self.ask_size.len(),
                self.lag_spread.len(),
                self.lag_bid_depth.len(),
                self.lag_ask_depth.len(),
            ],
        )
    }
}

// ── Tests ───────────────────────────────────────────────────────────
