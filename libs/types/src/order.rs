//! Order message types
//!
//! An `Order` is an immutable request to mutate the book: add a quote,
//! cancel a resting one, or reduce its size. `RawOrder` is the untyped
//! wire record agents and replay files use; converting it validates.

use crate::errors::OrderError;
use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(OrderError::UnknownSide(other.to_string())),
        }
    }
}

/// What the message asks the book to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Add,
    Cancel,
    Modify,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Add => "add",
            OrderType::Cancel => "cancel",
            OrderType::Modify => "modify",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(OrderType::Add),
            "cancel" => Ok(OrderType::Cancel),
            "modify" => Ok(OrderType::Modify),
            other => Err(OrderError::UnknownType(other.to_string())),
        }
    }
}

/// Limit price or "any price"
///
/// A `Market` order matches as deep as the opposite side allows and
/// never rests; a `Limit` order rests whatever it could not fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "price", rename_all = "lowercase")]
pub enum OrderPrice {
    Limit(Price),
    Market,
}

impl OrderPrice {
    pub fn limit(ticks: i64) -> Self {
        OrderPrice::Limit(Price::new(ticks))
    }

    pub fn as_limit(&self) -> Option<Price> {
        match self {
            OrderPrice::Limit(p) => Some(*p),
            OrderPrice::Market => None,
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self, OrderPrice::Market)
    }

    /// Whether an order on `side` at this price may trade at `resting`
    pub fn accepts(&self, side: Side, resting: Price) -> bool {
        match (self, side) {
            (OrderPrice::Market, _) => true,
            (OrderPrice::Limit(limit), Side::Buy) => *limit >= resting,
            (OrderPrice::Limit(limit), Side::Sell) => *limit <= resting,
        }
    }
}

/// Decodes the legacy integer price field
///
/// Raw prices at or below `min_limit - 1` or at or above `market_threshold`
/// are the old "buy/sell at any price" sentinels and become `Market`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    /// Smallest genuine limit price
    pub min_limit: i64,
    /// First raw value treated as a market sentinel
    pub market_threshold: i64,
}

impl Default for PriceBand {
    fn default() -> Self {
        Self {
            min_limit: 1,
            market_threshold: 2_000_000,
        }
    }
}

impl PriceBand {
    pub fn classify(&self, raw: i64) -> OrderPrice {
        if raw < self.min_limit || raw >= self.market_threshold {
            OrderPrice::Market
        } else {
            OrderPrice::limit(raw)
        }
    }

    /// Inverse of `classify`, used when writing the legacy wire form
    pub fn encode(&self, side: Side, price: OrderPrice) -> i64 {
        match (price, side) {
            (OrderPrice::Limit(p), _) => p.ticks(),
            (OrderPrice::Market, Side::Buy) => self.market_threshold,
            (OrderPrice::Market, Side::Sell) => self.min_limit - 1,
        }
    }
}

/// Largest order size; the legacy wire form carries quantities as `i64`
pub const MAX_ORDER_QUANTITY: Quantity = Quantity::new(i64::MAX as u64);

/// Immutable order message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: Quantity,
    pub price: OrderPrice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exid: Option<u64>,
}

impl Order {
    /// New quote entering the book
    pub fn add(order_id: OrderId, timestamp: i64, side: Side, quantity: Quantity, price: OrderPrice) -> Self {
        Self {
            order_id,
            timestamp,
            order_type: OrderType::Add,
            side,
            quantity,
            price,
            exid: None,
        }
    }

    /// Full cancel of a resting order
    pub fn cancel(order_id: OrderId, timestamp: i64, side: Side, quantity: Quantity, price: OrderPrice) -> Self {
        Self {
            order_type: OrderType::Cancel,
            ..Self::add(order_id, timestamp, side, quantity, price)
        }
    }

    /// Reduce a resting order by `quantity`
    pub fn modify(order_id: OrderId, timestamp: i64, side: Side, quantity: Quantity, price: OrderPrice) -> Self {
        Self {
            order_type: OrderType::Modify,
            ..Self::add(order_id, timestamp, side, quantity, price)
        }
    }

    pub fn with_exid(mut self, exid: u64) -> Self {
        self.exid = Some(exid);
        self
    }

    /// Caller contract checks; nothing here looks at the book
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.order_id.is_empty() {
            return Err(OrderError::EmptyOrderId);
        }
        if self.quantity.is_zero() {
            return Err(OrderError::InvalidQuantity(format!(
                "{} has non-positive quantity 0",
                self.order_id
            )));
        }
        if self.quantity > MAX_ORDER_QUANTITY {
            return Err(OrderError::InvalidQuantity(format!(
                "{} has quantity {} above {}",
                self.order_id, self.quantity, MAX_ORDER_QUANTITY
            )));
        }
        Ok(())
    }

    /// Cancel message for this order, carrying its current size
    pub fn to_cancel(&self, timestamp: i64) -> Order {
        Order::cancel(self.order_id.clone(), timestamp, self.side, self.quantity, self.price)
    }
}

/// Untyped order record as produced by external tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    pub quantity: i64,
    pub price: i64,
    #[serde(default)]
    pub exid: Option<u64>,
}

impl RawOrder {
    /// Decode with an explicit price band
    pub fn decode(self, band: &PriceBand) -> Result<Order, OrderError> {
        let order_type: OrderType = self.order_type.parse()?;
        let side: Side = self.side.parse()?;
        if self.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(format!(
                "{} has non-positive quantity {}",
                self.order_id, self.quantity
            )));
        }
        let order = Order {
            order_id: OrderId::from_raw(self.order_id),
            timestamp: self.timestamp,
            order_type,
            side,
            quantity: Quantity::new(self.quantity as u64),
            price: band.classify(self.price),
            exid: self.exid,
        };
        order.validate()?;
        Ok(order)
    }

    /// Legacy wire form of a typed order
    pub fn encode(order: &Order, band: &PriceBand) -> Result<Self, OrderError> {
        let quantity = i64::try_from(order.quantity.units()).map_err(|_| {
            OrderError::InvalidQuantity(format!(
                "{} has quantity {} above {}",
                order.order_id, order.quantity, MAX_ORDER_QUANTITY
            ))
        })?;
        Ok(Self {
            order_id: order.order_id.as_str().to_string(),
            timestamp: order.timestamp,
            order_type: order.order_type.as_str().to_string(),
            side: order.side.as_str().to_string(),
            quantity,
            price: band.encode(order.side, order.price),
            exid: order.exid,
        })
    }
}

impl TryFrom<RawOrder> for Order {
    type Error = OrderError;

    fn try_from(raw: RawOrder) -> Result<Self, Self::Error> {
        raw.decode(&PriceBand::default())
    }
}
