//! Trade records and confirmations
//!
//! A `Trade` is created once per (resting order, fill) pair. Each fill
//! also produces two `TradeConfirmation`s, one per party.

use crate::ids::{OrderId, TraderId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};

/// Executed fill, priced at the resting order's price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub resting_order_id: OrderId,
    /// Entry time of the resting order
    pub resting_timestamp: i64,
    pub incoming_order_id: OrderId,
    /// Match time
    pub timestamp: i64,
    pub price: Price,
    pub quantity: Quantity,
    /// Side of the resting order
    pub side: Side,
}

/// Fill notice sent to one party of a trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeConfirmation {
    pub timestamp: i64,
    pub trader: TraderId,
    pub order_id: OrderId,
    pub quantity: Quantity,
    /// Side of the confirmed party's order
    pub side: Side,
    pub price: Price,
}

impl TradeConfirmation {
    pub fn new(timestamp: i64, order_id: OrderId, quantity: Quantity, side: Side, price: Price) -> Self {
        Self {
            timestamp,
            trader: order_id.trader(),
            order_id,
            quantity,
            side,
            price,
        }
    }
}

/// Notice of size removed by a cancel or modify
///
/// `quantity` is the amount taken off the book, not what remains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyConfirmation {
    pub timestamp: i64,
    pub trader: TraderId,
    pub order_id: OrderId,
    pub quantity: Quantity,
    pub side: Side,
}

impl ModifyConfirmation {
    pub fn new(timestamp: i64, order_id: OrderId, quantity: Quantity, side: Side) -> Self {
        Self {
            timestamp,
            trader: order_id.trader(),
            order_id,
            quantity,
            side,
        }
    }
}

/// Anything the engine sends back to an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Confirmation {
    Trade(TradeConfirmation),
    Modify(ModifyConfirmation),
}

impl Confirmation {
    pub fn trader(&self) -> &TraderId {
        match self {
            Confirmation::Trade(c) => &c.trader,
            Confirmation::Modify(c) => &c.trader,
        }
    }

    pub fn order_id(&self) -> &OrderId {
        match self {
            Confirmation::Trade(c) => &c.order_id,
            Confirmation::Modify(c) => &c.order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_confirmation_derives_trader() {
        let c = TradeConfirmation::new(5, OrderId::from("t3_1"), Quantity::new(1), Side::Sell, Price::new(50));
        assert_eq!(c.trader, TraderId::new("t3"));
    }

    #[test]
    fn test_modify_confirmation_derives_trader() {
        let c = ModifyConfirmation::new(7, OrderId::from("t5_10"), Quantity::new(5), Side::Buy);
        assert_eq!(c.trader, TraderId::new("t5"));
        assert_eq!(c.quantity, Quantity::new(5));
    }

    #[test]
    fn test_confirmation_serialization() {
        let c = Confirmation::Modify(ModifyConfirmation::new(
            7,
            OrderId::from("t5_10"),
            Quantity::new(5),
            Side::Buy,
        ));
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"kind\":\"modify\""));
        let back: Confirmation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.trader().as_str(), "t5");
    }
}
