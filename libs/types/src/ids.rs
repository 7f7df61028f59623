//! Identifier types for traders and orders
//!
//! Order ids are human readable and carry their owner: `<trader_id>_<sequence>`.
//! The engine never needs a lookup table to know whom to confirm a fill to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the trader prefix and the per-trader sequence.
pub const ORDER_ID_SEPARATOR: char = '_';

/// Identifier of a trading agent (e.g. `t12`, `p3`, `m0`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraderId(String);

impl TraderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TraderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Globally unique order identifier
///
/// Ordering is lexicographic on the underlying string, which keeps
/// `BTreeMap<OrderId, _>` iteration deterministic across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Build the id of the `sequence`-th quote of `trader`
    pub fn new(trader: &TraderId, sequence: u64) -> Self {
        Self(format!("{}{}{}", trader.as_str(), ORDER_ID_SEPARATOR, sequence))
    }

    /// Wrap an id received from outside (seed orders use suffixes like `_a`)
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owner of the order: everything before the first separator
    pub fn trader(&self) -> TraderId {
        match self.0.split_once(ORDER_ID_SEPARATOR) {
            Some((prefix, _)) => TraderId::new(prefix),
            None => TraderId::new(self.0.as_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::from_raw(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_format() {
        let trader = TraderId::new("t12");
        let id = OrderId::new(&trader, 7);
        assert_eq!(id.as_str(), "t12_7");
    }

    #[test]
    fn test_order_id_trader_prefix() {
        assert_eq!(OrderId::from("p999999_a").trader(), TraderId::new("p999999"));
        assert_eq!(OrderId::from("m0_15").trader(), TraderId::new("m0"));
    }

    #[test]
    fn test_order_id_without_separator() {
        assert_eq!(OrderId::from("seed").trader(), TraderId::new("seed"));
    }

    #[test]
    fn test_order_id_serialization() {
        let id = OrderId::from("t1_3");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"t1_3\"");

        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_order_ids_sort_deterministically() {
        let mut ids = vec![OrderId::from("p1_2"), OrderId::from("p1_10"), OrderId::from("p0_5")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "p0_5");
    }
}
