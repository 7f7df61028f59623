//! Crossing detection logic
//!
//! Determines when an incoming order can trade against the opposite side

use types::numeric::Price;
use types::order::{OrderPrice, Side};

/// Check if an incoming order crosses the best opposite price
///
/// A buy is marketable at or above the best ask, a sell at or below the
/// best bid. Nothing is marketable against an empty side, not even a
/// market order.
pub fn is_marketable(side: Side, price: OrderPrice, best_opposite: Option<Price>) -> bool {
    match best_opposite {
        Some(resting) => price.accepts(side, resting),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_buy_marketable() {
        let best_ask = Some(Price::new(52));
        assert!(is_marketable(Side::Buy, OrderPrice::limit(52), best_ask));
        assert!(is_marketable(Side::Buy, OrderPrice::limit(60), best_ask));
        assert!(!is_marketable(Side::Buy, OrderPrice::limit(51), best_ask));
    }

    #[test]
    fn test_limit_sell_marketable() {
        let best_bid = Some(Price::new(50));
        assert!(is_marketable(Side::Sell, OrderPrice::limit(50), best_bid));
        assert!(!is_marketable(Side::Sell, OrderPrice::limit(51), best_bid));
    }

    #[test]
    fn test_market_order_needs_opposite_side() {
        assert!(is_marketable(Side::Sell, OrderPrice::Market, Some(Price::new(1))));
        assert!(!is_marketable(Side::Sell, OrderPrice::Market, None));
        assert!(!is_marketable(Side::Buy, OrderPrice::limit(100), None));
    }
}
