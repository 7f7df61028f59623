//! Price level implementation with FIFO queue
//!
//! A price level contains all orders resting at one price. Orders keep
//! their arrival order for time priority, and any order can be looked up
//! or removed by id without scanning the queue.
//!
//! Layout: an arena of slots in arrival order plus an id -> slot index.
//! Removing from the middle leaves a tombstone; the arena is compacted
//! once tombstones outnumber live orders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::errors::{InvariantViolation, OrderError};
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Below this many slots compaction is never worth it
const COMPACT_MIN_SLOTS: usize = 32;

/// An order sitting in the book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub order_id: OrderId,
    /// Entry time, reported on every trade against this order
    pub timestamp: i64,
    pub side: Side,
    pub price: Price,
    /// Remaining size; only ever decreases while resting
    pub quantity: Quantity,
    pub exid: Option<u64>,
}

impl RestingOrder {
    /// Rest `quantity` of `order` at `price`
    pub fn from_order(order: &Order, price: Price, quantity: Quantity) -> Self {
        Self {
            order_id: order.order_id.clone(),
            timestamp: order.timestamp,
            side: order.side,
            price,
            quantity,
            exid: order.exid,
        }
    }
}

/// Result of taking size off one resting order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Size actually taken off the book
    pub removed: Quantity,
    /// Size still resting; zero means the order is gone
    pub remaining: Quantity,
}

/// A price level containing orders at a specific price
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    /// Orders in arrival order; `None` marks a removed order
    slots: Vec<Option<RestingOrder>>,
    /// First slot that may still be live
    head: usize,
    index: HashMap<OrderId, usize>,
    /// Aggregate resting size at this level
    size: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new(price: Price) -> Self {
        Self {
            price,
            slots: Vec::new(),
            head: 0,
            index: HashMap::new(),
            size: Quantity::ZERO,
        }
    }

    /// Append at the tail of the queue (lowest time priority)
    ///
    /// Fails without touching the level if the id is already here or the
    /// aggregate size would overflow.
    pub fn push_back(&mut self, order: RestingOrder) -> Result<(), OrderError> {
        debug_assert_eq!(order.price, self.price, "order routed to the wrong level");
        if self.index.contains_key(&order.order_id) {
            return Err(OrderError::DuplicateOrderId {
                order_id: order.order_id.to_string(),
            });
        }
        self.size = self
            .size
            .checked_add(order.quantity)
            .ok_or(OrderError::LevelSizeOverflow {
                price: self.price.ticks(),
            })?;
        self.index.insert(order.order_id.clone(), self.slots.len());
        self.slots.push(Some(order));
        Ok(())
    }

    /// Remove an order by id
    ///
    /// Returns the removed order, or None if it is not resting here.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        let slot = self.index.remove(order_id)?;
        let order = self.slots[slot].take()?;
        self.size = self.size.saturating_sub(order.quantity);
        self.tidy();
        Some(order)
    }

    /// Take up to `amount` off an order; removes it when nothing is left
    pub fn reduce(&mut self, order_id: &OrderId, amount: Quantity) -> Option<Reduction> {
        let slot = *self.index.get(order_id)?;
        let order = self.slots[slot].as_mut()?;
        let removed = amount.min(order.quantity);
        order.quantity -= removed;
        self.size -= removed;
        let remaining = order.quantity;
        if remaining.is_zero() {
            self.index.remove(order_id);
            self.slots[slot] = None;
            self.tidy();
        }
        Some(Reduction { removed, remaining })
    }

    /// Fill the order at the front of the queue by up to `amount`
    ///
    /// Returns the order as it was before the fill, and the filled size.
    pub fn fill_front(&mut self, amount: Quantity) -> Option<(RestingOrder, Quantity)> {
        let front = self.front()?.clone();
        let reduction = self.reduce(&front.order_id, amount)?;
        Some((front, reduction.removed))
    }

    /// Peek at the order with the highest time priority
    pub fn front(&self) -> Option<&RestingOrder> {
        self.slots.get(self.head).and_then(Option::as_ref)
    }

    /// Resting orders in priority order
    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> {
        self.slots[self.head..].iter().flatten()
    }

    /// Order ids in priority order
    pub fn order_ids(&self) -> impl Iterator<Item = &OrderId> {
        self.iter().map(|o| &o.order_id)
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&RestingOrder> {
        let slot = *self.index.get(order_id)?;
        self.slots[slot].as_ref()
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Get the total quantity at this price level
    pub fn size(&self) -> Quantity {
        self.size
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Recompute aggregates from the resting orders and compare
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let actual_size: Quantity = self.iter().map(|o| o.quantity).sum();
        if actual_size != self.size {
            return Err(InvariantViolation::LevelSize {
                price: self.price.ticks(),
                recorded: self.size.units(),
                actual: actual_size.units(),
            });
        }
        let actual_count = self.iter().count();
        if actual_count != self.index.len() {
            return Err(InvariantViolation::LevelCount {
                price: self.price.ticks(),
                recorded: self.index.len(),
                actual: actual_count,
            });
        }
        for (order_id, slot) in &self.index {
            let resting = self.slots.get(*slot).and_then(Option::as_ref);
            if resting.map(|o| &o.order_id) != Some(order_id) || *slot < self.head {
                return Err(InvariantViolation::IndexMismatch {
                    order_id: order_id.to_string(),
                    indexed: self.price.ticks(),
                });
            }
        }
        Ok(())
    }

    /// Advance the head past tombstones and compact when they dominate
    fn tidy(&mut self) {
        if self.index.is_empty() {
            self.slots.clear();
            self.head = 0;
            return;
        }
        while matches!(self.slots.get(self.head), Some(None)) {
            self.head += 1;
        }
        let tombstones = self.slots.len() - self.index.len();
        if self.slots.len() >= COMPACT_MIN_SLOTS && tombstones * 2 > self.slots.len() {
            self.compact();
        }
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        self.head = 0;
        for (slot, order) in self.slots.iter().enumerate() {
            if let Some(order) = order {
                self.index.insert(order.order_id.clone(), slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting(id: &str, qty: u64) -> RestingOrder {
        RestingOrder {
            order_id: OrderId::from(id),
            timestamp: 1,
            side: Side::Buy,
            price: Price::new(50),
            quantity: Quantity::new(qty),
            exid: None,
        }
    }

    #[test]
    fn test_price_level_insert() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 1)).unwrap();

        assert_eq!(level.order_count(), 1);
        assert_eq!(level.size(), Quantity::new(1));
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_refuses_size_overflow() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", u64::MAX - 1)).unwrap();
        assert!(matches!(
            level.push_back(resting("t1_2", 2)),
            Err(OrderError::LevelSizeOverflow { price: 50 })
        ));
        assert_eq!(level.size(), Quantity::new(u64::MAX - 1));
        assert_eq!(level.order_count(), 1);
        assert!(level.verify().is_ok());
    }

    #[test]
    fn test_price_level_rejects_duplicate_id() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 1)).unwrap();
        assert!(matches!(
            level.push_back(resting("t1_1", 4)),
            Err(OrderError::DuplicateOrderId { .. })
        ));
        assert_eq!(level.size(), Quantity::new(1));
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_price_level_fifo_order() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 1)).unwrap();
        level.push_back(resting("t1_2", 2)).unwrap();
        level.push_back(resting("t1_3", 3)).unwrap();

        let ids: Vec<&str> = level.order_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["t1_1", "t1_2", "t1_3"]);
        assert_eq!(level.front().unwrap().order_id.as_str(), "t1_1");
    }

    #[test]
    fn test_price_level_remove_middle_keeps_priority() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 1)).unwrap();
        level.push_back(resting("t1_2", 2)).unwrap();
        level.push_back(resting("t1_3", 3)).unwrap();

        let removed = level.remove(&OrderId::from("t1_2")).unwrap();
        assert_eq!(removed.quantity, Quantity::new(2));
        assert_eq!(level.order_count(), 2);
        assert_eq!(level.size(), Quantity::new(4));

        let ids: Vec<&str> = level.order_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["t1_1", "t1_3"]);
        assert!(level.verify().is_ok());
    }

    #[test]
    fn test_price_level_remove_is_idempotent() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 1)).unwrap();
        level.push_back(resting("t1_2", 1)).unwrap();

        assert!(level.remove(&OrderId::from("t1_2")).is_some());
        assert!(level.remove(&OrderId::from("t1_2")).is_none());
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.size(), Quantity::new(1));
    }

    #[test]
    fn test_price_level_reduce() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 2)).unwrap();

        let partial = level.reduce(&OrderId::from("t1_1"), Quantity::new(1)).unwrap();
        assert_eq!(partial, Reduction { removed: Quantity::new(1), remaining: Quantity::new(1) });
        assert_eq!(level.size(), Quantity::new(1));
        assert_eq!(level.get(&OrderId::from("t1_1")).unwrap().quantity, Quantity::new(1));

        let last = level.reduce(&OrderId::from("t1_1"), Quantity::new(1)).unwrap();
        assert_eq!(last.remaining, Quantity::ZERO);
        assert!(level.is_empty());
        assert_eq!(level.size(), Quantity::ZERO);
    }

    #[test]
    fn test_price_level_reduce_clamps_to_resting() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 2)).unwrap();

        let r = level.reduce(&OrderId::from("t1_1"), Quantity::new(5)).unwrap();
        assert_eq!(r.removed, Quantity::new(2));
        assert!(level.is_empty());
    }

    #[test]
    fn test_price_level_fill_front() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 3)).unwrap();
        level.push_back(resting("t1_2", 2)).unwrap();

        let (before, filled) = level.fill_front(Quantity::new(1)).unwrap();
        assert_eq!(before.order_id.as_str(), "t1_1");
        assert_eq!(before.quantity, Quantity::new(3));
        assert_eq!(filled, Quantity::new(1));
        assert_eq!(level.size(), Quantity::new(4));

        let (before, filled) = level.fill_front(Quantity::new(10)).unwrap();
        assert_eq!(before.order_id.as_str(), "t1_1");
        assert_eq!(filled, Quantity::new(2));
        assert_eq!(level.front().unwrap().order_id.as_str(), "t1_2");
    }

    #[test]
    fn test_price_level_compaction_preserves_order() {
        let mut level = PriceLevel::new(Price::new(50));
        for i in 0..100 {
            level.push_back(resting(&format!("t1_{i}"), 1)).unwrap();
        }
        for i in (0..100).filter(|i| i % 3 != 0) {
            level.remove(&OrderId::from(format!("t1_{i}").as_str()));
        }

        let expected: Vec<String> = (0..100).filter(|i| i % 3 == 0).map(|i| format!("t1_{i}")).collect();
        let ids: Vec<String> = level.order_ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, expected);
        assert_eq!(level.size(), Quantity::new(expected.len() as u64));
        assert!(level.verify().is_ok());
    }

    #[test]
    fn test_price_level_total_quantity_invariant() {
        let mut level = PriceLevel::new(Price::new(50));
        level.push_back(resting("t1_1", 1)).unwrap();
        level.push_back(resting("t1_2", 2)).unwrap();
        level.push_back(resting("t1_3", 3)).unwrap();

        assert_eq!(level.size(), Quantity::new(6));
        assert!(level.verify().is_ok());
    }
}
