//! One side of the order book
//!
//! Active prices are kept in a BTreeMap sorted ascending for both sides.
//! The best bid is therefore the last key and the best ask the first key.
//! A level exists in the map iff it holds at least one order.

use std::collections::{BTreeMap, HashMap};
use types::errors::{InvariantViolation, OrderError};
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Side;

use super::price_level::{PriceLevel, Reduction, RestingOrder};

/// Outcome of filling against the front of the best level
#[derive(Debug, Clone)]
pub struct LevelFill {
    /// The resting order as it was before this fill
    pub resting: RestingOrder,
    pub filled: Quantity,
}

/// Price-level book for a single side
#[derive(Debug, Clone)]
pub struct SideBook {
    side: Side,
    /// Active levels keyed by price, ascending
    levels: BTreeMap<Price, PriceLevel>,
    /// Where each resting order lives
    locations: HashMap<OrderId, Price>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            locations: HashMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Append an order at the tail of its price level
    pub fn add(&mut self, order: RestingOrder) -> Result<(), OrderError> {
        debug_assert_eq!(order.side, self.side);
        if self.locations.contains_key(&order.order_id) {
            return Err(OrderError::DuplicateOrderId {
                order_id: order.order_id.to_string(),
            });
        }
        let price = order.price;
        let order_id = order.order_id.clone();
        let level = self.levels.entry(price).or_insert_with(|| PriceLevel::new(price));
        if let Err(err) = level.push_back(order) {
            if level.is_empty() {
                self.levels.remove(&price);
            }
            return Err(err);
        }
        self.locations.insert(order_id, price);
        Ok(())
    }

    /// Remove an order at a known price; a missing id is a no-op
    pub fn remove(&mut self, price: Price, order_id: &OrderId) -> Option<RestingOrder> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        self.locations.remove(order_id);
        Some(removed)
    }

    /// Remove an order wherever it rests
    pub fn cancel(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        let price = *self.locations.get(order_id)?;
        self.remove(price, order_id)
    }

    /// Take `amount` off an order at a known price
    ///
    /// Reaching zero removes the order, and the level with it if emptied.
    pub fn reduce_quantity(&mut self, price: Price, order_id: &OrderId, amount: Quantity) -> Option<Reduction> {
        let level = self.levels.get_mut(&price)?;
        let reduction = level.reduce(order_id, amount)?;
        if reduction.remaining.is_zero() {
            self.locations.remove(order_id);
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
        Some(reduction)
    }

    /// Take `amount` off an order wherever it rests
    pub fn reduce(&mut self, order_id: &OrderId, amount: Quantity) -> Option<(Price, Reduction)> {
        let price = *self.locations.get(order_id)?;
        self.reduce_quantity(price, order_id, amount).map(|r| (price, r))
    }

    /// Best active price: highest bid or lowest ask
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    pub fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.values().next_back(),
            Side::Sell => self.levels.values().next(),
        }
    }

    /// Fill the highest-priority order of the best level by up to `amount`
    pub fn fill_best(&mut self, amount: Quantity) -> Option<LevelFill> {
        let price = self.best_price()?;
        let level = self.levels.get_mut(&price)?;
        let (resting, filled) = level.fill_front(amount)?;
        if level.get(&resting.order_id).is_none() {
            self.locations.remove(&resting.order_id);
        }
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(LevelFill { resting, filled })
    }

    /// Active prices, ascending
    pub fn prices(&self) -> impl DoubleEndedIterator<Item = Price> + '_ {
        self.levels.keys().copied()
    }

    /// Levels from best to worst
    pub fn levels_by_priority(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// `(price, size)` of the best `depth` levels, best first
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels_by_priority()
            .take(depth)
            .map(|level| (level.price(), level.size()))
            .collect()
    }

    /// Aggregate size across every level
    pub fn total_size(&self) -> Quantity {
        self.levels.values().map(PriceLevel::size).sum()
    }

    pub fn order_count(&self) -> usize {
        self.locations.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.locations.contains_key(order_id)
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&RestingOrder> {
        let price = self.locations.get(order_id)?;
        self.levels.get(price)?.get(order_id)
    }

    /// Check per-level aggregates and the id index against the levels
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let mut indexed = 0usize;
        for (price, level) in &self.levels {
            if level.is_empty() || level.size().is_zero() {
                return Err(InvariantViolation::EmptyLevel { price: price.ticks() });
            }
            level.verify()?;
            for order_id in level.order_ids() {
                if self.locations.get(order_id) != Some(price) {
                    return Err(InvariantViolation::IndexMismatch {
                        order_id: order_id.to_string(),
                        indexed: self.locations.get(order_id).map_or(-1, |p| p.ticks()),
                    });
                }
                indexed += 1;
            }
        }
        if indexed != self.locations.len() {
            // Some index entry points at an order no level holds
            let stale = self
                .locations
                .iter()
                .find(|(id, price)| self.levels.get(*price).map_or(true, |l| !l.contains(id)));
            if let Some((order_id, price)) = stale {
                return Err(InvariantViolation::IndexMismatch {
                    order_id: order_id.to_string(),
                    indexed: price.ticks(),
                });
            }
        }
        Ok(())
    }
}
