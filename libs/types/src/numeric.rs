//! Integer tick prices and quantities
//!
//! Prices are tick-denominated signed integers, quantities are whole units.
//! No floating point ever touches book state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Price in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(&self) -> i64 {
        self.0
    }

    /// Shift by a signed number of ticks
    pub fn offset(&self, ticks: i64) -> Self {
        Self(self.0 + ticks)
    }

    /// Signed distance `self - other` in ticks
    pub fn ticks_from(&self, other: Price) -> i64 {
        self.0 - other.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Price {
    fn from(ticks: i64) -> Self {
        Self(ticks)
    }
}

/// Order or level size in whole units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtraction that returns `None` instead of wrapping below zero
    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
    }

    pub fn saturating_sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_sub(rhs.0))
    }

    /// Addition that returns `None` instead of wrapping past `u64::MAX`
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    pub fn saturating_add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Quantity {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

/// Panics on overflow in every build; book code adds through `checked_add`.
impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.checked_add(rhs.0).expect("quantity overflow"))
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        *self = *self + rhs;
    }
}

/// Panics on underflow; book code must only subtract what it holds.
impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(
            self.0
                .checked_sub(rhs.0)
                .expect("quantity underflow"),
        )
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        *self = *self - rhs;
    }
}

/// Saturates at `u64::MAX`
impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, Quantity::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_ordering() {
        assert!(Price::new(50) < Price::new(52));
        assert_eq!(Price::new(50).offset(5), Price::new(55));
        assert_eq!(Price::new(52).ticks_from(Price::new(50)), 2);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let a = Quantity::new(5);
        let b = Quantity::new(3);
        assert_eq!(a - b, Quantity::new(2));
        assert_eq!(a + b, Quantity::new(8));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), Quantity::ZERO);
    }

    #[test]
    fn test_quantity_sum() {
        let total: Quantity = [1u64, 2, 3].into_iter().map(Quantity::new).sum();
        assert_eq!(total, Quantity::new(6));
    }

    #[test]
    fn test_quantity_checked_add() {
        let max = Quantity::new(u64::MAX);
        assert_eq!(max.checked_add(Quantity::new(1)), None);
        assert_eq!(max.saturating_add(Quantity::new(1)), max);
        assert_eq!(Quantity::new(2).checked_add(Quantity::new(3)), Some(Quantity::new(5)));
        let total: Quantity = [u64::MAX, 4].into_iter().map(Quantity::new).sum();
        assert_eq!(total, max);
    }

    #[test]
    #[should_panic(expected = "quantity overflow")]
    fn test_quantity_overflow_panics() {
        let _ = Quantity::new(u64::MAX) + Quantity::new(1);
    }

    #[test]
    #[should_panic(expected = "quantity underflow")]
    fn test_quantity_underflow_panics() {
        let _ = Quantity::new(1) - Quantity::new(2);
    }
}
