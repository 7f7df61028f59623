//! Results handed back to the driver after each processed order

use serde::{Deserialize, Serialize};
use types::numeric::Quantity;
use types::trade::{Confirmation, ModifyConfirmation, TradeConfirmation};

/// How an order was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Not marketable, rested at its limit
    DirectInsert,
    /// Traded against the opposite side
    Matching {
        filled: Quantity,
        /// Unfilled size left resting at the limit
        rested: Quantity,
        /// Unfilled market size thrown away
        discarded: Quantity,
    },
    /// Market order with nothing on the opposite side
    Discarded,
    Cancelled { removed: Quantity },
    Modified { removed: Quantity },
    /// Cancel or modify for an order that is not resting
    UnknownReference,
}

/// Output of one `process` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Confirmations in emission order; for each fill, resting party first
    pub confirmations: Vec<Confirmation>,
    /// True when at least one trade printed
    pub traded: bool,
    pub route: Route,
}

impl ProcessOutcome {
    pub(crate) fn new(route: Route) -> Self {
        Self {
            confirmations: Vec::new(),
            traded: false,
            route,
        }
    }

    pub fn trade_confirmations(&self) -> impl Iterator<Item = &TradeConfirmation> {
        self.confirmations.iter().filter_map(|c| match c {
            Confirmation::Trade(t) => Some(t),
            Confirmation::Modify(_) => None,
        })
    }

    pub fn modify_confirmations(&self) -> impl Iterator<Item = &ModifyConfirmation> {
        self.confirmations.iter().filter_map(|c| match c {
            Confirmation::Modify(m) => Some(m),
            Confirmation::Trade(_) => None,
        })
    }
}
