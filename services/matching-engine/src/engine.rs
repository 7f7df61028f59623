//! Matching engine core
//!
//! Main coordinator for the book, matching, analytics and history. Orders
//! are processed strictly one at a time; each call to [`MatchingEngine::process`]
//! applies every book mutation it causes before the top-of-book refresh.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::{EngineError, OrderError};
use types::market::TopOfBook;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderPrice, OrderType, Side};
use types::trade::{Confirmation, ModifyConfirmation};

use crate::book::{OrderBook, PriceLevel, RestingOrder};
use crate::events::{ProcessOutcome, Route};
use crate::ledger::{FlushMode, HistoryLedger, HistorySink};
use crate::matching::{crossing, MatchExecutor};
use crate::top_of_book::TopOfBookTracker;

/// Engine construction parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of prior snapshots averaged into the lag fields
    pub lag_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { lag_window: 5 }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lag_window == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "lag_window must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Main matching engine
#[derive(Debug)]
pub struct MatchingEngine {
    config: EngineConfig,
    book: OrderBook,
    executor: MatchExecutor,
    ledger: HistoryLedger,
    top: TopOfBookTracker,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        info!(lag_window = config.lag_window, "matching engine created");
        Ok(Self {
            top: TopOfBookTracker::new(config.lag_window),
            config,
            book: OrderBook::new(),
            executor: MatchExecutor::new(),
            ledger: HistoryLedger::new(),
        })
    }

    /// Process one order message
    ///
    /// The order is logged before anything else. A rejected order is
    /// reported as an error and leaves the book and the snapshot untouched.
    pub fn process(&mut self, order: &Order) -> Result<ProcessOutcome, EngineError> {
        self.ledger.record_order(order);
        if let Err(err) = self.admit(order) {
            warn!(order_id = %order.order_id, error = %err, "order rejected");
            return Err(err.into());
        }

        let outcome = match order.order_type {
            OrderType::Add => self.add(order)?,
            OrderType::Cancel => self.cancel(order),
            OrderType::Modify => self.modify(order),
        };
        debug!(
            order_id = %order.order_id,
            order_type = %order.order_type,
            route = ?outcome.route,
            traded = outcome.traded,
            "order processed"
        );

        self.debug_check();
        self.report_top_of_book(order.timestamp);
        Ok(outcome)
    }

    /// Rest a limit order without matching, used to prime an empty book
    ///
    /// No snapshot is taken; call [`Self::report_top_of_book`] afterwards.
    pub fn seed_order(&mut self, order: &Order) -> Result<(), EngineError> {
        self.ledger.record_order(order);
        self.admit(order)?;
        if order.order_type != OrderType::Add {
            return Err(OrderError::UnknownType(format!("{} cannot seed the book", order.order_type)).into());
        }
        let price = order.price.as_limit().ok_or_else(|| OrderError::MarketOrderCannotRest {
            order_id: order.order_id.to_string(),
        })?;
        let best_opposite = self.book.side(order.side.opposite()).best_price();
        if crossing::is_marketable(order.side, order.price, best_opposite) {
            return Err(OrderError::SeedWouldCross {
                order_id: order.order_id.to_string(),
            }
            .into());
        }
        self.rest(order, price, order.quantity)?;
        debug!(order_id = %order.order_id, price = %price, "seed order rested");
        self.debug_check();
        Ok(())
    }

    /// Refresh the snapshot from the current book and log it
    pub fn report_top_of_book(&mut self, timestamp: i64) -> &TopOfBook {
        let snapshot = self.top.refresh(&self.book, timestamp).clone();
        self.ledger.record_top_of_book(snapshot);
        self.top.latest()
    }

    /// The latest snapshot handed to agents
    pub fn top_of_book(&self) -> &TopOfBook {
        self.top.latest()
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    pub fn level(&self, side: Side, price: Price) -> Option<&PriceLevel> {
        self.book.side(side).level(price)
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Total fills executed since construction
    pub fn fill_count(&self) -> u64 {
        self.executor.fill_count()
    }

    pub fn verify_invariants(&self) -> Result<(), EngineError> {
        self.book.verify_invariants().map_err(EngineError::from)
    }

    pub fn flush_orders<S: HistorySink>(&mut self, sink: &mut S, mode: FlushMode) -> Result<usize, S::Error> {
        self.ledger.flush_orders(sink, mode)
    }

    pub fn flush_trades<S: HistorySink>(&mut self, sink: &mut S, mode: FlushMode) -> Result<usize, S::Error> {
        self.ledger.flush_trades(sink, mode)
    }

    pub fn flush_top_of_book<S: HistorySink>(&mut self, sink: &mut S, mode: FlushMode) -> Result<usize, S::Error> {
        self.ledger.flush_top_of_book(sink, mode)
    }

    /// Checks that need no mutation: field validity and duplicate adds
    fn admit(&self, order: &Order) -> Result<(), OrderError> {
        order.validate()?;
        if order.order_type != OrderType::Add {
            return Ok(());
        }
        if self.book.bids().contains(&order.order_id) || self.book.asks().contains(&order.order_id) {
            return Err(OrderError::DuplicateOrderId {
                order_id: order.order_id.to_string(),
            });
        }
        // Matching only drains the opposite side, so the own-side level is final here
        if let OrderPrice::Limit(price) = order.price {
            let resting = self.book.side(order.side).level(price).map_or(Quantity::ZERO, PriceLevel::size);
            if resting.checked_add(order.quantity).is_none() {
                return Err(OrderError::LevelSizeOverflow { price: price.ticks() });
            }
        }
        Ok(())
    }

    fn add(&mut self, order: &Order) -> Result<ProcessOutcome, EngineError> {
        let opposite = order.side.opposite();
        let best_opposite = self.book.side(opposite).best_price();

        if !crossing::is_marketable(order.side, order.price, best_opposite) {
            return match order.price {
                OrderPrice::Limit(price) => {
                    self.rest(order, price, order.quantity)?;
                    Ok(ProcessOutcome::new(Route::DirectInsert))
                }
                OrderPrice::Market => {
                    debug!(order_id = %order.order_id, "market order with empty opposite side discarded");
                    Ok(ProcessOutcome::new(Route::Discarded))
                }
            };
        }

        let mut confirmations = Vec::new();
        let mut remaining = order.quantity;
        while !remaining.is_zero() {
            match self.book.side(opposite).best_price() {
                Some(best) if order.price.accepts(order.side, best) => {}
                _ => break,
            }
            let Some(fill) = self.book.side_mut(opposite).fill_best(remaining) else {
                break;
            };
            remaining -= fill.filled;
            let execution = self.executor.execute(&fill.resting, order, fill.filled, order.timestamp);
            debug!(
                resting = %fill.resting.order_id,
                incoming = %order.order_id,
                price = %execution.trade.price,
                quantity = %fill.filled,
                "fill"
            );
            self.ledger.record_trade(execution.trade);
            confirmations.extend(execution.confirmations);
        }

        let filled = order.quantity - remaining;
        let (rested, discarded) = match (order.price, remaining.is_zero()) {
            (_, true) => (Quantity::ZERO, Quantity::ZERO),
            (OrderPrice::Limit(price), false) => {
                self.rest(order, price, remaining)?;
                (remaining, Quantity::ZERO)
            }
            (OrderPrice::Market, false) => {
                debug!(order_id = %order.order_id, discarded = %remaining, "market remainder discarded");
                (Quantity::ZERO, remaining)
            }
        };

        Ok(ProcessOutcome {
            traded: !filled.is_zero(),
            confirmations,
            route: Route::Matching { filled, rested, discarded },
        })
    }

    fn cancel(&mut self, order: &Order) -> ProcessOutcome {
        match self.book.side_mut(order.side).cancel(&order.order_id) {
            Some(removed) => {
                let mut outcome = ProcessOutcome::new(Route::Cancelled { removed: removed.quantity });
                outcome.confirmations.push(Confirmation::Modify(ModifyConfirmation::new(
                    order.timestamp,
                    order.order_id.clone(),
                    removed.quantity,
                    order.side,
                )));
                outcome
            }
            None => {
                debug!(order_id = %order.order_id, "cancel for unknown order ignored");
                ProcessOutcome::new(Route::UnknownReference)
            }
        }
    }

    fn modify(&mut self, order: &Order) -> ProcessOutcome {
        match self.book.side_mut(order.side).reduce(&order.order_id, order.quantity) {
            Some((_, reduction)) => {
                let mut outcome = ProcessOutcome::new(Route::Modified { removed: reduction.removed });
                outcome.confirmations.push(Confirmation::Modify(ModifyConfirmation::new(
                    order.timestamp,
                    order.order_id.clone(),
                    reduction.removed,
                    order.side,
                )));
                outcome
            }
            None => {
                debug!(order_id = %order.order_id, "modify for unknown order ignored");
                ProcessOutcome::new(Route::UnknownReference)
            }
        }
    }

    fn rest(&mut self, order: &Order, price: Price, quantity: Quantity) -> Result<(), OrderError> {
        self.book
            .side_mut(order.side)
            .add(RestingOrder::from_order(order, price, quantity))
    }

    /// Aborts in debug builds if price-time priority can no longer be trusted
    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.book.verify_invariants() {
                panic!("book invariant violated: {violation}");
            }
        }
    }
}
