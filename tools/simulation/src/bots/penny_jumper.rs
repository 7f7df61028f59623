//! Penny jumper
//!
//! Keeps at most one bid and one ask, each one `mpi` inside the prevailing
//! quote, and pulls a quote as soon as it is no longer alone at the inside.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use types::ids::{OrderId, TraderId};
use types::market::TopOfBook;
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::TradeConfirmation;

use super::{Agent, QuoteSequence};

/// Orders from one penny jumper turn; cancels go to the engine first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JumpDecision {
    pub cancels: Vec<Order>,
    pub quotes: Vec<Order>,
}

impl JumpDecision {
    pub fn is_empty(&self) -> bool {
        self.cancels.is_empty() && self.quotes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PennyJumper {
    quotes: QuoteSequence,
    quantity: Quantity,
    mpi: i64,
    bid_quote: Option<Order>,
    ask_quote: Option<Order>,
    rng: ChaCha8Rng,
}

impl PennyJumper {
    pub fn new(trader: TraderId, quantity: u64, mpi: i64, seed: u64) -> Self {
        Self {
            quotes: QuoteSequence::new(trader),
            quantity: Quantity::new(quantity),
            mpi,
            bid_quote: None,
            ask_quote: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn bid_quote(&self) -> Option<&Order> {
        self.bid_quote.as_ref()
    }

    pub fn ask_quote(&self) -> Option<&Order> {
        self.ask_quote.as_ref()
    }

    /// With room inside the spread, jump the bid (probability `q_take`) or
    /// the ask; with a one-tick spread, only withdraw quotes that have
    /// company at the inside.
    pub fn process_signal(&mut self, timestamp: i64, signal: &TopOfBook, q_take: f64) -> JumpDecision {
        let mut decision = JumpDecision::default();
        let (Some(best_bid), Some(best_ask)) = (signal.best_bid, signal.best_ask) else {
            return decision;
        };

        if best_ask.ticks_from(best_bid) > self.mpi {
            if self.rng.gen::<f64>() < q_take {
                self.withdraw_bid(timestamp, signal, &mut decision);
                if self.bid_quote.is_none() {
                    let q = self.quotes.add(
                        timestamp,
                        Side::Buy,
                        self.quantity,
                        OrderPrice::limit(best_bid.ticks() + self.mpi),
                    );
                    self.bid_quote = Some(q.clone());
                    decision.quotes.push(q);
                }
            } else {
                self.withdraw_ask(timestamp, signal, &mut decision);
                if self.ask_quote.is_none() {
                    let q = self.quotes.add(
                        timestamp,
                        Side::Sell,
                        self.quantity,
                        OrderPrice::limit(best_ask.ticks() - self.mpi),
                    );
                    self.ask_quote = Some(q.clone());
                    decision.quotes.push(q);
                }
            }
        } else {
            self.withdraw_bid(timestamp, signal, &mut decision);
            self.withdraw_ask(timestamp, signal, &mut decision);
        }
        decision
    }

    /// Cancel the bid if it is behind the best bid or shares it
    fn withdraw_bid(&mut self, timestamp: i64, signal: &TopOfBook, decision: &mut JumpDecision) {
        let alone = match (&self.bid_quote, signal.best_bid) {
            (Some(q), Some(best)) => q.price.as_limit() >= Some(best) && q.quantity >= signal.bid_size,
            _ => true,
        };
        if !alone {
            if let Some(q) = self.bid_quote.take() {
                decision.cancels.push(q.to_cancel(timestamp));
            }
        }
    }

    /// Cancel the ask if it is behind the best ask or shares it
    fn withdraw_ask(&mut self, timestamp: i64, signal: &TopOfBook, decision: &mut JumpDecision) {
        let alone = match (&self.ask_quote, signal.best_ask) {
            (Some(q), Some(best)) => q.price.as_limit().is_some_and(|px| px <= best) && q.quantity >= signal.ask_size,
            _ => true,
        };
        if !alone {
            if let Some(q) = self.ask_quote.take() {
                decision.cancels.push(q.to_cancel(timestamp));
            }
        }
    }

    fn quote_mut(&mut self, order_id: &OrderId) -> Option<&mut Option<Order>> {
        if self.bid_quote.as_ref().is_some_and(|q| &q.order_id == order_id) {
            Some(&mut self.bid_quote)
        } else if self.ask_quote.as_ref().is_some_and(|q| &q.order_id == order_id) {
            Some(&mut self.ask_quote)
        } else {
            None
        }
    }
}

impl Agent for PennyJumper {
    fn trader_id(&self) -> &TraderId {
        self.quotes.trader()
    }

    /// Any fill retires the quote, partial or not
    fn confirm_trade_local(&mut self, confirm: &TradeConfirmation) {
        if let Some(slot) = self.quote_mut(&confirm.order_id) {
            *slot = None;
        }
    }

    fn reject_local(&mut self, order_id: &OrderId) {
        if let Some(slot) = self.quote_mut(order_id) {
            *slot = None;
        }
    }
}
