//! Liquidity provider
//!
//! Posts one limit order per arrival at a random distance behind the
//! opposite inside price, and randomly cancels what it has outstanding.
//!
//! The distance is `plug = trunc(lambda_t * ln(U))`, `U ~ U(0, 1]`. With
//! a negative `lambda_t` this is an exponential draw with mean `|lambda_t|`,
//! so quotes bunch up near the inside and thin out with distance.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use types::ids::{OrderId, TraderId};
use types::market::TopOfBook;
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::{ModifyConfirmation, TradeConfirmation};

use super::{Agent, LocalBook, QuoteSequence};

/// How a provider turns a raw price into a quote price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPricing {
    /// Any integer tick
    Exact,
    /// Bids rounded down and asks rounded up to a multiple of 5
    Snap5,
}

impl ProviderPricing {
    fn bid(self, raw: i64) -> i64 {
        match self {
            ProviderPricing::Exact => raw,
            ProviderPricing::Snap5 => raw.div_euclid(5) * 5,
        }
    }

    fn ask(self, raw: i64) -> i64 {
        match self {
            ProviderPricing::Exact => raw,
            ProviderPricing::Snap5 => -(-raw).div_euclid(5) * 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Provider {
    quotes: QuoteSequence,
    quantity: Quantity,
    /// Per-order cancel probability
    delta: f64,
    pricing: ProviderPricing,
    local_book: LocalBook,
    rng: ChaCha8Rng,
}

impl Provider {
    pub fn new(trader: TraderId, quantity: u64, delta: f64, pricing: ProviderPricing, seed: u64) -> Self {
        Self {
            quotes: QuoteSequence::new(trader),
            quantity: Quantity::new(quantity),
            delta,
            pricing,
            local_book: LocalBook::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn pricing(&self) -> ProviderPricing {
        self.pricing
    }

    pub fn local_book(&self) -> &LocalBook {
        &self.local_book
    }

    /// Track an order placed on this provider's behalf (seed quotes)
    pub fn adopt(&mut self, order: Order) {
        self.local_book.insert(order);
    }

    /// Bid with probability `q_provide`, otherwise offer
    ///
    /// Bids are priced off the best ask and offers off the best bid; with
    /// that side of the book empty there is nothing to price from and no
    /// order is made.
    pub fn process_signal(
        &mut self,
        timestamp: i64,
        signal: &TopOfBook,
        q_provide: f64,
        lambda_t: f64,
    ) -> Option<Order> {
        let side = if self.rng.gen::<f64>() < q_provide { Side::Buy } else { Side::Sell };
        let inside = match side {
            Side::Buy => signal.best_ask?,
            Side::Sell => signal.best_bid?,
        };
        let plug = (lambda_t * (1.0 - self.rng.gen::<f64>()).ln()).trunc() as i64;
        let price = match side {
            Side::Buy => self.pricing.bid(inside.ticks() - 1 - plug),
            Side::Sell => self.pricing.ask(inside.ticks() + 1 + plug),
        };
        let order = self.quotes.add(timestamp, side, self.quantity, OrderPrice::limit(price));
        self.local_book.insert(order.clone());
        Some(order)
    }

    /// Cancel messages for roughly `delta` of the outstanding orders
    pub fn bulk_cancel(&mut self, timestamp: i64) -> Vec<Order> {
        self.local_book.cancel_candidates(&mut self.rng, self.delta, timestamp)
    }
}

impl Agent for Provider {
    fn trader_id(&self) -> &TraderId {
        self.quotes.trader()
    }

    fn confirm_trade_local(&mut self, confirm: &TradeConfirmation) {
        self.local_book.apply_fill(confirm);
    }

    fn confirm_cancel_local(&mut self, confirm: &ModifyConfirmation) {
        self.local_book.remove(&confirm.order_id);
    }

    fn reject_local(&mut self, order_id: &OrderId) {
        self.local_book.remove(order_id);
    }
}
