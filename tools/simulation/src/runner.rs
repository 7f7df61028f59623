//! Simulation driver
//!
//! Owns the engine and every agent. A run has three phases:
//!
//! 1. **Seed**: one bid and one ask from a reserved provider.
//! 2. **Prime**: ticks `1..prime1`, providers only, fixed `lambda`.
//! 3. **Main**: ticks `prime1..=run_steps`. Each tick all providers and
//!    market makers get a turn (quoting only when their arrival interval
//!    divides the tick, cancelling always), plus the takers and informed
//!    trader due that tick. Turn order is shuffled with the run RNG.
//!
//! Agents only see the snapshot held in `signal`, refreshed at fixed
//! points of each turn. Rejected orders cost the agent its turn and do
//! not stop the run.

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use matching_engine::{FlushMode, HistorySink, MatchingEngine, ProcessOutcome};
use persistence::{Columnar, TableStore};
use types::ids::{OrderId, TraderId};
use types::market::TopOfBook;
use types::numeric::Quantity;
use types::order::{Order, OrderPrice, Side};
use types::trade::Confirmation;

use crate::bots::{
    eligible_sizes, Agent, CashFlowRow, InformedTrader, MarketMaker, PennyJumper, Provider, ProviderPricing,
    QuoteGrid, Taker,
};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::tables::{CashFlowTable, SignalRow, SignalTable};

/// Trader id of the provider that owns the seed quotes
pub const SEED_TRADER: &str = "p999999";
/// Exchange id stamped on the seed quotes
pub const SEED_EXID: u64 = 99_999_999;

/// Where an agent lives inside the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentRef {
    Seed,
    Taker(usize),
    Provider(usize),
    MarketMaker(usize),
    Informed,
    PennyJumper,
}

/// One entry of a tick's shuffled turn order
#[derive(Debug, Clone, Copy)]
enum Turn {
    Provider { index: usize, quote: bool },
    MarketMaker { index: usize, quote: bool },
    Taker(usize),
    Informed,
}

/// Cash flow and position of one market maker at run end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMakerSummary {
    pub mmid: TraderId,
    pub cash_flow: i64,
    pub position: i64,
    pub fills: usize,
}

/// Counters and final state of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks: i64,
    pub orders_submitted: u64,
    pub orders_rejected: u64,
    pub cancels_confirmed: u64,
    pub trades: usize,
    pub traded_volume: u64,
    pub resting_bids: usize,
    pub resting_asks: usize,
    pub final_top_of_book: TopOfBook,
    pub market_makers: Vec<MarketMakerSummary>,
}

#[derive(Debug, Default)]
struct RunStats {
    orders_submitted: u64,
    orders_rejected: u64,
    cancels_confirmed: u64,
}

/// The `q_take` path and the `lambda_t` it implies
///
/// Two independent walks start at 0.5 and move `wn` toward each uniform
/// draw. The second is `q_take`; the first sets the scale against which
/// the deviation of `q_take` from 0.5 inflates `lambda_t`.
pub fn make_q_take<R: Rng>(rng: &mut R, steps: usize, wn: f64, c_lambda: f64, lambda0: f64) -> (Vec<f64>, Vec<f64>) {
    let walk = |rng: &mut R| {
        let mut path = Vec::with_capacity(steps);
        let mut q = 0.5;
        for _ in 0..steps {
            path.push(q);
            let noise = rng.gen::<f64>();
            if noise > q {
                q += wn;
            } else if noise < q {
                q -= wn;
            }
        }
        path
    };
    let scale_walk = walk(rng);
    let q_take = walk(rng);

    let rms = if scale_walk.is_empty() {
        0.0
    } else {
        (scale_walk.iter().map(|q| (q - 0.5).powi(2)).sum::<f64>() / scale_walk.len() as f64).sqrt()
    };
    let lambda_t = q_take
        .iter()
        .map(|q| {
            let deviation = if rms > 0.0 { (q - 0.5).abs() / rms } else { 0.0 };
            -lambda0 * (1.0 + deviation * c_lambda)
        })
        .collect();
    (q_take, lambda_t)
}

/// Ticks between arrivals: `floor(Exp(rate) + 1) * size`
///
/// Saturates at `i64::MAX` for vanishing rates; such an agent never acts.
fn arrival_interval<R: Rng>(rng: &mut R, rate: f64, size: u64) -> i64 {
    let draw = -(1.0 - rng.gen::<f64>()).ln() / rate;
    let ticks = (draw + 1.0).floor() as i64;
    ticks.saturating_mul(i64::try_from(size).unwrap_or(i64::MAX))
}

fn draw_size<R: Rng>(rng: &mut R, sizes: &[u64]) -> u64 {
    sizes.choose(rng).copied().unwrap_or(1)
}

pub struct Runner {
    config: SimConfig,
    rng: ChaCha8Rng,
    engine: MatchingEngine,
    seed_provider: Provider,
    takers: Vec<Taker>,
    taker_intervals: Vec<i64>,
    providers: Vec<Provider>,
    provider_intervals: Vec<i64>,
    market_makers: Vec<MarketMaker>,
    mm_interval: i64,
    informed: InformedTrader,
    penny_jumper: Option<PennyJumper>,
    directory: HashMap<TraderId, AgentRef>,
    q_take: Vec<f64>,
    lambda_t: Vec<f64>,
    signal: TopOfBook,
    stats: RunStats,
}

impl Runner {
    /// Build every agent and seed the book
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let engine = MatchingEngine::new(config.engine_config())?;

        let sizes = eligible_sizes(config.taker_maxq);
        let mut takers = Vec::with_capacity(config.num_takers);
        let mut taker_intervals = Vec::with_capacity(config.num_takers);
        for i in 0..config.num_takers {
            let size = draw_size(&mut rng, &sizes);
            taker_intervals.push(arrival_interval(&mut rng, config.mu, size));
            takers.push(Taker::new(TraderId::new(format!("t{i}")), size, rng.gen()));
        }

        let pricing = if config.mpi == 1 { ProviderPricing::Exact } else { ProviderPricing::Snap5 };
        let sizes = eligible_sizes(config.provider_maxq);
        let mut providers = Vec::with_capacity(config.num_providers);
        let mut provider_intervals = Vec::with_capacity(config.num_providers);
        for i in 0..config.num_providers {
            let size = draw_size(&mut rng, &sizes);
            provider_intervals.push(arrival_interval(&mut rng, config.alpha, size));
            providers.push(Provider::new(
                TraderId::new(format!("p{i}")),
                size,
                config.delta,
                pricing,
                rng.gen(),
            ));
        }

        let grid = if config.mpi == 1 { QuoteGrid::Uniform } else { QuoteGrid::Weighted5 };
        let sizes = eligible_sizes(config.mm_maxq);
        let market_makers = (0..config.num_mms)
            .map(|i| {
                let size = draw_size(&mut rng, &sizes);
                MarketMaker::new(
                    TraderId::new(format!("m{i}")),
                    size,
                    config.mpi,
                    config.mm_delta,
                    config.mm_quotes,
                    config.mm_quote_range,
                    grid,
                    rng.gen(),
                )
            })
            .collect::<Vec<_>>();

        let informed_size = draw_size(&mut rng, &eligible_sizes(config.informed_maxq));
        let informed = InformedTrader::new(
            TraderId::from("i0"),
            informed_size,
            config.informed_mu,
            config.informed_runlength,
            rng.gen(),
        );
        let penny_jumper = config
            .pj
            .then(|| PennyJumper::new(TraderId::from("j0"), 1, config.mpi, rng.gen()));

        let seed_provider = Provider::new(TraderId::from(SEED_TRADER), 1, 0.05, ProviderPricing::Snap5, rng.gen());

        let mut directory = HashMap::new();
        directory.insert(TraderId::from(SEED_TRADER), AgentRef::Seed);
        for (i, t) in takers.iter().enumerate() {
            directory.insert(t.trader_id().clone(), AgentRef::Taker(i));
        }
        for (i, p) in providers.iter().enumerate() {
            directory.insert(p.trader_id().clone(), AgentRef::Provider(i));
        }
        for (i, m) in market_makers.iter().enumerate() {
            directory.insert(m.trader_id().clone(), AgentRef::MarketMaker(i));
        }
        directory.insert(informed.trader_id().clone(), AgentRef::Informed);
        if let Some(pj) = &penny_jumper {
            directory.insert(pj.trader_id().clone(), AgentRef::PennyJumper);
        }

        let steps = config.run_steps as usize + 1;
        let (q_take, lambda_t) = make_q_take(&mut rng, steps, config.wn, config.c_lambda, config.lambda0);

        info!(
            seed = config.seed,
            takers = takers.len(),
            providers = providers.len(),
            market_makers = market_makers.len(),
            informed_side = %informed.side(),
            penny_jumper = penny_jumper.is_some(),
            "simulation configured"
        );

        let mut runner = Self {
            mm_interval: config.mm_maxq as i64,
            config,
            rng,
            engine,
            seed_provider,
            takers,
            taker_intervals,
            providers,
            provider_intervals,
            market_makers,
            informed,
            penny_jumper,
            directory,
            q_take,
            lambda_t,
            signal: TopOfBook::empty(0),
            stats: RunStats::default(),
        };
        runner.seed_book()?;
        Ok(runner)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn market_makers(&self) -> &[MarketMaker] {
        &self.market_makers
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn informed(&self) -> &InformedTrader {
        &self.informed
    }

    pub fn penny_jumper(&self) -> Option<&PennyJumper> {
        self.penny_jumper.as_ref()
    }

    /// The snapshot agents currently act on
    pub fn signal(&self) -> &TopOfBook {
        &self.signal
    }

    pub fn q_take(&self) -> &[f64] {
        &self.q_take
    }

    pub fn lambda_t(&self) -> &[f64] {
        &self.lambda_t
    }

    /// One bid and one ask around 1,000,000 on the 5-tick grid
    fn seed_book(&mut self) -> Result<(), SimError> {
        let asks: Vec<i64> = (1_000_005..1_002_001).step_by(5).collect();
        let bids: Vec<i64> = (997_995..999_996).step_by(5).collect();
        let ask = asks.choose(&mut self.rng).copied().unwrap_or(1_000_005);
        let bid = bids.choose(&mut self.rng).copied().unwrap_or(999_995);

        for (suffix, side, price) in [("a", Side::Sell, ask), ("b", Side::Buy, bid)] {
            let order = Order::add(
                OrderId::from_raw(format!("{SEED_TRADER}_{suffix}")),
                0,
                side,
                Quantity::new(1),
                OrderPrice::limit(price),
            )
            .with_exid(SEED_EXID);
            self.engine.seed_order(&order)?;
            self.seed_provider.adopt(order);
        }
        debug!(bid, ask, "book seeded");
        Ok(())
    }

    /// Run both phases, exporting history to `sink`
    pub fn run<S>(&mut self, sink: &mut S) -> Result<RunSummary, SimError>
    where
        S: HistorySink,
        SimError: From<S::Error>,
    {
        self.prime();
        self.main_loop(sink)?;

        self.engine.flush_orders(sink, FlushMode::Clear)?;
        self.engine.flush_top_of_book(sink, FlushMode::Clear)?;
        self.engine.flush_trades(sink, FlushMode::Retain)?;

        let summary = self.summary();
        info!(
            ticks = summary.ticks,
            orders = summary.orders_submitted,
            rejected = summary.orders_rejected,
            trades = summary.trades,
            volume = summary.traded_volume,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Provider-only warm-up with `lambda = -lambda0`
    fn prime(&mut self) {
        self.signal = self.engine.report_top_of_book(0).clone();
        let lambda = -self.config.lambda0;
        for t in 1..self.config.prime1 {
            let mut due: Vec<usize> = (0..self.providers.len())
                .filter(|&i| t % self.provider_intervals[i] == 0)
                .collect();
            due.shuffle(&mut self.rng);
            for i in due {
                let quote = self.providers[i].process_signal(t, &self.signal, self.config.q_provide, lambda);
                if let Some(order) = quote {
                    self.submit(AgentRef::Provider(i), &order);
                    self.refresh_signal();
                }
            }
        }
        debug!(orders = self.stats.orders_submitted, "priming done");
    }

    fn main_loop<S>(&mut self, sink: &mut S) -> Result<(), SimError>
    where
        S: HistorySink,
        SimError: From<S::Error>,
    {
        self.signal = self.engine.report_top_of_book(self.config.prime1).clone();
        for t in self.config.prime1..=self.config.run_steps {
            for turn in self.turn_order(t) {
                match turn {
                    Turn::Provider { index, quote } => self.provider_turn(index, quote, t),
                    Turn::MarketMaker { index, quote } => self.market_maker_turn(index, quote, t),
                    Turn::Taker(index) => {
                        let order = self.takers[index].process_signal(t, self.q_take[t as usize]);
                        self.take(AgentRef::Taker(index), &order);
                    }
                    Turn::Informed => {
                        let order = self.informed.process_signal(t);
                        self.take(AgentRef::Informed, &order);
                    }
                }
                if self.penny_jumper.is_some() && self.rng.gen::<f64>() < self.config.alpha_pj {
                    self.penny_jumper_turn(t);
                }
            }

            if t % self.config.export_interval == 0 {
                let orders = self.engine.flush_orders(sink, FlushMode::Clear)?;
                let snapshots = self.engine.flush_top_of_book(sink, FlushMode::Clear)?;
                debug!(tick = t, orders, snapshots, "periodic export");
            }
        }
        Ok(())
    }

    /// Everyone acting at tick `t`, shuffled
    fn turn_order(&mut self, t: i64) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.providers.len() + self.market_makers.len() + 4);
        for (index, interval) in self.provider_intervals.iter().enumerate() {
            turns.push(Turn::Provider {
                index,
                quote: t % interval == 0,
            });
        }
        for index in 0..self.market_makers.len() {
            turns.push(Turn::MarketMaker {
                index,
                quote: t % self.mm_interval == 0,
            });
        }
        for (index, interval) in self.taker_intervals.iter().enumerate() {
            if t % interval == 0 {
                turns.push(Turn::Taker(index));
            }
        }
        if self.informed.is_scheduled(t) {
            turns.push(Turn::Informed);
        }
        turns.shuffle(&mut self.rng);
        turns
    }

    fn provider_turn(&mut self, index: usize, quote: bool, t: i64) {
        if quote {
            let lambda = self.lambda_t[t as usize];
            if let Some(order) = self.providers[index].process_signal(t, &self.signal, self.config.q_provide, lambda) {
                self.submit(AgentRef::Provider(index), &order);
                self.refresh_signal();
            }
        }
        let cancels = self.providers[index].bulk_cancel(t);
        self.submit_cancels(AgentRef::Provider(index), &cancels);
    }

    fn market_maker_turn(&mut self, index: usize, quote: bool, t: i64) {
        if quote {
            let quotes = self.market_makers[index].process_signal(t, &self.signal, self.config.q_provide);
            for order in &quotes {
                self.submit(AgentRef::MarketMaker(index), order);
            }
            self.refresh_signal();
        }
        let cancels = self.market_makers[index].bulk_cancel(t);
        self.submit_cancels(AgentRef::MarketMaker(index), &cancels);
    }

    /// Submit a market order; the signal only moves if it traded
    fn take(&mut self, owner: AgentRef, order: &Order) {
        if let Some(outcome) = self.submit(owner, order) {
            if outcome.traded {
                self.refresh_signal();
            }
        }
    }

    fn penny_jumper_turn(&mut self, t: i64) {
        let q_take = self.q_take[t as usize];
        let decision = match self.penny_jumper.as_mut() {
            Some(pj) => pj.process_signal(t, &self.signal, q_take),
            None => return,
        };
        for order in decision.cancels.iter().chain(&decision.quotes) {
            self.submit(AgentRef::PennyJumper, order);
        }
        self.refresh_signal();
    }

    fn submit_cancels(&mut self, owner: AgentRef, cancels: &[Order]) {
        if cancels.is_empty() {
            return;
        }
        for cancel in cancels {
            self.submit(owner, cancel);
        }
        self.refresh_signal();
    }

    /// Process one order and route every confirmation it produced
    ///
    /// A rejected order is handed back to its owner and yields `None`.
    fn submit(&mut self, owner: AgentRef, order: &Order) -> Option<ProcessOutcome> {
        self.stats.orders_submitted += 1;
        match self.engine.process(order) {
            Ok(outcome) => {
                self.route(&outcome);
                Some(outcome)
            }
            Err(err) => {
                self.stats.orders_rejected += 1;
                warn!(order_id = %order.order_id, error = %err, "agent order rejected");
                if let Some(agent) = self.agent_mut(owner) {
                    agent.reject_local(&order.order_id);
                }
                None
            }
        }
    }

    fn route(&mut self, outcome: &ProcessOutcome) {
        for confirmation in &outcome.confirmations {
            let Some(owner) = self.directory.get(confirmation.trader()).copied() else {
                warn!(order_id = %confirmation.order_id(), "confirmation for unknown trader");
                continue;
            };
            let Some(agent) = self.agent_mut(owner) else {
                continue;
            };
            match confirmation {
                Confirmation::Trade(fill) => agent.confirm_trade_local(fill),
                Confirmation::Modify(cancel) => {
                    agent.confirm_cancel_local(cancel);
                    self.stats.cancels_confirmed += 1;
                }
            }
        }
    }

    fn agent_mut(&mut self, owner: AgentRef) -> Option<&mut dyn Agent> {
        match owner {
            AgentRef::Seed => Some(&mut self.seed_provider),
            AgentRef::Taker(i) => self.takers.get_mut(i).map(|a| a as &mut dyn Agent),
            AgentRef::Provider(i) => self.providers.get_mut(i).map(|a| a as &mut dyn Agent),
            AgentRef::MarketMaker(i) => self.market_makers.get_mut(i).map(|a| a as &mut dyn Agent),
            AgentRef::Informed => Some(&mut self.informed),
            AgentRef::PennyJumper => self.penny_jumper.as_mut().map(|a| a as &mut dyn Agent),
        }
    }

    fn refresh_signal(&mut self) {
        self.signal = self.engine.top_of_book().clone();
    }

    /// Cash-flow rows of every market maker, in market maker order
    pub fn cash_flow_rows(&self) -> Vec<CashFlowRow> {
        self.market_makers
            .iter()
            .flat_map(|m| m.cash_flow_rows().iter().cloned())
            .collect()
    }

    /// `q_take` and `lambda_t` per tick
    pub fn signal_rows(&self) -> Vec<SignalRow> {
        self.q_take
            .iter()
            .zip(&self.lambda_t)
            .enumerate()
            .map(|(step, (q_take, lambda_t))| SignalRow {
                step: step as i64,
                q_take: *q_take,
                lambda_t: *lambda_t,
            })
            .collect()
    }

    /// Write the `qtl` and `mmp` tables
    pub fn export_run_tables(&self, store: &mut TableStore) -> Result<(), SimError> {
        store.write_table(&SignalTable::from_rows(&self.signal_rows()))?;
        store.write_table(&CashFlowTable::from_rows(&self.cash_flow_rows()))?;
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        let trades = self.engine.ledger().trades();
        RunSummary {
            seed: self.config.seed,
            ticks: self.config.run_steps,
            orders_submitted: self.stats.orders_submitted,
            orders_rejected: self.stats.orders_rejected,
            cancels_confirmed: self.stats.cancels_confirmed,
            trades: trades.len(),
            traded_volume: trades.iter().map(|t| t.quantity.units()).sum(),
            resting_bids: self.engine.book().bids().order_count(),
            resting_asks: self.engine.book().asks().order_count(),
            final_top_of_book: self.engine.top_of_book().clone(),
            market_makers: self
                .market_makers
                .iter()
                .map(|m| MarketMakerSummary {
                    mmid: m.trader_id().clone(),
                    cash_flow: m.cash_flow(),
                    position: m.position(),
                    fills: m.cash_flow_rows().len(),
                })
                .collect(),
        }
    }
}

/// Run a config end to end, writing every table under `output_dir`
pub fn run_to_directory(config: SimConfig) -> Result<RunSummary, SimError> {
    let mut store = TableStore::open(config.output_dir.clone())?.with_compression_level(config.compression_level);
    let mut runner = Runner::new(config)?;
    let summary = runner.run(&mut store)?;
    runner.export_run_tables(&mut store)?;
    info!(root = %store.root().display(), run_id = %store.run_id(), "tables exported");
    Ok(summary)
}
