//! Run configuration
//!
//! Every knob of a simulation run. Defaults reproduce the reference
//! parameterisation: 50 takers, 38 providers, one market maker and one
//! informed trader on a 5-tick grid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use matching_engine::EngineConfig;
use persistence::segment::DEFAULT_COMPRESSION_LEVEL;

use crate::error::SimError;

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed; every agent RNG is derived from it
    pub seed: u64,
    /// Ticks of provider-only priming before the main loop
    pub prime1: i64,
    /// Last tick of the main loop (inclusive)
    pub run_steps: i64,
    /// Minimum price increment
    pub mpi: i64,

    pub num_takers: usize,
    pub taker_maxq: u64,
    /// Taker arrival rate
    pub mu: f64,

    pub num_providers: usize,
    pub provider_maxq: u64,
    /// Provider arrival rate
    pub alpha: f64,
    /// Per-order cancel probability of providers
    pub delta: f64,
    /// Probability that a provider or market maker quotes the bid
    pub q_provide: f64,
    /// Base scale of the provider price offset distribution
    pub lambda0: f64,
    /// Step size of the `q_take` random walk
    pub wn: f64,
    /// Sensitivity of `lambda_t` to `q_take` deviating from 0.5
    pub c_lambda: f64,

    pub num_mms: usize,
    /// Market maker order size; market makers act every `mm_maxq` ticks
    pub mm_maxq: u64,
    pub mm_quotes: usize,
    pub mm_quote_range: i64,
    pub mm_delta: f64,

    pub informed_maxq: u64,
    /// Consecutive ticks per informed burst
    pub informed_runlength: i64,
    /// Number of informed bursts
    pub informed_mu: usize,

    /// Enable the penny jumper
    pub pj: bool,
    /// Per-turn probability that the penny jumper acts
    pub alpha_pj: f64,

    /// Snapshots averaged into the lag fields
    pub lag_window: usize,
    /// Ticks between `orders`/`tob` exports
    pub export_interval: i64,
    /// Root directory of the exported tables
    pub output_dir: PathBuf,
    /// zstd level of the exported segments
    pub compression_level: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 17,
            prime1: 20,
            run_steps: 100,
            mpi: 5,
            num_takers: 50,
            taker_maxq: 1,
            mu: 0.001,
            num_providers: 38,
            provider_maxq: 1,
            alpha: 0.0375,
            delta: 0.025,
            q_provide: 0.5,
            lambda0: 100.0,
            wn: 0.001,
            c_lambda: 1.0,
            num_mms: 1,
            mm_maxq: 1,
            mm_quotes: 12,
            mm_quote_range: 60,
            mm_delta: 0.025,
            informed_maxq: 1,
            informed_runlength: 1,
            informed_mu: 10,
            pj: false,
            alpha_pj: 0.0,
            lag_window: 5,
            export_interval: 2000,
            output_dir: PathBuf::from("zi-output"),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl SimConfig {
    /// Load a JSON config; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            lag_window: self.lag_window,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        fn bad(reason: String) -> Result<(), SimError> {
            Err(SimError::Config(reason))
        }

        if self.prime1 < 1 {
            return bad(format!("prime1 must be at least 1, got {}", self.prime1));
        }
        if self.run_steps < self.prime1 {
            return bad(format!(
                "run_steps ({}) must not be below prime1 ({})",
                self.run_steps, self.prime1
            ));
        }
        if self.mpi < 1 {
            return bad(format!("mpi must be at least 1, got {}", self.mpi));
        }
        for (name, maxq) in [
            ("taker_maxq", self.taker_maxq),
            ("provider_maxq", self.provider_maxq),
            ("mm_maxq", self.mm_maxq),
            ("informed_maxq", self.informed_maxq),
        ] {
            if maxq < 1 {
                return bad(format!("{name} must be at least 1"));
            }
        }
        for (name, p) in [
            ("delta", self.delta),
            ("mm_delta", self.mm_delta),
            ("q_provide", self.q_provide),
            ("alpha_pj", self.alpha_pj),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return bad(format!("{name} must be a probability, got {p}"));
            }
        }
        for (name, rate) in [("mu", self.mu), ("alpha", self.alpha)] {
            if !(rate > 0.0 && rate.is_finite()) {
                return bad(format!("{name} must be a positive rate, got {rate}"));
            }
        }
        if self.lambda0 < 0.0 || self.wn < 0.0 || self.c_lambda < 0.0 {
            return bad("lambda0, wn and c_lambda must be non-negative".to_string());
        }
        if self.num_mms > 0 && (self.mm_quotes == 0 || self.mm_quote_range < 1) {
            return bad("market makers need mm_quotes >= 1 and mm_quote_range >= 1".to_string());
        }
        if self.informed_runlength < 1 {
            return bad(format!(
                "informed_runlength must be at least 1, got {}",
                self.informed_runlength
            ));
        }
        if self.export_interval < 1 {
            return bad(format!("export_interval must be at least 1, got {}", self.export_interval));
        }
        if !(1..=22).contains(&self.compression_level) {
            return bad(format!(
                "compression_level must be within 1..=22, got {}",
                self.compression_level
            ));
        }
        self.engine_config().validate()?;
        Ok(())
    }
}
