//! `zi-sim`: run one simulation and export its tables
//!
//! Usage: `zi-sim [config.json]`. Without a path the default
//! parameterisation is used. Log level follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::Context;
use simulation::{run_to_directory, SimConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::from_json_file(&PathBuf::from(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => SimConfig::default(),
    };

    tracing::info!(version = simulation::VERSION, output = %config.output_dir.display(), "Starting zi-sim");
    let summary = run_to_directory(config).context("simulation run failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
