//! Simulation error type

use std::convert::Infallible;
use std::path::PathBuf;
use thiserror::Error;
use types::errors::EngineError;

use persistence::TableError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid simulation config: {0}")]
    Config(String),

    #[error("failed to read config {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("table export failed: {0}")]
    Export(#[from] TableError),
}

impl From<Infallible> for SimError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
