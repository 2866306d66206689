//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogFormat;
use crate::{EstimatorConfig, EstimatorError, Result};

/// Installs a global subscriber filtered by `config.log_level`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &EstimatorConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| EstimatorError::Config(format!("RUST_LOG: {e}")))?;

    let (json, text) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| EstimatorError::Config(format!("tracing already initialised: {e}")))
}
