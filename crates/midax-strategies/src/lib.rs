//! Trading models for the Midax engine.
//!
//! This crate provides:
//! - MacD: crossover of a fast and a slow time-weighted average
//! - MacD cascade: crossover of slower averages, gated by volatility
//! - Levels: session pivots and the daily mean, published without trading
//!
//! Models are built into a [`Network`](midax_engine::Network) through the
//! [`ModelRegistry`].

mod cascade;
mod crossover;
mod levels;
mod macd;
mod registry;

pub use cascade::{build_cascade, CascadeConfig, CascadeSignal};
pub use crossover::Crossover;
pub use levels::{build_levels, LevelsConfig};
pub use macd::{build_macd, MacdConfig, MacdSignal};
pub use registry::{ModelInfo, ModelRegistry};

use midax_core::error::{GraphError, StrategyError};
use midax_core::{MarketData, MarketId};
use midax_engine::Network;

/// Validation for model parameters.
pub trait ModelConfig {
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Average indicator name, e.g. `WMA_10_IX.D.DAX.DAILY.IP`.
pub fn average_name(prefix: &str, minutes: i64, instrument: &str) -> String {
    format!("{}_{}_{}", prefix, minutes, instrument)
}

/// Look up an instrument, registering it from its descriptor if needed.
///
/// Descriptors are `Name:ID` or a bare id.
pub(crate) fn ensure_market(network: &mut Network, descriptor: &str) -> Result<MarketId, GraphError> {
    let market = MarketData::from_descriptor(descriptor);
    match network.market_id(&market.id) {
        Ok(id) => Ok(id),
        Err(_) => network.add_market(market),
    }
}
