//! Indicator/signal graph for the Midax engine.
//!
//! - [`Network`]: markets, indicators and signals wired through ordered
//!   subscriber registries, with synchronous depth-first tick propagation
//! - [`Signal`] and the [`SignalLogic`] seam for strategy decisions
//! - [`Model`]: a strategy's start/stop lifecycle

pub mod model;
pub mod network;
pub mod signal;

pub use model::{Model, TradeActions};
pub use network::{GraphView, IndicatorNode, Network, SignalFailure, TickOutcome};
pub use signal::{Signal, SignalEvent, SignalLogic, TradeCallback};
