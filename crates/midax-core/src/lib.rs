//! Core types and traits for the Midax trading engine.
//!
//! This crate provides the foundational building blocks including:
//! - Quote arithmetic (`Price`) and ordered tick storage (`TimeSeries`)
//! - Instruments with session levels and subscriber registries (`MarketData`)
//! - Trades, signal codes and session phases
//! - Boundary traits for execution, persistence, clocks and tick sources

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use traits::*;
pub use types::*;
