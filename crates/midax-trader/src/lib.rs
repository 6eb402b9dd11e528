//! Trading session orchestration.
//!
//! This crate provides:
//! - [`Trader`]: the trading-day state machine running a set of models
//! - [`TradingDesk`] and [`Dispatcher`]: per-signal positions and trade routing
//! - [`ReplaySession`]: a full session replayed from CSV with a paper broker
//! - [`Validator`]: comparison of a replay with a reference run

mod desk;
mod replay;
mod trader;
mod validation;
mod window;

pub use desk::{DispatchSummary, Dispatcher, Instruction, Position, TradingDesk};
pub use replay::{ReplayReport, ReplaySession};
pub use trader::{SessionStats, ShutdownCallback, Trader};
pub use validation::{ValidationSummary, Validator};
pub use window::TradingWindow;
