//! Core traits for the trading engine.

mod clock;
mod data_source;
mod execution;
mod indicator;
mod publisher;

pub use clock::{Clock, ReplayClock, SystemClock};
pub use data_source::TickSource;
pub use execution::ExecutionBoundary;
pub use indicator::{IndicatorInputs, TickIndicator};
pub use publisher::{publish_or_log, NullPublisher, Publisher, Record};
