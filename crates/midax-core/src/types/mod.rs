//! Core data types for the trading engine.

mod ids;
mod market_data;
mod price;
mod session;
mod signal;
mod subscribers;
mod tick;
mod time_series;
mod trade;

pub use ids::{IndicatorId, MarketId, SignalId, SourceId, Subscriber};
pub use market_data::{Level, MarketData, SessionLevels};
pub use price::Price;
pub use session::SessionPhase;
pub use signal::{Action, SignalCode};
pub use subscribers::SubscriberList;
pub use tick::Tick;
pub use time_series::{Insertion, TimeSeries};
pub use trade::{
    CancelHandler, Cancellation, Confirmation, Side, Trade, TradeRecord, TradeRequest,
};
