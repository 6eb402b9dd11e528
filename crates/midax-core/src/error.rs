//! Error types for the trading engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level trading engine error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Time series error: {0}")]
    Series(#[from] SeriesError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Whether this error must end the trading session.
    ///
    /// Only broken tick ordering is fatal; everything else is logged and the
    /// session carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TradingError::Series(_))
    }
}

/// Time series integrity errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Time series do not accept values in the past: {timestamp} is earlier than {last}")]
    OutOfOrderInsertion {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient history: need {required_minutes} minutes, have {available_minutes:.2}")]
    InsufficientHistory {
        required_minutes: f64,
        available_minutes: f64,
    },

    #[error("Cannot publish level indicator {0}: value is unavailable")]
    MissingLevelData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Signal evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("No price for {instrument} at {time}")]
    MissingPrice {
        instrument: String,
        time: DateTime<Utc>,
    },

    #[error("Signal {signal} failed: {reason}")]
    Failed { signal: String, reason: String },
}

/// Errors raised while wiring markets, indicators and signals together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown instrument: {0}")]
    UnknownMarket(String),

    #[error("Duplicate instrument: {0}")]
    DuplicateMarket(String),

    #[error("Unknown indicator #{0}")]
    UnknownIndicator(usize),

    #[error("Unknown signal #{0}")]
    UnknownSignal(usize),

    #[error("Signal {0} is already subscribed")]
    AlreadySubscribed(String),

    #[error("Indicator {indicator} cannot use {companion} as companion: {reason}")]
    InvalidCompanion {
        indicator: String,
        companion: String,
        reason: String,
    },
}

/// Strategy and model construction errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Model wiring failed: {0}")]
    Wiring(#[from] GraphError),
}

/// Execution boundary errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Trade rejected: {0}")]
    Rejected(String),

    #[error("Size {requested} exceeds limit {limit}")]
    SizeLimit { requested: Decimal, limit: Decimal },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Dispatcher closed")]
    DispatcherClosed,
}

/// Tick source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("No data available: {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Persistence boundary errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Write failed: {0}")]
    Write(String),

    #[error("Publisher closed")]
    Closed,
}

/// Replay validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Test failed: {kind} {id} time {time} expected value {expected} != {actual}")]
    Mismatch {
        kind: String,
        id: String,
        time: String,
        expected: Decimal,
        actual: Decimal,
    },

    #[error("Test failed: {kind} {id} time {time} expected value {expected} was not published")]
    Missing {
        kind: String,
        id: String,
        time: String,
        expected: Decimal,
    },
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_series_errors_are_fatal() {
        let t = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        let fatal: TradingError = SeriesError::OutOfOrderInsertion {
            timestamp: t,
            last: t,
        }
        .into();
        assert!(fatal.is_fatal());

        let recoverable: TradingError = IndicatorError::MissingLevelData("LVLPivot_DAX".into()).into();
        assert!(!recoverable.is_fatal());
    }

    #[test]
    fn test_mismatch_message() {
        let err = ValidationError::Mismatch {
            kind: "indicator".into(),
            id: "WMA_1_DAX".into(),
            time: "08:41".into(),
            expected: dec!(9975.133333),
            actual: dec!(9975.356666),
        };
        assert_eq!(
            err.to_string(),
            "Test failed: indicator WMA_1_DAX time 08:41 expected value 9975.133333 != 9975.356666"
        );
    }
}
