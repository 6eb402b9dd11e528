//! Persistence boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PersistenceError;
use crate::types::{Price, SignalCode, TradeRecord};

/// A value written to the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// Raw market quote
    Price {
        instrument: String,
        time: DateTime<Utc>,
        price: Price,
    },
    /// Indicator output
    Indicator {
        id: String,
        time: DateTime<Utc>,
        value: Price,
    },
    /// BUY or SELL decision and the price it was taken at
    Signal {
        id: String,
        time: DateTime<Utc>,
        code: SignalCode,
        value: Decimal,
    },
    /// Trade snapshot
    Trade(TradeRecord),
}

impl Record {
    /// Record kind as written in tabular outputs.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Price { .. } => "price",
            Record::Indicator { .. } => "indicator",
            Record::Signal { .. } => "signal",
            Record::Trade(_) => "trade",
        }
    }

    /// Identifier of the instrument, indicator or signal.
    pub fn id(&self) -> &str {
        match self {
            Record::Price { instrument, .. } => instrument,
            Record::Indicator { id, .. } | Record::Signal { id, .. } => id,
            Record::Trade(trade) => &trade.reference,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Record::Price { time, .. }
            | Record::Indicator { time, .. }
            | Record::Signal { time, .. } => *time,
            Record::Trade(trade) => trade.confirmation_time.unwrap_or(trade.trading_time),
        }
    }

    /// Single scalar value: the midpoint for quotes and indicators.
    pub fn value(&self) -> Decimal {
        match self {
            Record::Price { price, .. } => price.mid(),
            Record::Indicator { value, .. } => value.mid(),
            Record::Signal { value, .. } => *value,
            Record::Trade(trade) => trade.price,
        }
    }
}

/// Trait for persistence sinks.
///
/// Writes must not block the tick path; implementations buffer or hand off
/// to a background task.
pub trait Publisher: Send + Sync {
    fn publish(&self, record: Record) -> Result<(), PersistenceError>;

    /// Flush buffered records.
    fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Publisher that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&self, _record: Record) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Publish, logging failures instead of propagating them.
pub fn publish_or_log(publisher: &dyn Publisher, record: Record) {
    let kind = record.kind();
    if let Err(e) = publisher.publish(record) {
        warn!(kind, error = %e, "Failed to publish record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_accessors() {
        let t = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        let record = Record::Indicator {
            id: "WMA_1_DAX".into(),
            time: t,
            value: Price::new(dec!(100), dec!(101)),
        };
        assert_eq!(record.kind(), "indicator");
        assert_eq!(record.id(), "WMA_1_DAX");
        assert_eq!(record.time(), t);
        assert_eq!(record.value(), dec!(100.5));

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"indicator\""));
    }

    struct Failing;

    impl Publisher for Failing {
        fn publish(&self, _record: Record) -> Result<(), PersistenceError> {
            Err(PersistenceError::Closed)
        }
    }

    #[test]
    fn test_publish_failures_are_swallowed() {
        let t = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        publish_or_log(
            &Failing,
            Record::Signal {
                id: "MacD".into(),
                time: t,
                code: SignalCode::Buy,
                value: dec!(101),
            },
        );
    }
}
