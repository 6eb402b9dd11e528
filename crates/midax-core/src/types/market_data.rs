//! Instruments and their session reference levels.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Insertion, Price, SubscriberList, TimeSeries};
use crate::error::SeriesError;

/// A session reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Pivot,
    R1,
    R2,
    R3,
    S1,
    S2,
    S3,
}

impl Level {
    /// All levels, pivot first.
    pub fn all() -> &'static [Level] {
        &[
            Level::Pivot,
            Level::R1,
            Level::R2,
            Level::R3,
            Level::S1,
            Level::S2,
            Level::S3,
        ]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Pivot => "Pivot",
            Level::R1 => "R1",
            Level::R2 => "R2",
            Level::R3 => "R3",
            Level::S1 => "S1",
            Level::S2 => "S2",
            Level::S3 => "S3",
        };
        write!(f, "{}", s)
    }
}

/// Pivot, resistance and support levels for one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLevels {
    pub pivot: Decimal,
    pub r1: Decimal,
    pub r2: Decimal,
    pub r3: Decimal,
    pub s1: Decimal,
    pub s2: Decimal,
    pub s3: Decimal,
}

impl SessionLevels {
    /// Classic floor pivots from the previous session's high, low and close.
    pub fn from_high_low_close(high: Decimal, low: Decimal, close: Decimal) -> Self {
        let pivot = (high + low + close) / Decimal::from(3);
        let range = high - low;
        Self {
            pivot,
            r1: Decimal::TWO * pivot - low,
            s1: Decimal::TWO * pivot - high,
            r2: pivot + range,
            s2: pivot - range,
            r3: high + Decimal::TWO * (pivot - low),
            s3: low - Decimal::TWO * (high - pivot),
        }
    }

    /// Value of a given level.
    pub fn get(&self, level: Level) -> Decimal {
        match level {
            Level::Pivot => self.pivot,
            Level::R1 => self.r1,
            Level::R2 => self.r2,
            Level::R3 => self.r3,
            Level::S1 => self.s1,
            Level::S2 => self.s2,
            Level::S3 => self.s3,
        }
    }
}

/// A tradable instrument: its tick history, levels and subscribers.
#[derive(Debug, Clone)]
pub struct MarketData {
    /// Instrument identifier (e.g. the broker epic)
    pub id: String,
    /// Human-readable name
    pub name: String,
    series: TimeSeries,
    levels: Option<SessionLevels>,
    subscribers: SubscriberList,
}

impl MarketData {
    /// Create a market with an empty history.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            series: TimeSeries::new(),
            levels: None,
            subscribers: SubscriberList::new(),
        }
    }

    /// Parse a `"Name:ID"` descriptor; a bare id is also its own name.
    pub fn from_descriptor(descriptor: &str) -> Self {
        match descriptor.split_once(':') {
            Some((name, id)) => Self::new(id, name),
            None => Self::new(descriptor, descriptor),
        }
    }

    /// Record a tick.
    pub fn record(&mut self, timestamp: DateTime<Utc>, price: Price) -> Result<Insertion, SeriesError> {
        self.series.insert(timestamp, price)
    }

    /// Tick history.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Session levels, once computed.
    pub fn levels(&self) -> Option<&SessionLevels> {
        self.levels.as_ref()
    }

    /// Set the day's levels.
    pub fn set_levels(&mut self, levels: SessionLevels) {
        self.levels = Some(levels);
    }

    /// Subscribers in delivery order.
    pub fn subscribers(&self) -> &SubscriberList {
        &self.subscribers
    }

    /// Mutable access to the subscriber registry.
    pub fn subscribers_mut(&mut self) -> &mut SubscriberList {
        &mut self.subscribers
    }
}
