//! Session level publishers.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use midax_core::error::IndicatorError;
use midax_core::{Level, Price, SessionLevels, TimeSeries};

use crate::average::integrate;
use crate::decay::TimeDecay;

/// Republishes one of an instrument's session levels on demand.
#[derive(Debug, Clone)]
pub struct LevelIndicator {
    name: String,
    level: Level,
}

impl LevelIndicator {
    /// Named `LVL<level>_<instrument>`.
    pub fn new(level: Level, instrument: &str) -> Self {
        Self {
            name: format!("LVL{}_{}", level, instrument),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// The level value as a flat quote.
    pub fn publish(&self, levels: Option<&SessionLevels>) -> Result<Price, IndicatorError> {
        levels
            .map(|l| Price::flat(l.get(self.level)))
            .ok_or_else(|| IndicatorError::MissingLevelData(self.name.clone()))
    }
}

/// Minutes of history required before a daily mean is published.
pub const DEFAULT_MEAN_HISTORY_MINUTES: i64 = 240;

/// Whole-session average, published once at session end.
#[derive(Debug, Clone)]
pub struct DailyMean {
    name: String,
    min_history: TimeDelta,
}

impl DailyMean {
    /// Named `WMA_1D_<instrument>`.
    pub fn new(instrument: &str) -> Self {
        Self {
            name: format!("WMA_1D_{}", instrument),
            min_history: TimeDelta::minutes(DEFAULT_MEAN_HISTORY_MINUTES),
        }
    }

    pub fn with_min_history(mut self, min_history: TimeDelta) -> Self {
        self.min_history = min_history;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time-weighted mean midpoint from the first sample to `as_of`.
    pub fn publish(&self, series: &TimeSeries, as_of: DateTime<Utc>) -> Result<Price, IndicatorError> {
        let elapsed = series.elapsed(as_of);
        let insufficient = || IndicatorError::InsufficientHistory {
            required_minutes: self.min_history.num_seconds() as f64 / 60.0,
            available_minutes: series.elapsed_minutes(as_of),
        };
        let start = match series.first_timestamp() {
            Some(first) if elapsed >= self.min_history => first,
            _ => return Err(insufficient()),
        };

        let acc = integrate(series, start, as_of, start, true, |_, p| Some((*p, Decimal::ONE)))
            .ok_or_else(insufficient)?;
        TimeDecay::Null
            .combine(&acc, as_of - start)
            .map(|avg| avg.mid_price())
            .ok_or_else(insufficient)
    }
}
