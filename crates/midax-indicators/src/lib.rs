//! Streaming indicators for the Midax engine.
//!
//! This crate provides:
//! - Time decay laws (`TimeDecay`)
//! - Exact step-function integration over a window (`average`)
//! - Incremental time-weighted averages: WMA, VWMA and the WMVol volatility
//! - Session level publishers and the daily mean
//!
//! Every variant is wrapped in the closed [`IndicatorKind`] enum so the
//! graph can store indicators by value and dispatch without trait objects.

pub mod average;
pub mod decay;
pub mod level;
pub mod wma;

pub use average::Accumulator;
pub use decay::TimeDecay;
pub use level::{DailyMean, LevelIndicator, DEFAULT_MEAN_HISTORY_MINUTES};
pub use wma::{WeightedMovingAverage, Weighting};

use chrono::{DateTime, TimeDelta, Utc};
use midax_core::traits::{IndicatorInputs, TickIndicator};
use midax_core::Price;

/// Every indicator the engine knows about.
#[derive(Debug, Clone)]
pub enum IndicatorKind {
    Average(WeightedMovingAverage),
    Level(LevelIndicator),
    DailyMean(DailyMean),
}

impl IndicatorKind {
    /// Whether the indicator is recomputed on every source tick.
    pub fn is_streaming(&self) -> bool {
        matches!(self, IndicatorKind::Average(_))
    }

    /// Whether the indicator reads a companion series.
    pub fn needs_companion(&self) -> bool {
        match self {
            IndicatorKind::Average(avg) => avg.needs_companion(),
            _ => false,
        }
    }
}

impl From<WeightedMovingAverage> for IndicatorKind {
    fn from(avg: WeightedMovingAverage) -> Self {
        IndicatorKind::Average(avg)
    }
}

impl From<LevelIndicator> for IndicatorKind {
    fn from(level: LevelIndicator) -> Self {
        IndicatorKind::Level(level)
    }
}

impl From<DailyMean> for IndicatorKind {
    fn from(mean: DailyMean) -> Self {
        IndicatorKind::DailyMean(mean)
    }
}

impl TickIndicator for IndicatorKind {
    fn on_tick(&mut self, inputs: &IndicatorInputs<'_>, as_of: DateTime<Utc>) -> Option<Price> {
        match self {
            IndicatorKind::Average(avg) => avg.on_tick(inputs, as_of),
            // published on demand only
            IndicatorKind::Level(_) | IndicatorKind::DailyMean(_) => None,
        }
    }

    fn current(&self) -> Option<Price> {
        match self {
            IndicatorKind::Average(avg) => avg.current(),
            _ => None,
        }
    }

    fn reset(&mut self) {
        if let IndicatorKind::Average(avg) = self {
            avg.reset();
        }
    }

    fn period(&self) -> Option<TimeDelta> {
        match self {
            IndicatorKind::Average(avg) => TickIndicator::period(avg),
            _ => None,
        }
    }

    fn name(&self) -> &str {
        match self {
            IndicatorKind::Average(avg) => TickIndicator::name(avg),
            IndicatorKind::Level(level) => level.name(),
            IndicatorKind::DailyMean(mean) => mean.name(),
        }
    }
}
