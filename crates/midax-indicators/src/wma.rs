//! Incremental weighted moving averages.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use midax_core::traits::{IndicatorInputs, TickIndicator};
use midax_core::Price;

use crate::average::{integrate, Accumulator};
use crate::decay::TimeDecay;

/// What each sample contributes to the average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// The quote, weighted by time
    Price,
    /// The quote, weighted by traded volume times time
    Volume,
    /// Midpoint distance to the companion average, weighted by time
    Deviation,
}

/// Incremental state, replaced wholesale on each successful update.
#[derive(Debug, Clone, PartialEq)]
struct AverageState {
    acc: Accumulator,
    /// Time of the last update
    timestamp: DateTime<Utc>,
    /// Start of the window at the last update
    cursor: DateTime<Utc>,
    value: Option<Price>,
}

/// Time-weighted moving average over a trailing window.
///
/// Covers the plain average (WMA), its volume-weighted variant (VWMA) and the
/// mean absolute deviation against a companion average (WMVol).
#[derive(Debug, Clone)]
pub struct WeightedMovingAverage {
    name: String,
    period: TimeDelta,
    decay: TimeDecay,
    weighting: Weighting,
    state: Option<AverageState>,
}

impl WeightedMovingAverage {
    /// Create a plain time-weighted average.
    pub fn new(name: impl Into<String>, period: TimeDelta, decay: TimeDecay) -> Self {
        Self::with_weighting(name, period, decay, Weighting::Price)
    }

    /// Create a volume-weighted average.
    pub fn volume_weighted(name: impl Into<String>, period: TimeDelta, decay: TimeDecay) -> Self {
        Self::with_weighting(name, period, decay, Weighting::Volume)
    }

    /// Create a volatility average reading its companion's published values.
    pub fn volatility(name: impl Into<String>, period: TimeDelta, decay: TimeDecay) -> Self {
        Self::with_weighting(name, period, decay, Weighting::Deviation)
    }

    pub fn with_weighting(
        name: impl Into<String>,
        period: TimeDelta,
        decay: TimeDecay,
        weighting: Weighting,
    ) -> Self {
        assert!(period > TimeDelta::zero(), "Period must be greater than 0");
        Self {
            name: name.into(),
            period,
            decay,
            weighting,
            state: None,
        }
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    pub fn decay(&self) -> TimeDecay {
        self.decay
    }

    /// Whether this average needs a companion series.
    pub fn needs_companion(&self) -> bool {
        self.weighting == Weighting::Deviation
    }

    /// Average over `[as_of - period, as_of]` computed from scratch.
    pub fn direct(&self, inputs: &IndicatorInputs<'_>, as_of: DateTime<Utc>) -> Option<Price> {
        let origin = as_of - self.period;
        let acc = self.integrate(inputs, origin, as_of, origin)?;
        self.decay.combine(&acc, self.period)
    }

    fn integrate(
        &self,
        inputs: &IndicatorInputs<'_>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        origin: DateTime<Utc>,
    ) -> Option<Accumulator> {
        match self.weighting {
            Weighting::Price => {
                integrate(inputs.source, start, end, origin, false, |_, p| {
                    Some((*p, Decimal::ONE))
                })
            }
            Weighting::Volume => {
                integrate(inputs.source, start, end, origin, false, |_, p| {
                    Some((*p, p.volume_or_zero()))
                })
            }
            Weighting::Deviation => {
                let companion = inputs.companion?;
                integrate(inputs.source, start, end, origin, false, |ts, p| {
                    let (_, reference) = companion.value_at(ts)?;
                    let deviation = (*p - *reference).abs().mid();
                    Some((Price::flat(deviation), Decimal::ONE))
                })
            }
        }
    }

    /// Compute the state after a tick at `as_of`, leaving `self` untouched.
    fn advance(&self, inputs: &IndicatorInputs<'_>, as_of: DateTime<Utc>) -> Option<AverageState> {
        let origin = as_of - self.period;

        let acc = match &self.state {
            None => self.integrate(inputs, origin, as_of, origin)?,
            Some(state) => {
                if as_of < state.timestamp {
                    return None;
                }
                let expired = self.integrate(inputs, state.cursor, origin, state.cursor)?;
                let arrived = self.integrate(inputs, state.timestamp, as_of, origin)?;
                (state.acc - expired).shift(origin - state.cursor) + arrived
            }
        };

        Some(AverageState {
            value: self.decay.combine(&acc, self.period),
            acc,
            timestamp: as_of,
            cursor: origin,
        })
    }
}

impl TickIndicator for WeightedMovingAverage {
    fn on_tick(&mut self, inputs: &IndicatorInputs<'_>, as_of: DateTime<Utc>) -> Option<Price> {
        if self.needs_companion() {
            match inputs.companion {
                Some(companion) if companion.has_history(as_of, self.period) => {}
                _ => {
                    trace!(indicator = %self.name, "Companion history too short");
                    return None;
                }
            }
        }

        let Some(next) = self.advance(inputs, as_of) else {
            trace!(indicator = %self.name, %as_of, "Window not computable yet");
            return None;
        };
        let value = next.value;
        self.state = Some(next);

        if inputs.source.has_history(as_of, self.period) {
            value
        } else {
            None
        }
    }

    fn current(&self) -> Option<Price> {
        self.state.as_ref().and_then(|s| s.value)
    }

    fn reset(&mut self) {
        self.state = None;
    }

    fn period(&self) -> Option<TimeDelta> {
        Some(self.period)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
