//! Weighting laws across a trailing window.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use midax_core::error::IndicatorError;
use midax_core::Price;

use crate::average::Accumulator;

/// Milliseconds as a decimal.
pub(crate) fn millis(delta: TimeDelta) -> Decimal {
    Decimal::from(delta.num_milliseconds())
}

/// How weight is spread across a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeDecay {
    /// Plain time weighting
    #[default]
    Null,
    /// Weight density grows linearly from the window start so that the
    /// newest instant weighs `factor` times the oldest
    Linear { factor: Decimal },
}

impl TimeDecay {
    /// Linear decay with the given newest/oldest weight ratio.
    pub fn linear(factor: Decimal) -> Result<Self, IndicatorError> {
        if factor <= Decimal::ZERO {
            return Err(IndicatorError::InvalidParameter(format!(
                "time decay factor must be positive, got {}",
                factor
            )));
        }
        Ok(TimeDecay::Linear { factor })
    }

    /// Build from a configured factor; 1 means no decay.
    pub fn from_factor(factor: Decimal) -> Result<Self, IndicatorError> {
        if factor == Decimal::ONE {
            Ok(TimeDecay::Null)
        } else {
            Self::linear(factor)
        }
    }

    /// Slope of the density relative to the window start (`factor - 1`).
    #[inline]
    pub(crate) fn slope(&self) -> Decimal {
        match self {
            TimeDecay::Null => Decimal::ZERO,
            TimeDecay::Linear { factor } => *factor - Decimal::ONE,
        }
    }

    /// Normalized weight of `[t0, t1]` in a window of length `period`
    /// starting at `origin`. Weights over a full window sum to one.
    pub fn weight(
        &self,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
        period: TimeDelta,
        origin: DateTime<Utc>,
    ) -> Decimal {
        let len = millis(t1 - t0);
        let p = millis(period);
        if p.is_zero() || len <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self {
            TimeDecay::Null => len / p,
            TimeDecay::Linear { factor } => {
                // twice the distance from the origin to the segment midpoint
                let x2 = millis(t0 - origin) + millis(t1 - origin);
                len * (Decimal::TWO * p + self.slope() * x2)
                    / (p * p * (*factor + Decimal::ONE))
            }
        }
    }

    /// Weighted average held by an accumulator, or None when it carries no
    /// weight.
    pub fn combine(&self, acc: &Accumulator, period: TimeDelta) -> Option<Price> {
        let scale = Decimal::TWO * millis(period);
        let c = self.slope();
        let den = scale * acc.uniform.weight + c * acc.moment.weight;
        if den.is_zero() {
            return None;
        }
        let bid = (scale * acc.uniform.bid + c * acc.moment.bid) / den;
        let offer = (scale * acc.uniform.offer + c * acc.moment.offer) / den;
        Some(Price::new(bid, offer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_null_weight_is_elapsed_fraction() {
        let w = TimeDecay::Null.weight(at(10), at(25), TimeDelta::seconds(60), at(0));
        assert_eq!(w, dec!(0.25));
    }

    #[test]
    fn test_linear_weights_sum_to_one() {
        let decay = TimeDecay::linear(dec!(3)).unwrap();
        let period = TimeDelta::seconds(60);
        let total: Decimal = (0..6)
            .map(|i| decay.weight(at(i * 10), at(i * 10 + 10), period, at(0)))
            .sum();
        assert_eq!(total.round_dp(20), Decimal::ONE);

        // newest slice outweighs the oldest
        let oldest = decay.weight(at(0), at(1), period, at(0));
        let newest = decay.weight(at(59), at(60), period, at(0));
        assert!(newest > oldest * dec!(2.9));
    }

    #[test]
    fn test_factor_validation() {
        assert!(TimeDecay::linear(dec!(0)).is_err());
        assert_eq!(TimeDecay::from_factor(dec!(1)).unwrap(), TimeDecay::Null);
    }
}
