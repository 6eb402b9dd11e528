//! Indicator capability trait.

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{Price, TimeSeries};

/// Series an indicator reads on update.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorInputs<'a> {
    /// The market or indicator the indicator averages
    pub source: &'a TimeSeries,
    /// Published values of the companion indicator, if any
    pub companion: Option<&'a TimeSeries>,
}

impl<'a> IndicatorInputs<'a> {
    /// Inputs without a companion.
    pub fn source(source: &'a TimeSeries) -> Self {
        Self {
            source,
            companion: None,
        }
    }

    /// Inputs with a companion series.
    pub fn with_companion(source: &'a TimeSeries, companion: &'a TimeSeries) -> Self {
        Self {
            source,
            companion: Some(companion),
        }
    }
}

/// Streaming indicator updated once per source tick.
///
/// Implementations keep their incremental state private and replace it
/// wholesale on a successful update, so a tick that cannot be computed leaves
/// the previous state intact.
pub trait TickIndicator: Send {
    /// Update with the source's latest sample at `as_of`.
    ///
    /// # Returns
    /// The value to publish, or None if nothing is published for this tick
    fn on_tick(&mut self, inputs: &IndicatorInputs<'_>, as_of: DateTime<Utc>) -> Option<Price>;

    /// Last computed value, published or not.
    fn current(&self) -> Option<Price>;

    /// Drop all incremental state.
    fn reset(&mut self);

    /// Trailing window length, for averaging indicators.
    fn period(&self) -> Option<TimeDelta> {
        None
    }

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    /// Republishes the latest source sample.
    struct Last {
        value: Option<Price>,
    }

    impl TickIndicator for Last {
        fn on_tick(&mut self, inputs: &IndicatorInputs<'_>, as_of: DateTime<Utc>) -> Option<Price> {
            self.value = inputs.source.value_at(as_of).map(|(_, p)| *p);
            self.value
        }

        fn current(&self) -> Option<Price> {
            self.value
        }

        fn reset(&mut self) {
            self.value = None;
        }

        fn name(&self) -> &str {
            "last"
        }
    }

    #[test]
    fn test_streaming_update_and_reset() {
        let t = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        let mut series = TimeSeries::new();
        series.insert(t, Price::flat(dec!(5))).unwrap();

        let mut indicator = Last { value: None };
        let out = indicator.on_tick(&IndicatorInputs::source(&series), t);
        assert_eq!(out, Some(Price::flat(dec!(5))));
        assert!(indicator.period().is_none());

        indicator.reset();
        assert!(indicator.current().is_none());
    }
}
