//! Append-ordered tick storage.

use chrono::{DateTime, TimeDelta, Utc};

use super::Price;
use crate::error::SeriesError;

/// Outcome of a successful insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new sample was appended
    Appended,
    /// The timestamp equalled the last one and its sample was replaced
    Replaced,
}

/// Time-ordered sequence of quotes for one instrument or indicator.
///
/// Timestamps never go backwards: every incremental average downstream walks
/// the series forward only, so an earlier insertion is rejected. A sample at
/// the same timestamp as the last one replaces it.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    samples: Vec<(DateTime<Utc>, Price)>,
}

impl TimeSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample at the end of the series.
    pub fn insert(&mut self, timestamp: DateTime<Utc>, price: Price) -> Result<Insertion, SeriesError> {
        match self.samples.last_mut() {
            Some((last, _)) if timestamp < *last => Err(SeriesError::OutOfOrderInsertion {
                timestamp,
                last: *last,
            }),
            Some((last, value)) if timestamp == *last => {
                *value = price;
                Ok(Insertion::Replaced)
            }
            _ => {
                self.samples.push((timestamp, price));
                Ok(Insertion::Appended)
            }
        }
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the oldest sample.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|(t, _)| *t)
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<(DateTime<Utc>, &Price)> {
        self.samples.last().map(|(t, p)| (*t, p))
    }

    /// Exact-timestamp lookup.
    pub fn lookup(&self, timestamp: DateTime<Utc>) -> Option<&Price> {
        self.samples
            .binary_search_by_key(&timestamp, |(t, _)| *t)
            .ok()
            .map(|idx| &self.samples[idx].1)
    }

    /// The sample in force at `timestamp` (last sample at or before it).
    pub fn value_at(&self, timestamp: DateTime<Utc>) -> Option<(DateTime<Utc>, &Price)> {
        let idx = self.samples.partition_point(|(t, _)| *t <= timestamp);
        idx.checked_sub(1).map(|i| {
            let (t, p) = &self.samples[i];
            (*t, p)
        })
    }

    /// Samples with `start <= timestamp <= end`, oldest first.
    ///
    /// Each call yields a fresh iterator.
    pub fn range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = (DateTime<Utc>, &Price)> + '_ {
        let lo = self.samples.partition_point(|(t, _)| *t < start);
        let hi = self.samples.partition_point(|(t, _)| *t <= end).max(lo);
        self.samples[lo..hi].iter().map(|(t, p)| (*t, p))
    }

    /// Like [`range`](Self::range), but starts with the sample in force at
    /// `start` when there is one.
    ///
    /// If the first yielded timestamp is later than `start`, no sample
    /// covers the beginning of the window.
    pub fn window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = (DateTime<Utc>, &Price)> + '_ {
        let lo = self
            .samples
            .partition_point(|(t, _)| *t <= start)
            .saturating_sub(1);
        let hi = self.samples.partition_point(|(t, _)| *t <= end).max(lo);
        self.samples[lo..hi].iter().map(|(t, p)| (*t, p))
    }

    /// Time between the first sample and `as_of`.
    pub fn elapsed(&self, as_of: DateTime<Utc>) -> TimeDelta {
        self.first_timestamp()
            .map(|first| as_of - first)
            .unwrap_or_else(TimeDelta::zero)
    }

    /// Minutes between the first sample and `as_of`.
    pub fn elapsed_minutes(&self, as_of: DateTime<Utc>) -> f64 {
        self.elapsed(as_of).num_milliseconds() as f64 / 60_000.0
    }

    /// Whether at least `period` of history is available at `as_of`.
    pub fn has_history(&self, as_of: DateTime<Utc>, period: TimeDelta) -> bool {
        !self.is_empty() && self.elapsed(as_of) >= period
    }

    /// Iterate over all samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, &Price)> + '_ {
        self.samples.iter().map(|(t, p)| (*t, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn series(points: &[(i64, Decimal)]) -> TimeSeries {
        let mut series = TimeSeries::new();
        for &(secs, value) in points {
            series.insert(at(secs), Price::flat(value)).unwrap();
        }
        series
    }

    #[test]
    fn test_range_preserves_insertion_order() {
        let series = series(&[(0, dec!(1)), (3, dec!(2)), (5, dec!(3)), (9, dec!(4))]);

        let stamps: Vec<_> = series.range(at(0), at(9)).map(|(t, _)| t).collect();
        assert_eq!(stamps, vec![at(0), at(3), at(5), at(9)]);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));

        let inner: Vec<_> = series.range(at(1), at(5)).map(|(_, p)| p.bid).collect();
        assert_eq!(inner, vec![dec!(2), dec!(3)]);
    }

    #[test]
    fn test_range_is_restartable() {
        let series = series(&[(0, dec!(1)), (1, dec!(2))]);
        assert_eq!(series.range(at(0), at(1)).count(), 2);
        assert_eq!(series.range(at(0), at(1)).count(), 2);
        assert_eq!(series.range(at(5), at(1)).count(), 0);
    }

    #[test]
    fn test_out_of_order_insertion_fails() {
        let mut series = series(&[(0, dec!(1)), (10, dec!(2))]);

        let err = series.insert(at(5), Price::flat(dec!(3))).unwrap_err();
        assert_eq!(
            err,
            SeriesError::OutOfOrderInsertion {
                timestamp: at(5),
                last: at(10),
            }
        );
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_duplicate_timestamp_replaces_last_sample() {
        let mut series = series(&[(0, dec!(1))]);

        let outcome = series.insert(at(0), Price::flat(dec!(7))).unwrap();
        assert_eq!(outcome, Insertion::Replaced);
        assert_eq!(series.len(), 1);
        assert_eq!(series.lookup(at(0)), Some(&Price::flat(dec!(7))));
    }

    #[test]
    fn test_lookup_and_value_at() {
        let series = series(&[(0, dec!(1)), (10, dec!(2))]);

        assert_eq!(series.lookup(at(10)).map(|p| p.bid), Some(dec!(2)));
        assert!(series.lookup(at(5)).is_none());

        let (t, p) = series.value_at(at(5)).unwrap();
        assert_eq!(t, at(0));
        assert_eq!(p.bid, dec!(1));
        assert!(series.value_at(at(-1)).is_none());
    }

    #[test]
    fn test_window_starts_with_sample_in_force() {
        let series = series(&[(0, dec!(1)), (10, dec!(2)), (20, dec!(3))]);

        let stamps: Vec<_> = series.window(at(15), at(20)).map(|(t, _)| t).collect();
        assert_eq!(stamps, vec![at(10), at(20)]);

        // Nothing covers the start of a window that begins before the series
        let first = series.window(at(-5), at(10)).next().map(|(t, _)| t);
        assert_eq!(first, Some(at(0)));
    }

    #[test]
    fn test_elapsed_minutes() {
        let series = series(&[(0, dec!(1))]);
        assert_eq!(series.elapsed_minutes(at(90)), 1.5);
        assert!(series.has_history(at(30), TimeDelta::seconds(30)));
        assert!(!series.has_history(at(29), TimeDelta::seconds(30)));
        assert_eq!(TimeSeries::new().elapsed_minutes(at(90)), 0.0);
    }
}
