//! Step-function integration over a time window.
//!
//! A series is treated as a step function: each sample holds until the next
//! one. Averages are kept as two exact accumulators so that a window can be
//! moved forward by subtracting what expired and adding what arrived, with
//! the same result as integrating the new window from scratch.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::ops::{Add, Sub};

use midax_core::{Price, TimeSeries};

use crate::decay::millis;

/// Weighted sums of both quote sides and of the weights themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Moments {
    pub bid: Decimal,
    pub offer: Decimal,
    pub weight: Decimal,
}

impl Moments {
    fn accumulate(&mut self, value: &Price, weight: Decimal) {
        self.bid += value.bid * weight;
        self.offer += value.offer * weight;
        self.weight += weight;
    }

    fn scaled(&self, k: Decimal) -> Moments {
        Moments {
            bid: self.bid * k,
            offer: self.offer * k,
            weight: self.weight * k,
        }
    }
}

impl Add for Moments {
    type Output = Moments;

    fn add(self, rhs: Moments) -> Moments {
        Moments {
            bid: self.bid + rhs.bid,
            offer: self.offer + rhs.offer,
            weight: self.weight + rhs.weight,
        }
    }
}

impl Sub for Moments {
    type Output = Moments;

    fn sub(self, rhs: Moments) -> Moments {
        Moments {
            bid: self.bid - rhs.bid,
            offer: self.offer - rhs.offer,
            weight: self.weight - rhs.weight,
        }
    }
}

/// Running integral of a step function relative to a window origin.
///
/// `uniform` sums `value * duration`; `moment` additionally multiplies by
/// twice the distance from the origin to the segment midpoint. Durations are
/// in milliseconds so every term is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Accumulator {
    pub uniform: Moments,
    pub moment: Moments,
}

impl Accumulator {
    /// Add one constant segment `[t0, t1]`.
    pub fn add_segment(
        &mut self,
        value: &Price,
        factor: Decimal,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
        origin: DateTime<Utc>,
    ) {
        let len = millis(t1 - t0);
        if len <= Decimal::ZERO {
            return;
        }
        let weight = len * factor;
        let x2 = millis(t0 - origin) + millis(t1 - origin);
        self.uniform.accumulate(value, weight);
        self.moment.accumulate(value, weight * x2);
    }

    /// Re-express the accumulator relative to an origin moved forward by
    /// `delta`.
    pub fn shift(&self, delta: TimeDelta) -> Accumulator {
        let k = Decimal::TWO * millis(delta);
        Accumulator {
            uniform: self.uniform,
            moment: self.moment - self.uniform.scaled(k),
        }
    }

    /// Check if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.uniform.weight.is_zero() && self.moment.weight.is_zero()
    }
}

impl Add for Accumulator {
    type Output = Accumulator;

    fn add(self, rhs: Accumulator) -> Accumulator {
        Accumulator {
            uniform: self.uniform + rhs.uniform,
            moment: self.moment + rhs.moment,
        }
    }
}

impl Sub for Accumulator {
    type Output = Accumulator;

    fn sub(self, rhs: Accumulator) -> Accumulator {
        Accumulator {
            uniform: self.uniform - rhs.uniform,
            moment: self.moment - rhs.moment,
        }
    }
}

/// Integrate `series` over `[start, end]` relative to `origin`.
///
/// `sample` maps each sample to the value and weight factor to integrate;
/// returning None aborts the integration. When `start` is earlier than the
/// first sample the window is not computable unless `accept_missing` is set,
/// in which case integration starts at the first sample.
pub fn integrate<F>(
    series: &TimeSeries,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    origin: DateTime<Utc>,
    accept_missing: bool,
    mut sample: F,
) -> Option<Accumulator>
where
    F: FnMut(DateTime<Utc>, &Price) -> Option<(Price, Decimal)>,
{
    let mut acc = Accumulator::default();
    if end <= start {
        return Some(acc);
    }

    let mut iter = series.window(start, end).peekable();
    match iter.peek() {
        None => return None,
        Some((first, _)) if *first > start && !accept_missing => return None,
        _ => {}
    }

    while let Some((ts, price)) = iter.next() {
        let seg_start = ts.max(start);
        let seg_end = iter.peek().map(|(next, _)| *next).unwrap_or(end).min(end);
        if seg_end <= seg_start {
            continue;
        }
        let (value, factor) = sample(ts, price)?;
        acc.add_segment(&value, factor, seg_start, seg_end, origin);
    }
    Some(acc)
}
