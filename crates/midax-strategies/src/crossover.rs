//! Crossover detection between two indicator outputs.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use midax_core::{Action, IndicatorId};
use midax_engine::GraphView;

/// Tracks which of two indicators is on top.
///
/// Both values are read at the same timestamp, so nothing is decided until
/// the second of the pair has published for the tick.
#[derive(Debug, Clone)]
pub struct Crossover {
    fast: IndicatorId,
    slow: IndicatorId,
    side: Option<Ordering>,
}

impl Crossover {
    pub fn new(fast: IndicatorId, slow: IndicatorId) -> Self {
        Self {
            fast,
            slow,
            side: None,
        }
    }

    pub fn fast(&self) -> IndicatorId {
        self.fast
    }

    pub fn slow(&self) -> IndicatorId {
        self.slow
    }

    /// Evaluate at `as_of`.
    ///
    /// # Returns
    /// `None` until both indicators have published at `as_of`. After that
    /// `Buy` when fast moves from at-or-below slow to above it, `Sell` on the
    /// way down and `Hold` otherwise. The first comparison only sets the side.
    pub fn update(&mut self, view: &GraphView<'_>, as_of: DateTime<Utc>) -> Option<Action> {
        let fast = view.indicator_at(self.fast, as_of)?;
        let slow = view.indicator_at(self.slow, as_of)?;
        let now = fast.cmp_mid(slow);
        let previous = self.side.replace(now);
        let action = match (previous, now) {
            (Some(Ordering::Less | Ordering::Equal), Ordering::Greater) => Action::Buy,
            (Some(Ordering::Greater | Ordering::Equal), Ordering::Less) => Action::Sell,
            _ => Action::Hold,
        };
        Some(action)
    }

    pub fn reset(&mut self) {
        self.side = None;
    }
}
