//! Trading-day schedule.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use midax_config::SessionSettings;
use midax_core::types::SessionPhase;

/// Absolute times of one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    pub publishing_start: DateTime<Utc>,
    pub trading_start: DateTime<Utc>,
    pub closing: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub publishing_stop: DateTime<Utc>,
}

impl TradingWindow {
    /// Place the configured schedule on `date`.
    pub fn from_session(session: &SessionSettings, date: NaiveDate) -> Self {
        let at = |time: NaiveTime| date.and_time(time).and_utc();
        Self {
            publishing_start: at(session.publishing_start),
            trading_start: at(session.trading_start),
            closing: at(session.closing),
            stop: at(session.trading_stop),
            publishing_stop: at(session.publishing_stop),
        }
    }

    /// Phase the session should be in at `now`.
    pub fn phase_at(&self, now: DateTime<Utc>) -> SessionPhase {
        if now < self.trading_start {
            SessionPhase::NotStarted
        } else if now < self.closing {
            SessionPhase::Active
        } else if now < self.stop {
            SessionPhase::Closing
        } else {
            SessionPhase::Stopped
        }
    }

    /// Whether ticks at `time` are recorded at all.
    pub fn is_publishing(&self, time: DateTime<Utc>) -> bool {
        self.publishing_start <= time && time <= self.publishing_stop
    }
}
