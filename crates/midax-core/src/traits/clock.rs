//! Clock sources.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Supplies "now" to the session state machine.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock driven by replayed tick timestamps.
#[derive(Debug)]
pub struct ReplayClock {
    now: Mutex<DateTime<Utc>>,
}

impl ReplayClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward. Earlier times are ignored.
    pub fn advance(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap();
        if to > *now {
            *now = to;
        }
    }
}

impl Clock for ReplayClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_replay_clock_only_moves_forward() {
        let start = Utc.with_ymd_and_hms(2015, 8, 26, 7, 0, 0).unwrap();
        let clock = ReplayClock::new(start);

        clock.advance(start + TimeDelta::minutes(5));
        clock.advance(start);
        assert_eq!(clock.now(), start + TimeDelta::minutes(5));
    }
}
