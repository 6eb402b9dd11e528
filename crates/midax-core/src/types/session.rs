//! Trading-day phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the trading day.
///
/// Phases only move forward: `NotStarted -> Active -> Closing -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Before trading start; history accumulates
    #[default]
    NotStarted,
    /// Models running, trades allowed
    Active,
    /// Only position-closing trades allowed
    Closing,
    /// Session over
    Stopped,
}

impl SessionPhase {
    /// Whether models are running in this phase.
    pub fn is_trading(&self) -> bool {
        matches!(self, SessionPhase::Active | SessionPhase::Closing)
    }

    /// Whether a trade opening a new position is allowed.
    pub fn allows_opening(&self) -> bool {
        matches!(self, SessionPhase::Active)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::NotStarted => write!(f, "NOT_STARTED"),
            SessionPhase::Active => write!(f, "ACTIVE"),
            SessionPhase::Closing => write!(f, "CLOSING"),
            SessionPhase::Stopped => write!(f, "STOPPED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_ordered() {
        assert!(SessionPhase::NotStarted < SessionPhase::Active);
        assert!(SessionPhase::Closing < SessionPhase::Stopped);
        assert!(SessionPhase::Closing.is_trading());
        assert!(!SessionPhase::Closing.allows_opening());
        assert!(!SessionPhase::Stopped.is_trading());
    }
}
