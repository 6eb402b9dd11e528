//! Signal decision codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Latest decision state of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalCode {
    /// Nothing evaluated yet
    #[default]
    Unknown,
    Hold,
    Buy,
    Sell,
    /// The last evaluation raised an error
    Failed,
}

impl fmt::Display for SignalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalCode::Unknown => write!(f, "UNKNOWN"),
            SignalCode::Hold => write!(f, "HOLD"),
            SignalCode::Buy => write!(f, "BUY"),
            SignalCode::Sell => write!(f, "SELL"),
            SignalCode::Failed => write!(f, "FAILED"),
        }
    }
}

/// Decision returned by a signal's logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Hold,
    Buy,
    Sell,
}

impl Action {
    /// The signal code this action leaves behind.
    pub fn code(&self) -> SignalCode {
        match self {
            Action::Hold => SignalCode::Hold,
            Action::Buy => SignalCode::Buy,
            Action::Sell => SignalCode::Sell,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.code(), f)
    }
}
