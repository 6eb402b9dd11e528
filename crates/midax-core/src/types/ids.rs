//! Handles into the indicator/signal graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a market in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId(pub usize);

/// Index of an indicator in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndicatorId(pub usize);

/// Index of a signal in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub usize);

/// Anything that publishes a time series: a market or an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    Market(MarketId),
    Indicator(IndicatorId),
}

impl From<MarketId> for SourceId {
    fn from(id: MarketId) -> Self {
        SourceId::Market(id)
    }
}

impl From<IndicatorId> for SourceId {
    fn from(id: IndicatorId) -> Self {
        SourceId::Indicator(id)
    }
}

/// Anything that can listen to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subscriber {
    Indicator(IndicatorId),
    Signal(SignalId),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Market(id) => write!(f, "market#{}", id.0),
            SourceId::Indicator(id) => write!(f, "indicator#{}", id.0),
        }
    }
}

impl fmt::Display for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Indicator(id) => write!(f, "indicator#{}", id.0),
            Subscriber::Signal(id) => write!(f, "signal#{}", id.0),
        }
    }
}
