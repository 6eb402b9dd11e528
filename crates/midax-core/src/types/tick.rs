//! Market-data tick as delivered by a feed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Price;

/// One quote observation for an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument identifier
    pub instrument: String,
    /// Quote time
    pub timestamp: DateTime<Utc>,
    /// Best bid
    pub bid: Decimal,
    /// Best offer
    pub offer: Decimal,
    /// Traded volume, if known
    #[serde(default)]
    pub volume: Option<Decimal>,
}

impl Tick {
    /// Create a tick without volume.
    pub fn new(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        bid: Decimal,
        offer: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            bid,
            offer,
            volume: None,
        }
    }

    /// Attach a traded volume.
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    /// The quote carried by this tick.
    pub fn price(&self) -> Price {
        Price {
            bid: self.bid,
            offer: self.offer,
            volume: self.volume,
        }
    }
}
