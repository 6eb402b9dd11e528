//! Trades sent to the execution boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Get the sign for position calculations (+1 for buy, -1 for sell).
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => -Decimal::ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Details handed to a trade's cancellation handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation {
    /// When the boundary rejected the trade
    pub time: DateTime<Utc>,
    /// Instrument price at rejection
    pub price: Decimal,
    /// Direction of the confirmed position held for the same reference
    pub open: Option<Side>,
}

impl Cancellation {
    /// Whether a position was already open for the reference.
    pub fn open_position(&self) -> bool {
        self.open.is_some()
    }
}

/// Invoked at most once when the execution boundary rejects a trade.
pub type CancelHandler = Box<dyn FnOnce(&Cancellation) + Send>;

/// What the execution boundary needs to place a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub instrument: String,
    pub direction: Side,
    pub size: Decimal,
    /// Expected price
    pub price: Decimal,
    /// Caller reference, e.g. the originating signal
    pub reference: String,
}

/// A fill reported by the execution boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Broker deal id
    pub id: String,
    pub time: DateTime<Utc>,
    /// Fill price
    pub price: Decimal,
}

/// Serializable snapshot of a trade for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Option<String>,
    pub instrument: String,
    pub direction: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub reference: String,
    pub trading_time: DateTime<Utc>,
    pub confirmation_time: Option<DateTime<Utc>>,
}

/// A trade attempted by a signal and settled asynchronously.
///
/// The trade is independent of the signal that created it: its cancellation
/// handler may run after the signal has been unsubscribed.
pub struct Trade {
    pub instrument: String,
    pub direction: Side,
    pub size: Decimal,
    pub reference: String,
    /// Broker id, set on confirmation
    pub id: Option<String>,
    pub trading_time: DateTime<Utc>,
    pub confirmation_time: Option<DateTime<Utc>>,
    pub price: Decimal,
    /// Issue sequence number of the trade within its reference
    pub placeholder: u32,
    on_cancelled: Option<CancelHandler>,
}

impl Trade {
    /// Create an unconfirmed trade.
    pub fn new(
        trading_time: DateTime<Utc>,
        instrument: impl Into<String>,
        direction: Side,
        size: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            direction,
            size,
            reference: String::new(),
            id: None,
            trading_time,
            confirmation_time: None,
            price,
            placeholder: 0,
            on_cancelled: None,
        }
    }

    /// Set the caller reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    /// Set the issue sequence number.
    pub fn with_placeholder(mut self, placeholder: u32) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Attach the handler run if the trade is rejected.
    pub fn on_cancelled<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(&Cancellation) + Send + 'static,
    {
        self.on_cancelled = Some(Box::new(handler));
        self
    }

    /// Whether the boundary has confirmed the trade.
    pub fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }

    /// The request to send to the execution boundary.
    pub fn request(&self) -> TradeRequest {
        TradeRequest {
            instrument: self.instrument.clone(),
            direction: self.direction,
            size: self.size,
            price: self.price,
            reference: self.reference.clone(),
        }
    }

    /// Apply a confirmation. The cancellation handler is dropped.
    pub fn confirm(&mut self, confirmation: Confirmation) {
        self.id = Some(confirmation.id);
        self.confirmation_time = Some(confirmation.time);
        self.price = confirmation.price;
        self.on_cancelled = None;
    }

    /// Run the cancellation handler. Returns false if it already ran or
    /// none was attached.
    pub fn reject(&mut self, cancellation: &Cancellation) -> bool {
        match self.on_cancelled.take() {
            Some(handler) => {
                handler(cancellation);
                true
            }
            None => false,
        }
    }

    /// The trade that closes this one: same size and reference, reversed
    /// direction. The cancellation handler is moved to the new trade.
    pub fn opposite(&mut self, trading_time: DateTime<Utc>) -> Trade {
        Trade {
            instrument: self.instrument.clone(),
            direction: self.direction.opposite(),
            size: self.size,
            reference: self.reference.clone(),
            id: self.id.clone(),
            trading_time,
            confirmation_time: None,
            price: self.price,
            placeholder: self.placeholder,
            on_cancelled: self.on_cancelled.take(),
        }
    }

    /// Snapshot for persistence.
    pub fn record(&self) -> TradeRecord {
        TradeRecord {
            id: self.id.clone(),
            instrument: self.instrument.clone(),
            direction: self.direction,
            size: self.size,
            price: self.price,
            reference: self.reference.clone(),
            trading_time: self.trading_time,
            confirmation_time: self.confirmation_time,
        }
    }
}

impl fmt::Debug for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trade")
            .field("instrument", &self.instrument)
            .field("direction", &self.direction)
            .field("size", &self.size)
            .field("reference", &self.reference)
            .field("id", &self.id)
            .field("trading_time", &self.trading_time)
            .field("confirmation_time", &self.confirmation_time)
            .field("price", &self.price)
            .field("placeholder", &self.placeholder)
            .field("cancellable", &self.on_cancelled.is_some())
            .finish()
    }
}
