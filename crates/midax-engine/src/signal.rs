//! Signal runtime: decision state, trade callbacks and the logic seam.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use midax_core::error::SignalError;
use midax_core::{Action, IndicatorId, MarketId, Price, SignalCode, SourceId};

use crate::network::GraphView;

/// A fired BUY or SELL decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Signal name
    pub signal: String,
    /// Instrument to trade
    pub instrument: String,
    pub action: Action,
    pub time: DateTime<Utc>,
    /// Quote of the trading instrument in force at `time`
    pub quote: Price,
}

impl SignalEvent {
    /// Price the decision is recorded at: offer for BUY, bid for SELL.
    pub fn recorded_price(&self) -> Decimal {
        match self.action {
            Action::Sell => self.quote.bid,
            _ => self.quote.offer,
        }
    }
}

/// Trade callback supplied by the session. Returns true if the trade was
/// taken.
pub type TradeCallback = Box<dyn FnMut(&SignalEvent) -> bool + Send>;

/// Strategy-specific decision function.
pub trait SignalLogic: Send {
    /// Evaluate an update from one of the signal's indicators.
    ///
    /// # Arguments
    /// * `view` - Read-only access to markets and indicator outputs
    /// * `source` - The indicator (or market) that just published
    /// * `as_of` - Update time
    /// * `value` - The published value
    ///
    /// # Returns
    /// `Some(action)` if a decision is due, `None` otherwise
    fn process(
        &mut self,
        view: &GraphView<'_>,
        source: SourceId,
        as_of: DateTime<Utc>,
        value: &Price,
    ) -> Result<Option<Action>, SignalError>;

    /// Forget any state carried between updates.
    fn reset(&mut self) {}
}

/// A decision unit bound to its indicators and instruments.
pub struct Signal {
    name: String,
    reference: MarketId,
    trading: MarketId,
    indicators: Vec<IndicatorId>,
    logic: Box<dyn SignalLogic>,
    on_buy: Option<TradeCallback>,
    on_sell: Option<TradeCallback>,
    code: SignalCode,
    last_trade: Option<SignalEvent>,
    /// Time of the last BUY, SELL or HOLD decision
    decided_at: Option<DateTime<Utc>>,
    subscribed: bool,
}

impl Signal {
    /// Create a signal watching `indicators`, in that order.
    ///
    /// `reference` is the instrument the indicators are computed on and
    /// `trading` the one traded; they are usually the same.
    pub fn new(
        name: impl Into<String>,
        reference: MarketId,
        trading: MarketId,
        indicators: Vec<IndicatorId>,
        logic: impl SignalLogic + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reference,
            trading,
            indicators,
            logic: Box::new(logic),
            on_buy: None,
            on_sell: None,
            code: SignalCode::Unknown,
            last_trade: None,
            decided_at: None,
            subscribed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> MarketId {
        self.reference
    }

    pub fn trading(&self) -> MarketId {
        self.trading
    }

    /// Indicators in declaration order.
    pub fn indicators(&self) -> &[IndicatorId] {
        &self.indicators
    }

    /// Latest decision code.
    pub fn code(&self) -> SignalCode {
        self.code
    }

    /// Last decision whose callback took the trade.
    pub fn last_trade(&self) -> Option<&SignalEvent> {
        self.last_trade.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub(crate) fn attach(&mut self, on_buy: TradeCallback, on_sell: TradeCallback) {
        self.on_buy = Some(on_buy);
        self.on_sell = Some(on_sell);
        self.subscribed = true;
    }

    pub(crate) fn detach(&mut self) {
        self.on_buy = None;
        self.on_sell = None;
        self.subscribed = false;
        self.decided_at = None;
        self.logic.reset();
    }

    /// Run the logic for one update.
    ///
    /// A decision is final for its timestamp: a tick replacing the last
    /// sample does not re-run the logic once it has decided at that time.
    ///
    /// # Returns
    /// The event when a BUY or SELL fired and its callback took the trade
    pub(crate) fn evaluate(
        &mut self,
        view: &GraphView<'_>,
        source: SourceId,
        as_of: DateTime<Utc>,
        value: &Price,
    ) -> Result<Option<SignalEvent>, SignalError> {
        if self.decided_at == Some(as_of) {
            return Ok(None);
        }
        let action = match self.logic.process(view, source, as_of, value) {
            Ok(Some(action)) => action,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.code = SignalCode::Failed;
                return Err(e);
            }
        };

        self.code = action.code();
        self.decided_at = Some(as_of);
        let callback = match action {
            Action::Hold => return Ok(None),
            Action::Buy => self.on_buy.as_mut(),
            Action::Sell => self.on_sell.as_mut(),
        };

        let market = view.market(self.trading);
        let Some((_, quote)) = market.series().value_at(as_of) else {
            self.code = SignalCode::Failed;
            return Err(SignalError::MissingPrice {
                instrument: market.id.clone(),
                time: as_of,
            });
        };

        let event = SignalEvent {
            signal: self.name.clone(),
            instrument: market.id.clone(),
            action,
            time: as_of,
            quote: *quote,
        };

        let taken = callback.map(|cb| cb(&event)).unwrap_or(false);
        if !taken {
            return Ok(None);
        }
        self.last_trade = Some(event.clone());
        Ok(Some(event))
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("reference", &self.reference)
            .field("trading", &self.trading)
            .field("indicators", &self.indicators)
            .field("code", &self.code)
            .field("subscribed", &self.subscribed)
            .finish()
    }
}
