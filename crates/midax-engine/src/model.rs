//! Strategy composition and lifecycle.

use tracing::{info, warn};

use midax_core::error::GraphError;
use midax_core::{IndicatorId, SignalId};

use crate::network::Network;
use crate::signal::TradeCallback;

/// Supplies the trade callbacks a model's signals fire into.
pub trait TradeActions {
    /// Callback run when `signal` decides to buy.
    fn on_buy(&self, signal: &str) -> TradeCallback;

    /// Callback run when `signal` decides to sell.
    fn on_sell(&self, signal: &str) -> TradeCallback;
}

/// A named set of signals and standalone indicators.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    indicators: Vec<IndicatorId>,
    signals: Vec<SignalId>,
    running: bool,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indicators: Vec::new(),
            signals: Vec::new(),
            running: false,
        }
    }

    /// Add an indicator published independently of any signal.
    pub fn with_indicator(mut self, id: IndicatorId) -> Self {
        self.indicators.push(id);
        self
    }

    pub fn with_signal(mut self, id: SignalId) -> Self {
        self.signals.push(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indicators(&self) -> &[IndicatorId] {
        &self.indicators
    }

    pub fn signals(&self) -> &[SignalId] {
        &self.signals
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pin standalone indicators, then subscribe every signal.
    ///
    /// On failure everything acquired so far is released again.
    pub fn start(&mut self, network: &mut Network, actions: &dyn TradeActions) -> Result<(), GraphError> {
        if self.running {
            warn!(model = %self.name, "Model already running");
            return Ok(());
        }
        let (mut pinned, mut subscribed) = (0, 0);
        if let Err(e) = self.acquire(network, actions, &mut pinned, &mut subscribed) {
            warn!(model = %self.name, error = %e, "Model start failed, rolling back");
            for &id in self.signals[..subscribed].iter().rev() {
                network.unsubscribe_signal(id)?;
            }
            for &id in self.indicators[..pinned].iter().rev() {
                network.unpin(id)?;
            }
            return Err(e);
        }
        self.running = true;
        info!(model = %self.name, signals = self.signals.len(), "Model started");
        Ok(())
    }

    fn acquire(
        &self,
        network: &mut Network,
        actions: &dyn TradeActions,
        pinned: &mut usize,
        subscribed: &mut usize,
    ) -> Result<(), GraphError> {
        for &id in &self.indicators {
            network.pin(id)?;
            *pinned += 1;
        }
        for &id in &self.signals {
            let name = network.signal(id).name().to_string();
            network.subscribe_signal(id, actions.on_buy(&name), actions.on_sell(&name))?;
            *subscribed += 1;
        }
        Ok(())
    }

    /// Unsubscribe signals in reverse start order, then release indicators.
    pub fn stop(&mut self, network: &mut Network) -> Result<(), GraphError> {
        if !self.running {
            return Ok(());
        }
        for &id in self.signals.iter().rev() {
            network.unsubscribe_signal(id)?;
        }
        for &id in self.indicators.iter().rev() {
            network.unpin(id)?;
        }
        self.running = false;
        info!(model = %self.name, "Model stopped");
        Ok(())
    }
}
