//! Session state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use midax_core::error::TradingError;
use midax_core::traits::Clock;
use midax_core::types::{SessionPhase, Tick};
use midax_engine::{Model, Network, TickOutcome};

use crate::desk::TradingDesk;
use crate::window::TradingWindow;

/// Invoked once when the session stops.
pub type ShutdownCallback = Box<dyn FnOnce() + Send>;

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Ticks recorded into the graph
    pub ticks: usize,
    /// Ticks outside the publishing window or after the session
    pub ignored: usize,
    /// Trades taken by the desk
    pub trades: usize,
    pub signal_failures: usize,
}

/// Runs the models of one trading day.
///
/// `NotStarted -> Active -> Closing -> Stopped`, following the clock handed
/// to [`init`](Self::init). Ticks are recorded from the start of the
/// publishing window so averages have history when trading starts.
pub struct Trader {
    network: Network,
    models: Vec<Model>,
    window: TradingWindow,
    desk: TradingDesk,
    clock: Option<Arc<dyn Clock>>,
    phase: SessionPhase,
    phase_tx: watch::Sender<SessionPhase>,
    on_shutdown: Option<ShutdownCallback>,
    stats: SessionStats,
}

impl Trader {
    pub fn new(network: Network, models: Vec<Model>, window: TradingWindow, desk: TradingDesk) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::NotStarted);
        Self {
            network,
            models,
            window,
            desk,
            clock: None,
            phase: SessionPhase::NotStarted,
            phase_tx,
            on_shutdown: None,
            stats: SessionStats::default(),
        }
    }

    /// Set the callback run when the session stops.
    pub fn on_shutdown<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_shutdown = Some(Box::new(callback));
        self
    }

    /// Broadcast phases on an existing channel.
    pub fn with_phase_channel(mut self, phase_tx: watch::Sender<SessionPhase>) -> Self {
        phase_tx.send_replace(self.phase);
        self.phase_tx = phase_tx;
        self
    }

    /// Receive phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Attach the clock and catch up with the schedule.
    pub fn init(&mut self, clock: Arc<dyn Clock>) -> Result<SessionPhase, TradingError> {
        info!(
            models = self.models.len(),
            trading_start = %self.window.trading_start,
            stop = %self.window.stop,
            "Trader initialised"
        );
        self.clock = Some(clock);
        self.poll()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn window(&self) -> &TradingWindow {
        &self.window
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Mutable graph access, e.g. to set session levels before trading.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn now(&self) -> Result<DateTime<Utc>, TradingError> {
        self.clock
            .as_ref()
            .map(|clock| clock.now())
            .ok_or_else(|| TradingError::Internal("trader used before init".to_string()))
    }

    /// Move through every phase the clock has reached.
    pub fn poll(&mut self) -> Result<SessionPhase, TradingError> {
        let now = self.now()?;
        let target = self.window.phase_at(now);
        while self.phase < target {
            match self.phase {
                SessionPhase::NotStarted => self.start_trading(now)?,
                SessionPhase::Active => self.set_phase(SessionPhase::Closing),
                SessionPhase::Closing | SessionPhase::Stopped => self.stop(now)?,
            }
        }
        Ok(self.phase)
    }

    /// Record a tick and run the models on it.
    ///
    /// A tick that breaks time ordering stops the session.
    pub fn on_tick(&mut self, tick: &Tick) -> Result<(), TradingError> {
        self.poll()?;
        if self.phase == SessionPhase::Stopped || !self.window.is_publishing(tick.timestamp) {
            trace!(instrument = %tick.instrument, time = %tick.timestamp, "Tick ignored");
            self.stats.ignored += 1;
            return Ok(());
        }

        match self.network.on_tick(tick) {
            Ok(outcome) => {
                self.stats.ticks += 1;
                self.handle_outcome(outcome);
                Ok(())
            }
            Err(e) => {
                error!(instrument = %tick.instrument, error = %e, "Stopping session");
                let now = self.now()?;
                if let Err(stop_err) = self.stop(now) {
                    warn!(error = %stop_err, "Session did not stop cleanly");
                }
                Err(e.into())
            }
        }
    }

    /// Stop the session now, whatever the schedule says.
    pub fn shutdown(&mut self) -> Result<(), TradingError> {
        if self.phase == SessionPhase::Stopped {
            return Ok(());
        }
        let now = self.now()?;
        self.stop(now)
    }

    fn start_trading(&mut self, now: DateTime<Utc>) -> Result<(), TradingError> {
        self.set_phase(SessionPhase::Active);
        for model in &mut self.models {
            model.start(&mut self.network, &self.desk)?;
        }
        let outcome = self.network.publish_levels(now)?;
        self.handle_outcome(outcome);
        Ok(())
    }

    fn stop(&mut self, now: DateTime<Utc>) -> Result<(), TradingError> {
        let published = self.network.publish_daily_means(now);
        for model in self.models.iter_mut().rev() {
            if let Err(e) = model.stop(&mut self.network) {
                warn!(model = %model.name(), error = %e, "Model did not stop cleanly");
            }
        }
        self.set_phase(SessionPhase::Stopped);
        self.desk.close_all(now);

        if let Some(callback) = self.on_shutdown.take() {
            callback();
        }
        info!(
            ticks = self.stats.ticks,
            ignored = self.stats.ignored,
            trades = self.stats.trades,
            "Session stopped"
        );

        let outcome = published?;
        self.handle_outcome(outcome);
        Ok(())
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        info!(from = %self.phase, to = %phase, "Session phase");
        self.phase = phase;
        self.desk.set_phase(phase);
        self.phase_tx.send_replace(phase);
    }

    fn handle_outcome(&mut self, outcome: TickOutcome) {
        for event in &outcome.events {
            debug!(signal = %event.signal, action = %event.action, price = %event.recorded_price(), "Trade taken");
        }
        self.stats.trades += outcome.events.len();
        for failure in outcome.failures {
            warn!(signal = %failure.signal, error = %failure.error, "Signal failed");
            self.stats.signal_failures += 1;
        }
    }
}
