//! Replay a recorded trading day end to end.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use midax_broker::PaperBroker;
use midax_config::AppConfig;
use midax_core::error::{DataError, TradingError};
use midax_core::traits::{Clock, ExecutionBoundary, NullPublisher, Publisher, ReplayClock, TickSource};
use midax_core::types::{MarketData, SessionLevels, SessionPhase};
use midax_data::{
    load_rows, ChannelPublisher, CsvPublisher, CsvTickSource, FanoutPublisher, MemoryPublisher,
};
use midax_engine::{Model, Network};
use midax_strategies::ModelRegistry;

use crate::desk::{DispatchSummary, Dispatcher, TradingDesk};
use crate::trader::{SessionStats, Trader};
use crate::validation::{ValidationSummary, Validator};
use crate::window::TradingWindow;

/// What a replay did.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub window: TradingWindow,
    pub phase: SessionPhase,
    pub stats: SessionStats,
    pub dispatch: DispatchSummary,
    /// Set when expected results were configured
    pub validation: Option<ValidationSummary>,
}

/// Drives a [`Trader`] from CSV files with a paper broker.
pub struct ReplaySession {
    config: AppConfig,
    registry: ModelRegistry,
    phase_tx: watch::Sender<SessionPhase>,
}

impl ReplaySession {
    pub fn new(config: AppConfig) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::NotStarted);
        Self {
            config,
            registry: ModelRegistry::new(),
            phase_tx,
        }
    }

    /// Receive the replayed session's phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Wire markets and models into a fresh graph.
    fn build(&self, publisher: Arc<dyn Publisher>) -> Result<(Network, Vec<Model>), TradingError> {
        let mut network = Network::new(publisher);
        for instrument in &self.config.instruments {
            let market = MarketData::from_descriptor(&instrument.descriptor);
            let id = match network.market_id(&market.id) {
                Ok(id) => id,
                Err(_) => network.add_market(market)?,
            };
            if let Some(previous) = instrument.previous {
                network.market_mut(id).set_levels(SessionLevels::from_high_low_close(
                    previous.high,
                    previous.low,
                    previous.close,
                ));
            }
        }

        let mut models = Vec::new();
        for settings in &self.config.models {
            let mut params = settings.params.clone();
            if let Some(map) = params.as_object_mut() {
                map.entry("time_decay_factor")
                    .or_insert_with(|| self.config.trading.time_decay_factor.to_string().into());
            }
            let model = self
                .registry
                .create(&settings.name, params, &settings.instrument, &mut network)?;
            info!(model = %settings.name, instrument = %settings.instrument, "Model built");
            models.push(model);
        }
        Ok((network, models))
    }

    fn broker(&self, clock: Arc<dyn Clock>) -> Arc<dyn ExecutionBoundary> {
        let trading = &self.config.trading;
        let mut broker = PaperBroker::with_clock(clock).with_slippage(trading.slippage_pct);
        if let Some(limit) = trading.max_size {
            broker = broker.with_max_size(limit);
        }
        Arc::new(broker)
    }

    /// Replay into the configured CSV output, or nowhere when none is set.
    pub async fn run_configured(&self) -> Result<ReplayReport, TradingError> {
        let publisher: Arc<dyn Publisher> = match &self.config.publishing.csv {
            Some(path) => Arc::new(CsvPublisher::create(path)?),
            None => Arc::new(NullPublisher),
        };
        self.run(publisher).await
    }

    /// Replay every configured file, then validate if expected results are
    /// configured.
    pub async fn run(&self, publisher: Arc<dyn Publisher>) -> Result<ReplayReport, TradingError> {
        let source = CsvTickSource::new(self.config.replay.files.clone())?;
        let mut ticks = source.subscribe(&[]).await?;
        let Some(first) = ticks.recv().await else {
            return Err(DataError::NoDataAvailable(source.name().to_string()).into());
        };

        let memory = Arc::new(MemoryPublisher::new());
        let mut fanout = FanoutPublisher::new(vec![publisher.clone()]);
        if self.config.replay.expected.is_some() {
            fanout.push(memory.clone());
        }
        let (channel, writer) = ChannelPublisher::spawn(Arc::new(fanout));
        let channel: Arc<dyn Publisher> = Arc::new(channel);

        let (network, models) = self.build(channel.clone())?;
        let date = self.config.session.date.unwrap_or_else(|| first.timestamp.date_naive());
        let window = TradingWindow::from_session(&self.config.session, date);
        let clock = Arc::new(ReplayClock::new(first.timestamp));

        let (mut desk, desk_rx) = TradingDesk::new(self.config.trading.size);
        if let Some(signal) = &self.config.trading.signal {
            desk = desk.restrict_to(signal.clone());
        }
        let dispatcher = Dispatcher::new(self.broker(clock.clone()), channel.clone(), clock.clone()).spawn(desk_rx);

        let mut trader = Trader::new(network, models, window, desk).with_phase_channel(self.phase_tx.clone());
        trader.init(clock.clone())?;

        let mut result = Ok(());
        let mut next = Some(first);
        while let Some(tick) = next {
            clock.advance(tick.timestamp);
            if let Err(e) = trader.on_tick(&tick) {
                result = Err(e);
                break;
            }
            next = ticks.recv().await;
        }
        drop(ticks);

        if result.is_ok() {
            clock.advance(window.stop);
            trader.poll()?;
        }
        trader.shutdown()?;

        let stats = trader.stats();
        let phase = trader.phase();
        drop(trader);
        let dispatch = dispatcher
            .await
            .map_err(|e| TradingError::Internal(e.to_string()))?;
        drop(channel);
        writer.await.map_err(|e| TradingError::Internal(e.to_string()))?;
        if let Err(e) = publisher.flush() {
            warn!(error = %e, "Flush failed");
        }
        result?;

        info!(
            ticks = stats.ticks,
            ignored = stats.ignored,
            trades = stats.trades,
            confirmed = dispatch.confirmed,
            "Replay finished"
        );

        let validation = match &self.config.replay.expected {
            Some(path) => {
                let expected = load_rows(path)?;
                let summary = Validator::new(expected, self.config.replay.tolerance).check(&memory.rows())?;
                Some(summary)
            }
            None => None,
        };

        Ok(ReplayReport {
            window,
            phase,
            stats,
            dispatch,
            validation,
        })
    }
}
