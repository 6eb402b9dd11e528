//! The market/indicator/signal graph.
//!
//! Nodes live in arenas addressed by typed ids. A tick is recorded on its
//! market and then pushed synchronously, depth first, through the subscriber
//! registries: every side effect of one tick is applied before the next tick
//! is accepted.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use midax_core::error::{GraphError, SeriesError, SignalError};
use midax_core::traits::{publish_or_log, IndicatorInputs, Publisher, Record, TickIndicator};
use midax_core::{
    IndicatorId, MarketData, MarketId, Price, SignalCode, SignalId, SourceId, Subscriber,
    SubscriberList, Tick, TimeSeries,
};
use midax_indicators::IndicatorKind;

use crate::signal::{Signal, SignalEvent, TradeCallback};

/// Signals are served after every indicator listening to the same source.
const SIGNAL_SORT_KEY: i32 = i32::MAX;

/// Graph bookkeeping for one indicator.
#[derive(Debug)]
pub struct IndicatorNode {
    name: String,
    source: SourceId,
    companion: Option<IndicatorId>,
    depth: i32,
    series: TimeSeries,
    subscribers: SubscriberList,
    holds: usize,
}

impl IndicatorNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn companion(&self) -> Option<IndicatorId> {
        self.companion
    }

    /// Published values.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Whether anything currently depends on this indicator.
    pub fn is_active(&self) -> bool {
        self.holds > 0
    }
}

/// A signal evaluation that raised an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFailure {
    pub signal: String,
    pub error: SignalError,
}

/// Side effects of one propagation.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Decisions whose callbacks took the trade
    pub events: Vec<SignalEvent>,
    /// Signal errors, already isolated from other subscribers
    pub failures: Vec<SignalFailure>,
}

impl TickOutcome {
    fn merge(&mut self, other: TickOutcome) {
        self.events.extend(other.events);
        self.failures.extend(other.failures);
    }
}

/// Read-only view of markets and indicator outputs handed to signal logic.
#[derive(Clone, Copy)]
pub struct GraphView<'a> {
    markets: &'a [MarketData],
    nodes: &'a [IndicatorNode],
}

impl<'a> GraphView<'a> {
    pub fn market(&self, id: MarketId) -> &'a MarketData {
        &self.markets[id.0]
    }

    /// Published values of an indicator.
    pub fn indicator(&self, id: IndicatorId) -> &'a TimeSeries {
        &self.nodes[id.0].series
    }

    /// Value an indicator published at exactly `time`.
    pub fn indicator_at(&self, id: IndicatorId, time: DateTime<Utc>) -> Option<&'a Price> {
        self.nodes[id.0].series.lookup(time)
    }

    /// Series behind any source.
    pub fn series(&self, source: SourceId) -> &'a TimeSeries {
        series_of(self.markets, self.nodes, source)
    }
}

fn series_of<'a>(markets: &'a [MarketData], nodes: &'a [IndicatorNode], source: SourceId) -> &'a TimeSeries {
    match source {
        SourceId::Market(id) => markets[id.0].series(),
        SourceId::Indicator(id) => &nodes[id.0].series,
    }
}

/// Indicator and signal graph rooted at markets.
pub struct Network {
    markets: Vec<MarketData>,
    market_index: HashMap<String, MarketId>,
    nodes: Vec<IndicatorNode>,
    states: Vec<IndicatorKind>,
    signals: Vec<Signal>,
    publisher: Arc<dyn Publisher>,
}

impl Network {
    /// Create an empty graph publishing to `publisher`.
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            markets: Vec::new(),
            market_index: HashMap::new(),
            nodes: Vec::new(),
            states: Vec::new(),
            signals: Vec::new(),
            publisher,
        }
    }

    pub fn publisher(&self) -> &Arc<dyn Publisher> {
        &self.publisher
    }

    // ----- construction -----

    /// Register a market.
    pub fn add_market(&mut self, market: MarketData) -> Result<MarketId, GraphError> {
        if self.market_index.contains_key(&market.id) {
            return Err(GraphError::DuplicateMarket(market.id));
        }
        let id = MarketId(self.markets.len());
        self.market_index.insert(market.id.clone(), id);
        self.markets.push(market);
        Ok(id)
    }

    /// Look up a market by instrument id.
    pub fn market_id(&self, instrument: &str) -> Result<MarketId, GraphError> {
        self.market_index
            .get(instrument)
            .copied()
            .ok_or_else(|| GraphError::UnknownMarket(instrument.to_string()))
    }

    /// Register an indicator fed by `source`.
    ///
    /// An indicator with a companion is placed behind it in every registry
    /// they share, so the companion sees each tick first.
    pub fn add_indicator(
        &mut self,
        indicator: impl Into<IndicatorKind>,
        source: SourceId,
        companion: Option<IndicatorId>,
    ) -> Result<IndicatorId, GraphError> {
        let indicator = indicator.into();
        let name = indicator.name().to_string();
        self.check_source(source)?;

        let mut depth = match source {
            SourceId::Market(_) => 0,
            SourceId::Indicator(id) => self.nodes[id.0].depth + 1,
        };

        match (indicator.needs_companion(), companion) {
            (true, None) => {
                return Err(GraphError::InvalidCompanion {
                    indicator: name,
                    companion: "none".to_string(),
                    reason: "a companion average is required".to_string(),
                })
            }
            (false, Some(c)) => {
                return Err(GraphError::InvalidCompanion {
                    indicator: name,
                    companion: self.node(c)?.name.clone(),
                    reason: "indicator does not use a companion".to_string(),
                })
            }
            (true, Some(c)) => {
                let node = self.node(c)?;
                if node.source != source {
                    return Err(GraphError::InvalidCompanion {
                        indicator: name,
                        companion: node.name.clone(),
                        reason: "companion must share the same source".to_string(),
                    });
                }
                depth = depth.max(node.depth + 1);
            }
            (false, None) => {}
        }

        let id = IndicatorId(self.nodes.len());
        debug!(indicator = %name, %source, depth, "Adding indicator");
        self.nodes.push(IndicatorNode {
            name,
            source,
            companion,
            depth,
            series: TimeSeries::new(),
            subscribers: SubscriberList::new(),
            holds: 0,
        });
        self.states.push(indicator);
        Ok(id)
    }

    /// Reuse an indicator with the same name, or register a new one.
    pub fn get_or_add_indicator(
        &mut self,
        indicator: impl Into<IndicatorKind>,
        source: SourceId,
        companion: Option<IndicatorId>,
    ) -> Result<IndicatorId, GraphError> {
        let indicator = indicator.into();
        match self.indicator_id(indicator.name()) {
            Some(id) => Ok(id),
            None => self.add_indicator(indicator, source, companion),
        }
    }

    /// Register a signal.
    pub fn add_signal(&mut self, signal: Signal) -> Result<SignalId, GraphError> {
        self.check_source(SourceId::Market(signal.reference()))?;
        self.check_source(SourceId::Market(signal.trading()))?;
        for &ind in signal.indicators() {
            self.node(ind)?;
        }
        let id = SignalId(self.signals.len());
        self.signals.push(signal);
        Ok(id)
    }

    fn check_source(&self, source: SourceId) -> Result<(), GraphError> {
        match source {
            SourceId::Market(id) if id.0 >= self.markets.len() => {
                Err(GraphError::UnknownMarket(format!("#{}", id.0)))
            }
            SourceId::Indicator(id) => self.node(id).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn node(&self, id: IndicatorId) -> Result<&IndicatorNode, GraphError> {
        self.nodes.get(id.0).ok_or(GraphError::UnknownIndicator(id.0))
    }

    // ----- queries -----

    pub fn market(&self, id: MarketId) -> &MarketData {
        &self.markets[id.0]
    }

    pub fn market_mut(&mut self, id: MarketId) -> &mut MarketData {
        &mut self.markets[id.0]
    }

    pub fn markets(&self) -> &[MarketData] {
        &self.markets
    }

    pub fn indicator(&self, id: IndicatorId) -> &IndicatorNode {
        &self.nodes[id.0]
    }

    /// All indicators, in creation order.
    pub fn indicators(&self) -> &[IndicatorNode] {
        &self.nodes
    }

    /// Find an indicator by name.
    pub fn indicator_id(&self, name: &str) -> Option<IndicatorId> {
        self.nodes.iter().position(|n| n.name == name).map(IndicatorId)
    }

    /// Last computed value of an indicator.
    pub fn indicator_value(&self, id: IndicatorId) -> Option<Price> {
        self.states[id.0].current()
    }

    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0]
    }

    pub fn signal_code(&self, id: SignalId) -> SignalCode {
        self.signals[id.0].code()
    }

    pub fn view(&self) -> GraphView<'_> {
        GraphView {
            markets: &self.markets,
            nodes: &self.nodes,
        }
    }

    // ----- activation -----

    /// Keep an indicator and everything it reads from subscribed.
    pub fn pin(&mut self, id: IndicatorId) -> Result<(), GraphError> {
        self.node(id)?;
        self.acquire(id);
        Ok(())
    }

    /// Drop a hold taken with [`pin`](Self::pin).
    pub fn unpin(&mut self, id: IndicatorId) -> Result<(), GraphError> {
        if !self.node(id)?.is_active() {
            return Ok(());
        }
        self.release(id);
        Ok(())
    }

    fn acquire(&mut self, id: IndicatorId) {
        let node = &mut self.nodes[id.0];
        node.holds += 1;
        if node.holds > 1 {
            return;
        }
        let (source, companion, depth) = (node.source, node.companion, node.depth);

        // Upstream first so a cascade is live before its consumer
        if let Some(c) = companion {
            self.acquire(c);
        }
        if let SourceId::Indicator(up) = source {
            self.acquire(up);
        }
        if self.states[id.0].is_streaming() {
            self.subscribers_of(source)
                .subscribe(Subscriber::Indicator(id), depth);
        }
        trace!(indicator = %self.nodes[id.0].name, "Indicator activated");
    }

    fn release(&mut self, id: IndicatorId) {
        let node = &mut self.nodes[id.0];
        node.holds = node.holds.saturating_sub(1);
        if node.holds > 0 {
            return;
        }
        let (source, companion) = (node.source, node.companion);

        self.subscribers_of(source).unsubscribe(Subscriber::Indicator(id));
        if let SourceId::Indicator(up) = source {
            self.release(up);
        }
        if let Some(c) = companion {
            self.release(c);
        }
        self.states[id.0].reset();
        trace!(indicator = %self.nodes[id.0].name, "Indicator deactivated");
    }

    fn subscribers_of(&mut self, source: SourceId) -> &mut SubscriberList {
        match source {
            SourceId::Market(id) => self.markets[id.0].subscribers_mut(),
            SourceId::Indicator(id) => &mut self.nodes[id.0].subscribers,
        }
    }

    /// Attach a signal to its indicators in declaration order.
    pub fn subscribe_signal(
        &mut self,
        id: SignalId,
        on_buy: TradeCallback,
        on_sell: TradeCallback,
    ) -> Result<(), GraphError> {
        let signal = self
            .signals
            .get(id.0)
            .ok_or(GraphError::UnknownSignal(id.0))?;
        if signal.is_subscribed() {
            return Err(GraphError::AlreadySubscribed(signal.name().to_string()));
        }
        let indicators = signal.indicators().to_vec();

        for ind in indicators {
            self.acquire(ind);
            self.nodes[ind.0]
                .subscribers
                .subscribe(Subscriber::Signal(id), SIGNAL_SORT_KEY);
        }
        let signal = &mut self.signals[id.0];
        signal.attach(on_buy, on_sell);
        debug!(signal = %signal.name(), "Signal subscribed");
        Ok(())
    }

    /// Detach a signal from its indicators in reverse order.
    ///
    /// Returns false when the signal was not subscribed.
    pub fn unsubscribe_signal(&mut self, id: SignalId) -> Result<bool, GraphError> {
        let signal = self
            .signals
            .get(id.0)
            .ok_or(GraphError::UnknownSignal(id.0))?;
        if !signal.is_subscribed() {
            return Ok(false);
        }
        let indicators = signal.indicators().to_vec();

        for ind in indicators.into_iter().rev() {
            self.nodes[ind.0]
                .subscribers
                .unsubscribe(Subscriber::Signal(id));
            self.release(ind);
        }
        let signal = &mut self.signals[id.0];
        signal.detach();
        debug!(signal = %signal.name(), "Signal unsubscribed");
        Ok(true)
    }

    // ----- propagation -----

    /// Record a tick and propagate it.
    ///
    /// Ticks for unknown instruments are ignored. Only a broken tick order
    /// is an error; signal failures are returned in the outcome.
    pub fn on_tick(&mut self, tick: &Tick) -> Result<TickOutcome, SeriesError> {
        let mut outcome = TickOutcome::default();
        let Some(&id) = self.market_index.get(&tick.instrument) else {
            trace!(instrument = %tick.instrument, "Ignoring tick for unknown instrument");
            return Ok(outcome);
        };

        let price = tick.price();
        self.markets[id.0].record(tick.timestamp, price)?;
        publish_or_log(
            self.publisher.as_ref(),
            Record::Price {
                instrument: tick.instrument.clone(),
                time: tick.timestamp,
                price,
            },
        );

        let subscribers = self.markets[id.0].subscribers().snapshot();
        for subscriber in subscribers {
            self.deliver(SourceId::Market(id), subscriber, tick.timestamp, &price, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn deliver(
        &mut self,
        source: SourceId,
        subscriber: Subscriber,
        as_of: DateTime<Utc>,
        value: &Price,
        outcome: &mut TickOutcome,
    ) -> Result<(), SeriesError> {
        match subscriber {
            Subscriber::Indicator(id) => {
                let Network {
                    markets,
                    nodes,
                    states,
                    ..
                } = &mut *self;
                let node = &nodes[id.0];
                let inputs = IndicatorInputs {
                    source: series_of(markets, nodes, node.source),
                    companion: node.companion.map(|c| &nodes[c.0].series),
                };
                let produced = states[id.0].on_tick(&inputs, as_of);
                if let Some(value) = produced {
                    self.emit(id, as_of, value, outcome)?;
                }
            }
            Subscriber::Signal(id) => {
                let Network {
                    markets,
                    nodes,
                    signals,
                    publisher,
                    ..
                } = &mut *self;
                let view = GraphView {
                    markets: markets.as_slice(),
                    nodes: nodes.as_slice(),
                };
                let signal = &mut signals[id.0];
                match signal.evaluate(&view, source, as_of, value) {
                    Ok(Some(event)) => {
                        debug!(signal = %event.signal, action = %event.action, time = %as_of, "Signal fired");
                        publish_or_log(
                            publisher.as_ref(),
                            Record::Signal {
                                id: event.signal.clone(),
                                time: as_of,
                                code: event.action.code(),
                                value: event.recorded_price(),
                            },
                        );
                        outcome.events.push(event);
                    }
                    Ok(None) => {}
                    Err(error) => outcome.failures.push(SignalFailure {
                        signal: signal.name().to_string(),
                        error,
                    }),
                }
            }
        }
        Ok(())
    }

    /// Publish an indicator value and fan it out.
    fn emit(
        &mut self,
        id: IndicatorId,
        as_of: DateTime<Utc>,
        value: Price,
        outcome: &mut TickOutcome,
    ) -> Result<(), SeriesError> {
        let node = &mut self.nodes[id.0];
        node.series.insert(as_of, value)?;
        publish_or_log(
            self.publisher.as_ref(),
            Record::Indicator {
                id: node.name.clone(),
                time: as_of,
                value,
            },
        );

        let subscribers = node.subscribers.snapshot();
        for subscriber in subscribers {
            self.deliver(SourceId::Indicator(id), subscriber, as_of, &value, outcome)?;
        }
        Ok(())
    }

    /// Publish every active session-level indicator.
    ///
    /// Instruments without levels are logged and skipped.
    pub fn publish_levels(&mut self, as_of: DateTime<Utc>) -> Result<TickOutcome, SeriesError> {
        let mut outcome = TickOutcome::default();
        for idx in 0..self.nodes.len() {
            let id = IndicatorId(idx);
            let IndicatorKind::Level(level) = &self.states[idx] else {
                continue;
            };
            if !self.nodes[idx].is_active() {
                continue;
            }
            let levels = match self.nodes[idx].source {
                SourceId::Market(m) => self.markets[m.0].levels(),
                SourceId::Indicator(_) => None,
            };
            match level.publish(levels) {
                Ok(value) => {
                    let mut sub = TickOutcome::default();
                    self.emit(id, as_of, value, &mut sub)?;
                    outcome.merge(sub);
                }
                Err(e) => warn!(indicator = %self.nodes[idx].name, error = %e, "Level not published"),
            }
        }
        Ok(outcome)
    }

    /// Publish every active daily mean.
    pub fn publish_daily_means(&mut self, as_of: DateTime<Utc>) -> Result<TickOutcome, SeriesError> {
        let mut outcome = TickOutcome::default();
        for idx in 0..self.nodes.len() {
            let id = IndicatorId(idx);
            let IndicatorKind::DailyMean(mean) = &self.states[idx] else {
                continue;
            };
            if !self.nodes[idx].is_active() {
                continue;
            }
            let result = mean.publish(series_of(&self.markets, &self.nodes, self.nodes[idx].source), as_of);
            match result {
                Ok(value) => {
                    let mut sub = TickOutcome::default();
                    self.emit(id, as_of, value, &mut sub)?;
                    outcome.merge(sub);
                }
                Err(e) => warn!(indicator = %self.nodes[idx].name, error = %e, "Daily mean not published"),
            }
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("markets", &self.markets.len())
            .field("indicators", &self.nodes.len())
            .field("signals", &self.signals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalLogic;
    use chrono::{TimeDelta, TimeZone};
    use midax_core::{Action, SessionLevels};
    use midax_indicators::{LevelIndicator, TimeDecay, WeightedMovingAverage};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        records: Mutex<Vec<Record>>,
    }

    impl Recorder {
        fn signals(&self) -> Vec<(String, Price)> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter_map(|r| match r {
                    Record::Signal { id, value, .. } => Some((id.clone(), Price::flat(*value))),
                    _ => None,
                })
                .collect()
        }
    }

    impl Publisher for Recorder {
        fn publish(&self, record: Record) -> Result<(), midax_core::error::PersistenceError> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    /// Plays back a fixed list of decisions.
    struct Scripted(VecDeque<Action>);

    impl SignalLogic for Scripted {
        fn process(
            &mut self,
            _view: &GraphView<'_>,
            _source: SourceId,
            _as_of: DateTime<Utc>,
            _value: &Price,
        ) -> Result<Option<Action>, SignalError> {
            Ok(self.0.pop_front())
        }
    }

    struct Broken;

    impl SignalLogic for Broken {
        fn process(
            &mut self,
            _view: &GraphView<'_>,
            _source: SourceId,
            _as_of: DateTime<Utc>,
            _value: &Price,
        ) -> Result<Option<Action>, SignalError> {
            Err(SignalError::Failed {
                signal: "broken".into(),
                reason: "boom".into(),
            })
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn tick(secs: i64, bid: Decimal, offer: Decimal) -> Tick {
        Tick::new("DAX", at(secs), bid, offer)
    }

    fn accept() -> TradeCallback {
        Box::new(|_| true)
    }

    fn setup() -> (Network, Arc<Recorder>, MarketId, IndicatorId) {
        let recorder = Arc::new(Recorder::default());
        let mut network = Network::new(recorder.clone());
        let dax = network.add_market(MarketData::new("DAX", "DAX")).unwrap();
        let wma = network
            .add_indicator(
                WeightedMovingAverage::new("WMA_1s_DAX", TimeDelta::seconds(1), TimeDecay::Null),
                dax.into(),
                None,
            )
            .unwrap();
        (network, recorder, dax, wma)
    }

    #[test]
    fn test_buy_records_offer_and_sell_records_bid() {
        let (mut network, recorder, dax, wma) = setup();
        let logic = Scripted(VecDeque::from([Action::Buy, Action::Sell]));
        let sig = network
            .add_signal(Signal::new("MacD", dax, dax, vec![wma], logic))
            .unwrap();
        network.subscribe_signal(sig, accept(), accept()).unwrap();

        for secs in 0..=2 {
            network.on_tick(&tick(secs, dec!(100), dec!(101))).unwrap();
        }

        assert_eq!(
            recorder.signals(),
            vec![
                ("MacD".to_string(), Price::flat(dec!(101))),
                ("MacD".to_string(), Price::flat(dec!(100))),
            ]
        );
        assert_eq!(network.signal_code(sig), SignalCode::Sell);
        assert_eq!(network.signal(sig).last_trade().unwrap().action, Action::Sell);
    }

    #[test]
    fn test_replaced_tick_keeps_decision() {
        let (mut network, recorder, dax, wma) = setup();
        let logic = Scripted(VecDeque::from([Action::Buy, Action::Hold, Action::Sell]));
        let sig = network
            .add_signal(Signal::new("MacD", dax, dax, vec![wma], logic))
            .unwrap();
        network.subscribe_signal(sig, accept(), accept()).unwrap();

        network.on_tick(&tick(0, dec!(100), dec!(101))).unwrap();
        network.on_tick(&tick(1, dec!(100), dec!(101))).unwrap();
        network.on_tick(&tick(1, dec!(102), dec!(103))).unwrap();

        assert_eq!(network.signal_code(sig), SignalCode::Buy);
        assert_eq!(recorder.signals().len(), 1);

        network.on_tick(&tick(2, dec!(102), dec!(103))).unwrap();
        assert_eq!(network.signal_code(sig), SignalCode::Hold);
    }

    #[test]
    fn test_refused_trade_is_not_recorded() {
        let (mut network, recorder, dax, wma) = setup();
        let sig = network
            .add_signal(Signal::new("MacD", dax, dax, vec![wma], Scripted(VecDeque::from([Action::Buy]))))
            .unwrap();
        network
            .subscribe_signal(sig, Box::new(|_| false), accept())
            .unwrap();

        for secs in 0..=1 {
            network.on_tick(&tick(secs, dec!(100), dec!(101))).unwrap();
        }

        assert!(recorder.signals().is_empty());
        assert_eq!(network.signal_code(sig), SignalCode::Buy);
        assert!(network.signal(sig).last_trade().is_none());
    }

    #[test]
    fn test_subscription_lifecycle() {
        let (mut network, _recorder, dax, wma) = setup();
        let sig = network
            .add_signal(Signal::new("MacD", dax, dax, vec![wma], Scripted(VecDeque::new())))
            .unwrap();

        network.subscribe_signal(sig, accept(), accept()).unwrap();
        assert!(network.indicator(wma).is_active());
        assert_eq!(network.market(dax).subscribers().len(), 1);

        let err = network.subscribe_signal(sig, accept(), accept()).unwrap_err();
        assert_eq!(err, GraphError::AlreadySubscribed("MacD".into()));

        assert!(network.unsubscribe_signal(sig).unwrap());
        assert!(!network.unsubscribe_signal(sig).unwrap());
        assert!(!network.indicator(wma).is_active());
        assert!(network.market(dax).subscribers().is_empty());

        // can be subscribed again once detached
        network.subscribe_signal(sig, accept(), accept()).unwrap();
    }

    #[test]
    fn test_companion_is_updated_first() {
        let (mut network, _recorder, dax, _) = setup();
        let period = TimeDelta::seconds(2);
        let avg = network
            .add_indicator(WeightedMovingAverage::new("WMA_2s", period, TimeDecay::Null), dax.into(), None)
            .unwrap();
        let vol = network
            .add_indicator(WeightedMovingAverage::volatility("WMVol_2s", period, TimeDecay::Null), dax.into(), Some(avg))
            .unwrap();
        let other = network
            .add_indicator(WeightedMovingAverage::new("WMA_5s", TimeDelta::seconds(5), TimeDecay::Null), dax.into(), None)
            .unwrap();

        network.pin(vol).unwrap();
        network.pin(other).unwrap();
        assert_eq!(
            network.market(dax).subscribers().snapshot(),
            vec![
                Subscriber::Indicator(avg),
                Subscriber::Indicator(other),
                Subscriber::Indicator(vol),
            ]
        );

        for secs in 0..=6 {
            let mid = if secs % 2 == 0 { dec!(101) } else { dec!(99) };
            network.on_tick(&tick(secs, mid, mid)).unwrap();
        }
        assert_eq!(network.indicator_value(vol), Some(Price::flat(dec!(1))));
        assert!(network.indicator(vol).series().lookup(at(4)).is_some());

        network.unpin(vol).unwrap();
        assert!(!network.indicator(avg).is_active());
        assert!(network.indicator(other).is_active());
    }

    #[test]
    fn test_invalid_companion() {
        let (mut network, _recorder, dax, wma) = setup();
        let missing = network.add_indicator(
            WeightedMovingAverage::volatility("WMVol", TimeDelta::seconds(1), TimeDecay::Null),
            dax.into(),
            None,
        );
        assert!(matches!(missing, Err(GraphError::InvalidCompanion { .. })));

        let unused = network.add_indicator(
            WeightedMovingAverage::new("WMA", TimeDelta::seconds(1), TimeDecay::Null),
            dax.into(),
            Some(wma),
        );
        assert!(matches!(unused, Err(GraphError::InvalidCompanion { .. })));
    }

    #[test]
    fn test_signal_failure_is_isolated() {
        let (mut network, _recorder, dax, wma) = setup();
        let broken = network
            .add_signal(Signal::new("broken", dax, dax, vec![wma], Broken))
            .unwrap();
        let good = network
            .add_signal(Signal::new("good", dax, dax, vec![wma], Scripted(VecDeque::from([Action::Buy]))))
            .unwrap();
        network.subscribe_signal(broken, accept(), accept()).unwrap();
        network.subscribe_signal(good, accept(), accept()).unwrap();

        network.on_tick(&tick(0, dec!(100), dec!(101))).unwrap();
        let outcome = network.on_tick(&tick(1, dec!(100), dec!(101))).unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].signal, "broken");
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(network.signal_code(broken), SignalCode::Failed);
        assert_eq!(network.signal_code(good), SignalCode::Buy);
    }

    #[test]
    fn test_out_of_order_tick_is_rejected() {
        let (mut network, _recorder, _dax, _wma) = setup();
        network.on_tick(&tick(10, dec!(1), dec!(1))).unwrap();

        let err = network.on_tick(&tick(5, dec!(1), dec!(1))).unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrderInsertion { .. }));

        // unknown instruments are ignored
        let other = Tick::new("FTSE", at(0), dec!(1), dec!(1));
        assert!(network.on_tick(&other).unwrap().events.is_empty());
    }

    #[test]
    fn test_publish_levels() {
        let (mut network, recorder, dax, _) = setup();
        let pivot = network
            .add_indicator(LevelIndicator::new(midax_core::Level::Pivot, "DAX"), dax.into(), None)
            .unwrap();
        network.pin(pivot).unwrap();

        // no levels yet: skipped
        network.publish_levels(at(0)).unwrap();
        assert!(network.indicator(pivot).series().is_empty());

        network
            .market_mut(dax)
            .set_levels(SessionLevels::from_high_low_close(dec!(110), dec!(90), dec!(100)));
        network.publish_levels(at(1)).unwrap();
        assert_eq!(network.indicator(pivot).series().lookup(at(1)), Some(&Price::flat(dec!(100))));
        assert!(recorder
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.id() == "LVLPivot_DAX"));
    }
}
