//! MacD model: fast/slow average crossover.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use midax_core::error::{SignalError, StrategyError};
use midax_core::{Action, Price, SourceId};
use midax_engine::{GraphView, Model, Network, Signal, SignalLogic};
use midax_indicators::{TimeDecay, WeightedMovingAverage};

use crate::crossover::Crossover;
use crate::{average_name, ensure_market, ModelConfig};

/// Configuration for the MacD model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    /// Instrument descriptor (`Name:ID` or ID)
    pub instrument: String,
    /// Fast average window in minutes
    pub fast_minutes: i64,
    /// Slow average window in minutes
    pub slow_minutes: i64,
    /// Weight samples by traded volume
    pub volume_weighted: bool,
    /// Newest/oldest weight ratio; 1 disables decay
    pub time_decay_factor: Decimal,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            instrument: String::new(),
            fast_minutes: 10,
            slow_minutes: 60,
            volume_weighted: false,
            time_decay_factor: Decimal::ONE,
        }
    }
}

impl ModelConfig for MacdConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_minutes <= 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_minutes >= self.slow_minutes {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if self.instrument.is_empty() {
            return Err(StrategyError::InvalidConfig("Instrument required".into()));
        }
        if self.time_decay_factor <= Decimal::ZERO {
            return Err(StrategyError::InvalidConfig(
                "Time decay factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Buys when the fast average crosses above the slow one, sells on the way
/// down.
#[derive(Debug, Clone)]
pub struct MacdSignal {
    crossover: Crossover,
}

impl MacdSignal {
    pub fn new(crossover: Crossover) -> Self {
        Self { crossover }
    }
}

impl SignalLogic for MacdSignal {
    fn process(
        &mut self,
        view: &GraphView<'_>,
        _source: SourceId,
        as_of: DateTime<Utc>,
        _value: &Price,
    ) -> Result<Option<Action>, SignalError> {
        Ok(self.crossover.update(view, as_of))
    }

    fn reset(&mut self) {
        self.crossover.reset();
    }
}

/// Build a time-weighted average over one instrument.
pub(crate) fn average(
    volume_weighted: bool,
    minutes: i64,
    instrument: &str,
    decay: TimeDecay,
) -> WeightedMovingAverage {
    let period = TimeDelta::minutes(minutes);
    if volume_weighted {
        WeightedMovingAverage::volume_weighted(average_name("VWMA", minutes, instrument), period, decay)
    } else {
        WeightedMovingAverage::new(average_name("WMA", minutes, instrument), period, decay)
    }
}

pub(crate) fn decay_of(factor: Decimal) -> Result<TimeDecay, StrategyError> {
    TimeDecay::from_factor(factor).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

/// Wire the MacD model into `network`.
pub fn build_macd(network: &mut Network, config: &MacdConfig) -> Result<Model, StrategyError> {
    config.validate()?;
    let decay = decay_of(config.time_decay_factor)?;
    let market = ensure_market(network, &config.instrument)?;
    let id = network.market(market).id.clone();

    let fast = network.get_or_add_indicator(
        average(config.volume_weighted, config.fast_minutes, &id, decay),
        market.into(),
        None,
    )?;
    let slow = network.get_or_add_indicator(
        average(config.volume_weighted, config.slow_minutes, &id, decay),
        market.into(),
        None,
    )?;

    let name = format!("MacD_{}_{}_{}", config.fast_minutes, config.slow_minutes, id);
    let logic = MacdSignal::new(Crossover::new(fast, slow));
    let signal = network.add_signal(Signal::new(name.clone(), market, market, vec![fast, slow], logic))?;
    debug!(signal = %name, "Built MacD model");

    Ok(Model::new("macd").with_signal(signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use midax_core::traits::NullPublisher;
    use midax_core::{SignalCode, Tick};
    use midax_engine::{SignalEvent, TradeActions, TradeCallback};
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Collect(Arc<Mutex<Vec<Action>>>);

    impl TradeActions for Collect {
        fn on_buy(&self, _signal: &str) -> TradeCallback {
            let seen = self.0.clone();
            Box::new(move |e: &SignalEvent| {
                seen.lock().unwrap().push(e.action);
                true
            })
        }

        fn on_sell(&self, signal: &str) -> TradeCallback {
            self.on_buy(signal)
        }
    }

    fn config() -> MacdConfig {
        MacdConfig {
            instrument: "DAX:IX.D.DAX.DAILY.IP".into(),
            fast_minutes: 1,
            slow_minutes: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.slow_minutes = 1;
        assert!(bad.validate().is_err());

        bad = config();
        bad.instrument.clear();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_macd_crossovers() {
        let mut network = Network::new(Arc::new(NullPublisher));
        let mut model = build_macd(&mut network, &config()).unwrap();
        let actions = Collect::default();
        model.start(&mut network, &actions).unwrap();

        let start = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        // flat, then a rally, then a sell-off; one tick every 10s
        let mut level = dec!(10000);
        for step in 0..120 {
            if (30..60).contains(&step) {
                level += dec!(5);
            } else if step >= 60 {
                level -= dec!(5);
            }
            let tick = Tick::new(
                "IX.D.DAX.DAILY.IP",
                start + TimeDelta::seconds(step * 10),
                level,
                level + dec!(1),
            );
            network.on_tick(&tick).unwrap();
        }

        let seen = actions.0.lock().unwrap().clone();
        assert_eq!(seen, vec![Action::Buy, Action::Sell]);
        let signal = network.signal(model.signals()[0]);
        assert_eq!(signal.name(), "MacD_1_3_IX.D.DAX.DAILY.IP");
        assert_ne!(signal.code(), SignalCode::Unknown);
    }
}
