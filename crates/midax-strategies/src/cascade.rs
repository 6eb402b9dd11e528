//! MacD cascade: slower crossover gated by volatility.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use midax_core::error::{SignalError, StrategyError};
use midax_core::{Action, IndicatorId, Price, SourceId};
use midax_engine::{GraphView, Model, Network, Signal, SignalLogic};
use midax_indicators::WeightedMovingAverage;

use crate::crossover::Crossover;
use crate::macd::{average, decay_of};
use crate::{average_name, ensure_market, ModelConfig};

/// Configuration for the cascade model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Instrument descriptor (`Name:ID` or ID)
    pub instrument: String,
    /// Faster average of the crossover, in minutes; also the volatility window
    pub mid_minutes: i64,
    /// Slower average of the crossover, in minutes
    pub slow_minutes: i64,
    /// Crossovers are ignored while volatility is below this level
    pub min_volatility: Decimal,
    /// Newest/oldest weight ratio; 1 disables decay
    pub time_decay_factor: Decimal,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            instrument: String::new(),
            mid_minutes: 30,
            slow_minutes: 90,
            min_volatility: Decimal::TWO,
            time_decay_factor: Decimal::ONE,
        }
    }
}

impl ModelConfig for CascadeConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.mid_minutes <= 0 {
            return Err(StrategyError::InvalidConfig(
                "Mid period must be greater than 0".into(),
            ));
        }
        if self.mid_minutes >= self.slow_minutes {
            return Err(StrategyError::InvalidConfig(
                "Mid period must be less than slow period".into(),
            ));
        }
        if self.min_volatility < Decimal::ZERO {
            return Err(StrategyError::InvalidConfig(
                "Minimum volatility cannot be negative".into(),
            ));
        }
        if self.instrument.is_empty() {
            return Err(StrategyError::InvalidConfig("Instrument required".into()));
        }
        Ok(())
    }
}

/// Crossover that only trades when the market is moving enough.
#[derive(Debug, Clone)]
pub struct CascadeSignal {
    crossover: Crossover,
    volatility: IndicatorId,
    min_volatility: Decimal,
}

impl CascadeSignal {
    pub fn new(crossover: Crossover, volatility: IndicatorId, min_volatility: Decimal) -> Self {
        Self {
            crossover,
            volatility,
            min_volatility,
        }
    }
}

impl SignalLogic for CascadeSignal {
    fn process(
        &mut self,
        view: &GraphView<'_>,
        _source: SourceId,
        as_of: DateTime<Utc>,
        _value: &Price,
    ) -> Result<Option<Action>, SignalError> {
        // volatility publishes last for a tick; wait for it
        let Some(vol) = view.indicator_at(self.volatility, as_of) else {
            return Ok(None);
        };
        let action = self.crossover.update(view, as_of);
        match action {
            Some(Action::Buy | Action::Sell) if vol.mid() < self.min_volatility => {
                trace!(volatility = %vol.mid(), "Crossover ignored in quiet market");
                Ok(Some(Action::Hold))
            }
            other => Ok(other),
        }
    }

    fn reset(&mut self) {
        self.crossover.reset();
    }
}

/// Wire the cascade model into `network`.
pub fn build_cascade(network: &mut Network, config: &CascadeConfig) -> Result<Model, StrategyError> {
    config.validate()?;
    let decay = decay_of(config.time_decay_factor)?;
    let market = ensure_market(network, &config.instrument)?;
    let id = network.market(market).id.clone();

    let mid = network.get_or_add_indicator(average(false, config.mid_minutes, &id, decay), market.into(), None)?;
    let slow = network.get_or_add_indicator(average(false, config.slow_minutes, &id, decay), market.into(), None)?;
    let vol = network.get_or_add_indicator(
        WeightedMovingAverage::volatility(
            average_name("WMVol", config.mid_minutes, &id),
            TimeDelta::minutes(config.mid_minutes),
            decay,
        ),
        market.into(),
        Some(mid),
    )?;

    let name = format!("MacDCas_{}_{}_{}", config.mid_minutes, config.slow_minutes, id);
    let logic = CascadeSignal::new(Crossover::new(mid, slow), vol, config.min_volatility);
    let signal = network.add_signal(Signal::new(name.clone(), market, market, vec![mid, slow, vol], logic))?;
    debug!(signal = %name, "Built cascade model");

    Ok(Model::new("macd_cascade").with_signal(signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use midax_core::traits::NullPublisher;
    use midax_core::{SignalCode, Tick};
    use midax_engine::{TradeActions, TradeCallback};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Count(Arc<AtomicUsize>);

    impl TradeActions for Count {
        fn on_buy(&self, _signal: &str) -> TradeCallback {
            let n = self.0.clone();
            Box::new(move |_| {
                n.fetch_add(1, Ordering::SeqCst);
                true
            })
        }

        fn on_sell(&self, signal: &str) -> TradeCallback {
            self.on_buy(signal)
        }
    }

    fn run(min_volatility: Decimal) -> (usize, SignalCode) {
        let mut network = Network::new(Arc::new(NullPublisher));
        let config = CascadeConfig {
            instrument: "DAX".into(),
            mid_minutes: 1,
            slow_minutes: 2,
            min_volatility,
            ..Default::default()
        };
        let mut model = build_cascade(&mut network, &config).unwrap();
        let actions = Count::default();
        model.start(&mut network, &actions).unwrap();

        let start = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        for step in 0..60 {
            // flat for 3 minutes, then a steady rally
            let level = dec!(10000) + Decimal::from((step - 18).max(0) * 3);
            let tick = Tick::new("DAX", start + TimeDelta::seconds(step * 10), level, level);
            network.on_tick(&tick).unwrap();
        }
        let code = network.signal(model.signals()[0]).code();
        (actions.0.load(Ordering::SeqCst), code)
    }

    #[test]
    fn test_cascade_trades_when_volatile() {
        let (trades, code) = run(dec!(0));
        assert_eq!(trades, 1);
        assert_eq!(code, SignalCode::Hold);
    }

    #[test]
    fn test_cascade_ignores_quiet_market() {
        let (trades, _) = run(dec!(1000));
        assert_eq!(trades, 0);
    }

    #[test]
    fn test_cascade_config_validation() {
        let config = CascadeConfig {
            instrument: "DAX".into(),
            mid_minutes: 5,
            slow_minutes: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
