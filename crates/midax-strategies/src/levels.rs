//! Levels model: session pivots and the daily mean, published only.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use midax_core::error::StrategyError;
use midax_core::Level;
use midax_engine::{Model, Network};
use midax_indicators::{DailyMean, LevelIndicator, DEFAULT_MEAN_HISTORY_MINUTES};

use crate::{ensure_market, ModelConfig};

/// Configuration for the levels model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    /// Instrument descriptor (`Name:ID` or ID)
    pub instrument: String,
    /// History required before the daily mean is published
    pub mean_min_history_minutes: i64,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            instrument: String::new(),
            mean_min_history_minutes: DEFAULT_MEAN_HISTORY_MINUTES,
        }
    }
}

impl ModelConfig for LevelsConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.instrument.is_empty() {
            return Err(StrategyError::InvalidConfig("Instrument required".into()));
        }
        if self.mean_min_history_minutes < 0 {
            return Err(StrategyError::InvalidConfig(
                "Minimum history cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Wire the levels model into `network`.
pub fn build_levels(network: &mut Network, config: &LevelsConfig) -> Result<Model, StrategyError> {
    config.validate()?;
    let market = ensure_market(network, &config.instrument)?;
    let id = network.market(market).id.clone();

    let mut model = Model::new("levels");
    for &level in Level::all() {
        let ind = network.get_or_add_indicator(LevelIndicator::new(level, &id), market.into(), None)?;
        model = model.with_indicator(ind);
    }
    let mean = DailyMean::new(&id).with_min_history(TimeDelta::minutes(config.mean_min_history_minutes));
    let mean = network.get_or_add_indicator(mean, market.into(), None)?;
    Ok(model.with_indicator(mean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use midax_core::traits::NullPublisher;
    use midax_core::{Price, SessionLevels, Tick};
    use midax_engine::{TradeActions, TradeCallback};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct NoTrades;

    impl TradeActions for NoTrades {
        fn on_buy(&self, _signal: &str) -> TradeCallback {
            Box::new(|_| false)
        }

        fn on_sell(&self, _signal: &str) -> TradeCallback {
            Box::new(|_| false)
        }
    }

    #[test]
    fn test_levels_model_publishes_on_demand() {
        let mut network = Network::new(Arc::new(NullPublisher));
        let config = LevelsConfig {
            instrument: "DAX".into(),
            mean_min_history_minutes: 60,
        };
        let mut model = build_levels(&mut network, &config).unwrap();
        assert_eq!(model.indicators().len(), 8);
        model.start(&mut network, &NoTrades).unwrap();

        let dax = network.market_id("DAX").unwrap();
        network
            .market_mut(dax)
            .set_levels(SessionLevels::from_high_low_close(dec!(110), dec!(90), dec!(100)));

        let start = Utc.with_ymd_and_hms(2015, 8, 26, 8, 0, 0).unwrap();
        network.on_tick(&Tick::new("DAX", start, dec!(100), dec!(100))).unwrap();
        network.publish_levels(start).unwrap();

        let r3 = network.indicator_id("LVLR3_DAX").unwrap();
        assert_eq!(network.indicator(r3).series().len(), 1);

        let end = start + TimeDelta::minutes(60);
        network.publish_daily_means(end).unwrap();
        let mean = network.indicator_id("WMA_1D_DAX").unwrap();
        assert_eq!(network.indicator(mean).series().lookup(end), Some(&Price::flat(dec!(100))));
    }
}
