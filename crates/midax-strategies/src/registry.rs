//! Model registry for building models by name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use midax_core::error::StrategyError;
use midax_engine::{Model, Network};

use crate::{build_cascade, build_levels, build_macd, CascadeConfig, LevelsConfig, MacdConfig};

/// Information about a registered model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Display name
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the built-in models.
pub struct ModelRegistry {
    models: HashMap<String, ModelInfo>,
}

impl ModelRegistry {
    /// Create a registry with all built-in models.
    pub fn new() -> Self {
        let mut models = HashMap::new();

        models.insert(
            "macd".to_string(),
            ModelInfo {
                name: "MacD".to_string(),
                description: "Trades crossovers of a fast and a slow time-weighted average".to_string(),
                default_config: serde_json::to_value(MacdConfig::default()).unwrap_or_default(),
            },
        );

        models.insert(
            "macd_cascade".to_string(),
            ModelInfo {
                name: "MacD Cascade".to_string(),
                description: "Trades slower crossovers while volatility is above a threshold"
                    .to_string(),
                default_config: serde_json::to_value(CascadeConfig::default()).unwrap_or_default(),
            },
        );

        models.insert(
            "levels".to_string(),
            ModelInfo {
                name: "Levels".to_string(),
                description: "Publishes session pivots, supports, resistances and the daily mean"
                    .to_string(),
                default_config: serde_json::to_value(LevelsConfig::default()).unwrap_or_default(),
            },
        );

        Self { models }
    }

    /// List all available models.
    pub fn list(&self) -> Vec<&ModelInfo> {
        self.models.values().collect()
    }

    /// Get model info by key.
    pub fn get(&self, name: &str) -> Option<&ModelInfo> {
        self.models.get(name)
    }

    /// Check if a model exists.
    pub fn exists(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// All model keys, sorted.
    pub fn names(&self) -> Vec<&String> {
        let mut names: Vec<_> = self.models.keys().collect();
        names.sort();
        names
    }

    /// Build a model into `network` from a JSON configuration.
    ///
    /// `instrument` overrides whatever the configuration names.
    pub fn create(
        &self,
        name: &str,
        config: serde_json::Value,
        instrument: &str,
        network: &mut Network,
    ) -> Result<Model, StrategyError> {
        match name {
            "macd" => {
                let mut config: MacdConfig = parse(config)?;
                config.instrument = instrument.to_string();
                build_macd(network, &config)
            }
            "macd_cascade" => {
                let mut config: CascadeConfig = parse(config)?;
                config.instrument = instrument.to_string();
                build_cascade(network, &config)
            }
            "levels" => {
                let mut config: LevelsConfig = parse(config)?;
                config.instrument = instrument.to_string();
                build_levels(network, &config)
            }
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    /// Build a model with its default configuration.
    pub fn create_default(
        &self,
        name: &str,
        instrument: &str,
        network: &mut Network,
    ) -> Result<Model, StrategyError> {
        let info = self
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone(), instrument, network)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse<T: DeserializeOwned>(config: serde_json::Value) -> Result<T, StrategyError> {
    serde_json::from_value(config).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use midax_core::traits::NullPublisher;
    use std::sync::Arc;

    fn network() -> Network {
        Network::new(Arc::new(NullPublisher))
    }

    #[test]
    fn test_registry_list() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.list().len(), 3);
        assert_eq!(registry.names(), vec!["levels", "macd", "macd_cascade"]);
    }

    #[test]
    fn test_registry_get() {
        let registry = ModelRegistry::new();

        assert!(registry.get("macd").is_some());
        assert!(registry.exists("levels"));
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_create_default() {
        let registry = ModelRegistry::new();
        let mut network = network();

        let model = registry
            .create_default("macd", "DAX:IX.D.DAX.DAILY.IP", &mut network)
            .unwrap();
        assert_eq!(model.name(), "macd");
        assert_eq!(model.signals().len(), 1);
        assert_eq!(
            network.signal(model.signals()[0]).name(),
            "MacD_10_60_IX.D.DAX.DAILY.IP"
        );
        assert!(network.indicator_id("WMA_10_IX.D.DAX.DAILY.IP").is_some());
    }

    #[test]
    fn test_models_share_indicators() {
        let registry = ModelRegistry::new();
        let mut network = network();

        let config = serde_json::json!({ "fast_minutes": 30, "slow_minutes": 90 });
        registry.create("macd", config, "DAX", &mut network).unwrap();
        registry.create_default("macd_cascade", "DAX", &mut network).unwrap();

        // WMA_30 and WMA_90 exist once; the cascade adds only its volatility
        assert!(network.indicator_id("WMVol_30_DAX").is_some());
        assert_eq!(network.indicators().len(), 3);
    }

    #[test]
    fn test_create_with_bad_config() {
        let registry = ModelRegistry::new();
        let mut network = network();

        let config = serde_json::json!({ "fast_minutes": 60, "slow_minutes": 10 });
        let result = registry.create("macd", config, "DAX", &mut network);
        assert!(matches!(result, Err(StrategyError::InvalidConfig(_))));

        let result = registry.create_default("unknown", "DAX", &mut network);
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }
}
