//! Configuration structures.

use chrono::{NaiveDate, NaiveTime};
use config::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub replay: ReplaySettings,
    #[serde(default)]
    pub publishing: PublishingSettings,
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
    #[serde(default)]
    pub models: Vec<ModelSettings>,
}

impl AppConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        if self.trading.size <= Decimal::ZERO {
            return Err(invalid("trading.size must be positive"));
        }
        if self.trading.time_decay_factor <= Decimal::ZERO {
            return Err(invalid("trading.time_decay_factor must be positive"));
        }
        if self.replay.tolerance < Decimal::ZERO {
            return Err(invalid("replay.tolerance cannot be negative"));
        }
        if let Some(model) = self.models.iter().find(|m| m.name.is_empty() || m.instrument.is_empty()) {
            return Err(invalid(format!(
                "model entries need a name and an instrument: {:?}",
                model
            )));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Message(message.into())
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "midax".to_string(),
            environment: "replay".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Trading-day schedule, in UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Trading day; replays default to the date of the first tick
    pub date: Option<NaiveDate>,
    /// Ticks before this time are ignored
    pub publishing_start: NaiveTime,
    /// Models start
    pub trading_start: NaiveTime,
    /// Opening trades are refused from here on
    pub closing: NaiveTime,
    /// Models stop and daily means are published
    pub trading_stop: NaiveTime,
    pub publishing_stop: NaiveTime,
}

impl SessionSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.publishing_start <= self.trading_start
            && self.trading_start < self.closing
            && self.closing <= self.trading_stop
            && self.trading_stop <= self.publishing_stop;
        if !ordered {
            return Err(invalid(
                "session times must satisfy publishing_start <= trading_start < closing <= trading_stop <= publishing_stop",
            ));
        }
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        let time = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            date: None,
            publishing_start: time(6, 45),
            trading_start: time(8, 0),
            closing: time(22, 45),
            trading_stop: time(23, 0),
            publishing_stop: time(23, 30),
        }
    }
}

/// Trade sizing and routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    /// Only this signal sends trades; all signals trade when unset
    pub signal: Option<String>,
    /// Size per trade, per index point
    pub size: Decimal,
    pub currency: String,
    pub time_decay_factor: Decimal,
    /// Paper broker slippage in percent
    pub slippage_pct: Decimal,
    /// Paper broker size limit
    pub max_size: Option<Decimal>,
}

impl Default for TradingSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            signal: None,
            size: dec!(10),
            currency: "GBP".to_string(),
            time_decay_factor: Decimal::ONE,
            slippage_pct: Decimal::ZERO,
            max_size: None,
        }
    }
}

/// Replay inputs and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Tick files, merged by timestamp
    pub files: Vec<PathBuf>,
    /// Expected published values to validate against
    pub expected: Option<PathBuf>,
    /// Largest accepted absolute difference
    pub tolerance: Decimal,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            files: Vec::new(),
            expected: None,
            tolerance: dec!(0.000001),
        }
    }
}

/// Persistence outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishingSettings {
    /// CSV file receiving every published record
    pub csv: Option<PathBuf>,
}

/// Previous session summary used to derive pivot levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PreviousSession {
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// A traded or referenced instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// `Name:ID` or a bare id
    pub descriptor: String,
    #[serde(default)]
    pub previous: Option<PreviousSession>,
}

/// A model to build at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Registry key, e.g. `macd`
    pub name: String,
    /// Instrument descriptor
    pub instrument: String,
    /// Model parameters
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
