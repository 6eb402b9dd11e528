//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, InstrumentConfig, LoggingConfig, ModelSettings, PreviousSession,
    PublishingSettings, ReplaySettings, SessionSettings, TradingSettings,
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use std::path::Path;

const ENV_PREFIX: &str = "MIDAX";

/// Load configuration from file and environment.
///
/// Environment variables override the file, e.g. `MIDAX__TRADING__SIZE=5`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

/// Parse configuration from TOML text, without environment overrides.
pub fn parse_config(toml: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()
}
