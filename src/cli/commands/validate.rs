//! Validate configuration command.

use anyhow::Result;
use midax_config::load_config;
use std::path::Path;

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!(
        "Session: publish {} trade {}-{} stop {}",
        config.session.publishing_start,
        config.session.trading_start,
        config.session.closing,
        config.session.trading_stop
    );
    println!("Trade size: {} {}", config.trading.size, config.trading.currency);
    println!("Instruments: {}", config.instruments.len());
    println!("Models: {}", config.models.len());
    println!("Replay files: {}", config.replay.files.len());
    println!();
    println!("Effective configuration:");
    println!("{}", config.to_toml()?);

    Ok(())
}
