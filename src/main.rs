//! Market indicator engine CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level {
        cli::LogLevel::Trace => "trace",
        cli::LogLevel::Debug => "debug",
        cli::LogLevel::Info => "info",
        cli::LogLevel::Warn => "warn",
        cli::LogLevel::Error => "error",
    };

    match cli.command {
        Commands::Replay(args) => {
            cli::commands::replay::run(args, &cli.config, log_level, cli.json_logs).await
        }
        Commands::Models => {
            midax_monitor::setup_logging(log_level, cli.json_logs, None);
            cli::commands::models::run()
        }
        Commands::ValidateConfig => {
            midax_monitor::setup_logging(log_level, cli.json_logs, None);
            cli::commands::validate::run(&cli.config)
        }
    }
}
