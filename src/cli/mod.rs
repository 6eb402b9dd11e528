//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "midax")]
#[command(author, version, about = "Streaming market indicators and session trading")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "MIDAX_CONFIG")]
    pub config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay recorded ticks through the configured models
    Replay(ReplayArgs),
    /// List available models
    Models,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct ReplayArgs {
    /// Tick files, replacing the configured ones
    #[arg(short, long, value_delimiter = ',')]
    pub files: Vec<PathBuf>,

    /// Write published records to this CSV file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Compare published records against this CSV file
    #[arg(long)]
    pub expected: Option<PathBuf>,

    /// Only trade this signal
    #[arg(long)]
    pub signal: Option<String>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}
