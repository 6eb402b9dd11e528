//! Replay command.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::cli::ReplayArgs;
use midax_config::load_config;
use midax_monitor::{setup_logging, watch_phases};
use midax_trader::{ReplayReport, ReplaySession};

pub async fn run(args: ReplayArgs, config_path: &Path, log_level: &str, json_logs: bool) -> Result<()> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    if !args.files.is_empty() {
        config.replay.files = args.files;
    }
    if args.record.is_some() {
        config.publishing.csv = args.record;
    }
    if args.expected.is_some() {
        config.replay.expected = args.expected;
    }
    if args.signal.is_some() {
        config.trading.signal = args.signal;
    }
    config.validate().context("Invalid configuration")?;

    let json = json_logs || config.logging.format == "json";
    let _guard = setup_logging(log_level, json, config.logging.file.as_deref().map(Path::new));

    if config.replay.files.is_empty() {
        bail!("No tick files to replay; set replay.files or pass --files");
    }

    info!(
        files = config.replay.files.len(),
        models = config.models.len(),
        "Starting replay"
    );

    let session = ReplaySession::new(config);
    let phases = watch_phases(session.subscribe_phase());
    let report = session.run_configured().await.context("Replay failed")?;
    drop(session);
    let _ = phases.await;

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &ReplayReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        REPLAY RESULTS");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("Session:        {}", report.window.trading_start.format("%Y-%m-%d"));
    println!(
        "Trading hours:  {} - {}",
        report.window.trading_start.format("%H:%M"),
        report.window.stop.format("%H:%M")
    );
    println!("Final phase:    {}", report.phase);
    println!();
    println!("Ticks:          {}", report.stats.ticks);
    println!("Ignored:        {}", report.stats.ignored);
    println!("Trade signals:  {}", report.stats.trades);
    println!("Signal errors:  {}", report.stats.signal_failures);
    println!();
    println!("Confirmed:      {}", report.dispatch.confirmed);
    println!("Rejected:       {}", report.dispatch.rejected);
    println!("Dropped:        {}", report.dispatch.dropped);
    println!("Closed at stop: {}", report.dispatch.closed_at_stop);

    if let Some(validation) = &report.validation {
        println!();
        println!("Validation:     passed");
        println!("  Matched:      {}", validation.matched);
        println!("  Unexpected:   {}", validation.unexpected);
    }

    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
