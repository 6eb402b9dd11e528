//! CSV replay tick source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

use midax_core::error::DataError;
use midax_core::traits::TickSource;
use midax_core::types::Tick;

const CHANNEL_CAPACITY: usize = 1024;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Instrument", alias = "epic", alias = "Epic")]
    instrument: String,
    #[serde(alias = "Timestamp", alias = "time", alias = "Time")]
    timestamp: String,
    #[serde(alias = "Bid")]
    bid: Decimal,
    #[serde(alias = "Offer", alias = "ask", alias = "Ask")]
    offer: Decimal,
    #[serde(alias = "Volume", default)]
    volume: Option<Decimal>,
}

/// Replays ticks recorded in one or more CSV files.
///
/// Files are merged by timestamp; ticks sharing a timestamp keep their file
/// order. Rows within a file are never reordered, so a file recorded out of
/// order reaches the consumer out of order.
pub struct CsvTickSource {
    paths: Vec<PathBuf>,
}

impl CsvTickSource {
    /// Create a source over existing files.
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, DataError> {
        if paths.is_empty() {
            return Err(DataError::NoDataAvailable("no replay files".to_string()));
        }
        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            return Err(DataError::NoDataAvailable(missing.display().to_string()));
        }
        Ok(Self { paths })
    }

    /// Load every tick, merging the files by timestamp.
    pub fn load_all(&self) -> Result<Vec<Tick>, DataError> {
        let mut files = Vec::with_capacity(self.paths.len());
        for (index, path) in self.paths.iter().enumerate() {
            let loaded = Self::load_from_path(path)?;
            debug!(path = %path.display(), ticks = loaded.len(), "Loaded replay file");
            files.push(loaded.into_iter().map(move |tick| (index, tick)));
        }

        let ticks = files
            .into_iter()
            .kmerge_by(|(a_file, a), (b_file, b)| (a.timestamp, a_file) < (b.timestamp, b_file))
            .map(|(_, tick)| tick)
            .collect();
        Ok(ticks)
    }

    fn load_from_path(path: &Path) -> Result<Vec<Tick>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut ticks = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
            let timestamp = parse_timestamp(&record.timestamp)?;
            let mut tick = Tick::new(record.instrument, timestamp, record.bid, record.offer);
            if let Some(volume) = record.volume {
                tick = tick.with_volume(volume);
            }
            ticks.push(tick);
        }
        Ok(ticks)
    }
}

/// Parse the timestamp formats found in recorded market data.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S%.f",
    ];
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    // Unix time; assume milliseconds if > 10 digits
    if let Ok(ts) = value.parse::<i64>() {
        let parsed = if ts > 10_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!("Could not parse timestamp: {}", value)))
}

#[async_trait]
impl TickSource for CsvTickSource {
    async fn subscribe(&self, instruments: &[String]) -> Result<mpsc::Receiver<Tick>, DataError> {
        let mut ticks = self.load_all()?;
        if !instruments.is_empty() {
            ticks.retain(|t| instruments.contains(&t.instrument));
        }
        if ticks.is_empty() {
            return Err(DataError::NoDataAvailable(instruments.join(",")));
        }
        info!(ticks = ticks.len(), files = self.paths.len(), "Starting replay");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for tick in ticks {
                if tx.send(tick).await.is_err() {
                    debug!("Replay receiver dropped");
                    break;
                }
            }
        });
        Ok(rx)
    }

    fn name(&self) -> &str {
        "CSV Replay"
    }
}
