//! Tick sources and persistence publishers.

mod csv_source;
mod publisher;

pub use csv_source::{parse_timestamp, CsvTickSource};
pub use publisher::{
    load_rows, ChannelPublisher, CsvPublisher, FanoutPublisher, MemoryPublisher, RecordRow,
};

use midax_core::error::DataError;
use midax_core::types::Tick;
use std::path::PathBuf;

/// Load and merge ticks from CSV files, oldest first.
pub fn load_csv(paths: &[PathBuf]) -> Result<Vec<Tick>, DataError> {
    CsvTickSource::new(paths.to_vec())?.load_all()
}
