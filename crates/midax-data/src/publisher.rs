//! Persistence publishers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use midax_core::error::PersistenceError;
use midax_core::traits::{Publisher, Record};

/// One published value as a flat row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    pub kind: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        Self {
            kind: record.kind().to_string(),
            id: record.id().to_string(),
            timestamp: record.time(),
            value: record.value(),
        }
    }
}

/// Read rows written by [`CsvPublisher`].
pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<RecordRow>, PersistenceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PersistenceError::Write(e.to_string()))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| PersistenceError::Write(e.to_string())))
        .collect()
}

/// Writes every record as a `kind,id,timestamp,value` row.
pub struct CsvPublisher {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvPublisher {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let writer = csv::Writer::from_path(path).map_err(|e| PersistenceError::Write(e.to_string()))?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

impl Publisher for CsvPublisher {
    fn publish(&self, record: Record) -> Result<(), PersistenceError> {
        let row = RecordRow::from(&record);
        self.writer
            .lock()
            .unwrap()
            .serialize(row)
            .map_err(|e| PersistenceError::Write(e.to_string()))
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        self.writer
            .lock()
            .unwrap()
            .flush()
            .map_err(|e| PersistenceError::Write(e.to_string()))
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    records: Mutex<Vec<Record>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Published records as rows.
    pub fn rows(&self) -> Vec<RecordRow> {
        self.records.lock().unwrap().iter().map(RecordRow::from).collect()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, record: Record) -> Result<(), PersistenceError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// Sends every record to several publishers.
#[derive(Default)]
pub struct FanoutPublisher {
    sinks: Vec<Arc<dyn Publisher>>,
}

impl FanoutPublisher {
    pub fn new(sinks: Vec<Arc<dyn Publisher>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn Publisher>) {
        self.sinks.push(sink);
    }
}

impl Publisher for FanoutPublisher {
    /// Every sink sees the record; the first failure is returned.
    fn publish(&self, record: Record) -> Result<(), PersistenceError> {
        let mut result = Ok(());
        for sink in &self.sinks {
            if let Err(e) = sink.publish(record.clone()) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        self.sinks.iter().try_for_each(|sink| sink.flush())
    }
}

/// Hands records to a background writer task.
///
/// Publishing never blocks; the task forwards to the inner publisher and
/// flushes it once every sender is dropped.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Record>,
}

impl ChannelPublisher {
    /// Spawn the writer task.
    pub fn spawn(inner: Arc<dyn Publisher>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Record>();
        let handle = tokio::spawn(async move {
            let mut written = 0usize;
            while let Some(record) = rx.recv().await {
                let kind = record.kind();
                match inner.publish(record) {
                    Ok(()) => written += 1,
                    Err(e) => warn!(kind, error = %e, "Background publish failed"),
                }
            }
            if let Err(e) = inner.flush() {
                warn!(error = %e, "Flush failed");
            }
            debug!(written, "Publisher task finished");
        });
        (Self { tx }, handle)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, record: Record) -> Result<(), PersistenceError> {
        self.tx.send(record).map_err(|_| PersistenceError::Closed)
    }
}
