//! Tick source trait.

use crate::error::DataError;
use crate::types::Tick;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for market-data feeds, live or replayed.
///
/// Ticks for a given instrument arrive in non-decreasing timestamp order.
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Subscribe to ticks.
    ///
    /// # Arguments
    /// * `instruments` - Instruments to subscribe to; empty means all
    ///
    /// # Returns
    /// A channel receiver that yields ticks until the feed ends
    async fn subscribe(&self, instruments: &[String]) -> Result<mpsc::Receiver<Tick>, DataError>;

    /// Get the source name.
    fn name(&self) -> &str;
}
