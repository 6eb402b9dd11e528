//! Execution boundary trait.

use crate::error::ExecutionError;
use crate::types::{Confirmation, TradeRequest};
use async_trait::async_trait;

/// Trait for trade execution venues.
///
/// The engine never waits on this boundary from the tick path: requests are
/// handed to a dispatcher task which awaits the outcome.
#[async_trait]
pub trait ExecutionBoundary: Send + Sync {
    /// Place a trade.
    ///
    /// # Returns
    /// The fill on success; a rejection is reported as an error and turned
    /// into a cancellation of the originating trade.
    async fn place(&self, request: TradeRequest) -> Result<Confirmation, ExecutionError>;

    /// Get the boundary name.
    fn name(&self) -> &str;
}
