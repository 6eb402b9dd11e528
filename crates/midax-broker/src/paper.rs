//! Paper execution boundary for replay and simulation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use midax_core::error::ExecutionError;
use midax_core::traits::{Clock, ExecutionBoundary, SystemClock};
use midax_core::types::{Confirmation, Side, TradeRequest};

/// A trade the paper broker filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub request: TradeRequest,
    pub confirmation: Confirmation,
}

#[derive(Debug, Default)]
struct Book {
    deals: Vec<Deal>,
    exposure: HashMap<String, Decimal>,
    rejecting: bool,
}

/// Paper broker: fills every request at the expected price plus slippage.
pub struct PaperBroker {
    book: Arc<Mutex<Book>>,
    clock: Arc<dyn Clock>,
    slippage_pct: Decimal,
    max_size: Option<Decimal>,
    latency: Duration,
}

impl PaperBroker {
    /// Create a paper broker using wall-clock confirmation times.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a paper broker stamping confirmations with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            book: Arc::new(Mutex::new(Book::default())),
            clock,
            slippage_pct: Decimal::ZERO,
            max_size: None,
            latency: Duration::ZERO,
        }
    }

    /// Set slippage percentage, applied against the trader.
    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Reject requests larger than `limit`.
    pub fn with_max_size(mut self, limit: Decimal) -> Self {
        self.max_size = Some(limit);
        self
    }

    /// Delay every placement.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reject all requests until switched off.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.book.lock().unwrap().rejecting = rejecting;
    }

    /// All fills so far.
    pub fn deals(&self) -> Vec<Deal> {
        self.book.lock().unwrap().deals.clone()
    }

    /// Net filled size on an instrument (positive is long).
    pub fn exposure(&self, instrument: &str) -> Decimal {
        self.book
            .lock()
            .unwrap()
            .exposure
            .get(instrument)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn fill_price(&self, request: &TradeRequest) -> Decimal {
        let slip = self.slippage_pct / dec!(100);
        match request.direction {
            Side::Buy => request.price * (Decimal::ONE + slip),
            Side::Sell => request.price * (Decimal::ONE - slip),
        }
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBoundary for PaperBroker {
    async fn place(&self, request: TradeRequest) -> Result<Confirmation, ExecutionError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(limit) = self.max_size {
            if request.size > limit {
                warn!(reference = %request.reference, size = %request.size, "Size limit exceeded");
                return Err(ExecutionError::SizeLimit {
                    requested: request.size,
                    limit,
                });
            }
        }
        if request.size <= Decimal::ZERO {
            return Err(ExecutionError::Rejected(format!(
                "Invalid size {}",
                request.size
            )));
        }

        let mut book = self.book.lock().unwrap();
        if book.rejecting {
            return Err(ExecutionError::Rejected("Market closed".to_string()));
        }

        let confirmation = Confirmation {
            id: Uuid::new_v4().to_string(),
            time: self.clock.now(),
            price: self.fill_price(&request),
        };
        *book
            .exposure
            .entry(request.instrument.clone())
            .or_insert(Decimal::ZERO) += request.direction.sign() * request.size;
        debug!(
            deal = %confirmation.id,
            instrument = %request.instrument,
            direction = %request.direction,
            price = %confirmation.price,
            "Paper fill"
        );
        book.deals.push(Deal {
            request,
            confirmation: confirmation.clone(),
        });

        Ok(confirmation)
    }

    fn name(&self) -> &str {
        "Paper Broker"
    }
}
