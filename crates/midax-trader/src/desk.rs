//! Position book per signal and the trade dispatcher.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use midax_core::traits::{publish_or_log, Clock, ExecutionBoundary, Publisher, Record};
use midax_core::types::{Cancellation, SessionPhase, Side, Trade};
use midax_engine::{SignalEvent, TradeActions, TradeCallback};

/// Position held by one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    /// Position after trading `side`, or None if the trade is a repeat.
    fn after(self, side: Side) -> Option<Position> {
        match (self, side) {
            (Position::Flat, Side::Buy) => Some(Position::Long),
            (Position::Flat, Side::Sell) => Some(Position::Short),
            (Position::Short, Side::Buy) | (Position::Long, Side::Sell) => Some(Position::Flat),
            (Position::Long, Side::Buy) | (Position::Short, Side::Sell) => None,
        }
    }

    /// Position held through an opening trade in direction `open`.
    fn holding(open: Option<Side>) -> Position {
        match open {
            None => Position::Flat,
            Some(Side::Buy) => Position::Long,
            Some(Side::Sell) => Position::Short,
        }
    }
}

/// Work for the dispatcher.
pub enum Instruction {
    /// Place `trade`, issued while the desk believed the reference held `from`
    Place { trade: Trade, from: Position },
    /// Close every confirmed open position
    CloseAll { time: DateTime<Utc> },
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    position: Position,
    /// Trades issued so far; the latest one settles the slot on cancellation
    issued: u32,
}

#[derive(Debug, Default)]
struct Book {
    slots: HashMap<String, Slot>,
    phase: SessionPhase,
}

/// Turns signal decisions into trades.
///
/// Each signal trades its own position: a BUY opens a long from flat or
/// covers a short, a SELL is symmetric. Opening is refused once the session
/// is closing. When the latest trade of a signal is cancelled, the book is
/// reset to the position the dispatcher actually holds.
#[derive(Clone)]
pub struct TradingDesk {
    book: Arc<Mutex<Book>>,
    size: Decimal,
    signal: Option<String>,
    tx: mpsc::UnboundedSender<Instruction>,
}

impl TradingDesk {
    /// Create a desk and the receiving end for its dispatcher.
    pub fn new(size: Decimal) -> (Self, mpsc::UnboundedReceiver<Instruction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let desk = Self {
            book: Arc::new(Mutex::new(Book::default())),
            size,
            signal: None,
            tx,
        };
        (desk, rx)
    }

    /// Only let `signal` trade.
    pub fn restrict_to(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        self.book.lock().unwrap().phase = phase;
    }

    pub fn position(&self, signal: &str) -> Position {
        self.book
            .lock()
            .unwrap()
            .slots
            .get(signal)
            .map(|slot| slot.position)
            .unwrap_or_default()
    }

    /// Ask the dispatcher to flatten everything.
    pub fn close_all(&self, time: DateTime<Utc>) {
        if self.tx.send(Instruction::CloseAll { time }).is_err() {
            warn!("Dispatcher gone, positions left open");
        }
    }

    fn trade(&self, signal: &str, side: Side, event: &SignalEvent) -> bool {
        if self.signal.as_deref().is_some_and(|s| s != signal) {
            return false;
        }

        let mut book = self.book.lock().unwrap();
        let phase = book.phase;
        if !phase.is_trading() {
            return false;
        }
        let slot = book.slots.entry(signal.to_string()).or_default();
        let previous = slot.position;
        let Some(next) = previous.after(side) else {
            debug!(signal, %side, "Repeated signal ignored");
            return false;
        };
        if previous == Position::Flat && !phase.allows_opening() {
            info!(signal, %side, %phase, "Opening refused");
            return false;
        }
        let seq = slot.issued + 1;

        let settle = {
            let book = Arc::clone(&self.book);
            let signal = signal.to_string();
            move |c: &Cancellation| {
                let mut book = book.lock().unwrap();
                if let Some(slot) = book.slots.get_mut(&signal) {
                    if slot.issued == seq {
                        slot.position = Position::holding(c.open);
                    }
                }
                warn!(signal = %signal, seq, time = %c.time, price = %c.price, open = c.open_position(), "Trade cancelled");
            }
        };
        let trade = Trade::new(event.time, &event.instrument, side, self.size, event.recorded_price())
            .with_reference(signal)
            .with_placeholder(seq)
            .on_cancelled(settle);

        if self
            .tx
            .send(Instruction::Place { trade, from: previous })
            .is_err()
        {
            warn!(signal, "Dispatcher gone, trade dropped");
            return false;
        }
        slot.position = next;
        slot.issued = seq;
        true
    }
}

impl TradeActions for TradingDesk {
    fn on_buy(&self, signal: &str) -> TradeCallback {
        let desk = self.clone();
        let signal = signal.to_string();
        Box::new(move |event| desk.trade(&signal, Side::Buy, event))
    }

    fn on_sell(&self, signal: &str) -> TradeCallback {
        let desk = self.clone();
        let signal = signal.to_string();
        Box::new(move |event| desk.trade(&signal, Side::Sell, event))
    }
}

/// Totals reported when the dispatcher finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub confirmed: usize,
    pub rejected: usize,
    /// Trades issued against a position that an earlier failure never opened or closed
    pub dropped: usize,
    /// Positions flattened at the end of the session
    pub closed_at_stop: usize,
}

/// Sends trades to the execution boundary, off the tick path.
///
/// A trade is only placed when the position it was issued against is the
/// one actually held for its reference; otherwise it is cancelled without
/// reaching the boundary.
pub struct Dispatcher {
    boundary: Arc<dyn ExecutionBoundary>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
    /// Confirmed opening trades by reference
    open: HashMap<String, Trade>,
    summary: DispatchSummary,
}

impl Dispatcher {
    pub fn new(boundary: Arc<dyn ExecutionBoundary>, publisher: Arc<dyn Publisher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            boundary,
            publisher,
            clock,
            open: HashMap::new(),
            summary: DispatchSummary::default(),
        }
    }

    /// Run until every desk handle is dropped.
    pub fn spawn(mut self, mut rx: mpsc::UnboundedReceiver<Instruction>) -> JoinHandle<DispatchSummary> {
        tokio::spawn(async move {
            while let Some(instruction) = rx.recv().await {
                self.handle(instruction).await;
            }
            info!(
                boundary = self.boundary.name(),
                confirmed = self.summary.confirmed,
                rejected = self.summary.rejected,
                dropped = self.summary.dropped,
                "Dispatcher finished"
            );
            self.summary
        })
    }

    /// Process one instruction.
    pub async fn handle(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Place { trade, from } => {
                self.place(trade, from).await;
            }
            Instruction::CloseAll { time } => self.close_all(time).await,
        }
    }

    pub fn summary(&self) -> DispatchSummary {
        self.summary
    }

    /// Position confirmed for `reference`.
    pub fn held(&self, reference: &str) -> Position {
        Position::holding(self.open.get(reference).map(|t| t.direction))
    }

    async fn place(&mut self, mut trade: Trade, from: Position) -> bool {
        let held = self.held(&trade.reference);
        if from != held {
            self.summary.dropped += 1;
            warn!(
                reference = %trade.reference,
                seq = trade.placeholder,
                expected = ?from,
                held = ?held,
                "Trade dropped, position out of date"
            );
            self.cancel(&mut trade);
            return false;
        }

        match self.boundary.place(trade.request()).await {
            Ok(confirmation) => {
                trade.confirm(confirmation);
                self.summary.confirmed += 1;
                debug!(reference = %trade.reference, direction = %trade.direction, price = %trade.price, "Trade confirmed");
                publish_or_log(self.publisher.as_ref(), Record::Trade(trade.record()));
                if from == Position::Flat {
                    self.open.insert(trade.reference.clone(), trade);
                } else {
                    self.open.remove(&trade.reference);
                }
                true
            }
            Err(e) => {
                self.summary.rejected += 1;
                warn!(reference = %trade.reference, error = %e, "Trade rejected");
                self.cancel(&mut trade);
                false
            }
        }
    }

    fn cancel(&self, trade: &mut Trade) {
        let cancellation = Cancellation {
            time: self.clock.now(),
            price: trade.price,
            open: self.open.get(&trade.reference).map(|t| t.direction),
        };
        trade.reject(&cancellation);
    }

    async fn close_all(&mut self, time: DateTime<Utc>) {
        let references: Vec<String> = self.open.keys().cloned().collect();
        for reference in references {
            let from = self.held(&reference);
            let Some(opening) = self.open.get_mut(&reference) else {
                continue;
            };
            let closing = opening.opposite(time);
            if self.place(closing, from).await {
                self.summary.closed_at_stop += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use midax_broker::PaperBroker;
    use midax_core::traits::ReplayClock;
    use midax_core::types::{Action, Price};
    use midax_data::MemoryPublisher;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 26, 8, 30, 0).unwrap()
    }

    fn event(action: Action) -> SignalEvent {
        SignalEvent {
            signal: "MacD_10_60_DAX".into(),
            instrument: "DAX".into(),
            action,
            time: t0(),
            quote: Price::new(dec!(100), dec!(101)),
        }
    }

    #[test]
    fn test_book_transitions() {
        let (desk, mut rx) = TradingDesk::new(dec!(10));
        desk.set_phase(SessionPhase::Active);
        let mut buy = desk.on_buy("MacD_10_60_DAX");
        let mut sell = desk.on_sell("MacD_10_60_DAX");

        assert!(buy(&event(Action::Buy)));
        assert_eq!(desk.position("MacD_10_60_DAX"), Position::Long);
        assert!(!buy(&event(Action::Buy)));
        assert!(sell(&event(Action::Sell)));
        assert_eq!(desk.position("MacD_10_60_DAX"), Position::Flat);
        assert!(sell(&event(Action::Sell)));
        assert_eq!(desk.position("MacD_10_60_DAX"), Position::Short);

        let Ok(Instruction::Place { trade: first, from }) = rx.try_recv() else {
            panic!("expected a trade");
        };
        assert_eq!(from, Position::Flat);
        assert_eq!(first.direction, Side::Buy);
        assert_eq!(first.placeholder, 1);
        assert_eq!(first.price, dec!(101));
        assert_eq!(first.size, dec!(10));
    }

    #[test]
    fn test_closing_refuses_opens_only() {
        let (desk, _rx) = TradingDesk::new(dec!(1));
        desk.set_phase(SessionPhase::Active);
        let mut buy = desk.on_buy("S");
        let mut sell = desk.on_sell("S");
        assert!(buy(&event(Action::Buy)));

        desk.set_phase(SessionPhase::Closing);
        assert!(sell(&event(Action::Sell)));
        assert!(!sell(&event(Action::Sell)));
        assert_eq!(desk.position("S"), Position::Flat);

        desk.set_phase(SessionPhase::Stopped);
        assert!(!buy(&event(Action::Buy)));
    }

    #[test]
    fn test_restricted_desk_ignores_other_signals() {
        let (desk, _rx) = TradingDesk::new(dec!(1));
        let desk = desk.restrict_to("MacD_10_60_DAX");
        desk.set_phase(SessionPhase::Active);

        assert!(!desk.on_buy("MacDCas_30_90_DAX")(&event(Action::Buy)));
        assert!(desk.on_buy("MacD_10_60_DAX")(&event(Action::Buy)));
    }

    #[tokio::test]
    async fn test_rejection_reverts_book() {
        let (desk, rx) = TradingDesk::new(dec!(1));
        desk.set_phase(SessionPhase::Active);

        let broker = Arc::new(PaperBroker::new());
        broker.set_rejecting(true);
        let memory = Arc::new(MemoryPublisher::new());
        let clock = Arc::new(ReplayClock::new(t0()));
        let handle = Dispatcher::new(broker.clone(), memory.clone(), clock).spawn(rx);

        assert!(desk.on_buy("S")(&event(Action::Buy)));
        assert_eq!(desk.position("S"), Position::Long);

        // the rejection comes back on the dispatcher task
        for _ in 0..100 {
            if desk.position("S") == Position::Flat {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(desk.position("S"), Position::Flat);
        drop(desk);

        let summary = handle.await.unwrap();
        assert_eq!(summary.rejected, 1);
        assert!(memory.records().is_empty());
    }

    #[tokio::test]
    async fn test_close_queued_behind_rejected_open_is_dropped() {
        let (desk, mut rx) = TradingDesk::new(dec!(1));
        desk.set_phase(SessionPhase::Active);
        let mut buy = desk.on_buy("S");
        let mut sell = desk.on_sell("S");

        let broker = Arc::new(PaperBroker::new());
        let memory = Arc::new(MemoryPublisher::new());
        let clock = Arc::new(ReplayClock::new(t0()));
        let mut dispatcher = Dispatcher::new(broker.clone(), memory.clone(), clock);

        // open and close both queued before the open is settled
        assert!(buy(&event(Action::Buy)));
        assert!(sell(&event(Action::Sell)));
        assert_eq!(desk.position("S"), Position::Flat);

        broker.set_rejecting(true);
        let Ok(open) = rx.try_recv() else {
            panic!("expected the opening trade");
        };
        dispatcher.handle(open).await;
        broker.set_rejecting(false);
        while let Ok(instruction) = rx.try_recv() {
            dispatcher.handle(instruction).await;
        }

        assert_eq!(desk.position("S"), Position::Flat);
        assert_eq!(dispatcher.held("S"), Position::Flat);
        assert_eq!(broker.exposure("DAX"), Decimal::ZERO);

        assert!(buy(&event(Action::Buy)));
        while let Ok(instruction) = rx.try_recv() {
            dispatcher.handle(instruction).await;
        }
        assert_eq!(desk.position("S"), Position::Long);
        assert_eq!(dispatcher.held("S"), Position::Long);
        assert_eq!(broker.exposure("DAX"), dec!(1));

        let summary = dispatcher.summary();
        assert_eq!(summary.confirmed, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.dropped, 1);
    }

    #[tokio::test]
    async fn test_rejected_close_keeps_position_open() {
        let (desk, mut rx) = TradingDesk::new(dec!(1));
        desk.set_phase(SessionPhase::Active);
        let mut sell = desk.on_sell("S");
        let mut buy = desk.on_buy("S");

        let broker = Arc::new(PaperBroker::new());
        let clock = Arc::new(ReplayClock::new(t0()));
        let mut dispatcher = Dispatcher::new(broker.clone(), Arc::new(MemoryPublisher::new()), clock);

        assert!(sell(&event(Action::Sell)));
        let Ok(open) = rx.try_recv() else {
            panic!("expected the opening trade");
        };
        dispatcher.handle(open).await;

        // cover, then reopen long, both behind a rejected cover
        assert!(buy(&event(Action::Buy)));
        assert!(buy(&event(Action::Buy)));
        assert_eq!(desk.position("S"), Position::Long);

        broker.set_rejecting(true);
        let Ok(cover) = rx.try_recv() else {
            panic!("expected the closing trade");
        };
        dispatcher.handle(cover).await;
        broker.set_rejecting(false);
        while let Ok(instruction) = rx.try_recv() {
            dispatcher.handle(instruction).await;
        }

        assert_eq!(desk.position("S"), Position::Short);
        assert_eq!(dispatcher.held("S"), Position::Short);
        assert_eq!(broker.exposure("DAX"), dec!(-1));
        assert_eq!(dispatcher.summary().dropped, 1);
    }

    #[tokio::test]
    async fn test_confirmed_trades_are_published_and_closed_at_stop() {
        let (desk, rx) = TradingDesk::new(dec!(2));
        desk.set_phase(SessionPhase::Active);

        let broker = Arc::new(PaperBroker::new());
        let memory = Arc::new(MemoryPublisher::new());
        let clock = Arc::new(ReplayClock::new(t0()));
        let handle = Dispatcher::new(broker.clone(), memory.clone(), clock).spawn(rx);

        assert!(desk.on_sell("S")(&event(Action::Sell)));
        desk.close_all(t0());
        drop(desk);

        let summary = handle.await.unwrap();
        assert_eq!(summary.confirmed, 2);
        assert_eq!(summary.closed_at_stop, 1);
        assert_eq!(broker.exposure("DAX"), Decimal::ZERO);

        let trades: Vec<_> = memory.records().into_iter().filter(|r| r.kind() == "trade").collect();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].value(), dec!(100));
    }
}
