//! Ordered fan-out registry.

use super::Subscriber;

/// Ordered list of subscribers with a sort key.
///
/// Entries are kept sorted by key; equal keys keep registration order. The
/// key lets a cascaded indicator sit behind the companion it reads from, so
/// the companion is always updated first for the same tick.
#[derive(Debug, Clone, Default)]
pub struct SubscriberList {
    entries: Vec<(Subscriber, i32)>,
}

impl SubscriberList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Returns false if it was already registered.
    pub fn subscribe(&mut self, subscriber: Subscriber, sort_key: i32) -> bool {
        if self.contains(subscriber) {
            return false;
        }
        let idx = self.entries.partition_point(|(_, key)| *key <= sort_key);
        self.entries.insert(idx, (subscriber, sort_key));
        true
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, subscriber: Subscriber) -> bool {
        match self.entries.iter().position(|(s, _)| *s == subscriber) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Check if a subscriber is registered.
    pub fn contains(&self, subscriber: Subscriber) -> bool {
        self.entries.iter().any(|(s, _)| *s == subscriber)
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the subscribers in delivery order.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.entries.iter().map(|(s, _)| *s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IndicatorId, SignalId};

    #[test]
    fn test_delivery_order_follows_key_then_registration() {
        let mut list = SubscriberList::new();
        list.subscribe(Subscriber::Indicator(IndicatorId(2)), 1);
        list.subscribe(Subscriber::Indicator(IndicatorId(0)), 0);
        list.subscribe(Subscriber::Signal(SignalId(0)), 0);

        assert_eq!(
            list.snapshot(),
            vec![
                Subscriber::Indicator(IndicatorId(0)),
                Subscriber::Signal(SignalId(0)),
                Subscriber::Indicator(IndicatorId(2)),
            ]
        );
    }

    #[test]
    fn test_subscribe_is_not_duplicated() {
        let mut list = SubscriberList::new();
        assert!(list.subscribe(Subscriber::Signal(SignalId(1)), 0));
        assert!(!list.subscribe(Subscriber::Signal(SignalId(1)), 0));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let mut list = SubscriberList::new();
        list.subscribe(Subscriber::Signal(SignalId(1)), 0);
        list.subscribe(Subscriber::Signal(SignalId(2)), 0);

        assert!(list.unsubscribe(Subscriber::Signal(SignalId(1))));
        assert!(!list.unsubscribe(Subscriber::Signal(SignalId(1))));
        assert_eq!(list.snapshot(), vec![Subscriber::Signal(SignalId(2))]);
    }
}
