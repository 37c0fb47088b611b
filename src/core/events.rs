//! Copy-on-write event subscriptions.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Initial multicast event bus with snapshot dispatch

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Identifier returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Multicast event list with copy-on-write semantics.
///
/// `publish` dispatches against an immutable snapshot of the subscriber list,
/// so subscribers added or removed while a dispatch is in flight do not affect
/// that dispatch.
pub struct EventBus<E> {
    subscribers: RwLock<Arc<Vec<(SubscriptionId, Subscriber<E>)>>>,
    next_id: AtomicU64,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        EventBus {
            subscribers: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Add a subscriber. The callback must not block.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.subscribers.write().unwrap();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push((id, Arc::new(callback)));
        *guard = Arc::new(next);
        id
    }

    /// Remove a subscriber. Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.subscribers.write().unwrap();
        if !guard.iter().any(|(sid, _)| *sid == id) {
            return false;
        }
        let next: Vec<_> = guard
            .iter()
            .filter(|(sid, _)| *sid != id)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    /// Publish an event to the current subscriber snapshot.
    pub fn publish(&self, event: &E) {
        let snapshot = {
            let guard = self.subscribers.read().unwrap();
            Arc::clone(&guard)
        };
        for (_, subscriber) in snapshot.iter() {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap().len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus: EventBus<u32> = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            bus.subscribe(move |value: &u32| {
                hits.fetch_add(*value as usize, Ordering::SeqCst);
            });
        }

        bus.publish(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus: EventBus<u32> = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = Arc::clone(&hits);
        let id = bus.subscribe(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&1);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_during_publish_does_not_affect_in_flight() {
        // A subscriber that subscribes another subscriber mid-dispatch; the
        // new subscriber must not see the event that triggered it.
        let bus: Arc<EventBus<u32>> = Arc::new(EventBus::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let bus_clone = Arc::clone(&bus);
        let late_clone = Arc::clone(&late_hits);
        bus.subscribe(move |_| {
            let late = Arc::clone(&late_clone);
            bus_clone.subscribe(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.publish(&1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 2);
    }
}
