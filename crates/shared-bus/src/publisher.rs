//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the in-memory bus itself.

use crate::events::GatewayEvent;
use crate::subscriber::Subscription;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Callback invoked for every event on a subscribed topic.
pub type EventHandler = Arc<dyn Fn(&GatewayEvent) + Send + Sync>;

pub(crate) struct SubscriberEntry {
    pub(crate) id: u64,
    pub(crate) handler: EventHandler,
}

/// Topic → subscribers, in subscription order.
pub(crate) type TopicTable = RwLock<HashMap<String, Vec<SubscriberEntry>>>;

/// Trait for publishing events to the bus.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of subscribers that were invoked. Zero means nothing is
    /// listening on the event's topic and the event was dropped.
    fn publish(&self, event: GatewayEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Delivery is synchronous: `publish` returns only after every subscriber of
/// the topic has run. The subscriber list is snapshotted before delivery, so
/// a handler may publish (or subscribe) without deadlocking the bus.
pub struct InMemoryEventBus {
    /// Subscribers keyed by topic.
    topics: Arc<TopicTable>,

    /// Monotonic subscriber id source.
    next_subscriber: AtomicU64,

    /// Total events published.
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    /// Create a new, empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            next_subscriber: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe a handler to a topic.
    ///
    /// The handler stays attached for as long as the returned `Subscription`
    /// is alive.
    #[must_use = "dropping the subscription detaches the handler"]
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);

        self.topics
            .write()
            .entry(topic.clone())
            .or_default()
            .push(SubscriberEntry {
                id,
                handler: Arc::new(handler),
            });

        debug!(topic = %topic, subscriber = id, "New subscription created");

        Subscription::new(Arc::downgrade(&self.topics), topic, id)
    }

    /// Whether anything is listening on `topic`.
    #[must_use]
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriber_count(topic) > 0
    }

    /// Number of handlers attached to `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Number of topics with at least one subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    fn snapshot(&self, topic: &str) -> Vec<EventHandler> {
        self.topics
            .read()
            .get(topic)
            .map(|subscribers| subscribers.iter().map(|s| Arc::clone(&s.handler)).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: GatewayEvent) -> usize {
        let topic = event.topic().to_string();
        let correlation_id = event.correlation_id();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let handlers = self.snapshot(&topic);
        if handlers.is_empty() {
            warn!(
                topic = %topic,
                correlation_id = %correlation_id,
                "Event dropped (no subscribers)"
            );
            return 0;
        }

        for handler in &handlers {
            // A panicking subscriber must not take the others down with it.
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!(
                    topic = %topic,
                    correlation_id = %correlation_id,
                    "Subscriber panicked while handling event"
                );
            }
        }

        debug!(
            topic = %topic,
            correlation_id = %correlation_id,
            receivers = handlers.len(),
            "Event published"
        );
        handlers.len()
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
