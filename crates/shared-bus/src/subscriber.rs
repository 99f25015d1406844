//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::publisher::TopicTable;
use std::fmt;
use std::sync::Weak;
use tracing::debug;

/// A subscription handle.
///
/// When dropped, the handler is removed from its topic. Long-lived listeners
/// (route table, response listener) keep their handle for the gateway's
/// lifetime; anything scoped to a single request must drop its handle as
/// soon as that request is finished.
pub struct Subscription {
    /// Weak so a dropped bus does not outlive its handles.
    topics: Weak<TopicTable>,

    /// Topic this subscription listens on.
    topic: String,

    /// Subscriber id within the topic.
    id: u64,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(topics: Weak<TopicTable>, topic: String, id: u64) -> Self {
        Self { topics, topic, id }
    }

    /// Get the topic for this subscription.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Detach the handler now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(topics) = self.topics.upgrade() else {
            return;
        };
        let mut table = topics.write();
        let Some(subscribers) = table.get_mut(&self.topic) else {
            return;
        };

        subscribers.retain(|entry| entry.id != self.id);
        if subscribers.is_empty() {
            table.remove(&self.topic);
        }
        debug!(topic = %self.topic, subscriber = self.id, "Subscription dropped");
    }
}
