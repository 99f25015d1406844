//! Bus-side half of a request: publish the dispatch, wait for the reply.

use crate::domain::error::DispatchError;
use crate::domain::pending::PendingRequestStore;
use shared_bus::{
    DispatchEvent, EventPublisher, GatewayEvent, InMemoryEventBus, Subscription, RESULT_TOPIC,
};
use shared_types::{DispatchKey, ReplyEnvelope, RequestEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Publishes validated envelopes and correlates their replies.
pub struct Dispatcher {
    bus: Arc<InMemoryEventBus>,
    pending: Arc<PendingRequestStore>,
    reply_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        bus: Arc<InMemoryEventBus>,
        pending: Arc<PendingRequestStore>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            pending,
            reply_timeout,
        }
    }

    /// Dispatch one envelope and wait for its correlated reply.
    ///
    /// A reply published by a route (including 500 and 501 replies) is
    /// returned as `Ok`; only routing misses and correlation failures are
    /// errors.
    pub async fn try_dispatch(
        &self,
        envelope: RequestEnvelope,
    ) -> Result<ReplyEnvelope, DispatchError> {
        let key = DispatchKey::new(&envelope.service_name, &envelope.method_name);
        let (correlation_id, rx) = self.pending.register(&key, Some(self.reply_timeout));

        let event = DispatchEvent::from_envelope(correlation_id, envelope);
        let receivers = self.bus.publish(GatewayEvent::Dispatch(event));
        if receivers == 0 {
            self.pending.cancel(&correlation_id);
            return Err(DispatchError::RoutingMiss(key));
        }

        debug!(
            correlation_id = %correlation_id,
            key = %key,
            receivers = receivers,
            "Dispatch published"
        );

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(correlated)) => Ok(correlated.reply),
            Ok(Err(_)) => Err(DispatchError::ReplyChannelClosed),
            Err(_) => {
                self.pending.expire(&correlation_id);
                Err(DispatchError::CorrelationTimeout(self.reply_timeout))
            }
        }
    }

    /// Dispatch and fold every failure into its reply envelope.
    pub async fn dispatch(&self, envelope: RequestEnvelope) -> ReplyEnvelope {
        match self.try_dispatch(envelope).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, status = err.status_code(), "Dispatch failed");
                err.to_reply()
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }
}

/// Process-lifetime listener on the result topic.
///
/// Completes the pending entry for each reply's correlation id. Replies for
/// unknown or expired ids are logged by the store and dropped.
pub struct ResponseListener {
    _subscription: Subscription,
}

impl ResponseListener {
    pub fn attach(bus: &InMemoryEventBus, pending: Arc<PendingRequestStore>) -> Self {
        let subscription = bus.subscribe(RESULT_TOPIC, move |event| {
            if let GatewayEvent::Reply(reply) = event {
                pending.complete(reply.correlation_id, reply.reply.clone());
            }
        });
        Self {
            _subscription: subscription,
        }
    }
}
