//! # Gateway Events
//!
//! The two event kinds that flow through the bus.

use crate::RESULT_TOPIC;
use serde::{Deserialize, Serialize};
use shared_types::{Args, CorrelationId, DispatchKey, ReplyEnvelope, RequestEnvelope};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// A validated request, routed to the subscriber of its dispatch key.
    /// Source: Connection Handler | Target: Route Table
    Dispatch(DispatchEvent),

    /// The single reply for one dispatch.
    /// Source: Route Table | Target: Response Listener
    Reply(ReplyEvent),
}

impl GatewayEvent {
    /// Topic this event is delivered on.
    pub fn topic(&self) -> &str {
        match self {
            Self::Dispatch(event) => event.key.as_str(),
            Self::Reply(_) => RESULT_TOPIC,
        }
    }

    /// Correlation id shared by a dispatch and its reply.
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::Dispatch(event) => event.correlation_id,
            Self::Reply(event) => event.correlation_id,
        }
    }
}

/// Dispatch request for one `(service, method)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub correlation_id: CorrelationId,
    pub key: DispatchKey,
    pub service_name: String,
    pub method_name: String,
    pub args: Args,
}

impl DispatchEvent {
    /// Build the dispatch event for an accepted envelope.
    pub fn from_envelope(correlation_id: CorrelationId, envelope: RequestEnvelope) -> Self {
        Self {
            correlation_id,
            key: DispatchKey::new(&envelope.service_name, &envelope.method_name),
            service_name: envelope.service_name,
            method_name: envelope.method_name,
            args: envelope.args,
        }
    }
}

/// Reply to the dispatch with the same correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEvent {
    pub correlation_id: CorrelationId,
    pub reply: ReplyEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> RequestEnvelope {
        RequestEnvelope::parse(
            br#"{"serviceName":"arithmetic","methodName":"add","args":{"first":1}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_dispatch_topic_is_dispatch_key() {
        let id = CorrelationId::new();
        let event = GatewayEvent::Dispatch(DispatchEvent::from_envelope(id, envelope()));
        assert_eq!(event.topic(), "arithmetic_add");
        assert_eq!(event.correlation_id(), id);
    }

    #[test]
    fn test_reply_topic_is_result() {
        let id = CorrelationId::new();
        let event = GatewayEvent::Reply(ReplyEvent {
            correlation_id: id,
            reply: ReplyEnvelope::internal_error(),
        });
        assert_eq!(event.topic(), RESULT_TOPIC);
        assert_eq!(event.correlation_id(), id);
    }

    #[test]
    fn test_dispatch_keeps_args() {
        let event = DispatchEvent::from_envelope(CorrelationId::new(), envelope());
        assert_eq!(event.args["first"], json!(1));
        assert_eq!(event.service_name, "arithmetic");
        assert_eq!(event.method_name, "add");
    }
}
