//! # Shared Types Crate
//!
//! This crate contains the wire envelopes exchanged over the single RPC
//! endpoint, the declarative service definition that drives routing, and the
//! correlation identifier that ties one reply to one waiting connection.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses the HTTP boundary or
//!   the event bus is defined here.
//! - **Validated at the edge**: a `RequestEnvelope` can only be obtained through
//!   [`RequestEnvelope::parse`], and a `ServiceDefinition` is checked by
//!   [`ServiceDefinition::validate`] before any route is subscribed.
//! - **Keys are derived, never typed by hand**: dispatch keys come from
//!   [`DispatchKey::new`].

pub mod correlation;
pub mod envelope;
pub mod errors;
pub mod service;

pub use correlation::CorrelationId;
pub use envelope::{JsonResult, ReplyEnvelope, RequestEnvelope, ResultData};
pub use errors::*;
pub use service::{
    DispatchKey, MethodSpec, ParamSpec, ParamType, ReturnInfo, ServiceDefinition, ServiceInfo,
};

/// Argument map carried by a request envelope.
pub type Args = serde_json::Map<String, serde_json::Value>;
