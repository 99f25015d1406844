//! Gateway error types and their mapping onto reply status codes.
//!
//! | Failure                              | Status |
//! |--------------------------------------|--------|
//! | Wrong method/path, bad envelope      | 400    |
//! | Handler returned an error or panicked| 500    |
//! | No subscriber for the dispatch key   | 404    |
//! | Declared method, no handler          | 501    |
//! | No correlated reply in time          | 504    |

use crate::domain::config::ConfigError;
use gateway_telemetry::TelemetryError;
use shared_types::{DefinitionError, DispatchKey, EnvelopeError, ReplyEnvelope};
use std::time::Duration;
use thiserror::Error;

/// Body written for every pre-dispatch rejection.
pub const BAD_REQUEST: &str = "Bad Request";

/// Why a request did not produce a handler result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    /// Rejected before dispatch: wrong method or path, unreadable body,
    /// or an envelope that failed validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The handler returned an error or panicked.
    #[error("handler for {key} failed: {detail}")]
    HandlerFailure { key: DispatchKey, detail: String },

    /// The method is declared but nothing was registered for it.
    #[error("no handler registered for {0}")]
    HandlerMissing(DispatchKey),

    /// Nothing is subscribed to the dispatch key.
    #[error("no route for {0}")]
    RoutingMiss(DispatchKey),

    /// No reply was correlated within the bound.
    #[error("no reply within {0:?}")]
    CorrelationTimeout(Duration),

    /// The pending entry was dropped without a reply.
    #[error("reply channel closed")]
    ReplyChannelClosed,
}

impl DispatchError {
    /// HTTP status for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::HandlerFailure { .. } | Self::ReplyChannelClosed => 500,
            Self::HandlerMissing(_) => 501,
            Self::RoutingMiss(_) => 404,
            Self::CorrelationTimeout(_) => 504,
        }
    }

    /// Reply sent to the caller. Handler detail never leaves the process.
    pub fn to_reply(&self) -> ReplyEnvelope {
        match self {
            Self::BadRequest(_) => ReplyEnvelope::failure(400, BAD_REQUEST),
            Self::HandlerFailure { .. } | Self::ReplyChannelClosed => {
                ReplyEnvelope::internal_error()
            }
            Self::HandlerMissing(_) => ReplyEnvelope::not_implemented(),
            Self::RoutingMiss(_) => ReplyEnvelope::not_found(),
            Self::CorrelationTimeout(_) => ReplyEnvelope::gateway_timeout(),
        }
    }
}

impl From<EnvelopeError> for DispatchError {
    fn from(err: EnvelopeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Errors raised while building or running the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid service definition
    #[error("service definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// Logging could not be installed
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(#[source] std::io::Error),

    /// The HTTP server stopped with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
