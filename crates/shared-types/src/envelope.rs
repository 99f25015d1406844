//! # Wire Envelopes
//!
//! The request envelope accepted by the single RPC endpoint and the reply
//! envelope produced for every accepted request.
//!
//! ```text
//! request:  {"serviceName": "...", "methodName": "...", "args": {...}}
//! reply:    {"statusCode": 200, "value": {"data": {"type": "...", "value": ...}}}
//!           {"statusCode": 500, "message": "Internal server error"}
//! ```

use crate::errors::EnvelopeError;
use crate::service::ParamType;
use crate::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated request envelope.
///
/// Constructed only by [`RequestEnvelope::parse`]; consumed once by dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Target service.
    pub service_name: String,
    /// Target method within the service.
    pub method_name: String,
    /// Named arguments, projected onto declared parameter order at dispatch.
    pub args: Args,
}

impl RequestEnvelope {
    /// Decode and validate one fully-buffered request body.
    ///
    /// Unknown top-level fields are ignored.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value against the envelope schema.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let service_name = take_name(&mut object, "serviceName")?;
        let method_name = take_name(&mut object, "methodName")?;

        let args = match object.remove("args") {
            Some(Value::Object(args)) => args,
            Some(other) => {
                return Err(EnvelopeError::InvalidField {
                    field: "args",
                    reason: format!("expected object, found {}", json_kind(&other)),
                })
            }
            None => return Err(EnvelopeError::MissingField("args")),
        };

        for (name, value) in &args {
            if !is_supported_argument(value) {
                return Err(EnvelopeError::UnsupportedArgument { name: name.clone() });
            }
        }

        Ok(Self {
            service_name,
            method_name,
            args,
        })
    }
}

fn take_name(
    object: &mut serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, EnvelopeError> {
    match object.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(EnvelopeError::InvalidField {
            field,
            reason: "must not be empty".into(),
        }),
        Some(other) => Err(EnvelopeError::InvalidField {
            field,
            reason: format!("expected string, found {}", json_kind(&other)),
        }),
        None => Err(EnvelopeError::MissingField(field)),
    }
}

fn is_supported_argument(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Object(_)
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed result wrapper: `{"data": {"type": ..., "value": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResult {
    pub data: ResultData,
}

/// Declared return type plus the handler's actual return value.
///
/// The declared type is informational; it is not checked against `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub value: Value,
}

/// The single reply produced for each accepted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    /// HTTP status written back to the caller.
    pub status_code: u16,
    /// Plain message, used for every non-success reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Typed result, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonResult>,
}

impl ReplyEnvelope {
    pub const INTERNAL_ERROR: &'static str = "Internal server error";
    pub const NOT_FOUND: &'static str = "Not Found";
    pub const NOT_IMPLEMENTED: &'static str = "Not Implemented";
    pub const GATEWAY_TIMEOUT: &'static str = "Gateway Timeout";

    /// Successful reply wrapping the handler's return value.
    pub fn success(kind: ParamType, value: Value) -> Self {
        Self {
            status_code: 200,
            message: None,
            value: Some(JsonResult {
                data: ResultData { kind, value },
            }),
        }
    }

    /// Reply carrying only a status code and message.
    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: Some(message.into()),
            value: None,
        }
    }

    /// Handler failed. Never carries the failure detail.
    pub fn internal_error() -> Self {
        Self::failure(500, Self::INTERNAL_ERROR)
    }

    /// No subscriber for the dispatch key.
    pub fn not_found() -> Self {
        Self::failure(404, Self::NOT_FOUND)
    }

    /// Method is declared but no handler is registered for it.
    pub fn not_implemented() -> Self {
        Self::failure(501, Self::NOT_IMPLEMENTED)
    }

    /// No correlated reply arrived within the configured bound.
    pub fn gateway_timeout() -> Self {
        Self::failure(504, Self::GATEWAY_TIMEOUT)
    }

    /// Whether this reply reports success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// HTTP body for this reply: the message if present, else the JSON value.
    pub fn body(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        serde_json::to_string(&self.value).unwrap_or_else(|_| "null".to_string())
    }
}
