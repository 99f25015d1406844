//! # Error Types
//!
//! Errors raised while decoding envelopes and validating service definitions.

use thiserror::Error;

/// Errors produced by the envelope validator.
///
/// Every variant maps to `400 Bad Request` at the connection handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Body is not valid JSON.
    #[error("Malformed JSON: {0}")]
    Malformed(String),

    /// Body is valid JSON but not an object.
    #[error("Envelope must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field has the wrong JSON type or an empty value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// An argument value is not a string, number, boolean or object.
    #[error("Argument '{name}' must be a string, number, boolean or object")]
    UnsupportedArgument { name: String },
}

/// Errors found while validating a service definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// Service, method or parameter name does not start with a lowercase letter.
    #[error("Invalid {kind} name '{name}': must start with a lowercase ASCII letter")]
    InvalidName { kind: &'static str, name: String },

    /// Two parameters of one method share the same order.
    #[error("Duplicate order {order} in {service}.{method}")]
    DuplicateOrder {
        service: String,
        method: String,
        order: u32,
    },

    /// Parameter orders do not run 1..=n without gaps.
    #[error("Parameter orders of {service}.{method} must be contiguous from 1, found {found:?}")]
    NonContiguousOrder {
        service: String,
        method: String,
        found: Vec<u32>,
    },

    /// A default value does not match the parameter's declared type.
    #[error("Default value of {service}.{method}({param}) does not match declared type {expected}")]
    DefaultTypeMismatch {
        service: String,
        method: String,
        param: String,
        expected: String,
    },

    /// Two service/method pairs join to the same `<service>_<method>` topic.
    #[error("{second} and {first} both dispatch on '{key}'")]
    DuplicateDispatchKey {
        key: String,
        first: String,
        second: String,
    },
}
