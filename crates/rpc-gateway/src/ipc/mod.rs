//! Event bus side of the gateway.
//!
//! The connection handler never calls a business handler directly: it
//! publishes a dispatch event and waits for the reply with the same
//! correlation id on the result topic.

pub mod handler;

pub use handler::{Dispatcher, ResponseListener};
