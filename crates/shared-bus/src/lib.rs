//! # Shared Bus - Event Bus Between the HTTP Layer and Business Dispatch
//!
//! The only channel between the connection handler and the route table.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────────┐   publish(Dispatch)   ┌──────────────┐
//! │ Connection       │ ────────────────────▶ │  Event Bus   │
//! │ Handler          │                       │              │
//! │                  │ ◀──────────────────── │   topic      │
//! └──────────────────┘   "result" listener   │   table      │
//!                                            └──────┬───────┘
//!                          subscribe(dispatch key)  │  publish(Reply)
//!                                            ┌──────┴───────┐
//!                                            │ Route Table  │
//!                                            └──────────────┘
//! ```
//!
//! ## Semantics
//!
//! - `publish` runs every subscriber of the event's topic synchronously, in
//!   subscription order, on the caller's task.
//! - Subscribers may publish from inside a handler; the reply to a dispatch
//!   is published before the dispatching `publish` call returns.
//! - Every reply carries the correlation id of the dispatch that caused it.
//! - Dropping a [`Subscription`] detaches its handler.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{DispatchEvent, GatewayEvent, ReplyEvent};
pub use publisher::{EventHandler, EventPublisher, InMemoryEventBus};
pub use subscriber::Subscription;

/// Topic every reply event is published on.
pub const RESULT_TOPIC: &str = "result";
