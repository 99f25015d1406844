//! RPC Gateway - one HTTP endpoint in front of an in-process event bus.
//!
//! Clients post a JSON envelope naming a service, a method and named
//! arguments. The gateway validates it, publishes a dispatch event on the
//! bus, and answers the connection with the reply carrying the same
//! correlation id.
//!
//! # Architecture
//!
//! ```text
//!   POST /messages
//!         │
//!  ┌──────┴───────────────────────────────┐
//!  │  TracingLayer → Connection Handler    │   400 on wrong method/path,
//!  │  (envelope validation)                │   oversized or invalid body
//!  └──────┬───────────────────────────────┘
//!         │ Dispatcher: register correlation id, publish
//!  ┌──────┴──────┐   "<service>_<method>"   ┌─────────────┐
//!  │  Event Bus  │ ───────────────────────▶ │ Route Table │ ─▶ business handler
//!  │             │ ◀─────────────────────── │             │
//!  └──────┬──────┘        "result"          └─────────────┘
//!         │
//!  ┌──────┴───────────────────┐
//!  │ Response Listener        │ completes the pending entry;
//!  │ Pending Request Store    │ 404 no route, 504 no reply in time
//!  └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rpc_gateway::{GatewayBuilder, GatewayConfig};
//! use shared_types::ServiceDefinition;
//!
//! let mut builder = GatewayBuilder::new(GatewayConfig::default(), definition);
//! builder.register_handler("add", |args| Ok(json!(number_arg(args, 0)? + number_arg(args, 1)?)))?;
//! let gateway = builder.build()?;
//! gateway.start(shutdown_signal()).await?;
//! ```

pub mod domain;
pub mod ipc;
pub mod middleware;
pub mod routes;
pub mod service;

// Re-exports
pub use domain::{
    number_arg, ConfigError, DispatchError, GatewayConfig, GatewayError, HttpConfig,
    LimitsConfig, MethodHandler, MethodRegistry, PendingRequestStore, TimeoutConfig, BAD_REQUEST,
};
pub use gateway_telemetry::{LogLevel, LogSink, LoggingConfig};
pub use ipc::{Dispatcher, ResponseListener};
pub use middleware::{GatewayMetrics, MetricsSnapshot};
pub use routes::{Route, RouteTable};
pub use service::{Gateway, GatewayBuilder};
