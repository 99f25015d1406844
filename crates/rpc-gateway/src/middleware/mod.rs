//! Middleware stack for the RPC gateway.
//!
//! Layer order: Request → Tracing → Handler. Metrics are recorded by the
//! connection handler once the reply status is known.

pub mod metrics;
pub mod tracing;

pub use metrics::{GatewayMetrics, MetricsSnapshot, RequestTimer};
pub use tracing::TracingLayer;
