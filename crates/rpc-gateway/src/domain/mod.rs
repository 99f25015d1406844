//! Domain types for the RPC gateway.
//!
//! Configuration, error mapping, the handler registry and the pending
//! request store. Nothing here touches HTTP.

pub mod config;
pub mod error;
pub mod pending;
pub mod registry;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig, HttpConfig, LimitsConfig, TimeoutConfig};
pub use error::{DispatchError, GatewayError, BAD_REQUEST};
pub use pending::{
    cleanup_task, CorrelatedReply, PendingRequestStore, PendingSnapshot, PendingStats,
};
pub use registry::{number_arg, qualified_key, MethodHandler, MethodRegistry};
