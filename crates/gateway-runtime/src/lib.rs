//! # Gateway Runtime Library
//!
//! Configuration loading and the built-in demo service, exposed for tests.
//! The entry point is the `main.rs` binary.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, config file, environment)
//! 2. Load the service definition (file or built-in `arithmetic`)
//! 3. Attach a console sink and register handlers
//! 4. Build the gateway and serve until Ctrl+C

pub mod arithmetic;
pub mod config;

use gateway_telemetry::LogLevel;
use rpc_gateway::{Gateway, GatewayBuilder, GatewayConfig, GatewayError};
use shared_types::ServiceDefinition;

/// Build the gateway with the built-in handlers and a console sink.
pub fn build_gateway(
    config: GatewayConfig,
    definition: ServiceDefinition,
    console_level: LogLevel,
) -> Result<Gateway, GatewayError> {
    let mut builder = GatewayBuilder::new(config, definition);
    builder.add_console_logger(console_level);
    arithmetic::register(&mut builder)?;
    builder.build()
}
