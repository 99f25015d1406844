//! # Gateway Telemetry
//!
//! Log sink configuration for the RPC gateway.
//!
//! ## Sinks
//!
//! - **Console**: human-readable, coloured `fmt` output.
//! - **File**: one JSON object per line, appended to the given path.
//! - **Http**: the same JSON lines, each POSTed to `http://{host}:{port}/`
//!   from a background thread.
//!
//! Each sink has its own level; the global `level` (or `RUST_LOG`) is the
//! ceiling for all of them. Sinks are attached before the gateway starts and
//! the subscriber is installed exactly once per process.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_logging, LogLevel, LogSink, LoggingConfig};
//!
//! let config = LoggingConfig {
//!     level: "debug".into(),
//!     sinks: vec![LogSink::Console { level: LogLevel::Info }],
//! };
//! init_logging(&config)?;
//! ```

mod config;
mod http_sink;
mod tracing_setup;

pub use config::{LogLevel, LogSink, LoggingConfig};
pub use tracing_setup::init_logging;

use std::path::PathBuf;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log level filter: {0}")]
    InvalidLevel(String),

    #[error("Failed to open log file {path:?}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start HTTP log sink for {endpoint}: {source}")]
    HttpSink {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
