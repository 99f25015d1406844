//! # Runtime Configuration
//!
//! Defaults, then an optional JSON config file, then environment overrides.
//!
//! | Variable               | Effect                                  |
//! |------------------------|-----------------------------------------|
//! | `RPC_GATEWAY_CONFIG`   | Path of a JSON [`GatewayConfig`] file   |
//! | `RPC_GATEWAY_HOST`     | Bind address                            |
//! | `RPC_GATEWAY_PORT`     | Bind port                               |
//! | `RPC_GATEWAY_ENDPOINT` | Endpoint path                           |
//! | `RPC_GATEWAY_LOG_LEVEL`| Global and console log level            |
//! | `RPC_GATEWAY_SERVICES` | Path of a JSON service definition       |

use crate::arithmetic;
use gateway_telemetry::LogLevel;
use rpc_gateway::GatewayConfig;
use shared_types::ServiceDefinition;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_ENV: &str = "RPC_GATEWAY_CONFIG";
pub const HOST_ENV: &str = "RPC_GATEWAY_HOST";
pub const PORT_ENV: &str = "RPC_GATEWAY_PORT";
pub const ENDPOINT_ENV: &str = "RPC_GATEWAY_ENDPOINT";
pub const SERVICES_ENV: &str = "RPC_GATEWAY_SERVICES";
pub const LOG_LEVEL_ENV: &str = "RPC_GATEWAY_LOG_LEVEL";

/// Errors while loading runtime configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Gateway configuration from the process environment.
pub fn load_config() -> Result<GatewayConfig, LoadError> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Service definition from the process environment, or the built-in one.
pub fn load_definition() -> Result<ServiceDefinition, LoadError> {
    load_definition_with(|key| std::env::var(key).ok())
}

/// Gateway configuration, reading variables through `lookup`.
pub fn load_config_with<F>(lookup: F) -> Result<GatewayConfig, LoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            let config: GatewayConfig = read_json(&path)?;
            info!(path = ?path, "Loaded gateway config file");
            config
        }
        None => GatewayConfig::default(),
    };

    if let Some(host) = lookup(HOST_ENV) {
        config.http.host = host.parse().map_err(|_| LoadError::InvalidEnv {
            var: HOST_ENV,
            value: host,
        })?;
    }
    if let Some(port) = lookup(PORT_ENV) {
        config.http.port = port.parse().map_err(|_| LoadError::InvalidEnv {
            var: PORT_ENV,
            value: port,
        })?;
    }
    if let Some(endpoint) = lookup(ENDPOINT_ENV) {
        config.http.endpoint = endpoint;
    }
    if let Some(level) = lookup(LOG_LEVEL_ENV) {
        let parsed: LogLevel = level.parse().map_err(|_| LoadError::InvalidEnv {
            var: LOG_LEVEL_ENV,
            value: level,
        })?;
        config.logging.level = parsed.as_str().to_string();
    }

    Ok(config)
}

/// Console sink level for `config`.
///
/// A full `EnvFilter` directive such as `rpc_gateway=info` is not a single
/// level; the console then lets everything the global filter passes.
pub fn console_level(config: &GatewayConfig) -> LogLevel {
    config.logging.level.parse().unwrap_or(LogLevel::Debug)
}

/// Service definition, reading variables through `lookup`.
pub fn load_definition_with<F>(lookup: F) -> Result<ServiceDefinition, LoadError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(SERVICES_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            let definition: ServiceDefinition = read_json(&path)?;
            info!(path = ?path, "Loaded service definition");
            Ok(definition)
        }
        None => Ok(arithmetic::definition()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
