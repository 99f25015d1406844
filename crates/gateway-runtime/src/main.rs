//! # RPC Gateway Runtime
//!
//! Serves the configured service definition on one HTTP endpoint.
//!
//! Runs on a current-thread Tokio runtime: connection handling, dispatch
//! and business handlers all share one thread, and a handler that blocks
//! stalls every connection.

use anyhow::{Context, Result};
use gateway_runtime::{build_gateway, config};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = config::load_config().context("Failed to load gateway config")?;
    let definition = config::load_definition().context("Failed to load service definition")?;

    let console_level = config::console_level(&config);
    let gateway =
        build_gateway(config, definition, console_level).context("Failed to build gateway")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    gateway
        .start(shutdown)
        .await
        .context("Gateway terminated with an error")?;

    Ok(())
}
