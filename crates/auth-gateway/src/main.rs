//! Auth gateway binary.
//!
//! Configuration comes from `SIWE_*` environment variables; log level from
//! `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use auth_gateway::{AuthGateway, GatewayConfig};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = GatewayConfig::from_env().context("failed to load gateway configuration")?;

    let gateway = AuthGateway::new(config).context("failed to build gateway")?;
    gateway.run(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
