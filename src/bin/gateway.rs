//! HTTP gateway.
//!
//! Authenticates callers, forwards `auth` envelopes to the credential
//! service, and dispatches `reserve` envelopes to the Reservation worker.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use mesh_gateway::config::GatewayConfig;
use mesh_gateway::gateway::{router, GatewayState};
use mesh_gateway::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env()?;
    info!(?config, "loaded configuration");

    let state = GatewayState::from_config(&config)?;
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    info!("gateway stopped");
    Ok(())
}
