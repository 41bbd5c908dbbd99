//! Logging worker.
//!
//! Serves `Logging.write` over the RPC listener.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use mesh_gateway::config::{WorkerConfig, WorkerKind};
use mesh_gateway::logging::init_tracing;
use mesh_gateway::rpc::{RpcListener, ServiceRegistry};
use mesh_gateway::store::{self, PgLogStore};
use mesh_gateway::workers::LoggingService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = WorkerConfig::from_env(WorkerKind::Logging)?;
    info!(?config, "loaded configuration");

    let pool = store::connect(config.database_url.expose_secret(), config.db_timeout)
        .await
        .context("connecting to log database")?;
    info!("connected to database");

    let service = LoggingService::new(PgLogStore::new(pool), config.db_timeout);
    let listener = RpcListener::new(ServiceRegistry::new().register(service), config.listener.clone());

    let tcp = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "logging worker listening");

    listener
        .serve_with_shutdown(tcp, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("logging worker stopped");
    Ok(())
}
