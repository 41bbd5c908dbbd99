//! Reservation worker.
//!
//! Serves `Reservation.create` over the RPC listener. Exits non-zero when the
//! accept-failure budget is exhausted so a supervisor can restart it.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use mesh_gateway::audit::AuditClient;
use mesh_gateway::config::{WorkerConfig, WorkerKind};
use mesh_gateway::logging::init_tracing;
use mesh_gateway::rpc::{RpcClient, RpcListener, ServiceRegistry};
use mesh_gateway::store::{self, PgReservationStore};
use mesh_gateway::workers::ReservationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = WorkerConfig::from_env(WorkerKind::Reservation)?;
    info!(?config, "loaded configuration");

    let pool = store::connect(config.database_url.expose_secret(), config.db_timeout)
        .await
        .context("connecting to reservation database")?;
    info!("connected to database");

    let audit = AuditClient::new(RpcClient::new(
        config.logger_rpc_addr.clone(),
        config.rpc_timeout,
    ));
    let service = ReservationService::new(PgReservationStore::new(pool), audit, config.db_timeout);
    let listener = RpcListener::new(ServiceRegistry::new().register(service), config.listener.clone());

    let tcp = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "reservation worker listening");

    listener
        .serve_with_shutdown(tcp, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("reservation worker stopped");
    Ok(())
}
