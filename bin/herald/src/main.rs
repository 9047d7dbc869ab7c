use anyhow::Result;
use clap::Parser;
use herald_core::{Declarations, MemoryDiscovery};
use herald_etcd::EtcdDiscovery;
use tracing::{error, info, warn};

mod config;
mod logging;
mod signal;

use config::{Cli, Config};
use signal::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load(Cli::parse())?;
    logging::init(config.log_format, config.log_force_colors);

    info!("Starting herald...");

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        return Err(e);
    }

    info!("herald stopped");
    Ok(())
}

async fn run(config: &Config) -> Result<()> {
    let shutdown = ShutdownSignal::install()?;

    // Both lists are validated before anything reaches the backend
    let declarations = Declarations::parse(&config.services, &config.stores)?;
    info!(
        "Declared {} services and {} stores",
        declarations.services.len(),
        declarations.stores.len()
    );
    if declarations.is_empty() {
        warn!("Nothing declared, parking without registrations");
    }

    if config.dry_run {
        let memory = MemoryDiscovery::new();
        herald_core::run(&memory, &declarations, shutdown.recv()).await?;
        info!("Dry run recorded {} calls", memory.calls().await.len());
        return Ok(());
    }

    let discovery = EtcdDiscovery::connect(&config.etcd).await?;
    info!("Connected to etcd at {}", config.etcd.endpoints.join(", "));

    herald_core::run(&discovery, &declarations, shutdown.recv()).await?;
    after_revoke(discovery.close().await)
}

/// A parked run that was terminated succeeded even if the lease could not be
/// revoked; its keys expire with the TTL.
fn after_revoke(revoked: Result<()>) -> Result<()> {
    if let Err(e) = revoked {
        warn!("{:#}", e);
        warn!("Registrations will expire with the lease TTL");
    }
    Ok(())
}
