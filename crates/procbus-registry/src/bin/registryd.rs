//! Standalone registry daemon.
//!
//! Hosting the registry in a dedicated process is optional — the first
//! process that cannot find one bootstraps a registry in-process — but a
//! daemon keeps discovery alive across the comings and goings of worker
//! processes.

use procbus_registry::RegistryServer;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let server = match RegistryServer::bind().await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind the registry endpoint: {e}");
            std::process::exit(1);
        }
    };

    let handle = server.spawn();
    info!("registryd running, press ctrl-c to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
    }

    handle.stop().await;
}
