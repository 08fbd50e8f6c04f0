//! veil-daemon: runs a whole onion-routing overlay on localhost.
//!
//! One directory, a configurable number of relays and users, each serving
//! newline-delimited JSON on its own TCP port.

mod config;
mod launcher;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::launcher::Overlay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing (RUST_LOG wins over the config file)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Veil daemon starting");

    // 3. Start every role
    let mut overlay = Overlay::launch(&config).await?;
    let relay_ids: Vec<_> = overlay.relays.iter().map(|r| r.id()).collect();
    let user_ids: Vec<_> = overlay.users.iter().map(|u| u.id()).collect();
    info!("Relays {:?} registered, users {:?} ready", relay_ids, user_ids);

    // 4. Run until a server fails or Ctrl-C
    tokio::select! {
        result = overlay.wait() => {
            if let Err(e) = result {
                error!("Server error: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    overlay.shutdown().await;
    info!("Daemon stopped");
    Ok(())
}
