//! Memory Match Server
//!
//! Hosts one shared memory matching session over WebSocket.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use memory_match::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("reading server configuration")?;

    info!("Memory Match Server v{}", VERSION);
    info!(
        "Max players: {}, default rounds: {}, reveal delay: {:?}",
        config.session.max_players, config.session.default_max_rounds, config.session.reveal_delay,
    );
    if let Some(seed) = config.session.seed {
        info!("Fixed session seed: {}", seed);
    }

    let server = GameServer::new(config);

    tokio::select! {
        result = server.run() => {
            result.context("server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            server.shutdown();
            // Let connection tasks flush their shutdown notice
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    Ok(())
}
