//! Pitwall Server
//!
//! Telemetry simulation, live arbitration and REST/SSE API

use anyhow::Result;
use clap::Parser;
use pitwall_server::config::{Cli, ServerConfig};
use pitwall_server::{api, manager, state};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli)?;
    let addr = config.bind;

    info!("Starting Pitwall Server");

    let state = state::AppState::new(config)?;
    manager::register_default_sources(&state).await?;

    let app = api::create_router(state.clone());

    // Start tick loop in background
    let ticker = tokio::spawn(manager::run(state.clone()));

    info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    ticker.await?;
    Ok(())
}
