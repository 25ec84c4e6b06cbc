//! Peers Deploy Dispatcher - Entry Point
//!
//! Small webhook service that listens for signed GitHub push deliveries and
//! kicks off the matching build target in the background.

use std::sync::Arc;

use tracing::{error, info};

use peers_deployd::config::Config;
use peers_deployd::deploy::runner::CommandRunner;
use peers_deployd::logs::{init_logging, LogOptions};
use peers_deployd::server::serve::serve;
use peers_deployd::server::state::ServerState;

#[tokio::main]
async fn main() {
    // Local overrides first, then the shared .env
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    if let Err(e) = init_logging(LogOptions::from_env()) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(ServerState::new(config.clone(), Arc::new(CommandRunner)));

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    };

    let handle = match serve(&config.server, state, shutdown_signal).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    match handle.await {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }
}
