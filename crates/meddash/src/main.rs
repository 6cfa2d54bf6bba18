//! Meddash gateway server.
//!
//! Resolves the tenant of every request from its subdomain and guards the
//! dashboard with per-tenant OIDC sessions.

use std::time::Duration;

use clap::Parser;
use meddash_gateway::{AppState, ServerConfig, create_app, init_logging};
use tracing::{debug, info, warn};

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Periodically drops expired tenant cache entries and sessions.
fn spawn_maintenance(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.tick().await;
        loop {
            interval.tick().await;
            let tenants = state.registry().purge_expired();
            match state.sessions().prune_expired().await {
                Ok(sessions) => debug!(tenants, sessions, "Maintenance pass complete"),
                Err(e) => warn!(error = %e, "Session pruning failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        identity_backend = ?config.identity_backend,
        identity_base_url = %config.identity_base_url,
        production = config.production,
        "Starting Meddash gateway"
    );

    let state = AppState::from_config(config.clone())
        .map_err(|e| anyhow::anyhow!("Cannot initialize gateway: {}", e))?;
    spawn_maintenance(state.clone(), config.maintenance_interval);

    let app = create_app(state);
    serve(app, &config).await
}
