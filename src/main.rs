//! BitGuess Backend Service
//!
//! Main entry point for the BitGuess prediction game backend.
//! This service provides:
//! - HTTP/JSON API for placing and resolving guesses
//! - Player creation for the signup flow
//! - Spot price passthrough for the price display

use anyhow::Context;
use bitguess_backend::clock::SystemClock;
use bitguess_backend::config::AppConfig;
use bitguess_backend::http_service;
use bitguess_backend::oracle::{CoinbaseOracle, PriceOracle};
use bitguess_backend::{connect_store, AppError, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "bitguess_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(AppError::Config)?;

    init_tracing(&config);

    info!("BitGuess backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Store backend: {}", config.store_backend.as_str());
    info!("HTTP port: {}", config.http.port);

    let store = connect_store(&config)
        .await
        .context("failed to open player store")?;
    info!("✓ Player store ready ({})", store.backend_name());

    let oracle: Arc<dyn PriceOracle> = Arc::new(
        CoinbaseOracle::new(&config.oracle).context("failed to build price client")?,
    );
    info!(
        "✓ Price oracle ready ({}, timeout {}s)",
        config.oracle.url, config.oracle.timeout_secs
    );

    let state = AppState::new(store, oracle, Arc::new(SystemClock));
    let app = http_service::router(state, &config.http);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("✓ HTTP server listening on {}", addr);
    info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, shutting down gracefully...");
        })
        .await
        .context("HTTP server error")?;

    info!("BitGuess backend shutdown complete");
    Ok(())
}
