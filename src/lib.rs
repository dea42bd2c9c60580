//! BitGuess Backend Library
//!
//! This module exposes the backend components for use by the binary and tests.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod http_service;
pub mod models;
pub mod oracle;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clock::Clock;
use config::StoreBackend;
use oracle::PriceOracle;
use repositories::{InMemoryPlayerStore, PlayerRepository, PlayerStore};
use services::{GuessService, PlayerService};
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub guess_service: Arc<GuessService>,
    pub player_service: Arc<PlayerService>,
    pub oracle: Arc<dyn PriceOracle>,
}

impl AppState {
    /// Wire the services over the given collaborators
    pub fn new(
        store: Arc<dyn PlayerStore>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            guess_service: Arc::new(GuessService::new(store.clone(), oracle.clone(), clock)),
            player_service: Arc::new(PlayerService::new(store)),
            oracle,
        }
    }
}

/// Open the player store selected by `config`, migrating Postgres first
pub async fn connect_store(config: &AppConfig) -> AppResult<Arc<dyn PlayerStore>> {
    match (config.store_backend, config.database.as_ref()) {
        (StoreBackend::Postgres, Some(db_config)) => {
            info!(
                max_connections = db_config.max_connections,
                "Connecting to database..."
            );
            let pool = database::create_pool(db_config).await?;

            info!("Running database migrations...");
            database::run_migrations(&pool).await?;

            Ok(Arc::new(PlayerRepository::new(pool)))
        }
        (StoreBackend::Postgres, None) => Err(AppError::Config(
            "postgres store selected without database configuration".to_string(),
        )),
        (StoreBackend::Memory, _) => {
            warn!("Using in-memory player store; data is lost on restart");
            Ok(Arc::new(InMemoryPlayerStore::new()))
        }
    }
}
