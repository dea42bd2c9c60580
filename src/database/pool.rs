//! Postgres pool setup and schema migrations

use crate::config::DatabaseConfig;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Player schema, embedded from `./migrations` at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Failures while bringing the player database up
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid DATABASE_URL: {0}")]
    InvalidUrl(sqlx::Error),

    #[error("Failed to connect to the player database: {0}")]
    PoolCreation(sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] MigrateError),
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .test_before_acquire(config.test_before_acquire)
}

/// Connect a pool and check it with a round trip.
///
/// The URL is parsed before any connection is attempted, so a typo fails
/// fast with `InvalidUrl` instead of waiting out the acquire timeout.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let connect = PgConnectOptions::from_str(&config.url).map_err(DatabaseError::InvalidUrl)?;

    let pool = pool_options(config)
        .connect_with(connect)
        .await
        .map_err(DatabaseError::PoolCreation)?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(DatabaseError::PoolCreation)?;

    Ok(pool)
}

/// Apply any pending migrations from [`MIGRATOR`]
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.iter().count(), "Player schema up to date");
    Ok(())
}
