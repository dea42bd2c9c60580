//! Postgres-backed player store

use super::PlayerStore;
use crate::error::RepositoryError;
use crate::models::{PlayerRecord, PlayerUpdate};
use async_trait::async_trait;
use sqlx::PgPool;

/// Repository for player data access
pub struct PlayerRepository {
    pool: PgPool,
}

impl PlayerRepository {
    /// Create a new PlayerRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a player by id
    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, PlayerRecord>(
            r#"
            SELECT user_id, score, active_guess, version
            FROM players
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert a player with the default score, leaving an existing row untouched
    pub async fn insert_if_absent(&self, user_id: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, PlayerRecord>(
            r#"
            INSERT INTO players (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING user_id, score, active_guess, version
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Write score and guess if the row is still at `expected_version`
    pub async fn compare_and_set(
        &self,
        user_id: &str,
        expected_version: i64,
        update: &PlayerUpdate,
    ) -> Result<Option<PlayerRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, PlayerRecord>(
            r#"
            UPDATE players
            SET score = $3, active_guess = $4, version = version + 1, updated_at = NOW()
            WHERE user_id = $1 AND version = $2
            RETURNING user_id, score, active_guess, version
            "#,
        )
        .bind(user_id)
        .bind(expected_version)
        .bind(update.score)
        .bind(update.active_guess.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl PlayerStore for PlayerRepository {
    async fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        self.find_by_id(user_id).await
    }

    async fn create(&self, user_id: &str) -> Result<(PlayerRecord, bool), RepositoryError> {
        if let Some(record) = self.insert_if_absent(user_id).await? {
            return Ok((record, true));
        }

        // Lost to an existing row
        let existing = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(user_id.to_string()))?;
        Ok((existing, false))
    }

    async fn update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: PlayerUpdate,
    ) -> Result<PlayerRecord, RepositoryError> {
        if let Some(record) = self.compare_and_set(user_id, expected_version, &update).await? {
            return Ok(record);
        }

        // Nothing matched: either the row is gone or its version moved on
        match self.find_by_id(user_id).await? {
            Some(_) => Err(RepositoryError::VersionConflict(user_id.to_string())),
            None => Err(RepositoryError::NotFound(user_id.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
