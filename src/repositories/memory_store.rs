use super::PlayerStore;
use crate::error::RepositoryError;
use crate::models::{PlayerRecord, PlayerUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local player store for development and tests
#[derive(Default)]
pub struct InMemoryPlayerStore {
    players: RwLock<HashMap<String, PlayerRecord>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a record as-is
    pub async fn insert(&self, record: PlayerRecord) {
        self.players
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        Ok(self.players.read().await.get(user_id).cloned())
    }

    async fn create(&self, user_id: &str) -> Result<(PlayerRecord, bool), RepositoryError> {
        let mut players = self.players.write().await;
        if let Some(existing) = players.get(user_id) {
            return Ok((existing.clone(), false));
        }
        let record = PlayerRecord::new(user_id);
        players.insert(user_id.to_string(), record.clone());
        Ok((record, true))
    }

    async fn update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: PlayerUpdate,
    ) -> Result<PlayerRecord, RepositoryError> {
        let mut players = self.players.write().await;
        let record = players
            .get_mut(user_id)
            .ok_or_else(|| RepositoryError::NotFound(user_id.to_string()))?;

        if record.version != expected_version {
            return Err(RepositoryError::VersionConflict(user_id.to_string()));
        }

        record.score = update.score;
        record.active_guess = update.active_guess;
        record.version += 1;
        Ok(record.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
