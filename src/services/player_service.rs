use super::validate_user_id;
use crate::error::{AppError, AppResult};
use crate::models::Player;
use crate::repositories::PlayerStore;
use std::sync::Arc;
use tracing::{error, info};

/// Player lifecycle outside of guessing: signup and lookup
pub struct PlayerService {
    store: Arc<dyn PlayerStore>,
}

impl PlayerService {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        Self { store }
    }

    /// Create a player with the default score. Safe to call more than once
    /// for the same id; the second call returns the existing player.
    pub async fn create_player(&self, user_id: &str) -> AppResult<(Player, bool)> {
        let user_id = validate_user_id(user_id)?;

        let (record, created) = self.store.create(user_id).await.map_err(|e| {
            error!(user_id, error = %e, "Failed to create player");
            AppError::from(e)
        })?;

        if created {
            info!(user_id, "Player created");
        } else {
            info!(user_id, "Player already exists");
        }

        Ok((Player::try_from(record)?, created))
    }

    /// Get a player's score and current guess
    pub async fn get_player(&self, user_id: &str) -> AppResult<Player> {
        let user_id = validate_user_id(user_id)?;

        let record = self
            .store
            .get(user_id)
            .await
            .map_err(|e| {
                error!(user_id, error = %e, "Failed to fetch player");
                AppError::from(e)
            })?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        Ok(Player::try_from(record)?)
    }
}
