use super::guess::ActiveGuess;
use crate::error::RepositoryError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default score for a freshly created player
pub const INITIAL_SCORE: i64 = 0;

/// Raw player row as the store keeps it. `active_guess` is opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlayerRecord {
    pub user_id: String,
    pub score: i64,
    pub active_guess: Option<String>,
    pub version: i64,
}

impl PlayerRecord {
    /// A new record with the default score and no guess
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            score: INITIAL_SCORE,
            active_guess: None,
            version: 0,
        }
    }
}

/// Field values written by a compare-and-set update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub score: i64,
    pub active_guess: Option<String>,
}

/// Decoded player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user_id: String,
    pub score: i64,
    pub active_guess: Option<ActiveGuess>,
    /// Version observed when this player was read
    pub version: i64,
}

impl Player {
    /// The guess that blocks a new one, if any
    pub fn open_guess(&self) -> Option<&ActiveGuess> {
        self.active_guess.as_ref().filter(|g| g.is_open())
    }

    /// Build the update that stores `guess` with the given score
    pub fn update_with(&self, score: i64, guess: &ActiveGuess) -> Result<PlayerUpdate, RepositoryError> {
        let blob = guess.encode().map_err(|e| {
            RepositoryError::Corrupt(format!("failed to encode guess for {}: {}", self.user_id, e))
        })?;
        Ok(PlayerUpdate {
            score,
            active_guess: Some(blob),
        })
    }
}

impl TryFrom<PlayerRecord> for Player {
    type Error = RepositoryError;

    fn try_from(record: PlayerRecord) -> Result<Self, Self::Error> {
        let active_guess = match record.active_guess.as_deref() {
            None => None,
            Some(blob) if blob.trim().is_empty() || blob.trim() == "null" => None,
            Some(blob) => Some(ActiveGuess::decode(blob).map_err(|e| {
                RepositoryError::Corrupt(format!(
                    "undecodable active guess for {}: {}",
                    record.user_id, e
                ))
            })?),
        };

        Ok(Self {
            user_id: record.user_id,
            score: record.score,
            active_guess,
            version: record.version,
        })
    }
}
