//! Guess lifecycle: placing a prediction and resolving it against the market.

use super::validate_user_id;
use crate::clock::Clock;
use crate::error::{AppError, AppResult, GuessSnapshot, RepositoryError};
use crate::models::{ActiveGuess, Direction, Player};
use crate::oracle::PriceOracle;
use crate::repositories::PlayerStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Minimum time between placing and resolving a guess
pub const MIN_DWELL_SECS: i64 = 60;

/// A compare-and-set loser is re-evaluated once before giving up
const CAS_ATTEMPTS: usize = 2;

/// Result of a successful placement
#[derive(Debug, Clone)]
pub struct PlacedGuess {
    pub player: Player,
    pub guess: ActiveGuess,
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub user_id: String,
    pub was_correct: bool,
    pub score_change: i64,
    pub new_score: i64,
    pub price_at_guess: Decimal,
    pub current_price: Decimal,
    pub direction: Direction,
}

/// Outcome of comparing a guess to the current price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub was_correct: bool,
    pub score_change: i64,
}

/// Fails with `TooEarly` until the dwell time has passed
pub fn check_dwell(guess: &ActiveGuess, now: DateTime<Utc>) -> AppResult<()> {
    let elapsed_secs = guess.elapsed(now).num_seconds();
    if elapsed_secs < MIN_DWELL_SECS {
        return Err(AppError::TooEarly {
            elapsed_secs,
            required_secs: MIN_DWELL_SECS,
        });
    }
    Ok(())
}

/// Scores a guess, refusing to decide on an unchanged price
pub fn score_guess(guess: &ActiveGuess, current_price: Decimal) -> AppResult<Verdict> {
    let was_correct = guess
        .is_correct(current_price)
        .ok_or(AppError::PriceUnchanged {
            price_at_guess: guess.price_at_guess,
            current_price,
        })?;

    Ok(Verdict {
        was_correct,
        score_change: if was_correct { 1 } else { -1 },
    })
}

/// Service owning the guess state machine
pub struct GuessService {
    store: Arc<dyn PlayerStore>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
}

impl GuessService {
    pub fn new(
        store: Arc<dyn PlayerStore>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            oracle,
            clock,
        }
    }

    /// Place a new guess for a player without an open one
    pub async fn place_guess(&self, user_id: &str, direction: Direction) -> AppResult<PlacedGuess> {
        let user_id = validate_user_id(user_id)?;
        info!(user_id, %direction, "Placing guess");

        let placed = self
            .with_cas_retry(user_id, "place_guess", || {
                self.try_place_guess(user_id, direction)
            })
            .await?;

        info!(
            user_id,
            %direction,
            price_at_guess = %placed.guess.price_at_guess,
            "Guess placed"
        );
        Ok(placed)
    }

    /// Resolve the player's open guess against the current price
    pub async fn resolve_guess(&self, user_id: &str) -> AppResult<Resolution> {
        let user_id = validate_user_id(user_id)?;
        info!(user_id, "Resolving guess");

        let resolution = self
            .with_cas_retry(user_id, "resolve_guess", || self.try_resolve_guess(user_id))
            .await?;

        info!(
            user_id,
            was_correct = resolution.was_correct,
            new_score = resolution.new_score,
            "Guess resolved"
        );
        Ok(resolution)
    }

    async fn try_place_guess(&self, user_id: &str, direction: Direction) -> AppResult<PlacedGuess> {
        let player = self.load_player(user_id).await?;

        if let Some(open) = player.open_guess() {
            warn!(user_id, direction = %open.direction, "Player already has an open guess");
            return Err(AppError::Conflict(Some(GuessSnapshot {
                direction: open.direction,
                timestamp: open.timestamp,
            })));
        }

        let price = self.fetch_price(user_id).await?;
        let guess = ActiveGuess::new(direction, self.clock.now(), price);

        let update = player.update_with(player.score, &guess)?;
        let record = self
            .store
            .update(user_id, player.version, update)
            .await
            .map_err(|e| self.store_error(user_id, e))?;

        Ok(PlacedGuess {
            player: Player::try_from(record)?,
            guess,
        })
    }

    async fn try_resolve_guess(&self, user_id: &str) -> AppResult<Resolution> {
        let player = self.load_player(user_id).await?;

        let guess = player.active_guess.clone().ok_or(AppError::NoActiveGuess)?;
        if guess.resolved {
            return Err(AppError::AlreadyResolved);
        }
        check_dwell(&guess, self.clock.now())?;

        let current_price = self.fetch_price(user_id).await?;
        let verdict = score_guess(&guess, current_price)?;
        let new_score = player
            .score
            .checked_add(verdict.score_change)
            .ok_or_else(|| {
                error!(user_id, score = player.score, "Score out of range");
                AppError::Persistence(format!("score overflow for {}", user_id))
            })?;

        let resolved = guess.clone().into_resolved();
        let update = player.update_with(new_score, &resolved)?;
        self.store
            .update(user_id, player.version, update)
            .await
            .map_err(|e| self.store_error(user_id, e))?;

        Ok(Resolution {
            user_id: user_id.to_string(),
            was_correct: verdict.was_correct,
            score_change: verdict.score_change,
            new_score,
            price_at_guess: guess.price_at_guess,
            current_price,
            direction: guess.direction,
        })
    }

    /// Re-runs `op` once if its write lost a compare-and-set race
    async fn with_cas_retry<T, F, Fut>(&self, user_id: &str, op: &'static str, mut f: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Err(AppError::Conflict(None)) if attempt < CAS_ATTEMPTS => {
                    warn!(user_id, op, attempt, "Concurrent update detected, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn load_player(&self, user_id: &str) -> AppResult<Player> {
        let record = self
            .store
            .get(user_id)
            .await
            .map_err(|e| self.store_error(user_id, e))?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        Player::try_from(record).map_err(|e| self.store_error(user_id, e))
    }

    async fn fetch_price(&self, user_id: &str) -> AppResult<Decimal> {
        self.oracle.current_price().await.map_err(|e| {
            error!(
                user_id,
                provider = self.oracle.provider_name(),
                error = %e,
                "Failed to fetch current price"
            );
            AppError::from(e)
        })
    }

    fn store_error(&self, user_id: &str, err: RepositoryError) -> AppError {
        match &err {
            RepositoryError::VersionConflict(_) | RepositoryError::NotFound(_) => {}
            _ => error!(
                user_id,
                backend = self.store.backend_name(),
                error = %err,
                "Player store failure"
            ),
        }
        AppError::from(err)
    }
}
