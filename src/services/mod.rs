pub mod guess_service;
pub mod player_service;

pub use guess_service::{GuessService, PlacedGuess, Resolution, MIN_DWELL_SECS};
pub use player_service::PlayerService;

use crate::error::{AppError, AppResult};

/// Longest accepted player identifier
pub const MAX_USER_ID_LEN: usize = 128;

/// Trim and sanity-check an externally issued player id
pub fn validate_user_id(user_id: &str) -> AppResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("userId must not be empty".to_string()));
    }
    if trimmed.len() > MAX_USER_ID_LEN {
        return Err(AppError::Validation(format!(
            "userId must be at most {} characters",
            MAX_USER_ID_LEN
        )));
    }
    Ok(trimmed)
}
