use crate::database::DatabaseError;
use crate::models::Direction;
use crate::oracle::ProviderError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Snapshot of the guess that blocks a new one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessSnapshot {
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing request input
    #[error("{0}")]
    Validation(String),

    /// Unknown player
    #[error("{0}")]
    NotFound(String),

    /// The player already holds an unresolved guess (with its snapshot), or
    /// the write lost a concurrent update twice (no snapshot)
    #[error("{}", conflict_message(.0))]
    Conflict(Option<GuessSnapshot>),

    /// Resolution attempted before the dwell time elapsed
    #[error("Guess cannot be resolved yet: {elapsed_secs}s elapsed, {required_secs}s required")]
    TooEarly { elapsed_secs: i64, required_secs: i64 },

    /// Current price equals the recorded price
    #[error("Price has not changed since the guess was placed ({price_at_guess})")]
    PriceUnchanged {
        price_at_guess: Decimal,
        current_price: Decimal,
    },

    #[error("Guess has already been resolved")]
    AlreadyResolved,

    #[error("Player has no active guess")]
    NoActiveGuess,

    /// Price source failure
    #[error("Price source unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database setup errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

fn conflict_message(active: &Option<GuessSnapshot>) -> &'static str {
    match active {
        Some(_) => "Player already has an active guess. Please wait for it to be resolved.",
        None => "Player was updated concurrently, please retry",
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Errors the caller may fix by resubmitting later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable(_) | AppError::Persistence(_) | AppError::Conflict(None)
        )
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::TooEarly { .. }
            | AppError::PriceUnchanged { .. }
            | AppError::AlreadyResolved
            | AppError::NoActiveGuess => 400,
            AppError::UpstreamUnavailable(_)
            | AppError::Persistence(_)
            | AppError::Config(_)
            | AppError::Database(_) => 500,
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The stored version moved on since it was read
    #[error("Version conflict for {0}")]
    VersionConflict(String),

    /// Stored data that cannot be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure outside of SQL (e.g. an unavailable store)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::VersionConflict(_) => AppError::Conflict(None),
            RepositoryError::Query(e) => AppError::Persistence(e.to_string()),
            RepositoryError::Duplicate(msg)
            | RepositoryError::Corrupt(msg)
            | RepositoryError::Unavailable(msg) => AppError::Persistence(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                if code.as_deref() == Some("23505") {
                    // Unique violation
                    RepositoryError::Duplicate(db_err.message().to_string())
                } else {
                    RepositoryError::Query(err)
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::Conflict(None).status_code(), 400);
        assert_eq!(
            AppError::TooEarly {
                elapsed_secs: 5,
                required_secs: 60
            }
            .status_code(),
            400
        );
        assert_eq!(AppError::AlreadyResolved.status_code(), 400);
        assert_eq!(AppError::UpstreamUnavailable("down".into()).status_code(), 500);
        assert_eq!(AppError::Persistence("io".into()).status_code(), 500);
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: AppError = RepositoryError::VersionConflict("p1".into()).into();
        assert!(matches!(err, AppError::Conflict(None)));

        let err: AppError = RepositoryError::NotFound("p1".into()).into();
        assert!(err.is_not_found());

        let err: AppError = RepositoryError::Corrupt("bad json".into()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_conflict_messages() {
        let lost_race = AppError::Conflict(None);
        assert_eq!(lost_race.to_string(), "Player was updated concurrently, please retry");
        assert!(lost_race.is_retryable());

        let open_guess = AppError::Conflict(Some(GuessSnapshot {
            direction: Direction::Up,
            timestamp: Utc::now(),
        }));
        assert!(open_guess.to_string().contains("already has an active guess"));
        assert!(!open_guess.is_retryable());
    }

    #[test]
    fn test_startup_errors_are_internal() {
        let err: AppError = DatabaseError::PoolCreation(SqlxError::PoolTimedOut).into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(AppError::Config("bad".into()).status_code(), 500);
    }

    #[test]
    fn test_provider_error_maps_to_upstream() {
        let err: AppError = ProviderError::Timeout.into();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
