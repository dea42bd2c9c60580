use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicted direction of the next price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Parse from the wire/database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's outstanding (or most recently resolved) prediction.
///
/// This is also the persisted shape: the store only ever sees the string
/// produced by [`ActiveGuess::encode`] and hands it back to [`ActiveGuess::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGuess {
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    pub price_at_guess: Decimal,
    pub resolved: bool,
}

impl ActiveGuess {
    /// Create a fresh, unresolved guess
    pub fn new(direction: Direction, timestamp: DateTime<Utc>, price_at_guess: Decimal) -> Self {
        Self {
            direction,
            timestamp,
            price_at_guess,
            resolved: false,
        }
    }

    /// Whether this guess still blocks a new one
    pub fn is_open(&self) -> bool {
        !self.resolved
    }

    /// Time since the guess was placed, never negative
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now.signed_duration_since(self.timestamp);
        if elapsed < Duration::zero() {
            Duration::zero()
        } else {
            elapsed
        }
    }

    /// Whether the guess called the move from `price_at_guess` to `current_price`.
    ///
    /// Returns `None` when the price did not move.
    pub fn is_correct(&self, current_price: Decimal) -> Option<bool> {
        if current_price == self.price_at_guess {
            return None;
        }
        let went_up = current_price > self.price_at_guess;
        Some(match self.direction {
            Direction::Up => went_up,
            Direction::Down => !went_up,
        })
    }

    /// The same guess marked resolved
    pub fn into_resolved(self) -> Self {
        Self {
            resolved: true,
            ..self
        }
    }

    /// Encode into the canonical stored form
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored blob.
    ///
    /// Accepts the canonical JSON object, a numeric `priceAtGuess`, and the
    /// legacy form where the object was stored as a JSON string.
    pub fn decode(blob: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(blob)?;
        let value = match value {
            Value::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };
        serde_json::from_value(value)
    }
}
