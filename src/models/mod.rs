//! Domain models for the BitGuess backend.

pub mod guess;
pub mod player;

pub use guess::{ActiveGuess, Direction};
pub use player::{Player, PlayerRecord, PlayerUpdate, INITIAL_SCORE};
