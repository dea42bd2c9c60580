pub mod memory_store;
pub mod player_repository;

pub use memory_store::InMemoryPlayerStore;
pub use player_repository::PlayerRepository;

use crate::error::RepositoryError;
use crate::models::{PlayerRecord, PlayerUpdate};
use async_trait::async_trait;

/// Key-value persistence for player records.
///
/// `update` is a compare-and-set: it succeeds only while the stored version
/// still equals `expected_version`, and bumps the version on success.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Fetch a player record
    async fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, RepositoryError>;

    /// Create a player with the default score. Returns the stored record and
    /// whether it was created by this call.
    async fn create(&self, user_id: &str) -> Result<(PlayerRecord, bool), RepositoryError>;

    /// Conditionally overwrite score and active guess
    async fn update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: PlayerUpdate,
    ) -> Result<PlayerRecord, RepositoryError>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
