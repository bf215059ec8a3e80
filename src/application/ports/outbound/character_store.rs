//! Outbound port for character persistence
//!
//! The engine never talks to a database directly. Adapters implement this
//! port; the reference implementation is the in-memory store in
//! `infrastructure::persistence`. `save` is a compare-and-swap on the
//! aggregate's version, which is what serializes two concurrent level-up
//! attempts for the same character.

use async_trait::async_trait;

use crate::domain::entities::Character;
use crate::domain::value_objects::CharacterId;

/// A persistence failure, typed enough for the commit path to distinguish a
/// version conflict (retryable by the user, not by the engine) from a
/// backend fault.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("character not found: {0}")]
    NotFound(CharacterId),

    #[error("version conflict for character {id}: expected {expected}, found {found}")]
    Conflict {
        id: CharacterId,
        expected: u64,
        found: u64,
    },

    #[error("character store backend failure")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait CharacterStorePort: Send + Sync {
    async fn load(&self, id: CharacterId) -> Result<Option<Character>, StoreError>;

    /// Persists `character` if and only if the stored aggregate still has
    /// `expected_version`. On success the stored (and returned) character
    /// carries `expected_version + 1`. The swap must be atomic: either the
    /// whole mutated aggregate lands or nothing does.
    async fn save(
        &self,
        character: &Character,
        expected_version: u64,
    ) -> Result<Character, StoreError>;
}
