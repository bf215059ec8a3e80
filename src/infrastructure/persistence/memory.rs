//! In-memory character store
//!
//! The reference adapter for [`CharacterStorePort`]. `save` is a
//! compare-and-swap on the aggregate version under a write lock, which gives
//! the commit path its atomicity: either the whole mutated clone replaces
//! the stored aggregate or nothing changes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::ports::outbound::{CharacterStorePort, StoreError};
use crate::domain::entities::Character;
use crate::domain::value_objects::CharacterId;

#[derive(Default)]
pub struct InMemoryCharacterStore {
    characters: RwLock<HashMap<CharacterId, Character>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a character as-is, bypassing the version check. For seeding
    /// stores in tests and demos; level-ups must go through `save`.
    pub async fn seed(&self, character: Character) {
        self.characters
            .write()
            .await
            .insert(character.id, character);
    }
}

#[async_trait]
impl CharacterStorePort for InMemoryCharacterStore {
    async fn load(&self, id: CharacterId) -> Result<Option<Character>, StoreError> {
        Ok(self.characters.read().await.get(&id).cloned())
    }

    async fn save(
        &self,
        character: &Character,
        expected_version: u64,
    ) -> Result<Character, StoreError> {
        let mut characters = self.characters.write().await;
        let stored = characters
            .get(&character.id)
            .ok_or(StoreError::NotFound(character.id))?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                id: character.id,
                expected: expected_version,
                found: stored.version,
            });
        }

        let mut saved = character.clone();
        saved.version = expected_version + 1;
        characters.insert(saved.id, saved.clone());
        debug!(character_id = %saved.id, version = saved.version, "saved character");
        Ok(saved)
    }
}
