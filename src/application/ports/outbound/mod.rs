//! Outbound ports - interfaces the engine consumes

mod character_store;

pub use character_store::{CharacterStorePort, StoreError};
