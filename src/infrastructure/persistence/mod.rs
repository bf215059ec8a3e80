//! Persistence adapters

mod memory;

pub use memory::InMemoryCharacterStore;
