//! Application services - Use case implementations
//!
//! The level-up service is the engine's public surface. It follows the
//! hexagonal layout: the rule catalog and the character store are injected,
//! and everything it returns is a domain entity or a DTO.

pub mod level_up_service;

pub use level_up_service::{LevelUpError, LevelUpService, LevelUpServiceImpl};
