//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Character aggregate, advancement records, the level-up workflow
//! - Value Objects: tiers, classes, domains, traits, options, selections
//! - Domain Services: slot calculation, validation, application, achievements

pub mod entities;
pub mod services;
pub mod value_objects;
