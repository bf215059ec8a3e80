//! Heroledger Engine - character advancement for tabletop RPG companions
//!
//! The engine decides, validates, and applies the mechanical changes a
//! character undergoes when gaining a level: trait increases, resource
//! growth, experience bonuses, domain-card acquisition, multiclassing, and
//! tier achievements. It is a library boundary: callers feed it plain
//! structured choices and receive either a fully advanced character or an
//! error naming the exact unmet rule. Transport and storage live elsewhere;
//! the engine only speaks to a [`CharacterStorePort`] and an immutable
//! [`RuleCatalog`] loaded once per process.
//!
//! [`CharacterStorePort`]: application::ports::outbound::CharacterStorePort
//! [`RuleCatalog`]: infrastructure::rules::RuleCatalog

pub mod application;
pub mod domain;
pub mod infrastructure;
