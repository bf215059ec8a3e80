//! Advancement records - the append-only history of committed level-ups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{AdvancementType, CharacterClass, CharacterTrait, Domain, Tier};

/// The structured, type-specific payload of one advancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdvancementPayload {
    TraitBonus {
        first: CharacterTrait,
        second: CharacterTrait,
    },
    HitPoint,
    Stress,
    Evasion,
    ExperienceBonus {
        /// Indices into the character's experience list at apply time.
        first: usize,
        second: usize,
    },
    DomainCard {
        key: String,
        domain: Domain,
        level: u8,
    },
    Multiclass {
        class: CharacterClass,
        domains: Vec<Domain>,
    },
    /// Synthetic, never user-selected; emitted by tier achievements.
    Proficiency,
    /// Escape hatch: the raw description only, no numeric effect.
    Generic,
}

impl AdvancementPayload {
    pub fn advancement_type(&self) -> AdvancementType {
        match self {
            AdvancementPayload::TraitBonus { .. } => AdvancementType::TraitBonus,
            AdvancementPayload::HitPoint => AdvancementType::HitPoint,
            AdvancementPayload::Stress => AdvancementType::Stress,
            AdvancementPayload::Evasion => AdvancementType::Evasion,
            AdvancementPayload::ExperienceBonus { .. } => AdvancementType::ExperienceBonus,
            AdvancementPayload::DomainCard { .. } => AdvancementType::DomainCard,
            AdvancementPayload::Multiclass { .. } => AdvancementType::Multiclass,
            AdvancementPayload::Proficiency => AdvancementType::Proficiency,
            AdvancementPayload::Generic => AdvancementType::Generic,
        }
    }
}

/// One committed advancement. Immutable once appended to the character's
/// advancement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancementRecord {
    pub tier: Tier,
    /// The level this advancement was taken at.
    pub level: u8,
    /// 1-based position within the level: user-chosen slots first, then the
    /// synthetic proficiency and achievement-card records.
    pub advancement_number: u8,
    pub advancement_type: AdvancementType,
    pub payload: AdvancementPayload,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

impl AdvancementRecord {
    pub fn new(
        level: u8,
        advancement_number: u8,
        payload: AdvancementPayload,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tier: Tier::of_level(level),
            level,
            advancement_number,
            advancement_type: payload.advancement_type(),
            payload,
            description: description.into(),
            recorded_at: Utc::now(),
        }
    }
}
