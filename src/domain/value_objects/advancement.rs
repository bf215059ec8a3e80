//! Advancement options and tier achievement requirements
//!
//! These are the shapes the rule data deserializes into. The `type` tag is
//! the only dispatch key anywhere in the engine; the description is display
//! text and is never parsed.

use serde::{Deserialize, Serialize};

use super::{Domain, Tier};

/// The kind of mechanical effect an advancement has.
///
/// `Proficiency` is never offered as a selectable option; it only appears in
/// the synthetic record emitted by a tier achievement. `Generic` is the
/// escape hatch for rule data the engine does not yet model: it records the
/// description and nothing else, and its application is always logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancementType {
    TraitBonus,
    HitPoint,
    Stress,
    Evasion,
    ExperienceBonus,
    DomainCard,
    Multiclass,
    Proficiency,
    Generic,
}

impl std::fmt::Display for AdvancementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AdvancementType::TraitBonus => "trait_bonus",
            AdvancementType::HitPoint => "hit_point",
            AdvancementType::Stress => "stress",
            AdvancementType::Evasion => "evasion",
            AdvancementType::ExperienceBonus => "experience_bonus",
            AdvancementType::DomainCard => "domain_card",
            AdvancementType::Multiclass => "multiclass",
            AdvancementType::Proficiency => "proficiency",
            AdvancementType::Generic => "generic",
        };
        write!(f, "{name}")
    }
}

/// One entry in a class/tier option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancementOption {
    /// Display text for the presentation layer. Never control data.
    pub description: String,
    #[serde(rename = "type")]
    pub advancement_type: AdvancementType,
    /// How many times this option may be chosen within one level-up.
    #[serde(default = "default_one")]
    pub max_selections: u8,
    /// How many of the level's advancement slots one pick consumes.
    #[serde(default = "default_one")]
    pub slots_required: u8,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_one() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

/// Metadata for a domain ability, keyed by its ability key in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCard {
    pub name: String,
    pub domain: Domain,
    pub level: u8,
    #[serde(default)]
    pub description: String,
}

/// What entering a given level demands beyond the advancement slots.
///
/// The domain card is required at every level; the experience, proficiency,
/// and trait-mark reset only fire at the achievement levels {2, 5, 8}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRequirement {
    pub level: u8,
    pub tier: Tier,
    pub domain_card_required: bool,
    pub grants_experience: bool,
    pub experience_modifier: i8,
    pub grants_proficiency: bool,
    pub clears_marked_traits: bool,
}

impl AchievementRequirement {
    /// The requirement descriptor for entering `level`, or `None` when the
    /// level is not reachable through a level-up (below 2 or above the cap).
    pub fn for_level(level: u8, max_level: u8) -> Option<Self> {
        if !(2..=max_level).contains(&level) {
            return None;
        }
        let achievement = Tier::is_achievement_level(level);
        Some(Self {
            level,
            tier: Tier::of_level(level),
            domain_card_required: true,
            grants_experience: achievement,
            experience_modifier: 2,
            grants_proficiency: achievement,
            clears_marked_traits: Tier::clears_marked_traits(level),
        })
    }
}
