//! Character aggregate - the single mutation target of a level-up

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::AdvancementRecord;
use crate::domain::value_objects::{CharacterClass, CharacterId, CharacterTrait, Domain, Tier};

/// The longest an experience name may be after sanitization.
pub const EXPERIENCE_NAME_MAX_LEN: usize = 100;

/// An experience a character has accumulated. The modifier grows by +2 per
/// experience-bonus advancement, cumulatively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub name: String,
    pub description: String,
    pub modifier: i8,
}

/// A domain ability the character has unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCard {
    /// Ability key into the rule catalog's ability table.
    pub key: String,
    pub domain: Domain,
    pub level: u8,
}

/// A player character (aggregate root).
///
/// Invariants the engine maintains:
/// - `level` increases by exactly 1 per committed level-up
/// - `marked_traits` holds the current tier's marks and is cleared only
///   when entering levels 5 and 8
/// - `advancements` is append-only
/// - `version` increases by 1 per persisted save and is the optimistic
///   concurrency token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub level: u8,
    pub class: CharacterClass,
    /// Secondary class taken through a multiclass advancement, if any.
    pub multiclass: Option<CharacterClass>,

    pub traits: BTreeMap<CharacterTrait, i8>,
    /// Traits already increased within the current tier.
    pub marked_traits: BTreeSet<CharacterTrait>,

    pub proficiency: u8,
    pub max_hit_points: u8,
    pub max_stress: u8,
    pub evasion: u8,

    pub experiences: Vec<Experience>,
    pub domain_cards: Vec<DomainCard>,
    /// Append-only log of every committed advancement.
    pub advancements: Vec<AdvancementRecord>,

    pub version: u64,
}

impl Character {
    pub fn new(name: impl Into<String>, class: CharacterClass) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            level: 1,
            class,
            multiclass: None,
            traits: CharacterTrait::all().into_iter().map(|t| (t, 0)).collect(),
            marked_traits: BTreeSet::new(),
            proficiency: 1,
            max_hit_points: class.base_hit_points(),
            max_stress: 6,
            evasion: class.base_evasion(),
            experiences: Vec::new(),
            domain_cards: Vec::new(),
            advancements: Vec::new(),
            version: 0,
        }
    }

    pub fn with_traits(mut self, values: [(CharacterTrait, i8); 6]) -> Self {
        self.traits = values.into_iter().collect();
        self
    }

    pub fn with_experience(mut self, experience: Experience) -> Self {
        self.experiences.push(experience);
        self
    }

    pub fn with_domain_card(mut self, card: DomainCard) -> Self {
        self.domain_cards.push(card);
        self
    }

    pub fn tier(&self) -> Tier {
        Tier::of_level(self.level)
    }

    pub fn trait_value(&self, t: CharacterTrait) -> i8 {
        self.traits.get(&t).copied().unwrap_or(0)
    }

    /// Every domain the character can draw cards from, primary class first.
    pub fn accessible_domains(&self) -> Vec<Domain> {
        let mut domains: Vec<Domain> = self.class.domains().to_vec();
        if let Some(secondary) = self.multiclass {
            for domain in secondary.domains() {
                if !domains.contains(&domain) {
                    domains.push(domain);
                }
            }
        }
        domains
    }

    /// The highest card level the character may take from `domain` while
    /// attaining `at_level`: the full level for a primary-class domain, half
    /// (rounded down) for a multiclass domain, `None` when the domain is not
    /// accessible at all.
    pub fn domain_card_ceiling(&self, domain: Domain, at_level: u8) -> Option<u8> {
        if self.class.domains().contains(&domain) {
            return Some(at_level);
        }
        match self.multiclass {
            Some(secondary) if secondary.domains().contains(&domain) => Some(at_level / 2),
            _ => None,
        }
    }

    pub fn has_domain_card(&self, key: &str) -> bool {
        self.domain_cards.iter().any(|c| c.key == key)
    }

    pub fn experience(&self, index: usize) -> Option<&Experience> {
        self.experiences.get(index)
    }
}

/// Normalizes an authored experience name: trims the ends, collapses runs of
/// interior whitespace, and strips control characters.
pub fn sanitize_experience_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| !c.is_control())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
