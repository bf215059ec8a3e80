//! Classes, domains, and character traits
//!
//! Closed enums for everything the rule data references by name. Each class
//! grants access to exactly two domains; a multiclass grants one additional
//! class whose domains become accessible at a reduced level ceiling.

use serde::{Deserialize, Serialize};

/// A playable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Warrior,
    Guardian,
    Rogue,
    Wizard,
    Bard,
    Ranger,
}

impl CharacterClass {
    /// The two domains this class grants access to.
    pub fn domains(&self) -> [Domain; 2] {
        match self {
            CharacterClass::Warrior => [Domain::Blade, Domain::Bone],
            CharacterClass::Guardian => [Domain::Valor, Domain::Blade],
            CharacterClass::Rogue => [Domain::Midnight, Domain::Grace],
            CharacterClass::Wizard => [Domain::Codex, Domain::Arcana],
            CharacterClass::Bard => [Domain::Grace, Domain::Codex],
            CharacterClass::Ranger => [Domain::Bone, Domain::Sage],
        }
    }

    /// Starting maximum hit points at character creation.
    pub fn base_hit_points(&self) -> u8 {
        match self {
            CharacterClass::Warrior | CharacterClass::Guardian => 6,
            CharacterClass::Ranger => 5,
            CharacterClass::Rogue | CharacterClass::Bard | CharacterClass::Wizard => 4,
        }
    }

    /// Starting evasion at character creation.
    pub fn base_evasion(&self) -> u8 {
        match self {
            CharacterClass::Rogue => 12,
            CharacterClass::Ranger => 11,
            CharacterClass::Warrior | CharacterClass::Bard => 10,
            CharacterClass::Guardian | CharacterClass::Wizard => 9,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CharacterClass::Warrior => "Warrior",
            CharacterClass::Guardian => "Guardian",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Wizard => "Wizard",
            CharacterClass::Bard => "Bard",
            CharacterClass::Ranger => "Ranger",
        }
    }
}

impl std::fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A domain of abilities a character may draw cards from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Blade,
    Bone,
    Valor,
    Midnight,
    Grace,
    Codex,
    Arcana,
    Sage,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::Blade => "Blade",
            Domain::Bone => "Bone",
            Domain::Valor => "Valor",
            Domain::Midnight => "Midnight",
            Domain::Grace => "Grace",
            Domain::Codex => "Codex",
            Domain::Arcana => "Arcana",
            Domain::Sage => "Sage",
        };
        write!(f, "{name}")
    }
}

/// One of the six character traits eligible for advancement bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterTrait {
    Agility,
    Strength,
    Finesse,
    Instinct,
    Presence,
    Knowledge,
}

impl CharacterTrait {
    pub fn all() -> [CharacterTrait; 6] {
        [
            CharacterTrait::Agility,
            CharacterTrait::Strength,
            CharacterTrait::Finesse,
            CharacterTrait::Instinct,
            CharacterTrait::Presence,
            CharacterTrait::Knowledge,
        ]
    }
}

impl std::fmt::Display for CharacterTrait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CharacterTrait::Agility => "Agility",
            CharacterTrait::Strength => "Strength",
            CharacterTrait::Finesse => "Finesse",
            CharacterTrait::Instinct => "Instinct",
            CharacterTrait::Presence => "Presence",
            CharacterTrait::Knowledge => "Knowledge",
        };
        write!(f, "{name}")
    }
}
