//! Rule catalog - static advancement rules loaded once per process
//!
//! The catalog is an immutable lookup of per-class/per-tier advancement
//! options, domain/ability metadata, and tier achievement requirements. It
//! is parsed from versioned JSON (the embedded default, or a file supplied
//! through [`EngineConfig`](crate::infrastructure::config::EngineConfig)),
//! validated for referential integrity, and injected read-only. It is never
//! re-read or mutated at runtime.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::value_objects::{
    AbilityCard, AchievementRequirement, AdvancementOption, CharacterClass, Domain, Tier,
};

const BUILTIN_RULES: &str = include_str!("data/core_rules.json");

#[derive(Debug, Deserialize)]
struct RuleData {
    version: String,
    max_level: u8,
    classes: BTreeMap<CharacterClass, ClassData>,
    abilities: BTreeMap<String, AbilityCard>,
}

#[derive(Debug, Deserialize)]
struct ClassData {
    domains: Vec<Domain>,
    tiers: BTreeMap<String, Vec<AdvancementOption>>,
}

/// Per-class advancement rules after validation.
#[derive(Debug)]
struct ClassRules {
    domains: Vec<Domain>,
    tiers: BTreeMap<Tier, Vec<AdvancementOption>>,
}

/// The loaded, immutable rule set.
#[derive(Debug)]
pub struct RuleCatalog {
    version: String,
    max_level: u8,
    classes: BTreeMap<CharacterClass, ClassRules>,
    abilities: BTreeMap<String, AbilityCard>,
}

impl RuleCatalog {
    /// Loads the rule set shipped with the engine.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RULES).context("embedded rule data is invalid")
    }

    /// Loads a rule set from a JSON file, for deployments that version
    /// their rules outside the binary.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rule data from {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("invalid rule data in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let data: RuleData = serde_json::from_str(raw).context("failed to parse rule data")?;

        let mut classes = BTreeMap::new();
        for (class, class_data) in data.classes {
            let mut tiers = BTreeMap::new();
            for (tier_key, options) in class_data.tiers {
                let tier = match tier_key.as_str() {
                    "1" => Tier::One,
                    "2" => Tier::Two,
                    "3" => Tier::Three,
                    "4" => Tier::Four,
                    other => anyhow::bail!("class {class}: unknown tier key '{other}'"),
                };
                tiers.insert(tier, options);
            }
            classes.insert(
                class,
                ClassRules {
                    domains: class_data.domains,
                    tiers,
                },
            );
        }

        let catalog = Self {
            version: data.version,
            max_level: data.max_level,
            classes,
            abilities: data.abilities,
        };
        catalog.check_integrity()?;
        Ok(catalog)
    }

    /// Every advancement option a class may pick from at a tier. Returns an
    /// empty slice, not an error, when there is no data: "no advancements
    /// available" is the caller's condition to interpret.
    pub fn options_for(&self, class: CharacterClass, tier: Tier) -> &[AdvancementOption] {
        self.classes
            .get(&class)
            .and_then(|rules| rules.tiers.get(&tier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The requirement descriptor for entering `level`, or `None` when the
    /// level cannot be entered through a level-up.
    pub fn achievement_requirements_for(&self, level: u8) -> Option<AchievementRequirement> {
        AchievementRequirement::for_level(level, self.max_level)
    }

    pub fn ability(&self, key: &str) -> Option<&AbilityCard> {
        self.abilities.get(key)
    }

    pub fn abilities(&self) -> &BTreeMap<String, AbilityCard> {
        &self.abilities
    }

    /// The domains the rule data assigns to a class. Falls back to the
    /// class's intrinsic pairing when the catalog has no entry.
    pub fn class_domains(&self, class: CharacterClass) -> Vec<Domain> {
        self.classes
            .get(&class)
            .map(|rules| rules.domains.clone())
            .unwrap_or_else(|| class.domains().to_vec())
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Cross-checks the data so a bad deploy fails at load, not mid-workflow.
    fn check_integrity(&self) -> Result<()> {
        if self.max_level < 2 {
            anyhow::bail!("max_level must allow at least one level-up");
        }
        for (class, rules) in &self.classes {
            if rules.domains.is_empty() {
                anyhow::bail!("class {class} has no domains");
            }
            for (tier, options) in &rules.tiers {
                for (index, option) in options.iter().enumerate() {
                    if option.slots_required == 0 || option.max_selections == 0 {
                        anyhow::bail!(
                            "class {class} {tier} option {index}: slots_required and max_selections must be at least 1"
                        );
                    }
                }
            }
        }
        for (key, ability) in &self.abilities {
            if ability.level == 0 || ability.level > self.max_level {
                anyhow::bail!(
                    "ability '{key}' has level {} outside 1..={}",
                    ability.level,
                    self.max_level
                );
            }
        }
        Ok(())
    }
}
