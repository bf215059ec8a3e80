//! Advancement applicator - turns validated choices into aggregate mutations
//!
//! One application path per type tag. The applicator mutates the character's
//! stats and rows but never the advancement log; the commit path appends all
//! records for a level at once, so a failed commit leaves no partial log.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::entities::{AdvancementPayload, AdvancementRecord, Character, DomainCard};
use crate::domain::value_objects::{
    AbilityCard, AdvancementOption, AdvancementType, PendingSelection, SubChoice,
};

/// A failure while applying a committed level-up. Recoverable at the
/// transaction boundary: the caller rolls back and may retry with the same
/// selections.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("character was modified concurrently: expected version {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("could not apply {advancement_type} advancement: {reason}")]
    Invalid {
        advancement_type: AdvancementType,
        reason: String,
    },

    #[error("failed to persist level-up: {0}")]
    Persistence(String),
}

pub struct AdvancementApplicator;

impl AdvancementApplicator {
    /// Builds numbered advancement records (1-based, slot order) from a
    /// validated selection. Pure; the aggregate is untouched.
    pub fn build_records(
        character: &Character,
        target_level: u8,
        options: &[AdvancementOption],
        abilities: &BTreeMap<String, AbilityCard>,
        selection: &PendingSelection,
    ) -> Result<Vec<AdvancementRecord>, ApplyError> {
        let mut records = Vec::new();
        let mut number: u8 = 1;

        for choice in selection.chosen() {
            let option = options.get(choice.option_index).ok_or_else(|| {
                ApplyError::Invalid {
                    advancement_type: AdvancementType::Generic,
                    reason: format!("option index {} out of range", choice.option_index),
                }
            })?;

            let (payload, description) =
                Self::build_payload(character, option, &choice.sub_choice, abilities)?;
            records.push(AdvancementRecord::new(
                target_level,
                number,
                payload,
                description,
            ));
            number += 1;
        }
        Ok(records)
    }

    /// Applies one record's effect to the aggregate. The advancement log is
    /// not touched here.
    pub fn apply(character: &mut Character, record: &AdvancementRecord) -> Result<(), ApplyError> {
        match &record.payload {
            AdvancementPayload::TraitBonus { first, second } => {
                for trait_name in [*first, *second] {
                    *character.traits.entry(trait_name).or_insert(0) += 1;
                    character.marked_traits.insert(trait_name);
                }
            }
            AdvancementPayload::HitPoint => character.max_hit_points += 1,
            AdvancementPayload::Stress => character.max_stress += 1,
            AdvancementPayload::Evasion => character.evasion += 1,
            AdvancementPayload::ExperienceBonus { first, second } => {
                for index in [*first, *second] {
                    let experience = character.experiences.get_mut(index).ok_or_else(|| {
                        ApplyError::Invalid {
                            advancement_type: AdvancementType::ExperienceBonus,
                            reason: format!("experience index {index} out of range"),
                        }
                    })?;
                    experience.modifier += 2;
                }
            }
            AdvancementPayload::DomainCard { key, domain, level } => {
                character.domain_cards.push(DomainCard {
                    key: key.clone(),
                    domain: *domain,
                    level: *level,
                });
            }
            AdvancementPayload::Multiclass { class, .. } => {
                character.multiclass = Some(*class);
            }
            AdvancementPayload::Proficiency => character.proficiency += 1,
            AdvancementPayload::Generic => {
                // No modeled effect. Loud on purpose: a generic record means
                // the rule catalog is serving an option without a real type
                // tag.
                warn!(
                    character_id = %character.id,
                    level = record.level,
                    description = %record.description,
                    "applied generic advancement with no mechanical effect"
                );
            }
        }
        Ok(())
    }

    fn build_payload(
        character: &Character,
        option: &AdvancementOption,
        sub_choice: &SubChoice,
        abilities: &BTreeMap<String, AbilityCard>,
    ) -> Result<(AdvancementPayload, String), ApplyError> {
        let mismatch = |field: &str| ApplyError::Invalid {
            advancement_type: option.advancement_type,
            reason: format!("selection is missing its {field} choice"),
        };

        match (option.advancement_type, sub_choice) {
            (AdvancementType::TraitBonus, SubChoice::Traits { first, second }) => Ok((
                AdvancementPayload::TraitBonus {
                    first: *first,
                    second: *second,
                },
                format!("{} ({first}, {second})", option.description),
            )),
            (AdvancementType::TraitBonus, _) => Err(mismatch("trait pair")),

            (AdvancementType::HitPoint, _) => {
                Ok((AdvancementPayload::HitPoint, option.description.clone()))
            }
            (AdvancementType::Stress, _) => {
                Ok((AdvancementPayload::Stress, option.description.clone()))
            }
            (AdvancementType::Evasion, _) => {
                Ok((AdvancementPayload::Evasion, option.description.clone()))
            }

            (AdvancementType::ExperienceBonus, SubChoice::Experiences { first, second }) => {
                let name = |index: usize| {
                    character
                        .experience(index)
                        .map(|e| e.name.clone())
                        .unwrap_or_else(|| format!("#{index}"))
                };
                Ok((
                    AdvancementPayload::ExperienceBonus {
                        first: *first,
                        second: *second,
                    },
                    format!("{} ({}, {})", option.description, name(*first), name(*second)),
                ))
            }
            (AdvancementType::ExperienceBonus, _) => Err(mismatch("experience pair")),

            (AdvancementType::DomainCard, SubChoice::DomainCard { key }) => {
                let ability = abilities.get(key).ok_or_else(|| ApplyError::Invalid {
                    advancement_type: AdvancementType::DomainCard,
                    reason: format!("unknown ability key '{key}'"),
                })?;
                Ok((
                    AdvancementPayload::DomainCard {
                        key: key.clone(),
                        domain: ability.domain,
                        level: ability.level,
                    },
                    format!("{} ({})", option.description, ability.name),
                ))
            }
            (AdvancementType::DomainCard, _) => Err(mismatch("domain card")),

            (AdvancementType::Multiclass, SubChoice::Multiclass { class }) => Ok((
                AdvancementPayload::Multiclass {
                    class: *class,
                    domains: class.domains().to_vec(),
                },
                format!("{} ({class})", option.description),
            )),
            (AdvancementType::Multiclass, _) => Err(mismatch("class")),

            (AdvancementType::Proficiency | AdvancementType::Generic, _) => {
                Ok((AdvancementPayload::Generic, option.description.clone()))
            }
        }
    }
}
