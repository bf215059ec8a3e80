//! Tier achievement processor - the per-level bonuses outside the slots
//!
//! Every level requires exactly one domain card in addition to the two
//! advancement slots. Only the achievement levels {2, 5, 8} additionally
//! grant a new experience and +1 proficiency, and only 5 and 8 reset the
//! marked-trait set. That asymmetry is deliberate and matches the reference
//! rules.
//!
//! The processor runs *before* the selected advancements are applied so the
//! 5/8 mark reset cannot wipe marks earned at the new level. Its synthetic
//! records are numbered after the user-chosen ones so the log still reads in
//! selection order.

use std::collections::BTreeMap;

use crate::domain::entities::{
    sanitize_experience_name, AdvancementPayload, AdvancementRecord, Character, Experience,
};
use crate::domain::services::{AdvancementApplicator, ApplyError};
use crate::domain::value_objects::{
    AbilityCard, AchievementRequirement, AdvancementType, TierAchievementChoice,
};

pub struct TierAchievementProcessor;

impl TierAchievementProcessor {
    /// Applies the tier achievement for entering `requirement.level` and
    /// returns its synthetic records, numbered from `first_number`. The
    /// aggregate's level is set here; the caller appends the returned
    /// records to the log.
    pub fn apply(
        character: &mut Character,
        requirement: &AchievementRequirement,
        achievement: &TierAchievementChoice,
        abilities: &BTreeMap<String, AbilityCard>,
        first_number: u8,
    ) -> Result<Vec<AdvancementRecord>, ApplyError> {
        let level = requirement.level;
        let mut records = Vec::new();
        let mut number = first_number;

        if requirement.clears_marked_traits {
            character.marked_traits.clear();
        }

        if requirement.grants_experience {
            let draft =
                achievement
                    .experience
                    .as_ref()
                    .ok_or_else(|| ApplyError::Invalid {
                        advancement_type: AdvancementType::Generic,
                        reason: format!("level {level} committed without its tier achievement experience"),
                    })?;
            character.experiences.push(Experience {
                name: sanitize_experience_name(&draft.name),
                description: draft.description.clone(),
                modifier: requirement.experience_modifier,
            });
        }

        if requirement.grants_proficiency {
            // Always automatic, never user-selected.
            let record = AdvancementRecord::new(
                level,
                number,
                AdvancementPayload::Proficiency,
                "Gain a +1 bonus to your Proficiency.",
            );
            AdvancementApplicator::apply(character, &record)?;
            records.push(record);
            number += 1;
        }

        if requirement.domain_card_required {
            let key = achievement
                .domain_card
                .as_deref()
                .ok_or_else(|| ApplyError::Invalid {
                    advancement_type: AdvancementType::DomainCard,
                    reason: format!("level {level} committed without its required domain card"),
                })?;
            let ability = abilities.get(key).ok_or_else(|| ApplyError::Invalid {
                advancement_type: AdvancementType::DomainCard,
                reason: format!("unknown ability key '{key}'"),
            })?;
            let record = AdvancementRecord::new(
                level,
                number,
                AdvancementPayload::DomainCard {
                    key: key.to_string(),
                    domain: ability.domain,
                    level: ability.level,
                },
                format!("Acquire a domain card ({})", ability.name),
            );
            AdvancementApplicator::apply(character, &record)?;
            records.push(record);
        }

        character.level = level;
        Ok(records)
    }
}
