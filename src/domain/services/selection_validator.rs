//! Selection validator - structural and semantic checks for a pending
//! level-up selection
//!
//! Validation is pure and idempotent: it inspects the character, the tier's
//! option list, and the pending selection, and reports the first violated
//! rule with enough context for the presentation layer to highlight the
//! exact missing choice. No state is touched on failure or success.
//!
//! Dispatch is always on the option's type tag. Descriptions are display
//! text and are never parsed.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::domain::entities::{sanitize_experience_name, Character, EXPERIENCE_NAME_MAX_LEN};
use crate::domain::services::SlotCalculator;
use crate::domain::value_objects::{
    AbilityCard, AdvancementOption, AdvancementType, CharacterClass, CharacterTrait, Domain,
    PendingSelection, SlotChoice, SubChoice, Tier,
};

/// A violated selection rule. Recoverable: the caller fixes the selection
/// and validates again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("level {level} requires exactly {expected} advancement slots, selection fills {actual}")]
    InvalidSelectionCount { level: u8, expected: u8, actual: u8 },

    #[error("slot {slot}: option {option_index} requires a {field} choice")]
    MissingRequiredChoice {
        slot: usize,
        option_index: usize,
        field: &'static str,
    },

    #[error("slot {slot}: {trait_name} is already marked this tier")]
    DuplicateMarkedTrait {
        slot: usize,
        trait_name: CharacterTrait,
    },

    #[error("slot {slot}: a trait advancement needs two distinct traits")]
    IncompleteTraitChoice { slot: usize },

    #[error("domain card '{key}' is level {card_level} but the eligibility ceiling is {ceiling}")]
    IneligibleDomainCard {
        key: String,
        card_level: u8,
        ceiling: u8,
    },

    #[error("level {level} requires a tier achievement: {missing}")]
    MissingTierAchievement { level: u8, missing: &'static str },

    #[error("option {option_index} does not exist for this class and tier")]
    UnknownOption { option_index: usize },

    #[error("option {option_index} is not currently available")]
    OptionUnavailable { option_index: usize },

    #[error("option {option_index} may be chosen at most {max_selections} time(s) per level")]
    OptionOverSelected {
        option_index: usize,
        max_selections: u8,
    },

    #[error("'{key}' is not a known domain card")]
    UnknownDomainCard { key: String },

    #[error("domain card '{key}' belongs to the {domain} domain, which this character cannot access")]
    InaccessibleDomain { key: String, domain: Domain },

    #[error("domain card '{key}' is already in the character's loadout")]
    DuplicateDomainCard { key: String },
}

pub struct SelectionValidator;

impl SelectionValidator {
    /// Full validation of a pending selection against the character's
    /// current state, in rule order: slot count, per-choice structure, then
    /// the tier achievement. Returns the first violated rule.
    pub fn validate(
        character: &Character,
        target_level: u8,
        options: &[AdvancementOption],
        abilities: &BTreeMap<String, AbilityCard>,
        selection: &PendingSelection,
    ) -> Result<(), ValidationError> {
        // Option indices must resolve before slot costs can be summed.
        for choice in selection.chosen() {
            if choice.option_index >= options.len() {
                return Err(ValidationError::UnknownOption {
                    option_index: choice.option_index,
                });
            }
        }

        let expected = SlotCalculator::available_slots(character, target_level);
        let actual: u8 = selection
            .chosen()
            .map(|choice| options[choice.option_index].slots_required)
            .sum();
        if actual != expected {
            return Err(ValidationError::InvalidSelectionCount {
                level: target_level,
                expected,
                actual,
            });
        }

        let mut picks_per_option: BTreeMap<usize, u8> = BTreeMap::new();
        for choice in selection.chosen() {
            let count = picks_per_option.entry(choice.option_index).or_insert(0);
            *count += 1;
            let max = options[choice.option_index].max_selections;
            if *count > max {
                return Err(ValidationError::OptionOverSelected {
                    option_index: choice.option_index,
                    max_selections: max,
                });
            }
        }

        let mut context = SelectionContext::new(character, target_level, selection);
        for slot in 0..selection.slot_count() {
            if let Some(choice) = selection.slot(slot) {
                Self::check_choice(
                    character,
                    options,
                    abilities,
                    &mut context,
                    slot,
                    choice,
                )?;
            }
        }

        Self::tier_achievement_rule(character, target_level, abilities, selection, &context)
    }

    /// Structural check for a single slot choice, used by the workflow to
    /// reject a bad pick at selection time. Marks, multiclass choices, and
    /// card picks from the *other* slots count as context.
    pub fn validate_choice(
        character: &Character,
        target_level: u8,
        options: &[AdvancementOption],
        abilities: &BTreeMap<String, AbilityCard>,
        selection: &PendingSelection,
        slot: usize,
    ) -> Result<(), ValidationError> {
        let Some(choice) = selection.slot(slot) else {
            // An empty slot has nothing to violate.
            return Ok(());
        };
        if choice.option_index >= options.len() {
            return Err(ValidationError::UnknownOption {
                option_index: choice.option_index,
            });
        }

        let picks = selection
            .chosen()
            .filter(|c| c.option_index == choice.option_index)
            .count() as u8;
        let max = options[choice.option_index].max_selections;
        if picks > max {
            return Err(ValidationError::OptionOverSelected {
                option_index: choice.option_index,
                max_selections: max,
            });
        }

        let mut context = SelectionContext::new(character, target_level, selection);
        context.exclude_slot(selection, slot);
        Self::check_choice(character, options, abilities, &mut context, slot, choice)
    }

    /// The tier-achievement rule (validation step 3): a domain card is
    /// required at *every* level; the authored experience only at the
    /// achievement levels {2, 5, 8}. Usable on its own as the guard for
    /// leaving the workflow's initial state.
    pub fn validate_tier_achievement(
        character: &Character,
        target_level: u8,
        abilities: &BTreeMap<String, AbilityCard>,
        selection: &PendingSelection,
    ) -> Result<(), ValidationError> {
        let mut context = SelectionContext::new(character, target_level, selection);
        context.include_all_slots(selection);
        Self::tier_achievement_rule(character, target_level, abilities, selection, &context)
    }

    fn tier_achievement_rule(
        character: &Character,
        target_level: u8,
        abilities: &BTreeMap<String, AbilityCard>,
        selection: &PendingSelection,
        context: &SelectionContext,
    ) -> Result<(), ValidationError> {
        let achievement = &selection.tier_achievement;

        if Tier::is_achievement_level(target_level) {
            let draft = achievement.experience.as_ref().ok_or(
                ValidationError::MissingTierAchievement {
                    level: target_level,
                    missing: "a newly authored experience",
                },
            )?;
            let name = sanitize_experience_name(&draft.name);
            // The cap counts characters, not bytes; multibyte names are fine.
            if name.is_empty() || name.chars().count() > EXPERIENCE_NAME_MAX_LEN {
                return Err(ValidationError::MissingTierAchievement {
                    level: target_level,
                    missing: "an experience name of 1-100 characters",
                });
            }
        }

        let key = achievement.domain_card.as_deref().ok_or(
            ValidationError::MissingTierAchievement {
                level: target_level,
                missing: "a domain card choice",
            },
        )?;
        Self::check_domain_card(character, abilities, context, key)
    }

    fn check_choice(
        character: &Character,
        options: &[AdvancementOption],
        abilities: &BTreeMap<String, AbilityCard>,
        context: &mut SelectionContext,
        slot: usize,
        choice: &SlotChoice,
    ) -> Result<(), ValidationError> {
        let option = options
            .get(choice.option_index)
            .ok_or(ValidationError::UnknownOption {
                option_index: choice.option_index,
            })?;
        if !option.available {
            return Err(ValidationError::OptionUnavailable {
                option_index: choice.option_index,
            });
        }

        match (option.advancement_type, &choice.sub_choice) {
            (AdvancementType::TraitBonus, SubChoice::Traits { first, second }) => {
                if first == second {
                    return Err(ValidationError::IncompleteTraitChoice { slot });
                }
                for trait_name in [*first, *second] {
                    if character.marked_traits.contains(&trait_name)
                        || context.pending_marks.contains(&trait_name)
                    {
                        return Err(ValidationError::DuplicateMarkedTrait { slot, trait_name });
                    }
                }
                context.pending_marks.insert(*first);
                context.pending_marks.insert(*second);
                Ok(())
            }
            (AdvancementType::TraitBonus, _) => Err(ValidationError::IncompleteTraitChoice { slot }),

            (AdvancementType::Multiclass, SubChoice::Multiclass { class }) => {
                if *class == character.class || Some(*class) == character.multiclass {
                    return Err(ValidationError::MissingRequiredChoice {
                        slot,
                        option_index: choice.option_index,
                        field: "a class different from the character's classes",
                    });
                }
                if character.multiclass.is_some() {
                    return Err(ValidationError::OptionUnavailable {
                        option_index: choice.option_index,
                    });
                }
                context.pending_multiclass = Some(*class);
                Ok(())
            }
            (AdvancementType::Multiclass, _) => Err(ValidationError::MissingRequiredChoice {
                slot,
                option_index: choice.option_index,
                field: "multiclass",
            }),

            (AdvancementType::DomainCard, SubChoice::DomainCard { key }) => {
                Self::check_domain_card(character, abilities, context, key)?;
                context.pending_cards.insert(key.clone());
                Ok(())
            }
            (AdvancementType::DomainCard, _) => Err(ValidationError::MissingRequiredChoice {
                slot,
                option_index: choice.option_index,
                field: "domain card",
            }),

            (AdvancementType::ExperienceBonus, SubChoice::Experiences { first, second }) => {
                let count = character.experiences.len();
                if first == second || *first >= count || *second >= count {
                    return Err(ValidationError::MissingRequiredChoice {
                        slot,
                        option_index: choice.option_index,
                        field: "two distinct existing experiences",
                    });
                }
                Ok(())
            }
            (AdvancementType::ExperienceBonus, _) => Err(ValidationError::MissingRequiredChoice {
                slot,
                option_index: choice.option_index,
                field: "two distinct existing experiences",
            }),

            // No sub-choice to verify. A surplus sub-choice is ignored
            // rather than rejected; the type tag wins.
            (
                AdvancementType::HitPoint
                | AdvancementType::Stress
                | AdvancementType::Evasion
                | AdvancementType::Proficiency
                | AdvancementType::Generic,
                _,
            ) => Ok(()),
        }
    }

    fn check_domain_card(
        character: &Character,
        abilities: &BTreeMap<String, AbilityCard>,
        context: &SelectionContext,
        key: &str,
    ) -> Result<(), ValidationError> {
        let card = abilities
            .get(key)
            .ok_or_else(|| ValidationError::UnknownDomainCard { key: key.to_string() })?;

        if character.has_domain_card(key) || context.pending_cards.contains(key) {
            return Err(ValidationError::DuplicateDomainCard {
                key: key.to_string(),
            });
        }

        let ceiling = context
            .card_ceiling(character, card.domain)
            .ok_or(ValidationError::InaccessibleDomain {
                key: key.to_string(),
                domain: card.domain,
            })?;
        if card.level > ceiling {
            return Err(ValidationError::IneligibleDomainCard {
                key: key.to_string(),
                card_level: card.level,
                ceiling,
            });
        }
        Ok(())
    }
}

/// Cross-slot state accumulated while walking a selection: traits marked by
/// earlier slots, a multiclass chosen within this same level-up (which
/// widens domain-card eligibility at the half-level ceiling), and card keys
/// already picked.
struct SelectionContext {
    target_level: u8,
    pending_marks: BTreeSet<CharacterTrait>,
    pending_multiclass: Option<CharacterClass>,
    pending_cards: BTreeSet<String>,
}

impl SelectionContext {
    fn new(character: &Character, target_level: u8, selection: &PendingSelection) -> Self {
        let mut context = Self {
            target_level,
            pending_marks: BTreeSet::new(),
            pending_multiclass: None,
            pending_cards: BTreeSet::new(),
        };
        // A multiclass anywhere in the selection affects card eligibility
        // even for slots validated before it.
        for choice in selection.chosen() {
            if let SubChoice::Multiclass { class } = &choice.sub_choice {
                if *class != character.class {
                    context.pending_multiclass = Some(*class);
                }
            }
        }
        context
    }

    /// Rebuilds the cross-slot context from every filled slot except one,
    /// for validating that slot in isolation.
    fn exclude_slot(&mut self, selection: &PendingSelection, excluded: usize) {
        self.fill_from_slots(selection, Some(excluded));
    }

    /// Accumulates marks and card picks from every filled slot, for checks
    /// that run after the whole selection (the tier-achievement card).
    fn include_all_slots(&mut self, selection: &PendingSelection) {
        self.fill_from_slots(selection, None);
    }

    fn fill_from_slots(&mut self, selection: &PendingSelection, excluded: Option<usize>) {
        self.pending_marks.clear();
        self.pending_cards.clear();
        for slot in 0..selection.slot_count() {
            if Some(slot) == excluded {
                continue;
            }
            if let Some(choice) = selection.slot(slot) {
                match &choice.sub_choice {
                    SubChoice::Traits { first, second } => {
                        self.pending_marks.insert(*first);
                        self.pending_marks.insert(*second);
                    }
                    SubChoice::DomainCard { key } => {
                        self.pending_cards.insert(key.clone());
                    }
                    _ => {}
                }
            }
        }
    }

    fn card_ceiling(&self, character: &Character, domain: Domain) -> Option<u8> {
        character
            .domain_card_ceiling(domain, self.target_level)
            .or_else(|| {
                self.pending_multiclass
                    .filter(|class| class.domains().contains(&domain))
                    .map(|_| self.target_level / 2)
            })
    }
}
