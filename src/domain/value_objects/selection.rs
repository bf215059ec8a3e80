//! Pending level-up selections
//!
//! A `PendingSelection` is workflow-transient state: it is created when a
//! level-up opens, discarded on cancel, and converted into advancement
//! records plus experience/domain-card rows on commit. It is never persisted
//! as-is.

use serde::{Deserialize, Serialize};

use super::{CharacterClass, CharacterTrait};

/// The sub-choice attached to a chosen advancement option, matched against
/// the option's type tag by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubChoice {
    /// For options with no further decision (hit point, stress, evasion,
    /// generic).
    None,
    /// Two distinct traits to increase and mark.
    Traits {
        first: CharacterTrait,
        second: CharacterTrait,
    },
    /// Indices into the character's existing experience list.
    Experiences { first: usize, second: usize },
    /// The secondary class to take.
    Multiclass { class: CharacterClass },
    /// The ability key of the domain card to acquire.
    DomainCard { key: String },
}

/// One filled advancement slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChoice {
    /// Index into the class/tier option list served by the rule catalog.
    pub option_index: usize,
    pub sub_choice: SubChoice,
}

/// A newly authored experience for a tier achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The tier-achievement portion of a pending selection. The domain card is
/// required at every level; the experience only at levels 2, 5, and 8.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAchievementChoice {
    pub experience: Option<ExperienceDraft>,
    pub domain_card: Option<String>,
}

/// Everything a player has chosen for one level-up, ordered by slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSelection {
    slots: Vec<Option<SlotChoice>>,
    pub tier_achievement: TierAchievementChoice,
}

impl PendingSelection {
    /// An empty selection sized by the level's available slots.
    pub fn sized(slot_count: u8) -> Self {
        Self {
            slots: vec![None; slot_count as usize],
            tier_achievement: TierAchievementChoice::default(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&SlotChoice> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    /// Overwrites the choice at `index`. Out-of-range indices are a caller
    /// bug and are rejected.
    pub fn set_slot(&mut self, index: usize, choice: SlotChoice) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(choice);
                true
            }
            None => false,
        }
    }

    /// Empties the slot at `index`, leaving its position in place.
    pub fn clear_slot(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// The filled slots in order, skipping empty positions. A two-slot
    /// option occupies a single position but counts double toward the slot
    /// total, so trailing positions may legitimately stay empty.
    pub fn chosen(&self) -> impl Iterator<Item = &SlotChoice> {
        self.slots.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}
