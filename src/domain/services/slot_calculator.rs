//! Slot calculator - how many advancement slots a level transition opens
//!
//! In the reference rule set every level from 2 up grants exactly two
//! advancement slots, but the count is computed through this seam so a rule
//! variant can change it without touching the validator or the workflow.
//! The per-level domain card requirement is separate and lives in
//! [`AchievementRequirement`](crate::domain::value_objects::AchievementRequirement).

use crate::domain::entities::Character;

/// Advancement slots granted per level in the reference rules.
pub const SLOTS_PER_LEVEL: u8 = 2;

pub struct SlotCalculator;

impl SlotCalculator {
    /// The number of advancement slots open for `character` advancing into
    /// `target_level`. Zero when the transition is not a legal single-level
    /// step. Side-effect free.
    pub fn available_slots(character: &Character, target_level: u8) -> u8 {
        if target_level < 2 || target_level != character.level + 1 {
            return 0;
        }
        SLOTS_PER_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::CharacterClass;

    #[test]
    fn every_legal_step_opens_two_slots() {
        let mut character = Character::new("Brynn", CharacterClass::Warrior);
        for level in 1..=9 {
            character.level = level;
            assert_eq!(SlotCalculator::available_slots(&character, level + 1), 2);
        }
    }

    #[test]
    fn skipping_levels_opens_no_slots() {
        let character = Character::new("Brynn", CharacterClass::Warrior);
        assert_eq!(SlotCalculator::available_slots(&character, 3), 0);
    }

    #[test]
    fn advancing_into_the_current_level_opens_no_slots() {
        let mut character = Character::new("Brynn", CharacterClass::Warrior);
        character.level = 4;
        assert_eq!(SlotCalculator::available_slots(&character, 4), 0);
        assert_eq!(SlotCalculator::available_slots(&character, 3), 0);
    }
}
