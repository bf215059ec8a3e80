//! Tier banding derived from character level
//!
//! A tier is never stored; it is always derived from a level. Levels 2, 5,
//! and 8 are the tier-achievement levels, and 5/8 additionally reset the
//! marked-trait set.

use serde::{Deserialize, Serialize};

/// The four-level banding that gates which advancement options are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    One,
    Two,
    Three,
    Four,
}

impl Tier {
    /// The tier a character of the given level occupies.
    pub fn of_level(level: u8) -> Self {
        match level {
            0..=1 => Tier::One,
            2..=4 => Tier::Two,
            5..=7 => Tier::Three,
            _ => Tier::Four,
        }
    }

    /// Whether entering this level grants the full tier achievement
    /// (new experience, +1 proficiency, and at 5/8 a trait-mark reset).
    pub fn is_achievement_level(level: u8) -> bool {
        matches!(level, 2 | 5 | 8)
    }

    /// Whether entering this level clears the marked-trait set.
    /// Level 2 is an achievement level but does not clear marks.
    pub fn clears_marked_traits(level: u8) -> bool {
        matches!(level, 5 | 8)
    }

    pub fn as_number(&self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
            Tier::Four => 4,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier {}", self.as_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_banding_matches_level_ranges() {
        assert_eq!(Tier::of_level(1), Tier::One);
        assert_eq!(Tier::of_level(2), Tier::Two);
        assert_eq!(Tier::of_level(4), Tier::Two);
        assert_eq!(Tier::of_level(5), Tier::Three);
        assert_eq!(Tier::of_level(7), Tier::Three);
        assert_eq!(Tier::of_level(8), Tier::Four);
        assert_eq!(Tier::of_level(10), Tier::Four);
    }

    #[test]
    fn achievement_levels_are_2_5_8() {
        let achievement: Vec<u8> = (1..=10).filter(|l| Tier::is_achievement_level(*l)).collect();
        assert_eq!(achievement, vec![2, 5, 8]);
    }

    #[test]
    fn only_5_and_8_clear_marked_traits() {
        let clearing: Vec<u8> = (1..=10).filter(|l| Tier::clears_marked_traits(*l)).collect();
        assert_eq!(clearing, vec![5, 8]);
    }
}
