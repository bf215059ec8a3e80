//! Value objects - Immutable objects defined by their attributes

mod advancement;
mod class;
mod ids;
mod selection;
mod tier;

pub use advancement::{AbilityCard, AchievementRequirement, AdvancementOption, AdvancementType};
pub use class::{CharacterClass, CharacterTrait, Domain};
pub use ids::*;
pub use selection::{
    ExperienceDraft, PendingSelection, SlotChoice, SubChoice, TierAchievementChoice,
};
pub use tier::Tier;
