//! Domain services - Pure business logic operations
//!
//! Everything here is synchronous and side-effect free with respect to
//! persistence: the validator inspects, the applicator and the tier
//! achievement processor mutate an in-memory aggregate handed to them, and
//! the commit path owns atomicity by working on a clone.

mod advancement_applicator;
mod selection_validator;
mod slot_calculator;
mod tier_achievement;

pub use advancement_applicator::{AdvancementApplicator, ApplyError};
pub use selection_validator::{SelectionValidator, ValidationError};
pub use slot_calculator::{SlotCalculator, SLOTS_PER_LEVEL};
pub use tier_achievement::TierAchievementProcessor;
