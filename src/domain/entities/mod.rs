//! Domain entities - Core business objects with identity

mod advancement_record;
mod character;
mod level_up;

pub use advancement_record::{AdvancementPayload, AdvancementRecord};
pub use character::{
    sanitize_experience_name, Character, DomainCard, Experience, EXPERIENCE_NAME_MAX_LEN,
};
pub use level_up::{LevelUpWorkflow, WorkflowState};
