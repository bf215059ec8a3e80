//! Level-up workflow - per-character, transient, discarded on commit/cancel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Character;
use crate::domain::value_objects::{PendingSelection, WorkflowId};

/// The finite states a level-up moves through. The advancement states are
/// named for the reference two-slot rule set; progress between them is
/// driven by how many slots the pending selection fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    TierAchievements,
    FirstAdvancement,
    SecondAdvancement,
    Confirmation,
    Committed,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Committed)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowState::TierAchievements => "tier_achievements",
            WorkflowState::FirstAdvancement => "first_advancement",
            WorkflowState::SecondAdvancement => "second_advancement",
            WorkflowState::Confirmation => "confirmation",
            WorkflowState::Committed => "committed",
        };
        write!(f, "{name}")
    }
}

/// An open level-up for one character.
///
/// Holds a snapshot of the character taken when the workflow opened; the
/// commit path reloads the aggregate and relies on its version for
/// serialization, so a stale workflow can never double-apply a level.
#[derive(Debug, Clone)]
pub struct LevelUpWorkflow {
    pub id: WorkflowId,
    /// Character state as of opening, used for option display and
    /// incremental validation.
    pub character: Character,
    pub target_level: u8,
    pub state: WorkflowState,
    pub selection: PendingSelection,
    /// The last commit failure, kept so the caller can retry without
    /// re-entering choices.
    pub last_error: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl LevelUpWorkflow {
    pub fn open(character: Character, target_level: u8, slot_count: u8) -> Self {
        Self {
            id: WorkflowId::new(),
            character,
            target_level,
            state: WorkflowState::TierAchievements,
            selection: PendingSelection::sized(slot_count),
            last_error: None,
            opened_at: Utc::now(),
        }
    }

    /// Advancement slots filled so far, weighted by each option's slot cost.
    /// The caller supplies the cost lookup since option data lives in the
    /// rule catalog.
    pub fn slots_filled(&self, slot_cost: impl Fn(usize) -> u8) -> u8 {
        self.selection
            .chosen()
            .map(|choice| slot_cost(choice.option_index))
            .sum()
    }
}
