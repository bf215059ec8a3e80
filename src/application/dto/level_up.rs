//! Level-up workflow DTOs returned to callers

use serde::Serialize;

use crate::domain::entities::{LevelUpWorkflow, WorkflowState};
use crate::domain::value_objects::{
    AdvancementOption, CharacterId, PendingSelection, WorkflowId,
};

/// A caller-facing snapshot of an open level-up: enough for a presentation
/// layer to render the option list and the current selection, plus the
/// handle id for follow-up calls.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowHandle {
    pub id: WorkflowId,
    pub character_id: CharacterId,
    pub target_level: u8,
    pub state: WorkflowState,
    pub available_slots: u8,
    pub options: Vec<AdvancementOption>,
    pub selection: PendingSelection,
    /// The last commit failure, retained alongside the selections so the
    /// caller can retry without re-entering choices.
    pub last_error: Option<String>,
}

impl WorkflowHandle {
    pub fn from_workflow(workflow: &LevelUpWorkflow, options: &[AdvancementOption]) -> Self {
        Self {
            id: workflow.id,
            character_id: workflow.character.id,
            target_level: workflow.target_level,
            state: workflow.state,
            available_slots: workflow.selection.slot_count() as u8,
            options: options.to_vec(),
            selection: workflow.selection.clone(),
            last_error: workflow.last_error.clone(),
        }
    }
}
