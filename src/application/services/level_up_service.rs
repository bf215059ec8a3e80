//! Level-Up Service - workflow orchestration for character advancement
//!
//! This service owns the finite-state workflow from "open" to "committed":
//! it serves eligible options from the rule catalog, collects choices into a
//! pending selection, validates them, and on commit applies the tier
//! achievement and every chosen advancement to the character aggregate as
//! one atomic swap through the store port.
//!
//! Commit works on a clone of a freshly loaded aggregate and saves it with
//! the loaded version as a compare-and-swap token, so a concurrent commit
//! from a second workflow (two browser tabs) loses cleanly instead of
//! double-applying a level.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::application::dto::WorkflowHandle;
use crate::application::ports::outbound::{CharacterStorePort, StoreError};
use crate::domain::entities::{Character, LevelUpWorkflow, WorkflowState};
use crate::domain::services::{
    AdvancementApplicator, ApplyError, SelectionValidator, SlotCalculator,
    TierAchievementProcessor, ValidationError,
};
use crate::domain::value_objects::{
    CharacterClass, CharacterId, ExperienceDraft, SlotChoice, SubChoice, Tier,
    TierAchievementChoice, WorkflowId,
};
use crate::infrastructure::rules::RuleCatalog;

/// Errors surfaced by the level-up workflow.
#[derive(Debug, thiserror::Error)]
pub enum LevelUpError {
    #[error("character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("character {character_id} has no open level to advance into (level {level})")]
    NotEligible {
        character_id: CharacterId,
        level: u8,
    },

    #[error("no open level-up workflow for handle {0}")]
    UnknownWorkflow(WorkflowId),

    #[error("{operation} is not allowed while the workflow is in the {state} state")]
    InvalidTransition {
        state: WorkflowState,
        operation: &'static str,
    },

    #[error("slot index {slot_index} is out of range; this level has {slot_count} slots")]
    InvalidSlot { slot_index: usize, slot_count: u8 },

    /// A configuration fault, not a user error: the rule catalog has no
    /// options for a class/tier the character legitimately occupies.
    #[error("rule data missing: no advancement options for {class} at {tier}")]
    RuleDataMissing { class: CharacterClass, tier: Tier },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Level-up service trait defining the engine's public operations.
#[async_trait]
pub trait LevelUpService: Send + Sync {
    /// Opens a level-up for the character's next level. Fails with
    /// `NotEligible` when there is no open level to advance into.
    async fn open_level_up(&self, character_id: CharacterId)
        -> Result<WorkflowHandle, LevelUpError>;

    /// Records the tier-achievement choices (the authored experience, where
    /// the level grants one, and the always-required domain card) and, once
    /// they satisfy the level's requirement, moves on to the advancements.
    async fn select_tier_achievement(
        &self,
        handle: WorkflowId,
        experience: Option<ExperienceDraft>,
        domain_card_key: String,
    ) -> Result<WorkflowHandle, LevelUpError>;

    /// Records one advancement slot choice. The choice is structurally
    /// checked immediately; filling the last slot runs full validation and
    /// enters confirmation.
    async fn select_advancement(
        &self,
        handle: WorkflowId,
        slot_index: usize,
        option_index: usize,
        sub_choice: SubChoice,
    ) -> Result<WorkflowHandle, LevelUpError>;

    /// Full validation of the pending selection. Idempotent; never changes
    /// workflow state.
    async fn validate(&self, handle: WorkflowId) -> Result<(), LevelUpError>;

    /// Atomically applies the level-up and returns the advanced character.
    /// On failure the workflow stays in confirmation with its selections
    /// intact so the caller can retry.
    async fn commit(&self, handle: WorkflowId) -> Result<Character, LevelUpError>;

    /// Discards the pending selection; the character is untouched.
    async fn cancel(&self, handle: WorkflowId);
}

/// Default implementation backed by an injected rule catalog and store.
pub struct LevelUpServiceImpl {
    catalog: Arc<RuleCatalog>,
    store: Arc<dyn CharacterStorePort>,
    workflows: Mutex<HashMap<WorkflowId, LevelUpWorkflow>>,
}

impl LevelUpServiceImpl {
    pub fn new(catalog: Arc<RuleCatalog>, store: Arc<dyn CharacterStorePort>) -> Self {
        Self {
            catalog,
            store,
            workflows: Mutex::new(HashMap::new()),
        }
    }

    fn handle_for(&self, workflow: &LevelUpWorkflow) -> WorkflowHandle {
        let options = self
            .catalog
            .options_for(workflow.character.class, Tier::of_level(workflow.target_level));
        WorkflowHandle::from_workflow(workflow, options)
    }

    /// Applies the whole level on a clone of the freshly loaded aggregate:
    /// tier achievement first (so a 5/8 mark reset precedes new marks), then
    /// each selected advancement, then the log append in record order.
    fn apply_level(
        &self,
        fresh: &Character,
        workflow: &LevelUpWorkflow,
    ) -> Result<Character, LevelUpError> {
        let target_level = workflow.target_level;
        let tier = Tier::of_level(target_level);
        let options = self.catalog.options_for(fresh.class, tier);
        let abilities = self.catalog.abilities();

        let requirement = self
            .catalog
            .achievement_requirements_for(target_level)
            .ok_or(LevelUpError::NotEligible {
                character_id: fresh.id,
                level: fresh.level,
            })?;

        let selected = AdvancementApplicator::build_records(
            fresh,
            target_level,
            options,
            abilities,
            &workflow.selection,
        )?;

        let mut updated = fresh.clone();
        let synthetic = TierAchievementProcessor::apply(
            &mut updated,
            &requirement,
            &workflow.selection.tier_achievement,
            abilities,
            selected.len() as u8 + 1,
        )?;
        for record in &selected {
            AdvancementApplicator::apply(&mut updated, record)?;
        }
        updated.advancements.extend(selected);
        updated.advancements.extend(synthetic);
        Ok(updated)
    }
}

#[async_trait]
impl LevelUpService for LevelUpServiceImpl {
    #[instrument(skip(self), fields(character_id = %character_id))]
    async fn open_level_up(
        &self,
        character_id: CharacterId,
    ) -> Result<WorkflowHandle, LevelUpError> {
        let character = self
            .store
            .load(character_id)
            .await?
            .ok_or(LevelUpError::CharacterNotFound(character_id))?;

        // Cap check first: a stored level at or above the cap (including a
        // corrupt out-of-range value) must not reach the increment.
        if character.level >= self.catalog.max_level() {
            return Err(LevelUpError::NotEligible {
                character_id,
                level: character.level,
            });
        }
        let target_level = character.level + 1;
        let slots = SlotCalculator::available_slots(&character, target_level);
        if slots == 0 {
            return Err(LevelUpError::NotEligible {
                character_id,
                level: character.level,
            });
        }

        let tier = Tier::of_level(target_level);
        if self.catalog.options_for(character.class, tier).is_empty() {
            // Empty option data for an occupied class/tier is a catalog
            // fault, not "nothing to validate".
            warn!(class = %character.class, %tier, "rule catalog has no options for an occupied class/tier");
            return Err(LevelUpError::RuleDataMissing {
                class: character.class,
                tier,
            });
        }

        let workflow = LevelUpWorkflow::open(character, target_level, slots);
        let handle = self.handle_for(&workflow);
        info!(
            workflow_id = %workflow.id,
            target_level,
            "opened level-up workflow"
        );
        self.workflows.lock().await.insert(workflow.id, workflow);
        Ok(handle)
    }

    #[instrument(skip(self, experience), fields(workflow_id = %handle))]
    async fn select_tier_achievement(
        &self,
        handle: WorkflowId,
        experience: Option<ExperienceDraft>,
        domain_card_key: String,
    ) -> Result<WorkflowHandle, LevelUpError> {
        let mut workflows = self.workflows.lock().await;
        let workflow = workflows
            .get_mut(&handle)
            .ok_or(LevelUpError::UnknownWorkflow(handle))?;

        if workflow.state != WorkflowState::TierAchievements {
            return Err(LevelUpError::InvalidTransition {
                state: workflow.state,
                operation: "select_tier_achievement",
            });
        }

        workflow.selection.tier_achievement = TierAchievementChoice {
            experience,
            domain_card: Some(domain_card_key),
        };
        SelectionValidator::validate_tier_achievement(
            &workflow.character,
            workflow.target_level,
            self.catalog.abilities(),
            &workflow.selection,
        )?;

        workflow.state = WorkflowState::FirstAdvancement;
        debug!(state = %workflow.state, "tier achievement requirement satisfied");
        Ok(self.handle_for(workflow))
    }

    #[instrument(skip(self), fields(workflow_id = %handle, slot_index, option_index))]
    async fn select_advancement(
        &self,
        handle: WorkflowId,
        slot_index: usize,
        option_index: usize,
        sub_choice: SubChoice,
    ) -> Result<WorkflowHandle, LevelUpError> {
        let mut workflows = self.workflows.lock().await;
        let workflow = workflows
            .get_mut(&handle)
            .ok_or(LevelUpError::UnknownWorkflow(handle))?;

        if !matches!(
            workflow.state,
            WorkflowState::FirstAdvancement | WorkflowState::SecondAdvancement
        ) {
            return Err(LevelUpError::InvalidTransition {
                state: workflow.state,
                operation: "select_advancement",
            });
        }

        let slot_count = workflow.selection.slot_count() as u8;
        let previous = workflow.selection.slot(slot_index).cloned();
        if !workflow.selection.set_slot(
            slot_index,
            SlotChoice {
                option_index,
                sub_choice,
            },
        ) {
            return Err(LevelUpError::InvalidSlot {
                slot_index,
                slot_count,
            });
        }

        let tier = Tier::of_level(workflow.target_level);
        let options = self.catalog.options_for(workflow.character.class, tier);
        if let Err(error) = SelectionValidator::validate_choice(
            &workflow.character,
            workflow.target_level,
            options,
            self.catalog.abilities(),
            &workflow.selection,
            slot_index,
        ) {
            // A rejected pick must not linger in the pending selection.
            match previous {
                Some(choice) => {
                    workflow.selection.set_slot(slot_index, choice);
                }
                None => workflow.selection.clear_slot(slot_index),
            }
            return Err(error.into());
        }

        let filled = workflow.slots_filled(|index| {
            options.get(index).map(|o| o.slots_required).unwrap_or(1)
        });
        if filled >= slot_count {
            SelectionValidator::validate(
                &workflow.character,
                workflow.target_level,
                options,
                self.catalog.abilities(),
                &workflow.selection,
            )?;
            workflow.state = WorkflowState::Confirmation;
        } else {
            workflow.state = WorkflowState::SecondAdvancement;
        }

        debug!(state = %workflow.state, filled, "recorded advancement choice");
        Ok(self.handle_for(workflow))
    }

    #[instrument(skip(self), fields(workflow_id = %handle))]
    async fn validate(&self, handle: WorkflowId) -> Result<(), LevelUpError> {
        let workflows = self.workflows.lock().await;
        let workflow = workflows
            .get(&handle)
            .ok_or(LevelUpError::UnknownWorkflow(handle))?;

        let tier = Tier::of_level(workflow.target_level);
        let options = self.catalog.options_for(workflow.character.class, tier);
        SelectionValidator::validate(
            &workflow.character,
            workflow.target_level,
            options,
            self.catalog.abilities(),
            &workflow.selection,
        )?;
        Ok(())
    }

    #[instrument(skip(self), fields(workflow_id = %handle))]
    async fn commit(&self, handle: WorkflowId) -> Result<Character, LevelUpError> {
        let mut workflows = self.workflows.lock().await;
        let workflow = workflows
            .get_mut(&handle)
            .ok_or(LevelUpError::UnknownWorkflow(handle))?;

        if workflow.state != WorkflowState::Confirmation {
            // Surface the precise unmet rule when the selection is simply
            // incomplete, rather than a bare state complaint.
            let tier = Tier::of_level(workflow.target_level);
            let options = self.catalog.options_for(workflow.character.class, tier);
            SelectionValidator::validate(
                &workflow.character,
                workflow.target_level,
                options,
                self.catalog.abilities(),
                &workflow.selection,
            )?;
            return Err(LevelUpError::InvalidTransition {
                state: workflow.state,
                operation: "commit",
            });
        }

        let fresh = self
            .store
            .load(workflow.character.id)
            .await?
            .ok_or(LevelUpError::CharacterNotFound(workflow.character.id))?;

        if fresh.level + 1 != workflow.target_level {
            // Another workflow advanced this character first.
            let conflict = ApplyError::Conflict {
                expected: workflow.character.version,
                found: fresh.version,
            };
            workflow.last_error = Some(conflict.to_string());
            return Err(conflict.into());
        }

        // Re-validate against the freshly loaded state; marks or cards may
        // have changed since the workflow opened.
        {
            let tier = Tier::of_level(workflow.target_level);
            let options = self.catalog.options_for(fresh.class, tier);
            if let Err(error) = SelectionValidator::validate(
                &fresh,
                workflow.target_level,
                options,
                self.catalog.abilities(),
                &workflow.selection,
            ) {
                workflow.last_error = Some(error.to_string());
                return Err(error.into());
            }
        }

        let updated = match self.apply_level(&fresh, workflow) {
            Ok(updated) => updated,
            Err(error) => {
                workflow.last_error = Some(error.to_string());
                return Err(error);
            }
        };

        match self.store.save(&updated, fresh.version).await {
            Ok(saved) => {
                workflow.state = WorkflowState::Committed;
                info!(
                    character_id = %saved.id,
                    level = saved.level,
                    state = %workflow.state,
                    advancements = saved.advancements.len(),
                    "committed level-up"
                );
                // Terminal: no state is retained once committed.
                workflows.remove(&handle);
                Ok(saved)
            }
            Err(StoreError::Conflict {
                expected, found, ..
            }) => {
                let conflict = ApplyError::Conflict { expected, found };
                workflow.last_error = Some(conflict.to_string());
                Err(conflict.into())
            }
            Err(error) => {
                // Selections stay intact; the caller can retry the commit.
                let failure = ApplyError::Persistence(error.to_string());
                workflow.last_error = Some(failure.to_string());
                Err(failure.into())
            }
        }
    }

    #[instrument(skip(self), fields(workflow_id = %handle))]
    async fn cancel(&self, handle: WorkflowId) {
        if self.workflows.lock().await.remove(&handle).is_some() {
            debug!("cancelled level-up workflow");
        } else {
            debug!("cancel for unknown or already closed workflow");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{AdvancementType, CharacterTrait};
    use crate::infrastructure::persistence::InMemoryCharacterStore;

    async fn service_with(character: Character) -> (LevelUpServiceImpl, CharacterId) {
        let id = character.id;
        let store = Arc::new(InMemoryCharacterStore::new());
        store.seed(character).await;
        let catalog = Arc::new(RuleCatalog::builtin().unwrap());
        (LevelUpServiceImpl::new(catalog, store), id)
    }

    fn warrior() -> Character {
        Character::new("Brynn", CharacterClass::Warrior)
    }

    fn option_index(handle: &WorkflowHandle, advancement_type: AdvancementType) -> usize {
        handle
            .options
            .iter()
            .position(|o| o.advancement_type == advancement_type)
            .unwrap_or_else(|| panic!("no {advancement_type} option served"))
    }

    fn combat_veteran() -> ExperienceDraft {
        ExperienceDraft {
            name: "Combat Veteran".to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn reference_scenario_level_two_hit_point_and_evasion() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let character = warrior();
        let (before_hp, before_evasion, before_proficiency) = (
            character.max_hit_points,
            character.evasion,
            character.proficiency,
        );
        let (service, id) = service_with(character).await;

        let handle = service.open_level_up(id).await.unwrap();
        assert_eq!(handle.state, WorkflowState::TierAchievements);
        assert_eq!(handle.target_level, 2);
        assert_eq!(handle.available_slots, 2);

        let hit_point = option_index(&handle, AdvancementType::HitPoint);
        let evasion = option_index(&handle, AdvancementType::Evasion);

        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(combat_veteran()),
                "weapon-mastery".to_string(),
            )
            .await
            .unwrap();
        assert_eq!(handle.state, WorkflowState::FirstAdvancement);

        let handle = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await
            .unwrap();
        assert_eq!(handle.state, WorkflowState::SecondAdvancement);

        let handle = service
            .select_advancement(handle.id, 1, evasion, SubChoice::None)
            .await
            .unwrap();
        assert_eq!(handle.state, WorkflowState::Confirmation);

        assert!(service.validate(handle.id).await.is_ok());
        let updated = service.commit(handle.id).await.unwrap();

        assert_eq!(updated.level, 2);
        assert_eq!(updated.max_hit_points, before_hp + 1);
        assert_eq!(updated.evasion, before_evasion + 1);
        assert_eq!(updated.proficiency, before_proficiency + 1);
        assert_eq!(updated.experiences.len(), 1);
        assert_eq!(updated.experiences[0].name, "Combat Veteran");
        assert_eq!(updated.experiences[0].modifier, 2);
        assert_eq!(updated.domain_cards.len(), 1);
        assert_eq!(updated.domain_cards[0].key, "weapon-mastery");
        // Level 2 does not clear marks (and none were set).
        assert!(updated.marked_traits.is_empty());

        // Handle is gone once committed.
        assert!(matches!(
            service.validate(handle.id).await,
            Err(LevelUpError::UnknownWorkflow(_))
        ));
    }

    #[tokio::test]
    async fn commit_with_one_selection_reports_invalid_selection_count() {
        let (service, id) = service_with(warrior()).await;
        let handle = service.open_level_up(id).await.unwrap();
        let hit_point = option_index(&handle, AdvancementType::HitPoint);

        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(combat_veteran()),
                "weapon-mastery".to_string(),
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await
            .unwrap();

        let result = service.commit(handle.id).await;
        assert!(matches!(
            result,
            Err(LevelUpError::Validation(
                ValidationError::InvalidSelectionCount {
                    level: 2,
                    expected: 2,
                    actual: 1
                }
            ))
        ));

        // The character is unchanged.
        let stored = service.store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.level, 1);
        assert!(stored.advancements.is_empty());
    }

    #[tokio::test]
    async fn two_hit_points_append_records_numbered_one_and_two() {
        let (service, id) = service_with(warrior()).await;
        let handle = service.open_level_up(id).await.unwrap();
        let hit_point = option_index(&handle, AdvancementType::HitPoint);
        let before_hp = service.store.load(id).await.unwrap().unwrap().max_hit_points;

        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(combat_veteran()),
                "weapon-mastery".to_string(),
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 1, hit_point, SubChoice::None)
            .await
            .unwrap();
        let updated = service.commit(handle.id).await.unwrap();

        assert_eq!(updated.max_hit_points, before_hp + 2);
        let hit_point_records: Vec<_> = updated
            .advancements
            .iter()
            .filter(|r| r.advancement_type == AdvancementType::HitPoint)
            .collect();
        assert_eq!(hit_point_records.len(), 2);
        assert_eq!(hit_point_records[0].advancement_number, 1);
        assert_eq!(hit_point_records[1].advancement_number, 2);
        // Synthetic records follow the selected ones.
        let numbers: Vec<u8> = updated
            .advancements
            .iter()
            .map(|r| r.advancement_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn tier_achievement_guard_blocks_the_first_transition() {
        let (service, id) = service_with(warrior()).await;
        let handle = service.open_level_up(id).await.unwrap();
        let hit_point = option_index(&handle, AdvancementType::HitPoint);

        // Advancement selection before the achievement is an invalid
        // transition.
        let result = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await;
        assert!(matches!(
            result,
            Err(LevelUpError::InvalidTransition {
                state: WorkflowState::TierAchievements,
                ..
            })
        ));

        // Level 2 demands the authored experience.
        let result = service
            .select_tier_achievement(handle.id, None, "weapon-mastery".to_string())
            .await;
        assert!(matches!(
            result,
            Err(LevelUpError::Validation(
                ValidationError::MissingTierAchievement { level: 2, .. }
            ))
        ));
    }

    #[tokio::test]
    async fn level_five_commit_clears_marked_traits_but_level_two_does_not() {
        let mut character = warrior();
        character.level = 4;
        character.marked_traits.insert(CharacterTrait::Agility);
        character.marked_traits.insert(CharacterTrait::Strength);
        let (service, id) = service_with(character).await;

        let handle = service.open_level_up(id).await.unwrap();
        assert_eq!(handle.target_level, 5);
        let hit_point = option_index(&handle, AdvancementType::HitPoint);

        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(ExperienceDraft {
                    name: "Tier Veteran".to_string(),
                    description: String::new(),
                }),
                "reckless-onslaught".to_string(),
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 1, hit_point, SubChoice::None)
            .await
            .unwrap();
        let updated = service.commit(handle.id).await.unwrap();

        assert_eq!(updated.level, 5);
        assert!(updated.marked_traits.is_empty());
    }

    #[tokio::test]
    async fn trait_marks_made_at_level_five_survive_the_reset() {
        let mut character = warrior();
        character.level = 4;
        character.marked_traits.insert(CharacterTrait::Presence);
        let (service, id) = service_with(character).await;

        let handle = service.open_level_up(id).await.unwrap();
        let trait_bonus = option_index(&handle, AdvancementType::TraitBonus);
        let hit_point = option_index(&handle, AdvancementType::HitPoint);

        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(ExperienceDraft {
                    name: "Tier Veteran".to_string(),
                    description: String::new(),
                }),
                "reckless-onslaught".to_string(),
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(
                handle.id,
                0,
                trait_bonus,
                SubChoice::Traits {
                    first: CharacterTrait::Agility,
                    second: CharacterTrait::Strength,
                },
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 1, hit_point, SubChoice::None)
            .await
            .unwrap();
        let updated = service.commit(handle.id).await.unwrap();

        // The old tier's mark is gone; the new level's marks remain.
        assert!(!updated.marked_traits.contains(&CharacterTrait::Presence));
        assert!(updated.marked_traits.contains(&CharacterTrait::Agility));
        assert!(updated.marked_traits.contains(&CharacterTrait::Strength));
    }

    #[tokio::test]
    async fn a_stale_workflow_cannot_double_apply_a_level() {
        let (service, id) = service_with(warrior()).await;

        let first = service.open_level_up(id).await.unwrap();
        let second = service.open_level_up(id).await.unwrap();
        let hit_point = option_index(&first, AdvancementType::HitPoint);

        async fn drive(
            service: &LevelUpServiceImpl,
            handle: WorkflowId,
            hit_point: usize,
        ) -> WorkflowHandle {
            let handle = service
                .select_tier_achievement(
                    handle,
                    Some(combat_veteran()),
                    "weapon-mastery".to_string(),
                )
                .await
                .unwrap();
            let handle = service
                .select_advancement(handle.id, 0, hit_point, SubChoice::None)
                .await
                .unwrap();
            service
                .select_advancement(handle.id, 1, hit_point, SubChoice::None)
                .await
                .unwrap()
        }

        let first = drive(&service, first.id, hit_point).await;
        let second = drive(&service, second.id, hit_point).await;

        service.commit(first.id).await.unwrap();
        let result = service.commit(second.id).await;
        assert!(matches!(
            result,
            Err(LevelUpError::Apply(ApplyError::Conflict { .. }))
        ));

        let stored = service.store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.level, 2);
        assert_eq!(stored.max_hit_points, warrior().max_hit_points + 2);
    }

    #[tokio::test]
    async fn cancel_discards_the_selection_and_leaves_the_character_unchanged() {
        let (service, id) = service_with(warrior()).await;
        let handle = service.open_level_up(id).await.unwrap();
        let before = service.store.load(id).await.unwrap().unwrap();

        service.cancel(handle.id).await;
        assert!(matches!(
            service.validate(handle.id).await,
            Err(LevelUpError::UnknownWorkflow(_))
        ));
        let after = service.store.load(id).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn a_character_at_the_level_cap_is_not_eligible() {
        let mut character = warrior();
        character.level = 10;
        let (service, id) = service_with(character).await;
        let result = service.open_level_up(id).await;
        assert!(matches!(result, Err(LevelUpError::NotEligible { .. })));
    }

    #[tokio::test]
    async fn a_rejected_pick_does_not_linger_in_the_selection() {
        let mut character = warrior();
        character.marked_traits.insert(CharacterTrait::Agility);
        let (service, id) = service_with(character).await;

        let handle = service.open_level_up(id).await.unwrap();
        let trait_bonus = option_index(&handle, AdvancementType::TraitBonus);
        let hit_point = option_index(&handle, AdvancementType::HitPoint);
        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(combat_veteran()),
                "weapon-mastery".to_string(),
            )
            .await
            .unwrap();

        // A bad pick into an empty slot leaves the slot empty.
        let marked_pair = SubChoice::Traits {
            first: CharacterTrait::Agility,
            second: CharacterTrait::Strength,
        };
        let result = service
            .select_advancement(handle.id, 0, trait_bonus, marked_pair.clone())
            .await;
        assert!(matches!(result, Err(LevelUpError::Validation(_))));
        {
            let workflows = service.workflows.lock().await;
            let workflow = workflows.get(&handle.id).unwrap();
            assert!(workflow.selection.slot(0).is_none());
            assert_eq!(workflow.state, WorkflowState::FirstAdvancement);
        }

        // A bad pick over a good one restores the good one.
        let handle = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await
            .unwrap();
        let result = service
            .select_advancement(handle.id, 0, trait_bonus, marked_pair)
            .await;
        assert!(matches!(result, Err(LevelUpError::Validation(_))));
        {
            let workflows = service.workflows.lock().await;
            let workflow = workflows.get(&handle.id).unwrap();
            let kept = workflow.selection.slot(0).unwrap();
            assert_eq!(kept.option_index, hit_point);
            assert_eq!(kept.sub_choice, SubChoice::None);
        }
    }

    #[tokio::test]
    async fn a_corrupt_stored_level_is_rejected_without_overflowing() {
        let mut character = warrior();
        character.level = u8::MAX;
        let (service, id) = service_with(character).await;
        let result = service.open_level_up(id).await;
        assert!(matches!(
            result,
            Err(LevelUpError::NotEligible { level: u8::MAX, .. })
        ));
    }

    #[tokio::test]
    async fn multiclass_consumes_both_slots_and_unlocks_the_new_domains() {
        let mut character = warrior();
        character.level = 4;
        let (service, id) = service_with(character).await;

        let handle = service.open_level_up(id).await.unwrap();
        let multiclass = option_index(&handle, AdvancementType::Multiclass);

        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(ExperienceDraft {
                    name: "Arcane Dabbler".to_string(),
                    description: String::new(),
                }),
                "reckless-onslaught".to_string(),
            )
            .await
            .unwrap();

        // One two-slot option fills the level and skips straight to
        // confirmation.
        let handle = service
            .select_advancement(
                handle.id,
                0,
                multiclass,
                SubChoice::Multiclass {
                    class: CharacterClass::Wizard,
                },
            )
            .await
            .unwrap();
        assert_eq!(handle.state, WorkflowState::Confirmation);

        let updated = service.commit(handle.id).await.unwrap();
        assert_eq!(updated.multiclass, Some(CharacterClass::Wizard));
        assert_eq!(updated.level, 5);
    }

    /// Store that fails the next save, for exercising the commit retry path.
    struct FlakyStore {
        inner: InMemoryCharacterStore,
        fail_next_save: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl CharacterStorePort for FlakyStore {
        async fn load(&self, id: CharacterId) -> Result<Option<Character>, StoreError> {
            self.inner.load(id).await
        }

        async fn save(
            &self,
            character: &Character,
            expected_version: u64,
        ) -> Result<Character, StoreError> {
            if self
                .fail_next_save
                .swap(false, std::sync::atomic::Ordering::SeqCst)
            {
                return Err(StoreError::Backend(anyhow::anyhow!("store offline")));
            }
            self.inner.save(character, expected_version).await
        }
    }

    #[tokio::test]
    async fn a_failed_commit_keeps_the_workflow_open_for_retry() {
        let character = warrior();
        let id = character.id;
        let store = Arc::new(FlakyStore {
            inner: InMemoryCharacterStore::new(),
            fail_next_save: std::sync::atomic::AtomicBool::new(false),
        });
        store.inner.seed(character).await;
        let catalog = Arc::new(RuleCatalog::builtin().unwrap());
        let service = LevelUpServiceImpl::new(catalog, store.clone());

        let handle = service.open_level_up(id).await.unwrap();
        let hit_point = option_index(&handle, AdvancementType::HitPoint);
        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(combat_veteran()),
                "weapon-mastery".to_string(),
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 0, hit_point, SubChoice::None)
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 1, hit_point, SubChoice::None)
            .await
            .unwrap();

        store
            .fail_next_save
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let result = service.commit(handle.id).await;
        assert!(matches!(
            result,
            Err(LevelUpError::Apply(ApplyError::Persistence(_)))
        ));

        // The character is unchanged and the workflow survived in
        // confirmation with its selections and the failure recorded.
        assert_eq!(store.load(id).await.unwrap().unwrap().level, 1);
        {
            let workflows = service.workflows.lock().await;
            let workflow = workflows.get(&handle.id).unwrap();
            assert_eq!(workflow.state, WorkflowState::Confirmation);
            assert!(workflow.last_error.is_some());
        }

        // Retrying the same handle now succeeds.
        let updated = service.commit(handle.id).await.unwrap();
        assert_eq!(updated.level, 2);
    }

    #[tokio::test]
    async fn successive_level_ups_accumulate_and_respect_trait_marks() {
        let (service, id) = service_with(warrior()).await;

        // Level 1 -> 2: two trait bonuses mark four of the six traits.
        let handle = service.open_level_up(id).await.unwrap();
        let trait_bonus = option_index(&handle, AdvancementType::TraitBonus);
        let handle = service
            .select_tier_achievement(
                handle.id,
                Some(combat_veteran()),
                "weapon-mastery".to_string(),
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(
                handle.id,
                0,
                trait_bonus,
                SubChoice::Traits {
                    first: CharacterTrait::Agility,
                    second: CharacterTrait::Strength,
                },
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(
                handle.id,
                1,
                trait_bonus,
                SubChoice::Traits {
                    first: CharacterTrait::Finesse,
                    second: CharacterTrait::Instinct,
                },
            )
            .await
            .unwrap();
        let after_two = service.commit(handle.id).await.unwrap();
        assert_eq!(after_two.level, 2);
        assert_eq!(after_two.marked_traits.len(), 4);

        // Level 2 -> 3: a marked trait is rejected, an unmarked pair passes.
        let handle = service.open_level_up(id).await.unwrap();
        assert_eq!(handle.target_level, 3);
        let trait_bonus = option_index(&handle, AdvancementType::TraitBonus);
        let hit_point = option_index(&handle, AdvancementType::HitPoint);
        // Level 3 grants no experience; only the domain card is required.
        let handle = service
            .select_tier_achievement(handle.id, None, "whirlwind".to_string())
            .await
            .unwrap();

        let result = service
            .select_advancement(
                handle.id,
                0,
                trait_bonus,
                SubChoice::Traits {
                    first: CharacterTrait::Agility,
                    second: CharacterTrait::Presence,
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(LevelUpError::Validation(
                ValidationError::DuplicateMarkedTrait { .. }
            ))
        ));

        let handle = service
            .select_advancement(
                handle.id,
                0,
                trait_bonus,
                SubChoice::Traits {
                    first: CharacterTrait::Presence,
                    second: CharacterTrait::Knowledge,
                },
            )
            .await
            .unwrap();
        let handle = service
            .select_advancement(handle.id, 1, hit_point, SubChoice::None)
            .await
            .unwrap();
        let after_three = service.commit(handle.id).await.unwrap();

        assert_eq!(after_three.level, 3);
        assert_eq!(after_three.marked_traits.len(), 6);
        assert_eq!(after_three.trait_value(CharacterTrait::Agility), 1);
        assert_eq!(after_three.trait_value(CharacterTrait::Presence), 1);
        // Proficiency only rises at the achievement levels (2 here).
        assert_eq!(after_three.proficiency, 2);
        assert_eq!(after_three.domain_cards.len(), 2);
        assert!(after_three.has_domain_card("whirlwind"));
        // Level 2 logs four records (two selected, proficiency, card);
        // level 3 logs three (no proficiency grant).
        assert_eq!(after_three.advancements.len(), 7);
        assert_eq!(after_three.version, 2);
    }
}
