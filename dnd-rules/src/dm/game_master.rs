//! The Game Master: the one place AI proposals become state changes.

use super::proposal::{CombatTrigger, ParsedAIProposal, PlayerChoice, ProposedReward};
use crate::actions::{ActionError, GameAction, ProposedAction};
use crate::config::RulesConfig;
use crate::dice::{DiceEngine, DiceError};
use crate::encounter::{CombatAction, CombatManager, CombatPhase};
use crate::rules::{ActionExecutor, ActionValidator, Execution, ValidationResult};
use crate::skills::{SkillCheckEngine, SkillCheckOutcome};
use crate::story::StoryEvent;
use crate::world::GameState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What one Game Master call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMasterResponse {
    pub updated_state: GameState,
    /// Events from this call, in order. Also appended to the state's story log.
    pub messages: Vec<StoryEvent>,
    #[serde(default)]
    pub skill_check: Option<SkillCheckOutcome>,
    #[serde(default)]
    pub requires_player_choice: bool,
    #[serde(default)]
    pub player_choices: Vec<PlayerChoice>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    /// Phase of the active encounter, if any.
    #[serde(default)]
    pub combat_phase: Option<CombatPhase>,
}

impl GameMasterResponse {
    fn new(mut state: GameState, messages: Vec<StoryEvent>) -> Self {
        state.story_log.extend(messages.iter().cloned());
        let combat_phase = state.combat.as_ref().map(|c| c.phase);
        Self {
            updated_state: state,
            messages,
            skill_check: None,
            requires_player_choice: false,
            player_choices: Vec::new(),
            suggested_actions: Vec::new(),
            combat_phase,
        }
    }
}

/// Validates and applies everything the narrative layer proposes.
///
/// Owns the dice so every roll in a session comes from one source.
#[derive(Debug)]
pub struct GameMaster {
    config: RulesConfig,
    dice: DiceEngine,
    checks: SkillCheckEngine,
    combat: CombatManager,
    validator: ActionValidator,
    executor: ActionExecutor,
}

impl GameMaster {
    pub fn new(config: RulesConfig, dice: DiceEngine) -> Self {
        Self {
            checks: SkillCheckEngine::new(),
            combat: CombatManager::new(&config),
            validator: ActionValidator::new(config.clone()),
            executor: ActionExecutor::new(config.clone()),
            config,
            dice,
        }
    }

    /// Default rules with a seeded RNG.
    pub fn seeded(seed: u64) -> Self {
        Self::new(RulesConfig::default(), DiceEngine::seeded(seed))
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn dice(&self) -> &DiceEngine {
        &self.dice
    }

    pub fn validate(&self, action: &GameAction, state: &GameState) -> ValidationResult {
        self.validator.validate(action, state)
    }

    /// Validate then execute one action. A rejection leaves the state
    /// unchanged and reports the reason as a system event.
    pub fn apply_action(
        &mut self,
        state: &GameState,
        action: &GameAction,
    ) -> Result<Execution, ActionError> {
        let verdict = self.validator.validate(action, state);
        if !verdict.is_valid {
            let reason = verdict.reason.unwrap_or_else(|| "not allowed".to_string());
            warn!(action = action.type_name(), %reason, "action rejected");
            return Ok(Execution {
                state: state.clone(),
                events: vec![StoryEvent::system(format!(
                    "{} rejected: {reason}",
                    action.type_name()
                ))],
            });
        }
        self.executor.execute(&mut self.dice, state, action)
    }

    /// Run a batch of proposed actions in order. Rejected or malformed
    /// actions are reported and skipped; the rest still apply.
    pub fn execute_actions(&mut self, state: &GameState, actions: &[ProposedAction]) -> Execution {
        let mut current = Execution {
            state: state.clone(),
            events: Vec::new(),
        };
        for proposed in actions {
            if let Some(narration) = proposed.narration.as_deref().filter(|n| !n.trim().is_empty()) {
                current.events.push(StoryEvent::narration(narration));
            }
            let applied = proposed
                .to_action()
                .and_then(|action| self.apply_action(&current.state, &action));
            self.absorb(&mut current, applied);
        }
        current
    }

    /// Apply rewards through the capped `add*` actions.
    pub fn process_rewards(&mut self, state: &GameState, rewards: &[ProposedReward]) -> Execution {
        let mut current = Execution {
            state: state.clone(),
            events: Vec::new(),
        };
        for reward in rewards {
            let Some(action) = reward.to_action() else {
                debug!(?reward, "reward without payload skipped");
                continue;
            };
            let applied = self.apply_action(&current.state, &action);
            self.absorb(&mut current, applied);
        }
        current
    }

    fn absorb(&self, current: &mut Execution, applied: Result<Execution, ActionError>) {
        match applied {
            Ok(step) => {
                current.state = step.state;
                current.events.extend(step.events);
            }
            Err(err) => {
                warn!(error = %err, "action failed");
                current
                    .events
                    .push(StoryEvent::system(format!("Action failed: {err}")));
            }
        }
    }

    /// Turn one AI response into state changes and story events.
    ///
    /// Order: player action, narration, dialogue, check and its outcome,
    /// rewards (only when the check passed or there was none), embedded
    /// actions, scene change, then any combat trigger.
    pub fn process_ai_response(
        &mut self,
        state: &GameState,
        player_input: &str,
        proposal: &ParsedAIProposal,
    ) -> GameMasterResponse {
        let mut events = Vec::new();
        let mut state = state.clone();

        if !player_input.trim().is_empty() {
            events.push(StoryEvent::player_action(player_input.trim()));
        }
        if !proposal.narration.trim().is_empty() {
            events.push(StoryEvent::narration(proposal.narration.clone()));
        }
        for line in &proposal.npc_dialogues {
            events.push(StoryEvent::dialogue(
                line.npc_name.clone(),
                line.dialogue.clone(),
                line.emotion.clone(),
            ));
        }

        let skill_check = proposal.proposed_check.as_ref().map(|check| {
            let mut check = check.clone();
            check.difficulty_class = self.config.clamp_dc(check.difficulty_class);
            let outcome = self
                .checks
                .perform_skill_check(&mut self.dice, &state.player, &check);
            events.push(StoryEvent::skill_check(&outcome));
            let follow_up = if outcome.success() {
                &proposal.success_outcome
            } else {
                &proposal.failure_outcome
            };
            if let Some(text) = follow_up.as_deref().filter(|t| !t.trim().is_empty()) {
                events.push(StoryEvent::narration(text));
            }
            outcome
        });

        if skill_check.as_ref().map_or(true, SkillCheckOutcome::success) {
            let step = self.process_rewards(&state, &proposal.proposed_rewards);
            state = step.state;
            events.extend(step.events);
        } else if !proposal.proposed_rewards.is_empty() {
            debug!(
                rewards = proposal.proposed_rewards.len(),
                "rewards withheld after failed check"
            );
        }

        if !proposal.actions.is_empty() {
            let step = self.execute_actions(&state, &proposal.actions);
            state = step.state;
            events.extend(step.events);
        }

        if let Some(scene) = &proposal.scene_change {
            if let Some(text) = scene
                .transition_description
                .as_deref()
                .filter(|t| !t.trim().is_empty())
            {
                events.push(StoryEvent::narration(text));
            }
            let mut current = Execution { state, events: Vec::new() };
            let applied = self.apply_action(&current.state, &scene.to_action());
            self.absorb(&mut current, applied);
            state = current.state;
            events.extend(current.events);
        }

        if let Some(trigger) = &proposal.combat_trigger {
            let step = self.start_combat(&state, trigger);
            state = step.state;
            events.extend(step.events);
        }

        info!(
            events = events.len(),
            check = skill_check.is_some(),
            in_combat = state.in_combat(),
            "AI response processed"
        );

        let mut response = GameMasterResponse::new(state, events);
        response.skill_check = skill_check;
        response.requires_player_choice =
            proposal.requires_player_choice || !proposal.player_choices.is_empty();
        response.player_choices = proposal.player_choices.clone();
        response.suggested_actions = proposal.suggested_actions.clone();
        response
    }

    /// Open an encounter from a combat trigger. Ignored while a fight is
    /// already running. Enemies who win initiative act immediately.
    pub fn start_combat(&mut self, state: &GameState, trigger: &CombatTrigger) -> Execution {
        let mut state = state.clone();
        if state.in_combat() {
            debug!("combat trigger ignored during active combat");
            return Execution {
                state,
                events: Vec::new(),
            };
        }

        let enemies = trigger.enemies.iter().map(|e| e.to_enemy()).collect();
        let Some((combat, mut events)) =
            self.combat
                .start_encounter(&mut self.dice, &state.player, enemies, trigger.ambush)
        else {
            return Execution {
                state,
                events: Vec::new(),
            };
        };
        if let Some(reason) = trigger.reason.as_deref().filter(|r| !r.trim().is_empty()) {
            events.insert(0, StoryEvent::combat_message(reason));
        }

        let turn = self
            .combat
            .run_enemy_turns(&mut self.dice, &combat, &state.player);
        state.player = turn.player;
        events.extend(turn.events);
        state.combat = (!turn.state.is_combat_over()).then_some(turn.state);

        Execution { state, events }
    }

    /// Resolve the player's combat action, then every enemy turn up to the
    /// player's next turn. Victory XP is applied; a finished encounter is
    /// cleared from the state.
    pub fn process_combat_action(
        &mut self,
        state: &GameState,
        action: &CombatAction,
    ) -> Result<GameMasterResponse, DiceError> {
        let Some(combat) = state.combat.as_ref().filter(|c| c.active) else {
            debug!("combat action outside combat ignored");
            return Ok(GameMasterResponse::new(state.clone(), Vec::new()));
        };

        let mut state = state.clone();
        let turn = self
            .combat
            .process_player_action(&mut self.dice, combat, &state.player, action)?;
        let mut events = turn.events;
        let mut player = turn.player;
        let mut combat = turn.state;
        let mut reward = turn.experience_reward;

        if combat.active {
            let enemies = self.combat.run_enemy_turns(&mut self.dice, &combat, &player);
            events.extend(enemies.events);
            player = enemies.player;
            combat = enemies.state;
            reward += enemies.experience_reward;
        }

        if reward > 0 {
            let (outcome, leveled) =
                self.combat
                    .engine()
                    .check_level_up(&mut self.dice, &player, reward);
            player = leveled;
            events.push(StoryEvent::experience_gained(reward, outcome.new_total));
            if outcome.leveled_up() {
                events.push(StoryEvent::level_up(&outcome));
            }
        }

        let phase = combat.phase;
        state.player = player;
        state.combat = if combat.is_combat_over() {
            info!(?phase, "encounter closed");
            None
        } else {
            Some(combat)
        };

        let mut response = GameMasterResponse::new(state, events);
        response.combat_phase = Some(phase);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dm::proposal::{NpcDialogue, SceneChange, TriggeredEnemy};
    use crate::skills::ProposedCheck;
    use crate::story::StoryEventKind;
    use crate::testing::{sample_state, scripted_dice};
    use serde_json::json;

    fn gm(faces: Vec<u32>) -> GameMaster {
        GameMaster::new(RulesConfig::default(), scripted_dice(faces))
    }

    #[test]
    fn test_rewards_granted_without_check() {
        let state = sample_state();
        let gold = state.player.inventory.gold;
        let proposal = ParsedAIProposal::narration("The merchant pays you.")
            .with_reward(ProposedReward::gold(500));
        let response = gm(vec![10]).process_ai_response(&state, "I sell the pelts", &proposal);

        assert_eq!(response.updated_state.player.inventory.gold, gold + 75);
        assert_eq!(response.messages[0].kind, StoryEventKind::PlayerAction);
        assert_eq!(response.messages[1].kind, StoryEventKind::Narration);
    }

    #[test]
    fn test_rewards_withheld_on_failed_check() {
        let state = sample_state();
        let gold = state.player.inventory.gold;
        let proposal = ParsedAIProposal::narration("The lock resists.")
            .with_check(
                ProposedCheck::skill("Athletics", 15),
                "The chest opens.",
                "It will not budge.",
            )
            .with_reward(ProposedReward::gold(20));
        // d20 of 2 + Athletics 5 = 7 vs 15
        let response = gm(vec![2]).process_ai_response(&state, "I force the chest", &proposal);

        let outcome = response.skill_check.as_ref().unwrap();
        assert!(!outcome.success());
        assert_eq!(response.updated_state.player.inventory.gold, gold);
        assert!(response
            .messages
            .iter()
            .any(|m| m.content == "It will not budge."));
    }

    #[test]
    fn test_proposed_dc_clamped() {
        let state = sample_state();
        let proposal = ParsedAIProposal::narration("A sheer wall.").with_check(
            ProposedCheck::skill("Athletics", 99),
            "You climb.",
            "You slip.",
        );
        let response = gm(vec![20]).process_ai_response(&state, "", &proposal);
        assert_eq!(response.skill_check.unwrap().roll.dc, 30);
    }

    #[test]
    fn test_dialogue_and_scene_change() {
        let state = sample_state();
        let proposal = ParsedAIProposal::narration("You leave town.")
            .with_dialogue(NpcDialogue::new("Mira", "Safe travels.").with_emotion("warm"))
            .with_scene_change(SceneChange::new("Old Road", "A rutted track heading north."));
        let response = gm(vec![10]).process_ai_response(&state, "I head out", &proposal);

        assert_eq!(response.updated_state.location, "Old Road");
        let dialogue = response
            .messages
            .iter()
            .find(|m| m.kind == StoryEventKind::Dialogue)
            .unwrap();
        assert_eq!(dialogue.speaker.as_deref(), Some("Mira"));
        assert_eq!(
            response.updated_state.story_log.len(),
            state.story_log.len() + response.messages.len()
        );
    }

    #[test]
    fn test_batch_continues_after_rejection() {
        let mut state = sample_state();
        state.player.inventory.gold = 10;
        let actions = vec![
            ProposedAction::new("spendGold", json!({"amount": 50})),
            ProposedAction::new("teleport", json!({})),
            ProposedAction::new("addItem", json!({"itemName": "Torch", "quantity": 1})),
        ];
        let result = gm(vec![10]).execute_actions(&state, &actions);

        assert_eq!(result.state.player.inventory.gold, 10);
        assert!(result.state.player.inventory.has_item("Torch"));
        let system = result
            .events
            .iter()
            .filter(|e| e.kind == StoryEventKind::System)
            .count();
        assert_eq!(system, 2);
    }

    #[test]
    fn test_combat_trigger_ignored_during_combat() {
        let state = sample_state();
        let trigger = CombatTrigger::against(vec![TriggeredEnemy::new("Goblin")]);
        let mut gm = gm(vec![20, 1]);
        let started = gm.start_combat(&state, &trigger);
        assert!(started.state.in_combat());

        let again = gm.start_combat(&started.state, &trigger);
        assert!(again.events.is_empty());
        assert_eq!(again.state.combat, started.state.combat);
    }

    #[test]
    fn test_combat_action_outside_combat_is_noop() {
        let state = sample_state();
        let response = gm(vec![10])
            .process_combat_action(&state, &CombatAction::Dodge)
            .unwrap();
        assert!(response.messages.is_empty());
        assert_eq!(response.updated_state, state);
    }
}
