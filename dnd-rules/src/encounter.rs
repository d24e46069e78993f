//! Encounter state machine.
//!
//! Owns turn order, the round counter, and phase transitions for one fight:
//!
//! ```text
//! Initiative -> PlayerTurn <-> EnemyTurn -> Victory | Defeat | Resolution
//! ```
//!
//! Victory, Defeat, and Resolution (the player fled) are terminal. Acting out
//! of turn, or against a dead or unknown enemy, is a no-op that returns the
//! state unchanged with no events.

use crate::combat::{CombatEngine, CombatResult, InitiativeEntry, PlayerAttack};
use crate::config::RulesConfig;
use crate::dice::{Advantage, Amount, DiceEngine, DiceError};
use crate::monsters::Enemy;
use crate::story::StoryEvent;
use crate::world::{Ability, Character, CharacterId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatPhase {
    Initiative,
    PlayerTurn,
    EnemyTurn,
    Victory,
    Defeat,
    Resolution,
}

impl CombatPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CombatPhase::Victory | CombatPhase::Defeat | CombatPhase::Resolution
        )
    }
}

/// One encounter. `current_turn_index < initiative_order.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatState {
    pub id: Uuid,
    pub enemies: Vec<Enemy>,
    pub initiative_order: Vec<InitiativeEntry>,
    pub current_turn_index: usize,
    pub round_number: u32,
    pub phase: CombatPhase,
    pub active: bool,
    /// Enemies attack with disadvantage until the player's next turn.
    #[serde(default)]
    pub player_dodging: bool,
    #[serde(default)]
    pub player_fled: bool,
    #[serde(default)]
    pub experience_reward: u32,
}

impl CombatState {
    pub fn is_combat_over(&self) -> bool {
        !self.active || !self.enemies.iter().any(Enemy::is_alive)
    }

    pub fn current_entry(&self) -> Option<&InitiativeEntry> {
        self.initiative_order.get(self.current_turn_index)
    }

    pub fn is_player_turn(&self) -> bool {
        self.active
            && self.phase == CombatPhase::PlayerTurn
            && self.current_entry().is_some_and(|e| e.is_player)
    }

    pub fn enemy(&self, id: CharacterId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(|e| e.is_alive())
    }

    fn replace_enemy(&mut self, enemy: Enemy) {
        if let Some(slot) = self.enemies.iter_mut().find(|e| e.id == enemy.id) {
            *slot = enemy;
        }
    }

    /// Move to the next actor, bumping the round when the order wraps.
    fn advance_turn(&mut self) {
        if self.initiative_order.is_empty() {
            return;
        }
        self.current_turn_index = (self.current_turn_index + 1) % self.initiative_order.len();
        if self.current_turn_index == 0 {
            self.round_number += 1;
        }
        self.phase = self.phase_for_current();
    }

    fn phase_for_current(&self) -> CombatPhase {
        match self.current_entry() {
            Some(entry) if entry.is_player => CombatPhase::PlayerTurn,
            _ => CombatPhase::EnemyTurn,
        }
    }
}

/// What the player does on their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CombatAction {
    Attack(PlayerAttack),
    Dodge,
    Heal { healing: Amount },
    Flee,
}

/// Result of one step of the encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatTurn {
    pub state: CombatState,
    pub player: Character,
    pub events: Vec<StoryEvent>,
    pub results: Vec<CombatResult>,
    pub combat_ended: bool,
    pub player_fled: bool,
    /// XP earned by this step; non-zero only on the step that wins.
    pub experience_reward: u32,
}

impl CombatTurn {
    fn unchanged(state: &CombatState, player: &Character) -> Self {
        Self {
            state: state.clone(),
            player: player.clone(),
            events: Vec::new(),
            results: Vec::new(),
            combat_ended: state.is_combat_over(),
            player_fled: state.player_fled,
            experience_reward: 0,
        }
    }

    fn defeat(&mut self) {
        self.state.active = false;
        self.state.phase = CombatPhase::Defeat;
        self.combat_ended = true;
        self.events.push(StoryEvent::combat_message(format!(
            "{} has fallen. Defeat.",
            self.player.name
        )));
        tracing::info!(combat_id = %self.state.id, "encounter lost");
    }
}

/// Drives encounters turn by turn.
#[derive(Debug, Clone, Copy)]
pub struct CombatManager {
    engine: CombatEngine,
    flee_dc: i32,
}

impl Default for CombatManager {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

impl CombatManager {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            engine: CombatEngine::new(config),
            flee_dc: config.flee_dc,
        }
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.engine
    }

    /// Roll initiative and open the encounter. `None` without enemies.
    ///
    /// An ambush gives the player disadvantage on initiative. A player who
    /// is already unconscious loses on the spot.
    pub fn start_encounter(
        &self,
        dice: &mut DiceEngine,
        player: &Character,
        enemies: Vec<Enemy>,
        ambush: bool,
    ) -> Option<(CombatState, Vec<StoryEvent>)> {
        if enemies.is_empty() {
            return None;
        }

        let player_advantage = if ambush {
            Advantage::Disadvantage
        } else {
            Advantage::Normal
        };
        let initiative_order =
            self.engine
                .roll_initiative(dice, player, &enemies, player_advantage);

        let mut state = CombatState {
            id: Uuid::new_v4(),
            enemies,
            initiative_order,
            current_turn_index: 0,
            round_number: 1,
            phase: CombatPhase::Initiative,
            active: true,
            player_dodging: false,
            player_fled: false,
            experience_reward: 0,
        };
        state.phase = state.phase_for_current();

        let names: Vec<&str> = state.enemies.iter().map(|e| e.name.as_str()).collect();
        let order: Vec<String> = state
            .initiative_order
            .iter()
            .map(|e| format!("{} ({})", e.actor_name, e.initiative_score))
            .collect();

        let mut events = Vec::new();
        if ambush {
            events.push(StoryEvent::combat_message("Ambush! You are caught off guard."));
        }
        events.push(StoryEvent::combat_message(format!(
            "Combat begins against {}! Initiative: {}",
            names.join(", "),
            order.join(", ")
        )));

        tracing::info!(
            combat_id = %state.id,
            enemies = state.enemies.len(),
            phase = ?state.phase,
            "encounter started"
        );

        if !player.is_conscious() {
            let mut turn = CombatTurn::unchanged(&state, player);
            turn.events = events;
            turn.defeat();
            return Some((turn.state, turn.events));
        }
        Some((state, events))
    }

    /// Resolve the player's action. Every action except a successful flee
    /// ends the player's turn.
    pub fn process_player_action(
        &self,
        dice: &mut DiceEngine,
        state: &CombatState,
        player: &Character,
        action: &CombatAction,
    ) -> Result<CombatTurn, DiceError> {
        if state.active && !player.is_conscious() {
            let mut turn = CombatTurn::unchanged(state, player);
            turn.defeat();
            return Ok(turn);
        }
        if !state.is_player_turn() {
            tracing::debug!(phase = ?state.phase, "player action out of turn ignored");
            return Ok(CombatTurn::unchanged(state, player));
        }

        let mut turn = CombatTurn::unchanged(state, player);
        turn.state.player_dodging = false;

        match action {
            CombatAction::Attack(attack) => {
                let Some(target) = state.enemy(attack.target_id).filter(|e| e.is_alive()) else {
                    tracing::debug!(target = %attack.target_id, "attack on missing or dead enemy ignored");
                    return Ok(CombatTurn::unchanged(state, player));
                };
                let (result, target) = self.engine.player_attack(dice, player, target, attack);
                turn.state.replace_enemy(target);
                turn.events.push(StoryEvent::combat(&result));
                turn.results.push(result);
            }
            CombatAction::Dodge => {
                turn.state.player_dodging = true;
                turn.events.push(StoryEvent::combat_message(format!(
                    "{} takes the Dodge action.",
                    player.name
                )));
            }
            CombatAction::Heal { healing } => {
                let (result, healed) = self.engine.apply_healing(dice, player, healing)?;
                turn.player = healed;
                turn.events.push(StoryEvent::combat_message(format!(
                    "{} recovers {} hit points ({}/{}).",
                    player.name,
                    result.healed,
                    result.hp_after,
                    turn.player.hit_points.maximum
                )));
            }
            CombatAction::Flee => {
                let modifier = player.ability_modifier(Ability::Dexterity);
                let check = dice.roll_skill_check(modifier, self.flee_dc, Advantage::Normal);
                if check.success {
                    turn.state.active = false;
                    turn.state.phase = CombatPhase::Resolution;
                    turn.state.player_fled = true;
                    turn.combat_ended = true;
                    turn.player_fled = true;
                    turn.events.push(StoryEvent::combat_message(format!(
                        "{} escapes ({} vs DC {})!",
                        player.name, check.total, self.flee_dc
                    )));
                    tracing::info!(combat_id = %state.id, "player fled");
                    return Ok(turn);
                }
                turn.events.push(StoryEvent::combat_message(format!(
                    "{} fails to escape ({} vs DC {}).",
                    player.name, check.total, self.flee_dc
                )));
            }
        }

        self.finish_player_turn(&mut turn);
        Ok(turn)
    }

    fn finish_player_turn(&self, turn: &mut CombatTurn) {
        if turn.state.living_enemies().next().is_none() {
            let reward = self.engine.calculate_experience_reward(&turn.state.enemies);
            turn.state.active = false;
            turn.state.phase = CombatPhase::Victory;
            turn.state.experience_reward = reward;
            turn.combat_ended = true;
            turn.experience_reward = reward;
            turn.events.push(StoryEvent::combat_message(format!(
                "Victory! All enemies are defeated. You earn {reward} experience points."
            )));
            tracing::info!(combat_id = %turn.state.id, reward, "encounter won");
        } else {
            turn.state.advance_turn();
        }
    }

    /// Resolve the current enemy's turn. Dead enemies are skipped without
    /// rolling.
    pub fn process_enemy_turn(
        &self,
        dice: &mut DiceEngine,
        state: &CombatState,
        player: &Character,
    ) -> CombatTurn {
        if !state.active || state.phase != CombatPhase::EnemyTurn {
            return CombatTurn::unchanged(state, player);
        }

        let mut turn = CombatTurn::unchanged(state, player);
        let enemy = state
            .current_entry()
            .filter(|entry| !entry.is_player)
            .and_then(|entry| state.enemy(entry.actor_id))
            .filter(|enemy| enemy.is_alive());

        let Some(enemy) = enemy else {
            turn.state.advance_turn();
            return turn;
        };

        let advantage = if state.player_dodging {
            Advantage::Disadvantage
        } else {
            Advantage::Normal
        };
        let action = enemy.primary_action();
        let (result, player) = self
            .engine
            .monster_attack(dice, enemy, player, &action, advantage);
        turn.player = player;
        turn.events.push(StoryEvent::combat(&result));

        if !turn.player.is_conscious() {
            turn.defeat();
        } else {
            turn.state.advance_turn();
        }
        turn.results.push(result);
        turn
    }

    /// Run enemy turns until it is the player's turn or the fight ends.
    pub fn run_enemy_turns(
        &self,
        dice: &mut DiceEngine,
        state: &CombatState,
        player: &Character,
    ) -> CombatTurn {
        let mut turn = CombatTurn::unchanged(state, player);
        for _ in 0..state.initiative_order.len() {
            if !turn.state.active || turn.state.phase != CombatPhase::EnemyTurn {
                break;
            }
            let step = self.process_enemy_turn(dice, &turn.state, &turn.player);
            turn.state = step.state;
            turn.player = step.player;
            turn.events.extend(step.events);
            turn.results.extend(step.results);
        }
        turn.combat_ended = turn.state.is_combat_over();
        turn
    }
}
