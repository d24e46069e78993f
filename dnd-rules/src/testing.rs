//! Testing utilities for the rules core.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedRoller` for fixed die faces instead of an RNG
//! - Sample characters, enemies, and game states
//! - `TestHarness` for scripted Game Master scenarios
//! - Assertion helpers for verifying game state

use crate::dice::{DiceEngine, DiceNotation, DieRoller};
use crate::dm::{GameMaster, GameMasterResponse, ParsedAIProposal};
use crate::config::RulesConfig;
use crate::encounter::{CombatAction, CombatPhase};
use crate::items::create_item;
use crate::monsters::{Enemy, MonsterAction};
use crate::rules::ValidationResult;
use crate::world::{
    Ability, AbilityScores, Character, CharacterClass, DamageType, GameState, Quest, Skill,
};
use std::collections::VecDeque;

/// A die roller that returns scripted faces in order.
///
/// Once the script runs out the last face repeats; an empty script rolls 1s.
/// Faces larger than the die are clamped by the engine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    faces: VecDeque<u32>,
    last: Option<u32>,
}

impl ScriptedRoller {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            last: None,
        }
    }

    /// Faces not yet rolled.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DieRoller for ScriptedRoller {
    fn roll(&mut self, _sides: u32) -> u32 {
        let face = self.faces.pop_front().or(self.last).unwrap_or(1);
        self.last = Some(face);
        face
    }
}

/// A dice engine that rolls exactly `faces`, in order.
pub fn scripted_dice(faces: impl IntoIterator<Item = u32>) -> DiceEngine {
    DiceEngine::new(ScriptedRoller::new(faces))
}

/// Level 1 fighter: STR 16, DEX 14, CON 14, 12 HP, AC 16, longsword in hand.
pub fn sample_fighter(name: &str) -> Character {
    Character::new(name, CharacterClass::Fighter)
        .with_ability_scores(AbilityScores::new(16, 14, 14, 10, 12, 8))
        .with_max_hp(12)
        .with_armor_class(16)
        .with_skill_proficiency(Skill::Athletics)
        .with_skill_proficiency(Skill::Perception)
        .with_saving_throw_proficiency(Ability::Strength)
        .with_saving_throw_proficiency(Ability::Constitution)
        .with_item(create_item("Longsword").equipped())
        .with_item(create_item("Potion of Healing"))
        .with_item(create_item("Potion of Healing"))
        .with_gold(15)
}

/// An enemy with no DEX bonus, +0 to hit, and a 1d4 slam.
pub fn training_dummy(name: &str, hp: i32, armor_class: i32) -> Enemy {
    Enemy::new(name, hp, armor_class).with_action(MonsterAction::new(
        "Slam",
        DiceNotation::new(1, 4, 0),
        DamageType::Bludgeoning,
    ))
}

pub fn sample_goblin() -> Enemy {
    Enemy::from_template("Goblin", None, None)
}

/// A fighter in a tavern with one open quest, `cellar-rats`, whose
/// objectives are `rats` and `report`.
pub fn sample_state() -> GameState {
    GameState::new(sample_fighter("Aria"))
        .with_location("The Prancing Pony", "A smoky common room full of travelers.")
        .with_quest(
            Quest::new("cellar-rats", "Rats in the Cellar")
                .with_description("The innkeeper wants the cellar cleared.")
                .with_objective("rats", "Clear out the rats")
                .with_objective("report", "Report back to the innkeeper"),
        )
}

/// Test harness for running Game Master scenarios.
pub struct TestHarness {
    pub gm: GameMaster,
    pub state: GameState,
}

impl TestHarness {
    /// A harness over [`sample_state`] rolling the scripted `faces`.
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self::with_state(sample_state(), faces)
    }

    pub fn with_state(state: GameState, faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            gm: GameMaster::new(RulesConfig::default(), scripted_dice(faces)),
            state,
        }
    }

    /// Feed an AI response through the Game Master and keep the new state.
    pub fn respond(&mut self, input: &str, proposal: &ParsedAIProposal) -> GameMasterResponse {
        let response = self.gm.process_ai_response(&self.state, input, proposal);
        self.state = response.updated_state.clone();
        response
    }

    /// Take a combat action and keep the new state.
    pub fn act(&mut self, action: &CombatAction) -> GameMasterResponse {
        let response = match self.gm.process_combat_action(&self.state, action) {
            Ok(response) => response,
            Err(err) => panic!("combat action failed: {err}"),
        };
        self.state = response.updated_state.clone();
        response
    }

    /// Current player HP as (current, max).
    pub fn player_hp(&self) -> (i32, i32) {
        let hp = &self.state.player.hit_points;
        (hp.current, hp.maximum)
    }

    pub fn gold(&self) -> u32 {
        self.state.player.inventory.gold
    }

    pub fn in_combat(&self) -> bool {
        self.state.in_combat()
    }

    pub fn phase(&self) -> Option<CombatPhase> {
        self.state.combat.as_ref().map(|c| c.phase)
    }

    /// Content of the last story log entry.
    pub fn last_message(&self) -> Option<&str> {
        self.state.story_log.last().map(|e| e.content.as_str())
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert player HP is at expected values.
#[track_caller]
pub fn assert_hp(harness: &TestHarness, current: i32, max: i32) {
    let (actual_current, actual_max) = harness.player_hp();
    assert_eq!(
        (actual_current, actual_max),
        (current, max),
        "Expected HP {current}/{max}, got {actual_current}/{actual_max}"
    );
}

#[track_caller]
pub fn assert_gold(harness: &TestHarness, gold: u32) {
    assert_eq!(harness.gold(), gold, "Expected {gold} gold, got {}", harness.gold());
}

#[track_caller]
pub fn assert_phase(response: &GameMasterResponse, phase: CombatPhase) {
    assert_eq!(
        response.combat_phase,
        Some(phase),
        "Expected combat phase {phase:?}, got {:?}",
        response.combat_phase
    );
}

#[track_caller]
pub fn assert_valid(result: &ValidationResult) {
    assert!(
        result.is_valid,
        "Expected action to be valid, rejected: {:?}",
        result.reason
    );
}

#[track_caller]
pub fn assert_invalid(result: &ValidationResult) {
    assert!(!result.is_valid, "Expected action to be rejected");
    assert!(result.reason.is_some(), "Rejection should carry a reason");
}

/// Assert player is in combat.
#[track_caller]
pub fn assert_in_combat(harness: &TestHarness) {
    assert!(harness.in_combat(), "Expected to be in combat");
}

/// Assert player is NOT in combat.
#[track_caller]
pub fn assert_not_in_combat(harness: &TestHarness) {
    assert!(!harness.in_combat(), "Expected to NOT be in combat");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dm::{CombatTrigger, ProposedReward, TriggeredEnemy};

    #[test]
    fn test_scripted_roller_repeats_last_face() {
        let mut roller = ScriptedRoller::new([3, 5]);
        assert_eq!(roller.roll(6), 3);
        assert_eq!(roller.roll(6), 5);
        assert_eq!(roller.remaining(), 0);
        assert_eq!(roller.roll(6), 5);
        assert_eq!(ScriptedRoller::default().roll(20), 1);
    }

    #[test]
    fn test_sample_fighter_stats() {
        let fighter = sample_fighter("Aria");
        assert_eq!(fighter.skill_modifier(Skill::Athletics), 5);
        assert_eq!(fighter.weapon_profile().name, "Longsword");
        assert_eq!(fighter.inventory.count_of("Potion of Healing"), 2);
        assert_eq!(fighter.hit_points.maximum, 12);
    }

    #[test]
    fn test_harness_reward_flow() {
        let mut harness = TestHarness::new([10]);
        harness.respond(
            "I search the cellar",
            &ParsedAIProposal::narration("You find a purse.").with_reward(ProposedReward::gold(5)),
        );
        assert_gold(&harness, 20);
        assert_eq!(harness.last_message(), Some("You gain 5 gold."));
    }

    #[test]
    fn test_harness_combat_flow() {
        // Initiative 20 vs 1, then a natural 20 and two 8s on the doubled
        // longsword dice.
        let mut harness = TestHarness::new([20, 1, 20, 8, 8]);
        let trigger = CombatTrigger::against(vec![TriggeredEnemy::new("Goblin")]);

        assert_not_in_combat(&harness);
        harness.respond("I open the door", &ParsedAIProposal::narration("A goblin!").with_combat(trigger));
        assert_in_combat(&harness);
        assert_eq!(harness.phase(), Some(CombatPhase::PlayerTurn));

        let goblin = harness.state.combat.as_ref().unwrap().enemies[0].id;
        let weapon = harness.state.player.weapon_profile();
        let response = harness.act(&CombatAction::Attack(
            crate::combat::PlayerAttack::with_weapon(goblin, &weapon),
        ));
        assert_phase(&response, CombatPhase::Victory);
        assert_not_in_combat(&harness);
        assert_eq!(harness.state.player.experience, 50);
    }
}
