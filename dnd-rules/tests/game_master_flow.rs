//! End-to-end Game Master scenarios: AI proposals in, validated state out.

use dnd_rules::combat::PlayerAttack;
use dnd_rules::dm::{CombatTrigger, ParsedAIProposal, TriggeredEnemy};
use dnd_rules::encounter::{CombatAction, CombatPhase};
use dnd_rules::story::StoryEventKind;
use dnd_rules::testing::{
    assert_gold, assert_hp, assert_in_combat, assert_not_in_combat, assert_phase, TestHarness,
};
use dnd_rules::world::QuestStatus;
use serde_json::json;

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_full_ai_response_in_order() {
    setup();
    let proposal: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "The old hermit studies you from the doorway.",
        "npcDialogues": [
            {"npcName": "Hermit", "dialogue": "Few find this place.", "emotion": "wary"}
        ],
        "proposedCheck": {
            "checkType": "skill",
            "skill": "perception",
            "difficultyClass": 12,
            "description": "Spot the hidden cache"
        },
        "successOutcome": "Behind a loose stone you find a bundle.",
        "failureOutcome": "Nothing catches your eye.",
        "proposedRewards": [
            {"type": "experience", "experiencePoints": 50},
            {"type": "item", "itemName": "Silver Dagger +1", "quantity": 1}
        ],
        "actions": [
            {"type": "startQuest", "params": {"title": "The Hermit's Request", "objectives": ["Find the lost bell"]}}
        ],
        "sceneChange": {
            "newSceneName": "Hermit's Hollow",
            "newSceneDescription": "A mossy clearing around a crooked hut.",
            "transitionDescription": "You follow the hermit inside."
        },
        "suggestedActions": ["Ask about the bell", "Leave"],
        "playerChoices": ["Help the hermit", "Refuse"]
    }))
    .unwrap();

    // Perception: d20 15 + WIS 1 + proficiency 2 = 18 vs DC 12.
    let mut harness = TestHarness::new([15]);
    let response = harness.respond("I search the hut", &proposal);

    let kinds: Vec<StoryEventKind> = response.messages.iter().map(|m| m.kind).collect();
    assert_eq!(
        &kinds[..5],
        &[
            StoryEventKind::PlayerAction,
            StoryEventKind::Narration,
            StoryEventKind::Dialogue,
            StoryEventKind::SkillCheck,
            StoryEventKind::Narration,
        ]
    );
    assert_eq!(
        response.messages[4].content,
        "Behind a loose stone you find a bundle."
    );

    let check = response.skill_check.as_ref().unwrap();
    assert!(check.success());
    assert_eq!(check.roll.total, 18);

    let player = &harness.state.player;
    assert_eq!(player.experience, 50);
    assert!(player.inventory.has_item("Silver Dagger +1"));

    let quest = harness.state.quest("the-hermits-request").unwrap();
    assert_eq!(quest.status, QuestStatus::Active);
    assert_eq!(quest.objectives.len(), 1);

    assert_eq!(harness.state.location, "Hermit's Hollow");
    assert!(response.requires_player_choice);
    assert_eq!(response.player_choices.len(), 2);
    assert_eq!(response.suggested_actions.len(), 2);
    assert_eq!(
        harness.last_message(),
        Some("You arrive at Hermit's Hollow.")
    );
}

#[test]
fn test_rejected_actions_reported_not_fatal() {
    setup();
    let proposal: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "The shopkeeper frowns.",
        "actions": [
            {"type": "spendGold", "params": {"amount": 999}},
            {"type": "removeItem", "params": {"itemName": "Crown of Stars"}},
            {"type": "addGold", "params": {"amount": "lots"}},
            {"type": "changeLocation", "params": {"locationName": "Market Street"}}
        ]
    }))
    .unwrap();

    let mut harness = TestHarness::new([10]);
    let response = harness.respond("I try to haggle", &proposal);

    assert_gold(&harness, 15);
    assert_eq!(harness.state.location, "Market Street");
    let rejections = response
        .messages
        .iter()
        .filter(|m| m.content.contains("rejected"))
        .count();
    assert_eq!(rejections, 2);
}

#[test]
fn test_damage_and_healing_clamped() {
    setup();
    let mut harness = TestHarness::new([4]);

    let hurt: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "The ceiling collapses!",
        "actions": [{"type": "damage", "params": {"amount": 100, "damageType": "bludgeoning"}}]
    }))
    .unwrap();
    harness.respond("I pull the lever", &hurt);
    assert_hp(&harness, 0, 12);

    let healed: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "A cleric tends your wounds.",
        "actions": [{"type": "heal", "params": {"amount": "2d4+2"}}]
    }))
    .unwrap();
    harness.respond("", &healed);
    assert_hp(&harness, 10, 12);

    let more: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "More healing.",
        "actions": [{"type": "heal", "params": {"amount": 50}}]
    }))
    .unwrap();
    harness.respond("", &more);
    assert_hp(&harness, 12, 12);
}

#[test]
fn test_triggered_combat_to_victory() {
    setup();
    // Initiative 20 vs 1; natural 20 with the longsword, doubled dice roll 8s.
    let mut harness = TestHarness::new([20, 1, 20, 8, 8]);
    let proposal = ParsedAIProposal::narration("A goblin leaps from the brush!").with_combat(
        CombatTrigger::against(vec![TriggeredEnemy::new("Goblin")]),
    );

    let response = harness.respond("I walk the trail", &proposal);
    assert_in_combat(&harness);
    assert_phase(&response, CombatPhase::PlayerTurn);

    // A second trigger mid-fight changes nothing.
    let again = harness.respond("", &proposal);
    assert_eq!(
        again.updated_state.combat.as_ref().map(|c| c.id),
        response.updated_state.combat.as_ref().map(|c| c.id)
    );

    let goblin = harness.state.combat.as_ref().unwrap().enemies[0].id;
    let weapon = harness.state.player.weapon_profile();
    let response = harness.act(&CombatAction::Attack(PlayerAttack::with_weapon(
        goblin, &weapon,
    )));

    assert_phase(&response, CombatPhase::Victory);
    assert_not_in_combat(&harness);
    assert_eq!(harness.state.player.experience, 50);
    assert!(response
        .messages
        .iter()
        .any(|m| m.content.contains("Victory")));
}

#[test]
fn test_rewards_withheld_when_check_fails() {
    setup();
    let proposal: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "The guard considers your bribe.",
        "proposedCheck": {"checkType": "skill", "skill": "Persuasion", "difficultyClass": 15},
        "failureOutcome": "He pockets nothing and waves you off.",
        "proposedRewards": [{"type": "gold", "goldAmount": 30}]
    }))
    .unwrap();

    let mut harness = TestHarness::new([3]);
    let response = harness.respond("I offer a bribe", &proposal);

    assert!(!response.skill_check.unwrap().success());
    assert_gold(&harness, 15);
}

#[test]
fn test_combat_triggered_while_unconscious_is_a_defeat() {
    setup();
    let mut harness = TestHarness::new([20]);
    let proposal: ParsedAIProposal = serde_json::from_value(json!({
        "narration": "A rockslide, and then goblins!",
        "actions": [{"type": "damage", "params": {"amount": 100}}],
        "combatTrigger": {"enemies": [{"name": "Goblin"}]}
    }))
    .unwrap();

    let response = harness.respond("I climb the pass", &proposal);

    assert_hp(&harness, 0, 12);
    assert_not_in_combat(&harness);
    assert!(response
        .messages
        .iter()
        .any(|m| m.content.contains("Defeat")));
}
