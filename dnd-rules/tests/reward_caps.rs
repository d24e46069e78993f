//! Reward caps and business-rule rejections at the Game Master boundary.

use dnd_rules::actions::{GameAction, ProposedAction};
use dnd_rules::dice::Amount;
use dnd_rules::dm::{GameMaster, ProposedReward};
use dnd_rules::items::MAX_ENCHANTMENT;
use dnd_rules::testing::{assert_invalid, sample_fighter, sample_state, scripted_dice};
use dnd_rules::world::GameState;
use dnd_rules::RulesConfig;
use serde_json::json;

fn game_master() -> GameMaster {
    GameMaster::new(RulesConfig::default(), scripted_dice([10]))
}

#[test]
fn test_level_one_gold_reward_capped_at_75() {
    let state = sample_state();
    let before = state.player.inventory.gold;

    let result = game_master().process_rewards(&state, &[ProposedReward::gold(500)]);

    assert_eq!(result.state.player.inventory.gold, before + 75);
}

#[test]
fn test_gold_cap_scales_with_level() {
    for level in 1..=10u8 {
        let state = GameState::new(sample_fighter("Aria").with_level(level).with_gold(0));
        let cap = 50 + 25 * level as u32;

        let over = game_master().process_rewards(&state, &[ProposedReward::gold(10_000)]);
        assert_eq!(over.state.player.inventory.gold, cap, "level {level}");

        let under = game_master().process_rewards(&state, &[ProposedReward::gold(cap as i64 - 1)]);
        assert_eq!(under.state.player.inventory.gold, cap - 1, "level {level}");
    }
}

#[test]
fn test_xp_reward_capped_by_level() {
    // Level 5 with 6500 XP: cap is 100 + 5 * 50 = 350, well short of level 6.
    let player = sample_fighter("Aria").with_level(5).with_experience(6500);
    let state = GameState::new(player);

    let result = game_master().process_rewards(&state, &[ProposedReward::experience(1000)]);

    assert_eq!(result.state.player.experience, 6850);
    assert_eq!(result.state.player.level, 5);
}

#[test]
fn test_negative_rewards_rejected_and_state_unchanged() {
    let state = sample_state();

    let result = game_master().process_rewards(
        &state,
        &[ProposedReward::gold(-20), ProposedReward::experience(-5)],
    );

    assert_eq!(result.state, state);
    assert_eq!(result.events.len(), 2);
}

#[test]
fn test_spend_gold_beyond_purse_rejected() {
    let mut state = sample_state();
    state.player.inventory.gold = 10;
    let mut gm = game_master();
    let action = GameAction::SpendGold { amount: 50 };

    assert_invalid(&gm.validate(&action, &state));
    let result = gm.apply_action(&state, &action).unwrap();
    assert_eq!(result.state.player.inventory.gold, 10);

    let ok = gm
        .apply_action(&state, &GameAction::SpendGold { amount: 4 })
        .unwrap();
    assert_eq!(ok.state.player.inventory.gold, 6);
}

#[test]
fn test_hit_points_stay_in_bounds() {
    let mut gm = game_master();
    let state = sample_state();
    let max = state.player.hit_points.maximum;

    for amount in [0, 1, 5, 12, 13, 1000] {
        let hurt = gm
            .apply_action(
                &state,
                &GameAction::Damage {
                    amount: Amount::Flat(amount),
                    damage_type: None,
                },
            )
            .unwrap()
            .state;
        let hp = hurt.player.hit_points.current;
        assert!((0..=max).contains(&hp), "damage {amount} left {hp}");

        let healed = gm
            .apply_action(
                &hurt,
                &GameAction::Heal {
                    amount: Amount::Flat(amount),
                },
            )
            .unwrap()
            .state;
        let hp = healed.player.hit_points.current;
        assert!((0..=max).contains(&hp), "heal {amount} left {hp}");
    }
}

#[test]
fn test_reputation_reward_clamped() {
    let state = sample_state();
    let result = game_master().process_rewards(&state, &[ProposedReward::reputation(40)]);
    assert_eq!(result.state.reputation, 10);
}

#[test]
fn test_extreme_heal_and_damage_amounts_stay_in_bounds() {
    let amounts = [
        Amount::Flat(i64::MAX),
        Amount::Flat(i64::MIN),
        Amount::Flat(3_000_000_000),
        Amount::Flat(i32::MAX as i64 + 1),
        Amount::Dice("100d1000+1000".to_string()),
        Amount::Dice("1d1000-1000".to_string()),
        Amount::Dice("1d6+2147483647".to_string()),
        Amount::Dice("2d4000000000".to_string()),
        Amount::Dice("99999999999d6".to_string()),
    ];

    let mut gm = GameMaster::new(RulesConfig::default(), scripted_dice([1000]));
    for hp in [0, 5, 12] {
        let mut state = sample_state();
        state.player.hit_points.current = hp;
        let max = state.player.hit_points.maximum;

        for amount in &amounts {
            let heal = GameAction::Heal {
                amount: amount.clone(),
            };
            let healed = gm.apply_action(&state, &heal).unwrap().state;
            let current = healed.player.hit_points.current;
            assert!((0..=max).contains(&current), "heal {amount:?} from {hp} left {current}");

            let damage = GameAction::Damage {
                amount: amount.clone(),
                damage_type: None,
            };
            let hurt = gm.apply_action(&state, &damage).unwrap().state;
            let current = hurt.player.hit_points.current;
            assert!((0..=max).contains(&current), "damage {amount:?} from {hp} left {current}");
        }
    }
}

#[test]
fn test_out_of_range_notation_is_rejected_not_rolled() {
    let mut gm = game_master();
    let state = sample_state();

    for text in ["1d6+2147483647", "2d4000000000", "1d1001"] {
        let action = GameAction::Damage {
            amount: Amount::Dice(text.to_string()),
            damage_type: None,
        };
        assert_invalid(&gm.validate(&action, &state));
        let result = gm.apply_action(&state, &action).unwrap();
        assert_eq!(result.state, state, "{text}");
    }
}

#[test]
fn test_enchanted_item_names_are_bounded() {
    let names = [
        "Sword +2147483647",
        "Sword +99999999999999999999",
        "Sword +1000",
        "Sword +2",
    ];

    for name in names {
        let state = sample_state();
        let batch = [
            ProposedAction::new("addItem", json!({"itemName": name, "quantity": 1})),
            ProposedAction::new("equip", json!({"itemName": name})),
        ];
        let result = game_master().execute_actions(&state, &batch);

        let profile = result.state.player.weapon_profile();
        assert_eq!(profile.name, name);
        // Sample fighter has STR 16.
        assert!(profile.damage.modifier <= MAX_ENCHANTMENT + 3, "{name}");

        let mut dice = scripted_dice([6]);
        let damage = dice.roll_damage_notation(&profile.damage, true);
        assert!(damage.total <= 12 + MAX_ENCHANTMENT + 3, "{name}");
    }
}
