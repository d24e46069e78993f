//! Single-exchange combat resolution.
//!
//! These are the primitives an encounter is built from: initiative, one
//! attack in either direction, healing, and experience. Every function takes
//! its inputs by reference and returns updated copies alongside a result
//! record, leaving the caller's values untouched.

use crate::config::{HpGrowth, RulesConfig};
use crate::dice::{Advantage, Amount, AttackRoll, D20Roll, DamageRoll, DiceEngine, DiceError, DiceNotation};
use crate::monsters::{Enemy, MonsterAction};
use crate::world::{Ability, Character, CharacterId, DamageType, WeaponProfile};
use serde::{Deserialize, Serialize};

/// Experience needed to reach each level, indexed by `level - 1`.
pub const XP_THRESHOLDS: [u32; 20] = [
    0, 300, 900, 2700, 6500, 14000, 23000, 34000, 48000, 64000, 85000, 100000, 120000, 140000,
    165000, 195000, 225000, 265000, 305000, 355000,
];

/// Level a character with `experience` XP should be.
pub fn level_for_experience(experience: u32) -> u8 {
    XP_THRESHOLDS
        .iter()
        .rposition(|&threshold| experience >= threshold)
        .map(|idx| (idx + 1) as u8)
        .unwrap_or(1)
}

/// One slot in the turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntry {
    pub actor_id: CharacterId,
    pub actor_name: String,
    pub initiative_score: i32,
    pub is_player: bool,
    pub dex_modifier: i32,
    pub roll: D20Roll,
}

/// A player attack against one enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAttack {
    pub target_id: CharacterId,
    pub weapon_name: String,
    pub attack_bonus: i32,
    pub damage: DiceNotation,
    pub damage_type: DamageType,
    #[serde(default)]
    pub advantage: Advantage,
}

impl PlayerAttack {
    pub fn new(target_id: CharacterId, attack_bonus: i32, damage: DiceNotation) -> Self {
        Self {
            target_id,
            weapon_name: "Attack".to_string(),
            attack_bonus,
            damage,
            damage_type: DamageType::Bludgeoning,
            advantage: Advantage::Normal,
        }
    }

    /// Attack with the player's current weapon profile.
    pub fn with_weapon(target_id: CharacterId, weapon: &WeaponProfile) -> Self {
        Self {
            target_id,
            weapon_name: weapon.name.clone(),
            attack_bonus: weapon.attack_bonus,
            damage: weapon.damage,
            damage_type: weapon.damage_type,
            advantage: Advantage::Normal,
        }
    }

    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    pub fn with_advantage(mut self, advantage: Advantage) -> Self {
        self.advantage = advantage;
        self
    }
}

/// Everything rolled in one attack, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResult {
    pub attacker_name: String,
    pub target_name: String,
    pub action_name: String,
    pub attack: AttackRoll,
    /// Present only on a hit.
    pub damage: Option<DamageRoll>,
    pub damage_type: DamageType,
    pub target_hp_before: i32,
    pub target_hp_after: i32,
    pub target_killed: bool,
    pub player_knocked: bool,
    pub description: String,
}

impl CombatResult {
    pub fn damage_dealt(&self) -> i32 {
        self.damage.as_ref().map(|d| d.total).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingResult {
    pub rolled: i32,
    /// Actually restored; less than `rolled` when near maximum.
    pub healed: i32,
    pub hp_before: i32,
    pub hp_after: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpOutcome {
    pub experience_gained: u32,
    pub new_total: u32,
    pub old_level: u8,
    pub new_level: u8,
    /// Maximum HP gained across all levels.
    pub hp_increase: i32,
}

impl LevelUpOutcome {
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

/// Resolves individual combat exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatEngine {
    hp_growth: HpGrowth,
    max_level: u8,
}

impl Default for CombatEngine {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

impl CombatEngine {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            hp_growth: config.hp_growth,
            max_level: config.max_level.clamp(1, 20),
        }
    }

    /// Roll d20 + DEX for every actor and sort into turn order.
    ///
    /// Ties go to the higher DEX modifier, then the player, then the
    /// order actors were listed in.
    pub fn roll_initiative(
        &self,
        dice: &mut DiceEngine,
        player: &Character,
        enemies: &[Enemy],
        player_advantage: Advantage,
    ) -> Vec<InitiativeEntry> {
        let mut order = Vec::with_capacity(enemies.len() + 1);

        let dex = player.initiative_modifier();
        let roll = dice.roll_d20(player_advantage);
        order.push(InitiativeEntry {
            actor_id: player.id,
            actor_name: player.name.clone(),
            initiative_score: roll.result as i32 + dex,
            is_player: true,
            dex_modifier: dex,
            roll,
        });

        for enemy in enemies {
            let roll = dice.roll_d20(Advantage::Normal);
            order.push(InitiativeEntry {
                actor_id: enemy.id,
                actor_name: enemy.name.clone(),
                initiative_score: roll.result as i32 + enemy.dex_modifier,
                is_player: false,
                dex_modifier: enemy.dex_modifier,
                roll,
            });
        }

        order.sort_by(|a, b| {
            b.initiative_score
                .cmp(&a.initiative_score)
                .then(b.dex_modifier.cmp(&a.dex_modifier))
                .then(b.is_player.cmp(&a.is_player))
        });

        tracing::debug!(
            order = ?order.iter().map(|e| (&e.actor_name, e.initiative_score)).collect::<Vec<_>>(),
            "initiative rolled"
        );
        order
    }

    /// Attack roll, then damage only on a hit. Returns the updated target.
    pub fn player_attack(
        &self,
        dice: &mut DiceEngine,
        player: &Character,
        target: &Enemy,
        attack: &PlayerAttack,
    ) -> (CombatResult, Enemy) {
        let mut target = target.clone();
        let roll = dice.roll_attack(attack.attack_bonus, target.armor_class, attack.advantage);
        let hp_before = target.hit_points.current;

        let damage = roll
            .is_hit
            .then(|| dice.roll_damage_notation(&attack.damage, roll.is_critical_hit));
        if let Some(damage) = &damage {
            target.hit_points.take_damage(damage.total);
        }

        let hp_after = target.hit_points.current;
        let target_killed = hp_before > 0 && hp_after == 0;
        let description = describe_attack(
            &player.name,
            &target.name,
            &attack.weapon_name,
            &roll,
            damage.as_ref(),
            attack.damage_type,
            if target_killed {
                Some(format!("{} falls!", target.name))
            } else {
                None
            },
        );

        let result = CombatResult {
            attacker_name: player.name.clone(),
            target_name: target.name.clone(),
            action_name: attack.weapon_name.clone(),
            attack: roll,
            damage,
            damage_type: attack.damage_type,
            target_hp_before: hp_before,
            target_hp_after: hp_after,
            target_killed,
            player_knocked: false,
            description,
        };
        (result, target)
    }

    /// An enemy attacks the player. Temporary HP absorbs damage first.
    pub fn monster_attack(
        &self,
        dice: &mut DiceEngine,
        attacker: &Enemy,
        player: &Character,
        action: &MonsterAction,
        advantage: Advantage,
    ) -> (CombatResult, Character) {
        let mut player = player.clone();
        let roll = dice.roll_attack(attacker.attack_bonus, player.armor_class, advantage);
        let hp_before = player.hit_points.current;

        let damage = roll
            .is_hit
            .then(|| dice.roll_damage_notation(&action.damage, roll.is_critical_hit));
        if let Some(damage) = &damage {
            player.hit_points.take_damage(damage.total);
        }

        let hp_after = player.hit_points.current;
        let player_knocked = roll.is_hit && hp_after == 0;
        let description = describe_attack(
            &attacker.name,
            &player.name,
            &action.name,
            &roll,
            damage.as_ref(),
            action.damage_type,
            if player_knocked {
                Some(format!("{} collapses, unconscious!", player.name))
            } else {
                None
            },
        );

        let result = CombatResult {
            attacker_name: attacker.name.clone(),
            target_name: player.name.clone(),
            action_name: action.name.clone(),
            attack: roll,
            damage,
            damage_type: action.damage_type,
            target_hp_before: hp_before,
            target_hp_after: hp_after,
            target_killed: player_knocked,
            player_knocked,
            description,
        };
        (result, player)
    }

    /// Roll (or take) a healing amount and apply it, clamped to maximum HP.
    pub fn apply_healing(
        &self,
        dice: &mut DiceEngine,
        target: &Character,
        healing: &Amount,
    ) -> Result<(HealingResult, Character), DiceError> {
        let rolled = dice.roll_amount(healing)?.clamp(0, i32::MAX as i64) as i32;
        let mut target = target.clone();
        let hp_before = target.hit_points.current;
        let healed = target.hit_points.heal(rolled);
        let result = HealingResult {
            rolled,
            healed,
            hp_before,
            hp_after: target.hit_points.current,
        };
        Ok((result, target))
    }

    /// Add experience and apply every level-up it earns.
    ///
    /// Thresholds are rechecked after each level, so one large award can
    /// grant several levels. Each level adds HP and one hit die.
    pub fn check_level_up(
        &self,
        dice: &mut DiceEngine,
        character: &Character,
        xp_gained: u32,
    ) -> (LevelUpOutcome, Character) {
        let mut character = character.clone();
        let old_level = character.level;
        character.experience = character.experience.saturating_add(xp_gained);

        let mut hp_increase = 0;
        while character.level < self.max_level
            && character.experience >= XP_THRESHOLDS[character.level as usize]
        {
            character.level += 1;
            let gain = self.hp_gain(dice, &character);
            character.hit_points.maximum += gain;
            character.hit_points.current += gain;
            character.hit_dice_remaining = (character.hit_dice_remaining + 1).min(character.level);
            hp_increase += gain;

            tracing::info!(
                name = %character.name,
                level = character.level,
                hp_gain = gain,
                "level up"
            );
        }

        let outcome = LevelUpOutcome {
            experience_gained: xp_gained,
            new_total: character.experience,
            old_level,
            new_level: character.level,
            hp_increase,
        };
        (outcome, character)
    }

    fn hp_gain(&self, dice: &mut DiceEngine, character: &Character) -> i32 {
        let sides = character.class.hit_die();
        let con = character.ability_modifier(Ability::Constitution);
        let base = match self.hp_growth {
            HpGrowth::Average => (sides / 2 + 1) as i32,
            HpGrowth::Rolled => dice.roll_die(sides) as i32,
        };
        (base + con).max(1)
    }

    /// Sum the XP value of every defeated enemy.
    pub fn calculate_experience_reward(&self, enemies: &[Enemy]) -> u32 {
        enemies
            .iter()
            .filter(|e| !e.is_alive())
            .map(Enemy::experience_value)
            .sum()
    }
}

fn describe_attack(
    attacker: &str,
    target: &str,
    action: &str,
    roll: &AttackRoll,
    damage: Option<&DamageRoll>,
    damage_type: DamageType,
    aftermath: Option<String>,
) -> String {
    let mut text = match damage {
        Some(damage) if roll.is_critical_hit => format!(
            "{attacker} lands a critical hit on {target} with {action} for {} {damage_type} damage!",
            damage.total
        ),
        Some(damage) => format!(
            "{attacker} hits {target} with {action} ({} vs AC {}) for {} {damage_type} damage.",
            roll.total, roll.target_ac, damage.total
        ),
        None if roll.is_critical_miss => {
            format!("{attacker} swings wildly at {target} and misses completely.")
        }
        None => format!(
            "{attacker} misses {target} with {action} ({} vs AC {}).",
            roll.total, roll.target_ac
        ),
    };
    if let Some(aftermath) = aftermath {
        text.push(' ');
        text.push_str(&aftermath);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_fighter, scripted_dice, training_dummy};
    use crate::world::CharacterClass;

    #[test]
    fn test_level_for_experience() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(299), 1);
        assert_eq!(level_for_experience(300), 2);
        assert_eq!(level_for_experience(1_000_000), 20);
    }

    #[test]
    fn test_initiative_sorted_descending() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria");
        let enemies = vec![training_dummy("Slow", 5, 10), training_dummy("Fast", 5, 10)];
        let mut dice = scripted_dice([8, 3, 17]);

        let order = engine.roll_initiative(&mut dice, &fighter, &enemies, Advantage::Normal);
        let names: Vec<&str> = order.iter().map(|e| e.actor_name.as_str()).collect();
        assert_eq!(names, vec!["Fast", "Aria", "Slow"]);
        assert_eq!(order[1].initiative_score, 10);
    }

    #[test]
    fn test_initiative_ties_prefer_dex_then_player() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria");
        let enemies = vec![
            training_dummy("Same Dex", 5, 10).with_dex_modifier(2),
            training_dummy("Quick", 5, 10).with_dex_modifier(4),
        ];
        // Aria 10+2, Same Dex 10+2, Quick 8+4
        let mut dice = scripted_dice([10, 10, 8]);

        let order = engine.roll_initiative(&mut dice, &fighter, &enemies, Advantage::Normal);
        let names: Vec<&str> = order.iter().map(|e| e.actor_name.as_str()).collect();
        assert_eq!(names, vec!["Quick", "Aria", "Same Dex"]);
    }

    #[test]
    fn test_player_attack_miss_rolls_no_damage() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria");
        let dummy = training_dummy("Dummy", 10, 15);
        let mut dice = scripted_dice([5]);

        let attack = PlayerAttack::new(dummy.id, 5, DiceNotation::new(1, 8, 3));
        let (result, dummy) = engine.player_attack(&mut dice, &fighter, &dummy, &attack);
        assert!(!result.attack.is_hit);
        assert!(result.damage.is_none());
        assert_eq!(dummy.hit_points.current, 10);
        assert_eq!(dice.rolls_made(), 1);
    }

    #[test]
    fn test_player_attack_kills_and_clamps() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria");
        let dummy = training_dummy("Dummy", 3, 10);
        let mut dice = scripted_dice([20, 8, 8]);

        let attack = PlayerAttack::new(dummy.id, 5, DiceNotation::new(1, 8, 3));
        let (result, dummy) = engine.player_attack(&mut dice, &fighter, &dummy, &attack);
        assert!(result.attack.is_critical_hit);
        assert_eq!(result.damage_dealt(), 19);
        assert_eq!(dummy.hit_points.current, 0);
        assert!(result.target_killed);
    }

    #[test]
    fn test_monster_attack_hits_temp_hp_first() {
        let engine = CombatEngine::default();
        let mut fighter = sample_fighter("Aria");
        fighter.hit_points.add_temp_hp(3);
        let goblin = training_dummy("Goblin", 7, 12).with_attack_bonus(4);
        let action = goblin.primary_action();
        let mut dice = scripted_dice([15, 4]);

        let (result, fighter) =
            engine.monster_attack(&mut dice, &goblin, &fighter, &action, Advantage::Normal);
        assert!(result.attack.is_hit);
        assert_eq!(result.damage_dealt(), 4);
        assert_eq!(fighter.hit_points.temporary, 0);
        assert_eq!(fighter.hit_points.current, 11);
        assert!(!result.player_knocked);
    }

    #[test]
    fn test_monster_attack_knocks_out_player() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria").with_current_hp(2);
        let ogre = training_dummy("Ogre", 50, 11).with_attack_bonus(6);
        let action = ogre.primary_action();
        let mut dice = scripted_dice([18, 4]);

        let (result, fighter) =
            engine.monster_attack(&mut dice, &ogre, &fighter, &action, Advantage::Normal);
        assert!(result.player_knocked);
        assert_eq!(fighter.hit_points.current, 0);
    }

    #[test]
    fn test_monster_hit_on_downed_player_still_knocks() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria").with_current_hp(0);
        let goblin = training_dummy("Goblin", 7, 12);
        let action = goblin.primary_action();
        let mut dice = scripted_dice([20, 3]);

        let (result, fighter) =
            engine.monster_attack(&mut dice, &goblin, &fighter, &action, Advantage::Normal);
        assert!(result.player_knocked);
        assert_eq!(fighter.hit_points.current, 0);
    }

    #[test]
    fn test_apply_healing_clamps_to_max() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria").with_current_hp(10);
        let mut dice = scripted_dice([4, 4]);

        let (result, fighter) = engine
            .apply_healing(&mut dice, &fighter, &Amount::Dice("2d4+2".to_string()))
            .unwrap();
        assert_eq!(result.rolled, 10);
        assert_eq!(result.healed, 2);
        assert_eq!(fighter.hit_points.current, 12);

        assert!(engine
            .apply_healing(&mut dice, &fighter, &Amount::Dice("lots".to_string()))
            .is_err());
    }

    #[test]
    fn test_level_up_average_hp() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria");
        let mut dice = DiceEngine::seeded(1);

        let (outcome, fighter) = engine.check_level_up(&mut dice, &fighter, 300);
        assert!(outcome.leveled_up());
        assert_eq!(outcome.new_level, 2);
        // d10 average 6 + CON 2
        assert_eq!(outcome.hp_increase, 8);
        assert_eq!(fighter.hit_points.maximum, 20);
        assert_eq!(fighter.hit_dice_remaining, 2);
        assert_eq!(dice.rolls_made(), 0);
    }

    #[test]
    fn test_level_up_compounds_across_thresholds() {
        let engine = CombatEngine::default();
        let fighter = sample_fighter("Aria");
        let mut dice = DiceEngine::seeded(1);

        let (outcome, fighter) = engine.check_level_up(&mut dice, &fighter, 1000);
        assert_eq!(outcome.new_level, 3);
        assert_eq!(outcome.hp_increase, 16);
        assert_eq!(fighter.experience, 1000);
    }

    #[test]
    fn test_level_up_respects_max_level() {
        let engine = CombatEngine::new(&RulesConfig::default().with_max_level(2));
        let wizard = Character::new("Mage", CharacterClass::Wizard);
        let mut dice = DiceEngine::seeded(1);
        let (outcome, _) = engine.check_level_up(&mut dice, &wizard, 100_000);
        assert_eq!(outcome.new_level, 2);
    }

    #[test]
    fn test_level_up_rolled_hp_minimum_one() {
        let engine = CombatEngine::new(&RulesConfig::default().with_hp_growth(HpGrowth::Rolled));
        let frail = Character::new("Frail", CharacterClass::Wizard)
            .with_ability_scores(crate::world::AbilityScores::new(10, 10, 3, 10, 10, 10));
        let mut dice = scripted_dice([1]);
        let (outcome, _) = engine.check_level_up(&mut dice, &frail, 300);
        assert_eq!(outcome.hp_increase, 1);
    }

    #[test]
    fn test_experience_reward_counts_only_defeated() {
        let engine = CombatEngine::default();
        let enemies = vec![
            Enemy::from_template("Goblin", None, None).with_current_hp(0),
            Enemy::from_template("Goblin", None, None),
            Enemy::from_template("Orc", None, None).with_current_hp(0),
        ];
        assert_eq!(engine.calculate_experience_reward(&enemies), 150);
    }
}
