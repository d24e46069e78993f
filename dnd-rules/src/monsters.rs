//! Enemies and the bestiary used for AI-triggered encounters.

use crate::dice::DiceNotation;
use crate::world::{CharacterId, DamageType, HitPoints};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// One attack an enemy can make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterAction {
    pub name: String,
    pub damage: DiceNotation,
    pub damage_type: DamageType,
}

impl MonsterAction {
    pub fn new(name: impl Into<String>, damage: DiceNotation, damage_type: DamageType) -> Self {
        Self {
            name: name.into(),
            damage,
            damage_type,
        }
    }

    /// Fallback for enemies with no listed actions.
    pub fn unarmed() -> Self {
        Self::new("Strike", DiceNotation::new(1, 4, 0), DamageType::Bludgeoning)
    }
}

/// A combatant controlled by the rules layer. Alive iff current HP > 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enemy {
    pub id: CharacterId,
    pub name: String,
    /// Bestiary kind ("Goblin", "Wolf"), or free text for unknown creatures.
    pub kind: String,
    pub challenge_rating: f32,
    pub hit_points: HitPoints,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub dex_modifier: i32,
    pub actions: Vec<MonsterAction>,
}

impl Enemy {
    pub fn new(name: impl Into<String>, max_hp: i32, armor_class: i32) -> Self {
        let name = name.into();
        Self {
            id: CharacterId::new(),
            kind: name.clone(),
            name,
            challenge_rating: 0.0,
            hit_points: HitPoints::new(max_hp),
            armor_class,
            attack_bonus: 0,
            dex_modifier: 0,
            actions: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_challenge_rating(mut self, cr: f32) -> Self {
        self.challenge_rating = cr.max(0.0);
        self
    }

    pub fn with_attack_bonus(mut self, bonus: i32) -> Self {
        self.attack_bonus = bonus;
        self
    }

    pub fn with_dex_modifier(mut self, modifier: i32) -> Self {
        self.dex_modifier = modifier;
        self
    }

    pub fn with_action(mut self, action: MonsterAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_current_hp(mut self, current: i32) -> Self {
        self.hit_points.current = current.clamp(0, self.hit_points.maximum);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points.current > 0
    }

    /// The action used on this enemy's turn.
    pub fn primary_action(&self) -> MonsterAction {
        self.actions
            .first()
            .cloned()
            .unwrap_or_else(MonsterAction::unarmed)
    }

    pub fn experience_value(&self) -> u32 {
        experience_for_cr(self.challenge_rating)
    }

    /// Build an enemy for an AI-named creature.
    ///
    /// A bestiary match on `kind` (or on `name` when no kind is given) uses
    /// the bestiary stat block. Anything else gets generic stats for `cr`,
    /// defaulting to CR 1/4.
    pub fn from_template(name: &str, kind: Option<&str>, cr: Option<f32>) -> Enemy {
        let lookup = kind.unwrap_or(name);
        if let Some(template) = find_template(lookup) {
            let mut enemy = template.clone();
            enemy.id = CharacterId::new();
            enemy.name = name.to_string();
            return enemy;
        }

        let cr = cr.unwrap_or(0.25).clamp(0.0, 30.0);
        let stats = generic_stats(cr);
        Enemy::new(name, stats.hit_points, stats.armor_class)
            .with_kind(kind.unwrap_or(name))
            .with_challenge_rating(cr)
            .with_attack_bonus(stats.attack_bonus)
            .with_action(MonsterAction::new(
                "Attack",
                stats.damage,
                DamageType::Bludgeoning,
            ))
    }
}

/// Look up a bestiary stat block by kind (case-insensitive).
pub fn find_template(kind: &str) -> Option<&'static Enemy> {
    let kind = kind.trim();
    BESTIARY.iter().find(|e| e.kind.eq_ignore_ascii_case(kind))
}

struct GenericStats {
    hit_points: i32,
    armor_class: i32,
    attack_bonus: i32,
    damage: DiceNotation,
}

/// Rough per-CR stat block for creatures outside the bestiary.
fn generic_stats(cr: f32) -> GenericStats {
    let (hit_points, armor_class, attack_bonus, damage) = if cr < 0.125 {
        (4, 12, 2, DiceNotation::new(1, 4, 0))
    } else if cr < 0.25 {
        (9, 12, 3, DiceNotation::new(1, 6, 1))
    } else if cr < 0.5 {
        (13, 13, 4, DiceNotation::new(1, 6, 2))
    } else if cr < 1.0 {
        (22, 13, 4, DiceNotation::new(1, 8, 2))
    } else if cr < 2.0 {
        (33, 13, 4, DiceNotation::new(2, 6, 2))
    } else if cr < 3.0 {
        (45, 13, 4, DiceNotation::new(2, 8, 2))
    } else if cr < 4.0 {
        (60, 13, 5, DiceNotation::new(2, 10, 3))
    } else if cr < 5.0 {
        (75, 14, 5, DiceNotation::new(2, 12, 3))
    } else {
        let steps = (cr as i32) - 5;
        (
            15 * cr as i32 + 20,
            (15 + steps / 3).min(19),
            6 + steps / 4,
            DiceNotation::new(3, 10, 4 + steps),
        )
    };
    GenericStats {
        hit_points,
        armor_class,
        attack_bonus,
        damage,
    }
}

/// Experience awarded for defeating a creature of challenge rating `cr`.
pub fn experience_for_cr(cr: f32) -> u32 {
    if cr <= 0.0 {
        return 10;
    }
    if cr < 0.25 {
        return 25;
    }
    if cr < 0.5 {
        return 50;
    }
    if cr < 1.0 {
        return 100;
    }
    const TABLE: [u32; 30] = [
        200, 450, 700, 1100, 1800, 2300, 2900, 3900, 5000, 5900, 7200, 8400, 10000, 11500, 13000,
        15000, 18000, 20000, 22000, 25000, 33000, 41000, 50000, 62000, 75000, 90000, 105000,
        120000, 135000, 155000,
    ];
    let index = (cr.floor() as usize).clamp(1, 30) - 1;
    TABLE[index]
}

fn stat_block(
    kind: &str,
    cr: f32,
    hp: i32,
    ac: i32,
    attack_bonus: i32,
    dex_modifier: i32,
    action: (&str, u32, u32, i32, DamageType),
) -> Enemy {
    let (name, count, sides, modifier, damage_type) = action;
    Enemy::new(kind, hp, ac)
        .with_challenge_rating(cr)
        .with_attack_bonus(attack_bonus)
        .with_dex_modifier(dex_modifier)
        .with_action(MonsterAction::new(
            name,
            DiceNotation::new(count, sides, modifier),
            damage_type,
        ))
}

lazy_static! {
    /// Common low-level creatures.
    pub static ref BESTIARY: Vec<Enemy> = vec![
        stat_block("Giant Rat", 0.125, 7, 12, 4, 2, ("Bite", 1, 4, 2, DamageType::Piercing)),
        stat_block("Kobold", 0.125, 5, 12, 4, 2, ("Dagger", 1, 4, 2, DamageType::Piercing)),
        stat_block("Bandit", 0.125, 11, 12, 3, 1, ("Scimitar", 1, 6, 1, DamageType::Slashing)),
        stat_block("Goblin", 0.25, 7, 15, 4, 2, ("Scimitar", 1, 6, 2, DamageType::Slashing)),
        stat_block("Wolf", 0.25, 11, 13, 4, 2, ("Bite", 2, 4, 2, DamageType::Piercing)),
        stat_block("Skeleton", 0.25, 13, 13, 4, 2, ("Shortsword", 1, 6, 2, DamageType::Piercing)),
        stat_block("Zombie", 0.25, 22, 8, 3, -2, ("Slam", 1, 6, 1, DamageType::Bludgeoning)),
        stat_block("Orc", 0.5, 15, 13, 5, 1, ("Greataxe", 1, 12, 3, DamageType::Slashing)),
        stat_block("Bugbear", 1.0, 27, 16, 4, 2, ("Morningstar", 2, 8, 2, DamageType::Piercing)),
        stat_block("Ogre", 2.0, 59, 11, 6, -1, ("Greatclub", 2, 8, 4, DamageType::Bludgeoning)),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_for_cr() {
        assert_eq!(experience_for_cr(0.0), 10);
        assert_eq!(experience_for_cr(0.125), 25);
        assert_eq!(experience_for_cr(0.25), 50);
        assert_eq!(experience_for_cr(0.5), 100);
        assert_eq!(experience_for_cr(1.0), 200);
        assert_eq!(experience_for_cr(5.0), 1800);
        assert_eq!(experience_for_cr(30.0), 155000);
        assert_eq!(experience_for_cr(99.0), 155000);
    }

    #[test]
    fn test_from_template_uses_bestiary() {
        let goblin = Enemy::from_template("Snik", Some("goblin"), None);
        assert_eq!(goblin.name, "Snik");
        assert_eq!(goblin.kind, "Goblin");
        assert_eq!(goblin.armor_class, 15);
        assert_eq!(goblin.experience_value(), 50);

        let other = Enemy::from_template("Goblin", None, None);
        assert_ne!(goblin.id, other.id);
    }

    #[test]
    fn test_from_template_scales_unknown_by_cr() {
        let weak = Enemy::from_template("Shadow Thing", None, Some(0.5));
        let strong = Enemy::from_template("Shadow Thing", None, Some(3.0));
        assert!(strong.hit_points.maximum > weak.hit_points.maximum);
        assert!(strong.attack_bonus >= weak.attack_bonus);
        assert_eq!(strong.experience_value(), 700);
    }

    #[test]
    fn test_primary_action_falls_back_to_unarmed() {
        let blob = Enemy::new("Blob", 5, 8);
        assert_eq!(blob.primary_action().name, "Strike");
        assert!(blob.is_alive());
        assert!(!blob.with_current_hp(0).is_alive());
    }
}
