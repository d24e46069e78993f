//! D&D dice rolling system.
//!
//! Supports standard dice notation (`XdY+Z`), d20 checks with
//! advantage/disadvantage, attack rolls with critical rules, damage rolls
//! with critical dice doubling, and ability score generation.
//!
//! Every die face comes from a single [`DieRoller`] owned by the
//! [`DiceEngine`], so a session seeded with the same value replays the
//! same rolls.

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on the dice count of a single notation.
pub const MAX_DICE: u32 = 100;
/// Largest die a notation may name.
pub const MAX_SIDES: u32 = 1000;
/// Largest flat modifier, in either direction, a notation may carry.
pub const MAX_MODIFIER: i32 = 1000;

lazy_static! {
    static ref NOTATION_RE: Regex =
        Regex::new(r"^(\d+)d(\d+)(?:([+-])(\d+))?$").expect("dice notation regex is valid");
}

/// Error type for dice parsing and rolling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("Too many dice: {count} (max {max})")]
    TooManyDice { count: u32, max: u32 },
}

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }

    /// Build from a pair of flags. Both set cancel out to a single plain roll.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Advantage {
        match (advantage, disadvantage) {
            (true, false) => Advantage::Advantage,
            (false, true) => Advantage::Disadvantage,
            _ => Advantage::Normal,
        }
    }
}

// ============================================================================
// Randomness
// ============================================================================

/// Source of individual die faces.
pub trait DieRoller: Send {
    /// Roll one die with `sides` faces. Must return a value in `1..=sides`.
    fn roll(&mut self, sides: u32) -> u32;
}

/// A [`DieRoller`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomRoller<R = StdRng> {
    rng: R,
}

impl<R> RandomRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomRoller<StdRng> {
    /// Deterministic roller for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> DieRoller for RandomRoller<R> {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

// ============================================================================
// Notation
// ============================================================================

/// A parsed `XdY+Z` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceNotation {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceNotation {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Parse `\d+d\d+([+-]\d+)?`, case-insensitive, ignoring whitespace.
    pub fn parse(text: &str) -> Result<Self, DiceError> {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let caps = NOTATION_RE
            .captures(&cleaned)
            .ok_or_else(|| DiceError::InvalidNotation(text.to_string()))?;

        let count: u32 = caps[1]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(text.to_string()))?;
        let sides: u32 = caps[2]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(text.to_string()))?;

        if count == 0 {
            return Err(DiceError::InvalidNotation(text.to_string()));
        }
        if sides == 0 || sides > MAX_SIDES {
            return Err(DiceError::InvalidDieSize(sides));
        }
        if count > MAX_DICE {
            return Err(DiceError::TooManyDice {
                count,
                max: MAX_DICE,
            });
        }

        let modifier = match (caps.get(3), caps.get(4)) {
            (Some(sign), Some(value)) => {
                let value: i32 = value
                    .as_str()
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(text.to_string()))?;
                if value > MAX_MODIFIER {
                    return Err(DiceError::InvalidNotation(text.to_string()));
                }
                if sign.as_str() == "-" {
                    -value
                } else {
                    value
                }
            }
            _ => 0,
        };

        Ok(Self::new(count, sides, modifier))
    }

    /// Same expression with the dice count doubled (critical hits).
    /// The flat modifier is left alone.
    pub fn doubled_dice(&self) -> Self {
        Self {
            count: self.count.saturating_mul(2),
            ..*self
        }
    }
}

impl FromStr for DiceNotation {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceNotation::parse(s)
    }
}

impl TryFrom<String> for DiceNotation {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DiceNotation::parse(&value)
    }
}

impl From<DiceNotation> for String {
    fn from(value: DiceNotation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            0 => write!(f, "{}d{}", self.count, self.sides),
            m if m > 0 => write!(f, "{}d{}+{}", self.count, self.sides, m),
            m => write!(f, "{}d{}-{}", self.count, self.sides, m.abs()),
        }
    }
}

/// A heal/damage amount as proposed by the AI: a flat number or dice notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Flat(i64),
    Dice(String),
}

impl Amount {
    pub fn parse(text: &str) -> Amount {
        match text.trim().parse::<i64>() {
            Ok(value) => Amount::Flat(value),
            Err(_) => Amount::Dice(text.trim().to_string()),
        }
    }

    /// Flat value, including numeric strings like `"7"`.
    pub fn as_flat(&self) -> Option<i64> {
        match self {
            Amount::Flat(value) => Some(*value),
            Amount::Dice(text) => text.trim().parse().ok(),
        }
    }

    /// Check the amount can be rolled without rolling it.
    pub fn validate(&self) -> Result<(), DiceError> {
        if self.as_flat().is_some() {
            return Ok(());
        }
        match self {
            Amount::Dice(text) => DiceNotation::parse(text).map(|_| ()),
            Amount::Flat(_) => Ok(()),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Flat(value) => write!(f, "{value}"),
            Amount::Dice(text) => write!(f, "{text}"),
        }
    }
}

// ============================================================================
// Roll results
// ============================================================================

/// Result of rolling several identical dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRoll {
    pub rolls: Vec<u32>,
    pub total: i32,
}

/// A d20 roll, possibly with a second die for advantage/disadvantage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct D20Roll {
    /// The face that counts.
    pub result: u32,
    pub roll1: u32,
    pub roll2: Option<u32>,
    pub advantage: Advantage,
}

impl D20Roll {
    pub fn is_natural_20(&self) -> bool {
        self.result == 20
    }

    pub fn is_natural_1(&self) -> bool {
        self.result == 1
    }

    pub fn faces(&self) -> Vec<u32> {
        match self.roll2 {
            Some(second) => vec![self.roll1, second],
            None => vec![self.roll1],
        }
    }
}

/// Result of rolling a notation string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotationRoll {
    pub notation: DiceNotation,
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
}

/// Result of an attack roll against an armor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRoll {
    pub d20: D20Roll,
    pub attack_bonus: i32,
    pub total: i32,
    pub target_ac: i32,
    pub is_hit: bool,
    pub is_critical_hit: bool,
    pub is_critical_miss: bool,
}

/// Result of a damage roll. Never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageRoll {
    /// The notation actually rolled (dice already doubled on a critical).
    pub notation: DiceNotation,
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    pub is_critical: bool,
}

/// Result of a d20 + modifier check against a DC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRoll {
    pub d20: D20Roll,
    pub modifier: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
    pub critical_success: bool,
    pub critical_failure: bool,
}

/// One ability score rolled as 4d6, drop lowest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScoreRoll {
    /// All four dice, highest first.
    pub rolls: Vec<u32>,
    pub kept: Vec<u32>,
    pub dropped: u32,
    pub total: u32,
}

// ============================================================================
// Engine
// ============================================================================

/// All dice mechanics, drawing from one injected [`DieRoller`].
pub struct DiceEngine {
    roller: Box<dyn DieRoller>,
    rolls_made: u64,
}

impl DiceEngine {
    pub fn new(roller: impl DieRoller + 'static) -> Self {
        Self {
            roller: Box::new(roller),
            rolls_made: 0,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(RandomRoller::seeded(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(RandomRoller::from_entropy())
    }

    /// Number of individual dice rolled so far.
    pub fn rolls_made(&self) -> u64 {
        self.rolls_made
    }

    /// Roll one die, uniformly in `1..=sides`.
    pub fn roll_die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        let face = self.roller.roll(sides).clamp(1, sides);
        self.rolls_made += 1;
        tracing::trace!(sides, face, "die rolled");
        face
    }

    pub fn roll_dice(&mut self, count: u32, sides: u32) -> DiceRoll {
        let rolls: Vec<u32> = (0..count).map(|_| self.roll_die(sides)).collect();
        let total = rolls.iter().map(|&face| i64::from(face)).sum::<i64>();
        let total = i32::try_from(total).unwrap_or(i32::MAX);
        DiceRoll { rolls, total }
    }

    /// Roll a d20 honoring advantage (keep higher) or disadvantage (keep lower).
    pub fn roll_d20(&mut self, advantage: Advantage) -> D20Roll {
        let roll1 = self.roll_die(20);
        match advantage {
            Advantage::Normal => D20Roll {
                result: roll1,
                roll1,
                roll2: None,
                advantage,
            },
            Advantage::Advantage | Advantage::Disadvantage => {
                let roll2 = self.roll_die(20);
                let result = if advantage == Advantage::Advantage {
                    roll1.max(roll2)
                } else {
                    roll1.min(roll2)
                };
                D20Roll {
                    result,
                    roll1,
                    roll2: Some(roll2),
                    advantage,
                }
            }
        }
    }

    pub fn roll_d20_with_advantage(&mut self) -> D20Roll {
        self.roll_d20(Advantage::Advantage)
    }

    pub fn roll_d20_with_disadvantage(&mut self) -> D20Roll {
        self.roll_d20(Advantage::Disadvantage)
    }

    /// d20 check from raw flags; both flags set is a single plain roll.
    pub fn roll_d20_check(&mut self, advantage: bool, disadvantage: bool) -> D20Roll {
        self.roll_d20(Advantage::from_flags(advantage, disadvantage))
    }

    pub fn roll(&mut self, notation: &DiceNotation) -> NotationRoll {
        let dice = self.roll_dice(notation.count, notation.sides);
        NotationRoll {
            notation: *notation,
            total: dice.total.saturating_add(notation.modifier),
            rolls: dice.rolls,
            modifier: notation.modifier,
        }
    }

    pub fn roll_notation(&mut self, text: &str) -> Result<NotationRoll, DiceError> {
        let notation = DiceNotation::parse(text)?;
        Ok(self.roll(&notation))
    }

    /// Roll a flat-or-dice amount. Flat values are returned without rolling.
    pub fn roll_amount(&mut self, amount: &Amount) -> Result<i64, DiceError> {
        if let Some(flat) = amount.as_flat() {
            return Ok(flat);
        }
        match amount {
            Amount::Dice(text) => Ok(self.roll_notation(text)?.total as i64),
            Amount::Flat(value) => Ok(*value),
        }
    }

    /// Natural 20 always hits, natural 1 always misses, otherwise total >= AC.
    pub fn roll_attack(
        &mut self,
        attack_bonus: i32,
        target_ac: i32,
        advantage: Advantage,
    ) -> AttackRoll {
        let d20 = self.roll_d20(advantage);
        let total = d20.result as i32 + attack_bonus;
        let is_critical_hit = d20.is_natural_20();
        let is_critical_miss = d20.is_natural_1();
        let is_hit = is_critical_hit || (!is_critical_miss && total >= target_ac);

        tracing::debug!(
            natural = d20.result,
            total,
            target_ac,
            is_hit,
            "attack rolled"
        );

        AttackRoll {
            d20,
            attack_bonus,
            total,
            target_ac,
            is_hit,
            is_critical_hit,
            is_critical_miss,
        }
    }

    /// Roll damage; a critical doubles the dice count but not the modifier.
    pub fn roll_damage(&mut self, notation: &str, is_critical: bool) -> Result<DamageRoll, DiceError> {
        let notation = DiceNotation::parse(notation)?;
        Ok(self.roll_damage_notation(&notation, is_critical))
    }

    pub fn roll_damage_notation(&mut self, notation: &DiceNotation, is_critical: bool) -> DamageRoll {
        let rolled = if is_critical {
            notation.doubled_dice()
        } else {
            *notation
        };
        let result = self.roll(&rolled);
        DamageRoll {
            notation: rolled,
            rolls: result.rolls,
            modifier: result.modifier,
            total: result.total.max(0),
            is_critical,
        }
    }

    /// Skill/ability check. Natural 20/1 are flagged but do not override the DC.
    pub fn roll_skill_check(&mut self, modifier: i32, dc: i32, advantage: Advantage) -> CheckRoll {
        let d20 = self.roll_d20(advantage);
        let total = d20.result as i32 + modifier;
        CheckRoll {
            d20,
            modifier,
            total,
            dc,
            success: total >= dc,
            critical_success: d20.is_natural_20(),
            critical_failure: d20.is_natural_1(),
        }
    }

    /// Saving throw. Natural 20 always succeeds, natural 1 always fails.
    pub fn roll_saving_throw(&mut self, modifier: i32, dc: i32, advantage: Advantage) -> CheckRoll {
        let d20 = self.roll_d20(advantage);
        let total = d20.result as i32 + modifier;
        let critical_success = d20.is_natural_20();
        let critical_failure = d20.is_natural_1();
        CheckRoll {
            d20,
            modifier,
            total,
            dc,
            success: critical_success || (!critical_failure && total >= dc),
            critical_success,
            critical_failure,
        }
    }

    /// Roll 4d6 and drop the lowest die.
    pub fn roll_ability_score(&mut self) -> AbilityScoreRoll {
        let mut rolls = self.roll_dice(4, 6).rolls;
        rolls.sort_by(|a, b| b.cmp(a));
        let kept = rolls[..3].to_vec();
        let dropped = rolls[3];
        AbilityScoreRoll {
            total: kept.iter().sum(),
            kept,
            dropped,
            rolls,
        }
    }

    pub fn roll_ability_score_set(&mut self) -> [AbilityScoreRoll; 6] {
        std::array::from_fn(|_| self.roll_ability_score())
    }
}

impl Default for DiceEngine {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for DiceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiceEngine")
            .field("rolls_made", &self.rolls_made)
            .finish_non_exhaustive()
    }
}
