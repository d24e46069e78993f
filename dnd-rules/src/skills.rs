//! Skill checks, ability checks, saving throws, and contests.
//!
//! The AI proposes a check as loose text ("stealth", "DEX"); this module
//! resolves it against the character's real modifiers and rolls it.

use crate::dice::{Advantage, CheckRoll, D20Roll, DiceEngine};
use crate::world::{Ability, Character, Skill};
use serde::{Deserialize, Serialize};

/// Kind of check the AI is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CheckType {
    #[default]
    Skill,
    Ability,
    SavingThrow,
    Attack,
    Contest,
}

/// A check proposed by the AI. The DC is taken as given here; callers clamp it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedCheck {
    #[serde(default)]
    pub check_type: CheckType,
    #[serde(default)]
    pub ability: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
    pub difficulty_class: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub advantage: bool,
    #[serde(default)]
    pub disadvantage: bool,
}

impl ProposedCheck {
    pub fn skill(skill: impl Into<String>, dc: i32) -> Self {
        Self {
            check_type: CheckType::Skill,
            ability: None,
            skill: Some(skill.into()),
            difficulty_class: dc,
            description: String::new(),
            advantage: false,
            disadvantage: false,
        }
    }

    pub fn ability(ability: impl Into<String>, dc: i32) -> Self {
        Self {
            check_type: CheckType::Ability,
            ability: Some(ability.into()),
            skill: None,
            ..Self::skill("", dc)
        }
    }

    pub fn saving_throw(ability: impl Into<String>, dc: i32) -> Self {
        Self {
            check_type: CheckType::SavingThrow,
            ..Self::ability(ability, dc)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_advantage(mut self) -> Self {
        self.advantage = true;
        self
    }

    pub fn with_disadvantage(mut self) -> Self {
        self.disadvantage = true;
        self
    }

    fn parsed_skill(&self) -> Option<Skill> {
        self.skill.as_deref().and_then(Skill::from_name)
    }

    /// Named ability, else the skill's ability, else Strength.
    fn resolved_ability(&self) -> Ability {
        self.ability
            .as_deref()
            .and_then(Ability::from_name)
            .or_else(|| self.parsed_skill().map(|s| s.ability()))
            .unwrap_or(Ability::Strength)
    }
}

/// How decisively a check went, by margin from the DC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Degree {
    /// Beat or missed the DC by 10 or more.
    Exceptional,
    /// By 5 to 9.
    Clear,
    /// By less than 5.
    Narrow,
}

impl Degree {
    pub fn from_margin(margin: i32) -> Degree {
        match margin.abs() {
            d if d >= 10 => Degree::Exceptional,
            d if d >= 5 => Degree::Clear,
            _ => Degree::Narrow,
        }
    }
}

/// The fully resolved check, with every rolled value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCheckOutcome {
    pub check_type: CheckType,
    pub ability: Ability,
    pub skill: Option<Skill>,
    pub roll: CheckRoll,
    /// `total - dc`.
    pub margin: i32,
    pub degree: Degree,
    pub description: String,
}

impl SkillCheckOutcome {
    pub fn success(&self) -> bool {
        self.roll.success
    }

    pub fn label(&self) -> String {
        match self.skill {
            Some(skill) => skill.name().to_string(),
            None if self.check_type == CheckType::SavingThrow => {
                format!("{} saving throw", self.ability.name())
            }
            None => self.ability.name().to_string(),
        }
    }

    /// One-line narrative summary such as "Stealth: clear success (18 vs DC 13)".
    pub fn summary(&self) -> String {
        let tier = match (self.success(), self.degree) {
            (true, Degree::Exceptional) => "exceptional success",
            (true, Degree::Clear) => "clear success",
            (true, Degree::Narrow) => "barely succeeded",
            (false, Degree::Exceptional) => "disastrous failure",
            (false, Degree::Clear) => "clear failure",
            (false, Degree::Narrow) => "barely failed",
        };
        let mut text = format!(
            "{}: {} ({} vs DC {})",
            self.label(),
            tier,
            self.roll.total,
            self.roll.dc
        );
        if self.roll.critical_success {
            text.push_str(", natural 20");
        } else if self.roll.critical_failure {
            text.push_str(", natural 1");
        }
        text
    }
}

/// An opposed check between the player and an opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestedCheckOutcome {
    pub player_roll: D20Roll,
    pub player_modifier: i32,
    pub player_total: i32,
    pub opponent_roll: D20Roll,
    pub opponent_modifier: i32,
    pub opponent_total: i32,
    /// The player wins ties.
    pub player_wins: bool,
}

/// A passive check: 10 + modifier, no roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveCheck {
    pub skill: Skill,
    pub score: i32,
    pub dc: i32,
    pub success: bool,
}

/// Resolves checks against a character's modifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillCheckEngine;

impl SkillCheckEngine {
    pub fn new() -> Self {
        Self
    }

    /// Modifier the character adds to `proposal`.
    ///
    /// Skills use the skill modifier, abilities the raw modifier, saves the
    /// saving throw modifier. Attacks and contests add proficiency to the
    /// resolved ability. Unrecognized names fall back to Strength.
    pub fn modifier_for(&self, character: &Character, proposal: &ProposedCheck) -> i32 {
        let ability = proposal.resolved_ability();
        match proposal.check_type {
            CheckType::Skill => match proposal.parsed_skill() {
                Some(skill) => character.skill_modifier(skill),
                None => character.ability_modifier(ability),
            },
            CheckType::Ability => character.ability_modifier(ability),
            CheckType::SavingThrow => character.saving_throw_modifier(ability),
            CheckType::Attack | CheckType::Contest => {
                character.ability_modifier(ability) + character.proficiency_bonus()
            }
        }
    }

    pub fn perform_skill_check(
        &self,
        dice: &mut DiceEngine,
        character: &Character,
        proposal: &ProposedCheck,
    ) -> SkillCheckOutcome {
        let ability = proposal.resolved_ability();
        let skill = match proposal.check_type {
            CheckType::Skill | CheckType::Contest => proposal.parsed_skill(),
            _ => None,
        };
        let modifier = self.modifier_for(character, proposal);
        let advantage = Advantage::from_flags(proposal.advantage, proposal.disadvantage);
        let dc = proposal.difficulty_class;

        let roll = match proposal.check_type {
            CheckType::SavingThrow => dice.roll_saving_throw(modifier, dc, advantage),
            _ => dice.roll_skill_check(modifier, dc, advantage),
        };
        let margin = roll.total - dc;

        tracing::debug!(
            check_type = ?proposal.check_type,
            ?ability,
            ?skill,
            natural = roll.d20.result,
            total = roll.total,
            dc,
            success = roll.success,
            "check resolved"
        );

        SkillCheckOutcome {
            check_type: proposal.check_type,
            ability,
            skill,
            roll,
            margin,
            degree: Degree::from_margin(margin),
            description: proposal.description.clone(),
        }
    }

    /// Player's skill against an opponent's flat modifier. Each side rolls
    /// its own d20 with its own advantage state.
    pub fn perform_contested_check(
        &self,
        dice: &mut DiceEngine,
        character: &Character,
        skill: Skill,
        player_advantage: Advantage,
        opponent_modifier: i32,
        opponent_advantage: Advantage,
    ) -> ContestedCheckOutcome {
        let player_modifier = character.skill_modifier(skill);
        let player_roll = dice.roll_d20(player_advantage);
        let opponent_roll = dice.roll_d20(opponent_advantage);

        let player_total = player_roll.result as i32 + player_modifier;
        let opponent_total = opponent_roll.result as i32 + opponent_modifier;

        ContestedCheckOutcome {
            player_roll,
            player_modifier,
            player_total,
            opponent_roll,
            opponent_modifier,
            opponent_total,
            player_wins: player_total >= opponent_total,
        }
    }

    pub fn passive_check(&self, character: &Character, skill: Skill, dc: i32) -> PassiveCheck {
        let score = character.passive_score(skill);
        PassiveCheck {
            skill,
            score,
            dc,
            success: score >= dc,
        }
    }
}
