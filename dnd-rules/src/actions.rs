//! Game actions proposed by the AI.
//!
//! The AI emits actions as `{type, params, narration}` with a free-form
//! parameter bag. [`GameAction::from_parts`] turns that into a closed enum so
//! the executor can match exhaustively. Numeric fields that are present but
//! malformed read as 0; a missing required name is a hard error.

use crate::dice::{Amount, DiceError};
use crate::world::{DamageType, QuestObjective, QuestStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors converting a raw action into a [`GameAction`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    #[error("Malformed parameters for {action}: {reason}")]
    MalformedParameters { action: String, reason: String },

    #[error(transparent)]
    Dice(#[from] DiceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RestType {
    #[default]
    Short,
    Long,
}

/// A single mechanical change the AI wants to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameAction {
    AddItem {
        item_name: String,
        quantity: i64,
    },
    RemoveItem {
        item_name: String,
        quantity: i64,
    },
    UseItem {
        item_name: String,
    },
    Heal {
        amount: Amount,
    },
    Damage {
        amount: Amount,
        #[serde(default)]
        damage_type: Option<DamageType>,
    },
    AddGold {
        amount: i64,
    },
    SpendGold {
        amount: i64,
    },
    #[serde(rename = "addXP")]
    AddXp {
        amount: i64,
    },
    StartQuest {
        quest_id: String,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        objectives: Vec<QuestObjective>,
    },
    UpdateQuest {
        quest_id: String,
        #[serde(default)]
        objective_id: Option<String>,
        #[serde(default)]
        status: Option<QuestStatus>,
    },
    ChangeLocation {
        location_name: String,
        #[serde(default)]
        description: String,
    },
    Rest {
        rest_type: RestType,
    },
    Equip {
        item_name: String,
    },
    Unequip {
        item_name: String,
    },
    AdjustReputation {
        amount: i64,
    },
}

impl GameAction {
    /// Stable wire tag, as used in the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            GameAction::AddItem { .. } => "addItem",
            GameAction::RemoveItem { .. } => "removeItem",
            GameAction::UseItem { .. } => "useItem",
            GameAction::Heal { .. } => "heal",
            GameAction::Damage { .. } => "damage",
            GameAction::AddGold { .. } => "addGold",
            GameAction::SpendGold { .. } => "spendGold",
            GameAction::AddXp { .. } => "addXP",
            GameAction::StartQuest { .. } => "startQuest",
            GameAction::UpdateQuest { .. } => "updateQuest",
            GameAction::ChangeLocation { .. } => "changeLocation",
            GameAction::Rest { .. } => "rest",
            GameAction::Equip { .. } => "equip",
            GameAction::Unequip { .. } => "unequip",
            GameAction::AdjustReputation { .. } => "adjustReputation",
        }
    }

    /// Build from the wire shape. Tags match case-insensitively, ignoring
    /// `_`, `-` and spaces, so `add_item`, `AddItem` and `additem` agree.
    pub fn from_parts(action_type: &str, params: &Value) -> Result<GameAction, ActionError> {
        let tag: String = action_type
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        let malformed = |reason: &str| ActionError::MalformedParameters {
            action: action_type.to_string(),
            reason: reason.to_string(),
        };
        let item_name = || {
            str_param(params, &["itemName", "item_name", "item", "name"])
                .ok_or_else(|| malformed("missing item name"))
        };

        let action = match tag.as_str() {
            "additem" | "giveitem" => GameAction::AddItem {
                item_name: item_name()?,
                quantity: int_param(params, &["quantity", "qty", "count"]).unwrap_or(1),
            },
            "removeitem" | "takeitem" => GameAction::RemoveItem {
                item_name: item_name()?,
                quantity: int_param(params, &["quantity", "qty", "count"]).unwrap_or(1),
            },
            "useitem" => GameAction::UseItem {
                item_name: item_name()?,
            },
            "heal" => GameAction::Heal {
                amount: amount_param(params, &["amount", "healing", "hp"]),
            },
            "damage" | "dealdamage" | "takedamage" => GameAction::Damage {
                amount: amount_param(params, &["amount", "damage", "hp"]),
                damage_type: str_param(params, &["damageType", "damage_type"])
                    .and_then(|s| DamageType::from_name(&s)),
            },
            "addgold" | "givegold" => GameAction::AddGold {
                amount: int_param(params, &["amount", "gold"]).unwrap_or(0),
            },
            "spendgold" | "removegold" => GameAction::SpendGold {
                amount: int_param(params, &["amount", "gold"]).unwrap_or(0),
            },
            "addxp" | "addexperience" | "giveexperience" | "awardxp" => GameAction::AddXp {
                amount: int_param(params, &["amount", "xp", "experience"]).unwrap_or(0),
            },
            "startquest" | "addquest" => {
                let title = str_param(params, &["title", "name"])
                    .ok_or_else(|| malformed("missing quest title"))?;
                let quest_id = str_param(params, &["questId", "quest_id", "id"])
                    .unwrap_or_else(|| slug(&title));
                GameAction::StartQuest {
                    quest_id,
                    title,
                    description: str_param(params, &["description"]).unwrap_or_default(),
                    objectives: objectives_param(params),
                }
            }
            "updatequest" | "completeobjective" => GameAction::UpdateQuest {
                quest_id: str_param(params, &["questId", "quest_id", "quest", "id"])
                    .ok_or_else(|| malformed("missing quest id"))?,
                objective_id: str_param(params, &["objectiveId", "objective_id", "objective"]),
                status: str_param(params, &["status"]).and_then(|s| parse_status(&s)),
            },
            "changelocation" | "movetolocation" | "travel" => GameAction::ChangeLocation {
                location_name: str_param(params, &["locationName", "location_name", "location", "name"])
                    .ok_or_else(|| malformed("missing location name"))?,
                description: str_param(params, &["description"]).unwrap_or_default(),
            },
            "rest" | "shortrest" | "longrest" => {
                let kind = str_param(params, &["restType", "rest_type", "type", "kind"])
                    .unwrap_or_else(|| tag.clone());
                let rest_type = if kind.to_lowercase().contains("long") {
                    RestType::Long
                } else {
                    RestType::Short
                };
                GameAction::Rest { rest_type }
            }
            "equip" | "equipitem" => GameAction::Equip {
                item_name: item_name()?,
            },
            "unequip" | "unequipitem" => GameAction::Unequip {
                item_name: item_name()?,
            },
            "adjustreputation" | "reputation" | "changereputation" => GameAction::AdjustReputation {
                amount: int_param(params, &["amount", "change", "reputation"]).unwrap_or(0),
            },
            _ => return Err(ActionError::UnknownActionType(action_type.to_string())),
        };
        Ok(action)
    }
}

/// The raw `{type, params, narration}` shape the AI emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub narration: Option<String>,
}

impl ProposedAction {
    pub fn new(action_type: impl Into<String>, params: Value) -> Self {
        Self {
            action_type: action_type.into(),
            params,
            narration: None,
        }
    }

    pub fn to_action(&self) -> Result<GameAction, ActionError> {
        GameAction::from_parts(&self.action_type, &self.params)
    }
}

fn lookup<'a>(params: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| params.get(k))
        .find(|v| !v.is_null())
}

fn str_param(params: &Value, keys: &[&str]) -> Option<String> {
    match lookup(params, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `None` when absent; `Some(0)` when present but not a number.
fn int_param(params: &Value, keys: &[&str]) -> Option<i64> {
    let value = lookup(params, keys)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Some(parsed.unwrap_or(0))
}

fn amount_param(params: &Value, keys: &[&str]) -> Amount {
    match lookup(params, keys) {
        Some(Value::Number(n)) => Amount::Flat(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)),
        Some(Value::String(s)) => Amount::parse(s),
        _ => Amount::Flat(0),
    }
}

fn objectives_param(params: &Value) -> Vec<QuestObjective> {
    let Some(Value::Array(items)) = lookup(params, &["objectives"]) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (id, description) = match item {
                Value::String(text) => (None, text.clone()),
                Value::Object(_) => (
                    str_param(item, &["id", "objectiveId"]),
                    str_param(item, &["description", "text"])?,
                ),
                _ => return None,
            };
            Some(QuestObjective {
                id: id.unwrap_or_else(|| format!("objective-{}", i + 1)),
                description,
                completed: false,
            })
        })
        .collect()
}

fn parse_status(text: &str) -> Option<QuestStatus> {
    match text.trim().to_lowercase().as_str() {
        "active" | "inprogress" | "in_progress" => Some(QuestStatus::Active),
        "completed" | "complete" | "done" => Some(QuestStatus::Completed),
        "failed" | "fail" => Some(QuestStatus::Failed),
        _ => None,
    }
}

fn slug(title: &str) -> String {
    let words: Vec<String> = title
        .replace('\'', "")
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    words.join("-")
}
