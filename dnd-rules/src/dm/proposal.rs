//! The structured proposal the AI layer hands to the Game Master.
//!
//! Everything here is untrusted. Fields are optional and defaulted so a
//! partially filled proposal still deserializes; the Game Master decides
//! what actually happens.

use crate::actions::{GameAction, ProposedAction};
use crate::monsters::Enemy;
use crate::skills::ProposedCheck;
use serde::{Deserialize, Serialize};

/// A parsed AI response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedAIProposal {
    pub narration: String,
    pub suggested_actions: Vec<String>,
    pub proposed_check: Option<ProposedCheck>,
    pub success_outcome: Option<String>,
    pub failure_outcome: Option<String>,
    pub npc_dialogues: Vec<NpcDialogue>,
    pub proposed_rewards: Vec<ProposedReward>,
    pub scene_change: Option<SceneChange>,
    pub combat_trigger: Option<CombatTrigger>,
    pub requires_player_choice: bool,
    pub player_choices: Vec<PlayerChoice>,
    /// Mechanical actions the AI wants applied alongside the narration.
    pub actions: Vec<ProposedAction>,
}

impl ParsedAIProposal {
    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            narration: text.into(),
            ..Self::default()
        }
    }

    pub fn with_check(
        mut self,
        check: ProposedCheck,
        success: impl Into<String>,
        failure: impl Into<String>,
    ) -> Self {
        self.proposed_check = Some(check);
        self.success_outcome = Some(success.into());
        self.failure_outcome = Some(failure.into());
        self
    }

    pub fn with_dialogue(mut self, dialogue: NpcDialogue) -> Self {
        self.npc_dialogues.push(dialogue);
        self
    }

    pub fn with_reward(mut self, reward: ProposedReward) -> Self {
        self.proposed_rewards.push(reward);
        self
    }

    pub fn with_scene_change(mut self, scene: SceneChange) -> Self {
        self.scene_change = Some(scene);
        self
    }

    pub fn with_combat(mut self, trigger: CombatTrigger) -> Self {
        self.combat_trigger = Some(trigger);
        self
    }

    pub fn with_action(mut self, action: ProposedAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_choices(mut self, choices: Vec<PlayerChoice>) -> Self {
        self.requires_player_choice = !choices.is_empty();
        self.player_choices = choices;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcDialogue {
    pub npc_name: String,
    pub dialogue: String,
    #[serde(default)]
    pub emotion: Option<String>,
}

impl NpcDialogue {
    pub fn new(npc_name: impl Into<String>, dialogue: impl Into<String>) -> Self {
        Self {
            npc_name: npc_name.into(),
            dialogue: dialogue.into(),
            emotion: None,
        }
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardType {
    #[serde(alias = "xp", alias = "exp")]
    Experience,
    Gold,
    Item,
    Reputation,
}

/// A reward the AI would like to grant. Caps are applied on execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedReward {
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub gold_amount: Option<i64>,
    #[serde(default)]
    pub experience_points: Option<i64>,
    #[serde(default)]
    pub reputation_change: Option<i64>,
}

impl ProposedReward {
    fn empty(reward_type: RewardType) -> Self {
        Self {
            reward_type,
            item_name: None,
            quantity: None,
            gold_amount: None,
            experience_points: None,
            reputation_change: None,
        }
    }

    pub fn gold(amount: i64) -> Self {
        Self {
            gold_amount: Some(amount),
            ..Self::empty(RewardType::Gold)
        }
    }

    pub fn experience(points: i64) -> Self {
        Self {
            experience_points: Some(points),
            ..Self::empty(RewardType::Experience)
        }
    }

    pub fn item(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            item_name: Some(name.into()),
            quantity: Some(quantity),
            ..Self::empty(RewardType::Item)
        }
    }

    pub fn reputation(change: i64) -> Self {
        Self {
            reputation_change: Some(change),
            ..Self::empty(RewardType::Reputation)
        }
    }

    /// The action this reward amounts to. `None` when the payload it needs
    /// is missing; `quantity` stands in for a missing typed amount.
    pub fn to_action(&self) -> Option<GameAction> {
        match self.reward_type {
            RewardType::Gold => self
                .gold_amount
                .or(self.quantity)
                .map(|amount| GameAction::AddGold { amount }),
            RewardType::Experience => self
                .experience_points
                .or(self.quantity)
                .map(|amount| GameAction::AddXp { amount }),
            RewardType::Item => self
                .item_name
                .as_ref()
                .filter(|name| !name.trim().is_empty())
                .map(|name| GameAction::AddItem {
                    item_name: name.trim().to_string(),
                    quantity: self.quantity.unwrap_or(1),
                }),
            RewardType::Reputation => self
                .reputation_change
                .or(self.quantity)
                .map(|amount| GameAction::AdjustReputation { amount }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneChange {
    pub new_scene_name: String,
    #[serde(default)]
    pub new_scene_description: String,
    #[serde(default)]
    pub transition_description: Option<String>,
}

impl SceneChange {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            new_scene_name: name.into(),
            new_scene_description: description.into(),
            transition_description: None,
        }
    }

    pub fn to_action(&self) -> GameAction {
        GameAction::ChangeLocation {
            location_name: self.new_scene_name.clone(),
            description: self.new_scene_description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredEnemy {
    pub name: String,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default, alias = "challengeRating")]
    pub cr: Option<f32>,
}

impl TriggeredEnemy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            cr: None,
        }
    }

    pub fn to_enemy(&self) -> Enemy {
        Enemy::from_template(&self.name, self.kind.as_deref(), self.cr)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatTrigger {
    #[serde(default)]
    pub enemies: Vec<TriggeredEnemy>,
    #[serde(default)]
    pub ambush: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CombatTrigger {
    pub fn against(enemies: Vec<TriggeredEnemy>) -> Self {
        Self {
            enemies,
            ..Self::default()
        }
    }
}

/// An option offered to the player. Accepts a bare string on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ChoiceRepr")]
pub struct PlayerChoice {
    pub text: String,
    pub description: Option<String>,
}

impl PlayerChoice {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChoiceRepr {
    Text(String),
    #[serde(rename_all = "camelCase")]
    Full {
        #[serde(alias = "label")]
        text: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<ChoiceRepr> for PlayerChoice {
    fn from(repr: ChoiceRepr) -> Self {
        match repr {
            ChoiceRepr::Text(text) => PlayerChoice::new(text),
            ChoiceRepr::Full { text, description } => PlayerChoice { text, description },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::CheckType;
    use serde_json::json;

    #[test]
    fn test_parse_full_proposal() {
        let raw = json!({
            "narration": "The goblin eyes your purse.",
            "suggestedActions": ["Pay up", "Draw steel"],
            "proposedCheck": {
                "checkType": "skill",
                "skill": "Intimidation",
                "difficultyClass": 12
            },
            "successOutcome": "It backs away.",
            "failureOutcome": "It laughs.",
            "npcDialogues": [{"npcName": "Snik", "dialogue": "Shiny!"}],
            "proposedRewards": [{"type": "gold", "goldAmount": 500}],
            "combatTrigger": {"enemies": [{"name": "Snik", "type": "goblin"}], "ambush": true},
            "playerChoices": ["Run", {"text": "Bargain", "description": "Offer a trade"}]
        });
        let proposal: ParsedAIProposal = serde_json::from_value(raw).unwrap();

        let check = proposal.proposed_check.as_ref().unwrap();
        assert_eq!(check.check_type, CheckType::Skill);
        assert_eq!(check.difficulty_class, 12);
        assert_eq!(proposal.npc_dialogues[0].npc_name, "Snik");
        assert_eq!(
            proposal.proposed_rewards[0].to_action(),
            Some(GameAction::AddGold { amount: 500 })
        );
        let trigger = proposal.combat_trigger.as_ref().unwrap();
        assert!(trigger.ambush);
        assert_eq!(trigger.enemies[0].kind.as_deref(), Some("goblin"));
        assert_eq!(proposal.player_choices[0], PlayerChoice::new("Run"));
        assert_eq!(
            proposal.player_choices[1].description.as_deref(),
            Some("Offer a trade")
        );
    }

    #[test]
    fn test_sparse_proposal_defaults() {
        let proposal: ParsedAIProposal =
            serde_json::from_value(json!({"narration": "Rain falls."})).unwrap();
        assert!(proposal.proposed_check.is_none());
        assert!(proposal.proposed_rewards.is_empty());
        assert!(!proposal.requires_player_choice);
    }

    #[test]
    fn test_reward_without_payload_has_no_action() {
        let reward: ProposedReward = serde_json::from_value(json!({"type": "item"})).unwrap();
        assert_eq!(reward.to_action(), None);

        let xp: ProposedReward =
            serde_json::from_value(json!({"type": "xp", "quantity": 40})).unwrap();
        assert_eq!(xp.to_action(), Some(GameAction::AddXp { amount: 40 }));
    }

    #[test]
    fn test_triggered_enemy_uses_bestiary() {
        let enemy = TriggeredEnemy {
            name: "Snik".to_string(),
            kind: Some("Goblin".to_string()),
            cr: None,
        }
        .to_enemy();
        assert_eq!(enemy.name, "Snik");
        assert_eq!(enemy.armor_class, 15);
    }
}
