//! Story log entries produced by every resolution.

use crate::combat::{CombatResult, LevelUpOutcome};
use crate::skills::SkillCheckOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoryEventKind {
    PlayerAction,
    Narration,
    Dialogue,
    SkillCheck,
    Combat,
    System,
    ItemReceived,
    QuestUpdate,
    LevelUp,
}

/// Structured data attached to an event for replay and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EventPayload {
    CombatResult(CombatResult),
    SkillCheckResult(SkillCheckOutcome),
    #[serde(rename_all = "camelCase")]
    ExperienceGained { amount: u32, new_total: u32 },
    ItemsReceived { items: Vec<String> },
}

/// One entry in the story log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: StoryEventKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

impl StoryEvent {
    pub fn new(kind: StoryEventKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            speaker: None,
            emotion: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn player_action(content: impl Into<String>) -> Self {
        Self::new(StoryEventKind::PlayerAction, content)
    }

    pub fn narration(content: impl Into<String>) -> Self {
        Self::new(StoryEventKind::Narration, content)
    }

    pub fn dialogue(
        speaker: impl Into<String>,
        content: impl Into<String>,
        emotion: Option<String>,
    ) -> Self {
        let mut event = Self::new(StoryEventKind::Dialogue, content);
        event.speaker = Some(speaker.into());
        event.emotion = emotion;
        event
    }

    pub fn skill_check(outcome: &SkillCheckOutcome) -> Self {
        Self::new(StoryEventKind::SkillCheck, outcome.summary())
            .with_payload(EventPayload::SkillCheckResult(outcome.clone()))
    }

    pub fn combat(result: &CombatResult) -> Self {
        Self::new(StoryEventKind::Combat, result.description.clone())
            .with_payload(EventPayload::CombatResult(result.clone()))
    }

    pub fn combat_message(content: impl Into<String>) -> Self {
        Self::new(StoryEventKind::Combat, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(StoryEventKind::System, content)
    }

    pub fn items_received(items: Vec<String>) -> Self {
        let content = format!("Received: {}", items.join(", "));
        Self::new(StoryEventKind::ItemReceived, content)
            .with_payload(EventPayload::ItemsReceived { items })
    }

    pub fn quest_update(content: impl Into<String>) -> Self {
        Self::new(StoryEventKind::QuestUpdate, content)
    }

    pub fn experience_gained(amount: u32, new_total: u32) -> Self {
        Self::system(format!("Gained {amount} experience points (Total: {new_total})"))
            .with_payload(EventPayload::ExperienceGained { amount, new_total })
    }

    pub fn level_up(outcome: &LevelUpOutcome) -> Self {
        Self::new(
            StoryEventKind::LevelUp,
            format!(
                "Level up! You are now level {} (+{} max HP).",
                outcome.new_level, outcome.hp_increase
            ),
        )
        .with_payload(EventPayload::ExperienceGained {
            amount: outcome.experience_gained,
            new_total: outcome.new_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_stable_tags() {
        let event = StoryEvent::experience_gained(50, 350);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "system");
        assert_eq!(json["payload"]["type"], "experienceGained");
        assert_eq!(json["payload"]["data"]["newTotal"], 350);
        assert!(json.get("speaker").is_none());

        let back: StoryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_dialogue_carries_speaker() {
        let event = StoryEvent::dialogue("Mira", "Welcome, traveler.", Some("warm".to_string()));
        assert_eq!(event.kind, StoryEventKind::Dialogue);
        assert_eq!(event.speaker.as_deref(), Some("Mira"));
        assert_eq!(event.emotion.as_deref(), Some("warm"));
    }

    #[test]
    fn test_items_received_content() {
        let event = StoryEvent::items_received(vec!["Dagger".to_string(), "Rope".to_string()]);
        assert_eq!(event.content, "Received: Dagger, Rope");
        assert_eq!(event.kind, StoryEventKind::ItemReceived);
    }
}
