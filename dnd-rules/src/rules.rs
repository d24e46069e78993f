//! Validation and execution of AI-proposed actions.
//!
//! [`ActionValidator`] is a pure check of an action against the current
//! state. [`ActionExecutor`] applies an accepted action to a copy of the
//! state, enforcing reward caps and inventory capacity, and reports what
//! happened as story events.

use crate::actions::{ActionError, GameAction, RestType};
use crate::combat::CombatEngine;
use crate::config::RulesConfig;
use crate::dice::{Amount, DiceEngine};
use crate::items;
use crate::story::StoryEvent;
use crate::world::{Ability, GameState, Quest, QuestStatus};
use serde::{Deserialize, Serialize};

/// Verdict on one proposed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
    /// A corrected value the caller could use instead, e.g. the capped reward.
    #[serde(default)]
    pub suggested_value: Option<i64>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
            suggested_value: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            suggested_value: None,
        }
    }

    pub fn with_suggestion(mut self, value: i64) -> Self {
        self.suggested_value = Some(value);
        self
    }
}

/// Pure checks of actions against game state.
#[derive(Debug, Clone)]
pub struct ActionValidator {
    config: RulesConfig,
}

impl Default for ActionValidator {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

impl ActionValidator {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, action: &GameAction, state: &GameState) -> ValidationResult {
        let player = &state.player;
        let inventory = &player.inventory;

        match action {
            GameAction::AddItem { quantity, .. } => {
                if *quantity < 0 {
                    return ValidationResult::invalid("Item quantity cannot be negative");
                }
                ValidationResult::valid()
            }
            GameAction::RemoveItem {
                item_name,
                quantity,
            } => {
                if *quantity < 0 {
                    return ValidationResult::invalid("Item quantity cannot be negative");
                }
                if !inventory.has_item(item_name) {
                    return ValidationResult::invalid(format!("No {item_name} in inventory"));
                }
                ValidationResult::valid()
            }
            GameAction::UseItem { item_name } => {
                if !inventory.has_item(item_name) {
                    return ValidationResult::invalid(format!("No {item_name} in inventory"));
                }
                ValidationResult::valid()
            }
            GameAction::Heal { amount } | GameAction::Damage { amount, .. } => {
                validate_amount(amount)
            }
            GameAction::AddGold { amount } => {
                if *amount < 0 {
                    return ValidationResult::invalid("Gold reward cannot be negative");
                }
                let cap = self.config.gold_cap(player.level) as i64;
                capped(*amount, cap)
            }
            GameAction::AddXp { amount } => {
                if *amount < 0 {
                    return ValidationResult::invalid("Experience reward cannot be negative");
                }
                let cap = self.config.xp_cap(player.level) as i64;
                capped(*amount, cap)
            }
            GameAction::SpendGold { amount } => {
                if *amount < 0 {
                    return ValidationResult::invalid("Cannot spend a negative amount of gold");
                }
                let gold = inventory.gold as i64;
                if *amount > gold {
                    return ValidationResult::invalid(format!(
                        "Not enough gold: need {amount}, have {gold}"
                    ))
                    .with_suggestion(gold);
                }
                ValidationResult::valid()
            }
            GameAction::StartQuest { quest_id, .. } => {
                if state.quest(quest_id).is_some() {
                    return ValidationResult::invalid(format!("Quest {quest_id} already exists"));
                }
                ValidationResult::valid()
            }
            GameAction::UpdateQuest {
                quest_id,
                objective_id,
                ..
            } => {
                let Some(quest) = state.quest(quest_id) else {
                    return ValidationResult::invalid(format!("Unknown quest: {quest_id}"));
                };
                if let Some(objective_id) = objective_id {
                    if quest.objective(objective_id).is_none() {
                        return ValidationResult::invalid(format!(
                            "Quest {quest_id} has no objective {objective_id}"
                        ));
                    }
                }
                ValidationResult::valid()
            }
            GameAction::ChangeLocation { location_name, .. } => {
                if location_name.trim().is_empty() {
                    return ValidationResult::invalid("Location name is empty");
                }
                ValidationResult::valid()
            }
            GameAction::Rest { rest_type } => {
                if state.in_combat() {
                    let kind = match rest_type {
                        RestType::Short => "short",
                        RestType::Long => "long",
                    };
                    return ValidationResult::invalid(format!(
                        "Cannot take a {kind} rest while in combat"
                    ));
                }
                ValidationResult::valid()
            }
            GameAction::Equip { item_name } => match inventory.find_item(item_name) {
                None => ValidationResult::invalid(format!("No {item_name} in inventory")),
                Some(item) if item.item_type.slot().is_none() => {
                    ValidationResult::invalid(format!("{} cannot be equipped", item.name))
                }
                Some(_) => ValidationResult::valid(),
            },
            GameAction::Unequip { item_name } => {
                let equipped = inventory
                    .items
                    .iter()
                    .any(|i| i.matches_name(item_name) && i.equipped);
                if !equipped {
                    return ValidationResult::invalid(format!("{item_name} is not equipped"));
                }
                ValidationResult::valid()
            }
            GameAction::AdjustReputation { .. } => ValidationResult::valid(),
        }
    }
}

fn validate_amount(amount: &Amount) -> ValidationResult {
    if let Some(flat) = amount.as_flat() {
        if flat < 0 {
            return ValidationResult::invalid("Amount cannot be negative");
        }
        return ValidationResult::valid();
    }
    match amount.validate() {
        Ok(()) => ValidationResult::valid(),
        Err(err) => ValidationResult::invalid(err.to_string()),
    }
}

/// Over-cap rewards stay valid; the executor clamps them.
fn capped(amount: i64, cap: i64) -> ValidationResult {
    if amount > cap {
        ValidationResult::valid().with_suggestion(cap)
    } else {
        ValidationResult::valid()
    }
}

/// State and events after one executed action.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub state: GameState,
    pub events: Vec<StoryEvent>,
}

/// Applies validated actions to a copy of the game state.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    config: RulesConfig,
    combat: CombatEngine,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

impl ActionExecutor {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            combat: CombatEngine::new(&config),
            config,
        }
    }

    /// Apply `action`. Callers validate first; the executor still clamps
    /// every amount it applies.
    pub fn execute(
        &self,
        dice: &mut DiceEngine,
        state: &GameState,
        action: &GameAction,
    ) -> Result<Execution, ActionError> {
        let mut state = state.clone();
        let mut events = Vec::new();
        let level = state.player.level;

        match action {
            GameAction::AddItem {
                item_name,
                quantity,
            } => {
                let wanted = (*quantity).max(0) as usize;
                let room = self
                    .config
                    .inventory_capacity
                    .saturating_sub(state.player.inventory.len());
                let count = wanted.min(room);
                let mut received = Vec::with_capacity(count);
                for _ in 0..count {
                    let item = items::create_item(item_name);
                    received.push(item.name.clone());
                    state.player.inventory.items.push(item);
                }
                if count < wanted {
                    tracing::debug!(item = %item_name, wanted, added = count, "inventory full");
                }
                if !received.is_empty() {
                    events.push(StoryEvent::items_received(received));
                }
            }
            GameAction::RemoveItem {
                item_name,
                quantity,
            } => {
                let removed = state
                    .player
                    .inventory
                    .remove_by_name(item_name, (*quantity).max(0) as usize);
                if let Some(first) = removed.first() {
                    events.push(StoryEvent::system(format!(
                        "Removed {} x {}.",
                        removed.len(),
                        first.name
                    )));
                }
            }
            GameAction::UseItem { item_name } => {
                if let Some(item) = state.player.inventory.find_item(item_name).cloned() {
                    if let Some(healing) = item.healing {
                        let rolled = dice.roll(&healing).total.max(0);
                        let healed = state.player.hit_points.heal(rolled);
                        events.push(StoryEvent::system(format!(
                            "You use {} and recover {healed} hit points ({}/{}).",
                            item.name,
                            state.player.hit_points.current,
                            state.player.hit_points.maximum
                        )));
                    } else {
                        events.push(StoryEvent::system(format!("You use {}.", item.name)));
                    }
                    if item.item_type.is_consumable() {
                        state.player.inventory.items.retain(|i| i.id != item.id);
                    }
                }
            }
            GameAction::Heal { amount } => {
                let rolled = dice.roll_amount(amount)?.clamp(0, i32::MAX as i64) as i32;
                let healed = state.player.hit_points.heal(rolled);
                events.push(StoryEvent::system(format!(
                    "You recover {healed} hit points ({}/{}).",
                    state.player.hit_points.current, state.player.hit_points.maximum
                )));
            }
            GameAction::Damage {
                amount,
                damage_type,
            } => {
                let rolled = dice.roll_amount(amount)?.clamp(0, i32::MAX as i64) as i32;
                let result = state.player.hit_points.take_damage(rolled);
                let kind = damage_type.map(|d| format!(" {d}")).unwrap_or_default();
                let mut text = format!(
                    "You take {rolled}{kind} damage ({}/{}).",
                    state.player.hit_points.current, state.player.hit_points.maximum
                );
                if result.dropped_to_zero {
                    text.push_str(" You fall unconscious!");
                }
                events.push(StoryEvent::system(text));
            }
            GameAction::AddGold { amount } => {
                let cap = self.config.gold_cap(level);
                let granted = (*amount).clamp(0, cap as i64) as u32;
                if *amount > cap as i64 {
                    tracing::warn!(proposed = amount, cap, "gold reward capped");
                }
                state.player.inventory.gold = state.player.inventory.gold.saturating_add(granted);
                events.push(StoryEvent::system(format!("You gain {granted} gold.")));
            }
            GameAction::SpendGold { amount } => {
                let spent = (*amount).clamp(0, state.player.inventory.gold as i64) as u32;
                state.player.inventory.gold -= spent;
                events.push(StoryEvent::system(format!("You spend {spent} gold.")));
            }
            GameAction::AddXp { amount } => {
                let cap = self.config.xp_cap(level);
                let granted = (*amount).clamp(0, cap as i64) as u32;
                if *amount > cap as i64 {
                    tracing::warn!(proposed = amount, cap, "experience reward capped");
                }
                let (outcome, player) = self.combat.check_level_up(dice, &state.player, granted);
                state.player = player;
                events.push(StoryEvent::experience_gained(granted, outcome.new_total));
                if outcome.leveled_up() {
                    events.push(StoryEvent::level_up(&outcome));
                }
            }
            GameAction::StartQuest {
                quest_id,
                title,
                description,
                objectives,
            } => {
                let mut quest = Quest::new(quest_id.clone(), title.clone())
                    .with_description(description.clone());
                quest.objectives = objectives.clone();
                state.quests.push(quest);
                events.push(StoryEvent::quest_update(format!("New quest: {title}")));
            }
            GameAction::UpdateQuest {
                quest_id,
                objective_id,
                status,
            } => {
                if let Some(quest) = state.quests.iter_mut().find(|q| &q.id == quest_id) {
                    if let Some(objective_id) = objective_id {
                        if let Some(objective) =
                            quest.objectives.iter_mut().find(|o| &o.id == objective_id)
                        {
                            objective.completed = true;
                            events.push(StoryEvent::quest_update(format!(
                                "Objective complete: {}",
                                objective.description
                            )));
                        }
                    }
                    let new_status = status
                        .or_else(|| quest.is_complete().then_some(QuestStatus::Completed));
                    if let Some(new_status) = new_status {
                        if new_status != quest.status {
                            quest.status = new_status;
                            let verb = match new_status {
                                QuestStatus::Active => "resumed",
                                QuestStatus::Completed => "completed",
                                QuestStatus::Failed => "failed",
                            };
                            events.push(StoryEvent::quest_update(format!(
                                "Quest {verb}: {}",
                                quest.title
                            )));
                        }
                    }
                }
            }
            GameAction::ChangeLocation {
                location_name,
                description,
            } => {
                state.location = location_name.clone();
                state.location_description = description.clone();
                events.push(StoryEvent::system(format!("You arrive at {location_name}.")));
            }
            GameAction::Rest { rest_type } => match rest_type {
                RestType::Short => events.push(self.short_rest(dice, &mut state)),
                RestType::Long => {
                    let player = &mut state.player;
                    player.hit_points.restore_full();
                    player.hit_points.temporary = 0;
                    player.hit_dice_remaining = player.level;
                    events.push(StoryEvent::system(
                        "You take a long rest. Hit points and hit dice are fully restored.",
                    ));
                }
            },
            GameAction::Equip { item_name } => {
                let inventory = &mut state.player.inventory;
                let target = inventory
                    .items
                    .iter()
                    .position(|i| i.matches_name(item_name) && !i.equipped)
                    .or_else(|| inventory.items.iter().position(|i| i.matches_name(item_name)));
                if let Some(idx) = target {
                    let slot = inventory.items[idx].item_type.slot();
                    if slot.is_some() {
                        for item in inventory.items.iter_mut() {
                            if item.item_type.slot() == slot {
                                item.equipped = false;
                            }
                        }
                        inventory.items[idx].equipped = true;
                        events.push(StoryEvent::system(format!(
                            "You equip {}.",
                            inventory.items[idx].name
                        )));
                    }
                }
            }
            GameAction::Unequip { item_name } => {
                if let Some(item) = state
                    .player
                    .inventory
                    .items
                    .iter_mut()
                    .find(|i| i.matches_name(item_name) && i.equipped)
                {
                    item.equipped = false;
                    events.push(StoryEvent::system(format!("You unequip {}.", item.name)));
                }
            }
            GameAction::AdjustReputation { amount } => {
                let cap = self.config.reputation_cap as i64;
                let change = (*amount).clamp(-cap, cap) as i32;
                state.reputation = state.reputation.saturating_add(change);
                events.push(StoryEvent::system(format!(
                    "Reputation {} by {} (now {}).",
                    if change >= 0 { "increases" } else { "decreases" },
                    change.abs(),
                    state.reputation
                )));
            }
        }

        tracing::debug!(action = action.type_name(), events = events.len(), "action executed");
        Ok(Execution { state, events })
    }

    /// Spend up to half the remaining hit dice (rounded up), stopping once
    /// hit points are full.
    fn short_rest(&self, dice: &mut DiceEngine, state: &mut GameState) -> StoryEvent {
        let player = &mut state.player;
        let budget = player.hit_dice_remaining.div_ceil(2);
        let sides = player.class.hit_die();
        let con = player.ability_modifier(Ability::Constitution);

        let mut spent = 0u8;
        let mut healed = 0;
        while spent < budget && !player.hit_points.is_full() {
            let roll = (dice.roll_die(sides) as i32 + con).max(0);
            healed += player.hit_points.heal(roll);
            spent += 1;
        }
        player.hit_dice_remaining -= spent;

        StoryEvent::system(format!(
            "You take a short rest, spending {spent} hit dice and recovering {healed} hit points ({}/{}).",
            player.hit_points.current, player.hit_points.maximum
        ))
    }
}
