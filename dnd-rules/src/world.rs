//! D&D 5e game state types.
//!
//! Contains the player character, inventory, quests, and the complete
//! [`GameState`] snapshot that the rules layer receives and returns.

use crate::dice::DiceNotation;
use crate::encounter::CombatState;
use crate::story::StoryEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for characters and enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase and drop everything but letters, for lenient name matching.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Parse full names or abbreviations, ignoring case and punctuation.
    pub fn from_name(name: &str) -> Option<Ability> {
        let key = normalize(name);
        Ability::all()
            .into_iter()
            .find(|a| normalize(a.name()) == key || normalize(a.abbreviation()) == key)
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores container. Scores are kept within 1-30.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub const MIN_SCORE: u8 = 1;
    pub const MAX_SCORE: u8 = 30;

    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        let clamp = |v: u8| v.clamp(Self::MIN_SCORE, Self::MAX_SCORE);
        Self {
            strength: clamp(str),
            dexterity: clamp(dex),
            constitution: clamp(con),
            intelligence: clamp(int),
            wisdom: clamp(wis),
            charisma: clamp(cha),
        }
    }

    pub fn standard_array() -> Self {
        Self::new(15, 14, 13, 12, 10, 8)
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: u8) {
        let value = value.clamp(Self::MIN_SCORE, Self::MAX_SCORE);
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        // Floor division: 8-9 = -1, 10-11 = 0, 12-13 = +1
        (self.get(ability) as i32 - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Skills
// ============================================================================

/// D&D 5e skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Arcana => "Arcana",
            Skill::History => "History",
            Skill::Investigation => "Investigation",
            Skill::Nature => "Nature",
            Skill::Religion => "Religion",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Insight => "Insight",
            Skill::Medicine => "Medicine",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Deception => "Deception",
            Skill::Intimidation => "Intimidation",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
        }
    }

    pub fn all() -> [Skill; 18] {
        [
            Skill::Athletics,
            Skill::Acrobatics,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Arcana,
            Skill::History,
            Skill::Investigation,
            Skill::Nature,
            Skill::Religion,
            Skill::AnimalHandling,
            Skill::Insight,
            Skill::Medicine,
            Skill::Perception,
            Skill::Survival,
            Skill::Deception,
            Skill::Intimidation,
            Skill::Performance,
            Skill::Persuasion,
        ]
    }

    /// Parse "Sleight of Hand", "sleight_of_hand", "sleightOfHand" alike.
    pub fn from_name(name: &str) -> Option<Skill> {
        let key = normalize(name);
        Skill::all().into_iter().find(|s| normalize(s.name()) == key)
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    /// Sides of the class hit die.
    pub fn hit_die(&self) -> u32 {
        match self {
            CharacterClass::Barbarian => 12,
            CharacterClass::Fighter | CharacterClass::Paladin | CharacterClass::Ranger => 10,
            CharacterClass::Sorcerer | CharacterClass::Wizard => 6,
            _ => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Hit Points
// ============================================================================

/// Hit points tracking. `0 <= current <= maximum` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
    pub temporary: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        let maximum = maximum.max(1);
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }

    /// Apply damage to temporary hit points first, then current.
    pub fn take_damage(&mut self, amount: i32) -> DamageResult {
        let amount = amount.max(0);
        let absorbed = self.temporary.min(amount);
        self.temporary -= absorbed;

        let remaining = amount - absorbed;
        let before = self.current;
        self.current = self.current.saturating_sub(remaining).clamp(0, self.maximum);

        DamageResult {
            damage_taken: amount,
            absorbed_by_temporary: absorbed,
            hp_lost: before - self.current,
            dropped_to_zero: before > 0 && self.current == 0,
        }
    }

    /// Heal up to maximum. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let old = self.current;
        self.current = self.current.saturating_add(amount.max(0)).clamp(0, self.maximum);
        self.current - old
    }

    pub fn add_temp_hp(&mut self, amount: i32) {
        self.temporary = self.temporary.max(amount);
    }

    pub fn restore_full(&mut self) {
        self.current = self.maximum;
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.maximum
    }

    pub fn is_unconscious(&self) -> bool {
        self.current <= 0
    }
}

/// Result of taking damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageResult {
    pub damage_taken: i32,
    pub absorbed_by_temporary: i32,
    pub hp_lost: i32,
    pub dropped_to_zero: bool,
}

/// Common D&D damage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DamageType {
    Slashing,
    Piercing,
    #[default]
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Thunder => "thunder",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Force => "force",
            DamageType::Psychic => "psychic",
        }
    }

    pub fn all() -> [DamageType; 13] {
        [
            DamageType::Slashing,
            DamageType::Piercing,
            DamageType::Bludgeoning,
            DamageType::Fire,
            DamageType::Cold,
            DamageType::Lightning,
            DamageType::Thunder,
            DamageType::Acid,
            DamageType::Poison,
            DamageType::Necrotic,
            DamageType::Radiant,
            DamageType::Force,
            DamageType::Psychic,
        ]
    }

    pub fn from_name(name: &str) -> Option<DamageType> {
        let key = normalize(name);
        DamageType::all().into_iter().find(|d| d.name() == key)
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Items and Inventory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Weapon,
    Armor,
    Shield,
    Potion,
    Scroll,
    Food,
    Tool,
    Key,
    Treasure,
    Accessory,
    Misc,
}

impl ItemType {
    pub fn is_consumable(&self) -> bool {
        matches!(self, ItemType::Potion | ItemType::Scroll | ItemType::Food)
    }

    /// Equipment slot, or `None` for items that cannot be equipped.
    pub fn slot(&self) -> Option<EquipSlot> {
        match self {
            ItemType::Weapon => Some(EquipSlot::MainHand),
            ItemType::Armor => Some(EquipSlot::Body),
            ItemType::Shield => Some(EquipSlot::OffHand),
            ItemType::Accessory => Some(EquipSlot::Accessory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipSlot {
    MainHand,
    OffHand,
    Body,
    Accessory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    VeryRare,
    Legendary,
}

impl Rarity {
    pub fn value_multiplier(&self) -> u32 {
        match self {
            Rarity::Common => 1,
            Rarity::Uncommon => 5,
            Rarity::Rare => 20,
            Rarity::VeryRare => 50,
            Rarity::Legendary => 200,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::VeryRare => "very rare",
            Rarity::Legendary => "legendary",
        }
    }
}

/// A single inventory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub item_type: ItemType,
    pub rarity: Rarity,
    pub value_gp: u32,
    #[serde(default)]
    pub equipped: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Weapon damage dice, without ability modifier.
    #[serde(default)]
    pub damage_dice: Option<DiceNotation>,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    #[serde(default)]
    pub finesse: bool,
    #[serde(default)]
    pub ranged: bool,
    /// Healing rolled when the item is consumed.
    #[serde(default)]
    pub healing: Option<DiceNotation>,
}

impl Item {
    pub fn new(name: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            item_type,
            rarity: Rarity::Common,
            value_gp: 0,
            equipped: false,
            description: None,
            damage_dice: None,
            damage_type: None,
            finesse: false,
            ranged: false,
            healing: None,
        }
    }

    pub fn weapon(name: impl Into<String>, dice: DiceNotation, damage_type: DamageType) -> Self {
        let mut item = Self::new(name, ItemType::Weapon);
        item.damage_dice = Some(dice);
        item.damage_type = Some(damage_type);
        item
    }

    pub fn potion(name: impl Into<String>, healing: DiceNotation) -> Self {
        let mut item = Self::new(name, ItemType::Potion);
        item.healing = Some(healing);
        item
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_value(mut self, value_gp: u32) -> Self {
        self.value_gp = value_gp;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn finesse(mut self) -> Self {
        self.finesse = true;
        self
    }

    pub fn ranged(mut self) -> Self {
        self.ranged = true;
        self
    }

    pub fn equipped(mut self) -> Self {
        self.equipped = true;
        self
    }

    /// Copy of this item with a fresh id, for minting from a template.
    pub fn instantiate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            equipped: false,
            ..self.clone()
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

/// Character inventory: individual item entries plus gold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub items: Vec<Item>,
    pub gold: u32,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find an item by name (case-insensitive).
    pub fn find_item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.matches_name(name))
    }

    pub fn find_item_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.matches_name(name))
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.find_item(name).is_some()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.items.iter().filter(|i| i.matches_name(name)).count()
    }

    /// Remove up to `quantity` entries matching `name`, preferring unequipped
    /// ones. Returns the removed items.
    pub fn remove_by_name(&mut self, name: &str, quantity: usize) -> Vec<Item> {
        let mut removed = Vec::new();
        for prefer_unequipped in [true, false] {
            while removed.len() < quantity {
                let position = self
                    .items
                    .iter()
                    .position(|i| i.matches_name(name) && (!prefer_unequipped || !i.equipped));
                match position {
                    Some(idx) => removed.push(self.items.remove(idx)),
                    None => break,
                }
            }
        }
        removed
    }

    pub fn equipped_in(&self, slot: EquipSlot) -> Option<&Item> {
        self.items
            .iter()
            .find(|i| i.equipped && i.item_type.slot() == Some(slot))
    }
}

// ============================================================================
// Character
// ============================================================================

/// How a character attacks with their current equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponProfile {
    pub name: String,
    pub attack_bonus: i32,
    pub damage: DiceNotation,
    pub damage_type: DamageType,
}

/// The player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub class: CharacterClass,
    pub level: u8,
    pub experience: u32,
    pub ability_scores: AbilityScores,
    pub hit_points: HitPoints,
    pub armor_class: i32,
    #[serde(default)]
    pub skill_proficiencies: HashSet<Skill>,
    #[serde(default)]
    pub expertise: HashSet<Skill>,
    #[serde(default)]
    pub saving_throw_proficiencies: HashSet<Ability>,
    pub hit_dice_remaining: u8,
    #[serde(default)]
    pub inventory: Inventory,
}

impl Character {
    pub fn new(name: impl Into<String>, class: CharacterClass) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            class,
            level: 1,
            experience: 0,
            ability_scores: AbilityScores::default(),
            hit_points: HitPoints::new(class.hit_die() as i32),
            armor_class: 10,
            skill_proficiencies: HashSet::new(),
            expertise: HashSet::new(),
            saving_throw_proficiencies: HashSet::new(),
            hit_dice_remaining: 1,
            inventory: Inventory::default(),
        }
    }

    pub fn with_ability_scores(mut self, scores: AbilityScores) -> Self {
        self.ability_scores = scores;
        self
    }

    /// Sets level and refills hit dice to match.
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level.clamp(1, 20);
        self.hit_dice_remaining = self.level;
        self
    }

    pub fn with_experience(mut self, experience: u32) -> Self {
        self.experience = experience;
        self
    }

    pub fn with_max_hp(mut self, maximum: i32) -> Self {
        self.hit_points = HitPoints::new(maximum);
        self
    }

    pub fn with_current_hp(mut self, current: i32) -> Self {
        self.hit_points.current = current.clamp(0, self.hit_points.maximum);
        self
    }

    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = armor_class;
        self
    }

    pub fn with_skill_proficiency(mut self, skill: Skill) -> Self {
        self.skill_proficiencies.insert(skill);
        self
    }

    /// Expertise implies proficiency.
    pub fn with_expertise(mut self, skill: Skill) -> Self {
        self.skill_proficiencies.insert(skill);
        self.expertise.insert(skill);
        self
    }

    pub fn with_saving_throw_proficiency(mut self, ability: Ability) -> Self {
        self.saving_throw_proficiencies.insert(ability);
        self
    }

    pub fn with_gold(mut self, gold: u32) -> Self {
        self.inventory.gold = gold;
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.inventory.items.push(item);
        self
    }

    pub fn proficiency_bonus(&self) -> i32 {
        match self.level {
            0..=4 => 2,
            5..=8 => 3,
            9..=12 => 4,
            13..=16 => 5,
            _ => 6,
        }
    }

    pub fn ability_modifier(&self, ability: Ability) -> i32 {
        self.ability_scores.modifier(ability)
    }

    pub fn initiative_modifier(&self) -> i32 {
        self.ability_modifier(Ability::Dexterity)
    }

    /// Ability modifier plus proficiency, doubled with expertise.
    pub fn skill_modifier(&self, skill: Skill) -> i32 {
        let ability_mod = self.ability_modifier(skill.ability());
        if self.expertise.contains(&skill) {
            ability_mod + self.proficiency_bonus() * 2
        } else if self.skill_proficiencies.contains(&skill) {
            ability_mod + self.proficiency_bonus()
        } else {
            ability_mod
        }
    }

    pub fn saving_throw_modifier(&self, ability: Ability) -> i32 {
        let ability_mod = self.ability_modifier(ability);
        if self.saving_throw_proficiencies.contains(&ability) {
            ability_mod + self.proficiency_bonus()
        } else {
            ability_mod
        }
    }

    /// Passive score: 10 + skill modifier, no roll.
    pub fn passive_score(&self, skill: Skill) -> i32 {
        10 + self.skill_modifier(skill)
    }

    pub fn passive_perception(&self) -> i32 {
        self.passive_score(Skill::Perception)
    }

    pub fn is_conscious(&self) -> bool {
        self.hit_points.current > 0
    }

    /// Attack profile of the equipped weapon, or an unarmed strike.
    ///
    /// Ranged weapons use DEX, finesse weapons the better of STR and DEX,
    /// everything else STR. Proficiency is always added.
    pub fn weapon_profile(&self) -> WeaponProfile {
        let str_mod = self.ability_modifier(Ability::Strength);
        let dex_mod = self.ability_modifier(Ability::Dexterity);

        let weapon = self
            .inventory
            .equipped_in(EquipSlot::MainHand)
            .filter(|w| w.damage_dice.is_some());

        let (name, dice, damage_type, ability_mod) = match weapon {
            Some(w) => {
                let ability_mod = if w.ranged {
                    dex_mod
                } else if w.finesse {
                    str_mod.max(dex_mod)
                } else {
                    str_mod
                };
                (
                    w.name.clone(),
                    w.damage_dice.unwrap_or(DiceNotation::new(1, 4, 0)),
                    w.damage_type.unwrap_or_default(),
                    ability_mod,
                )
            }
            None => (
                "Unarmed Strike".to_string(),
                DiceNotation::new(1, 4, 0),
                DamageType::Bludgeoning,
                str_mod,
            ),
        };

        WeaponProfile {
            name,
            attack_bonus: ability_mod + self.proficiency_bonus(),
            damage: DiceNotation::new(
                dice.count,
                dice.sides,
                dice.modifier.saturating_add(ability_mod),
            ),
            damage_type,
        }
    }
}

// ============================================================================
// Quests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum QuestStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestObjective {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default)]
    pub objectives: Vec<QuestObjective>,
}

impl Quest {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: QuestStatus::Active,
            objectives: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_objective(mut self, id: impl Into<String>, description: impl Into<String>) -> Self {
        self.objectives.push(QuestObjective {
            id: id.into(),
            description: description.into(),
            completed: false,
        });
        self
    }

    pub fn objective(&self, id: &str) -> Option<&QuestObjective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    pub fn is_complete(&self) -> bool {
        !self.objectives.is_empty() && self.objectives.iter().all(|o| o.completed)
    }
}

// ============================================================================
// Game State
// ============================================================================

/// The complete state handed to and returned from the rules layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player: Character,
    pub location: String,
    #[serde(default)]
    pub location_description: String,
    #[serde(default)]
    pub quests: Vec<Quest>,
    #[serde(default)]
    pub story_log: Vec<StoryEvent>,
    #[serde(default)]
    pub combat: Option<CombatState>,
    #[serde(default)]
    pub reputation: i32,
}

impl GameState {
    pub fn new(player: Character) -> Self {
        Self {
            player,
            location: "Starting Location".to_string(),
            location_description: "A quiet place where your adventure begins.".to_string(),
            quests: Vec::new(),
            story_log: Vec::new(),
            combat: None,
            reputation: 0,
        }
    }

    pub fn with_location(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.location = name.into();
        self.location_description = description.into();
        self
    }

    pub fn with_quest(mut self, quest: Quest) -> Self {
        self.quests.push(quest);
        self
    }

    pub fn quest(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn in_combat(&self) -> bool {
        self.combat.as_ref().is_some_and(|c| c.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_floor_division() {
        let scores = AbilityScores::new(8, 9, 10, 11, 12, 30);
        assert_eq!(scores.modifier(Ability::Strength), -1);
        assert_eq!(scores.modifier(Ability::Dexterity), -1);
        assert_eq!(scores.modifier(Ability::Constitution), 0);
        assert_eq!(scores.modifier(Ability::Intelligence), 0);
        assert_eq!(scores.modifier(Ability::Wisdom), 1);
        assert_eq!(scores.modifier(Ability::Charisma), 10);
    }

    #[test]
    fn test_scores_clamped() {
        let scores = AbilityScores::new(0, 40, 10, 10, 10, 10);
        assert_eq!(scores.strength, 1);
        assert_eq!(scores.dexterity, 30);
    }

    #[test]
    fn test_lenient_names() {
        assert_eq!(Ability::from_name("dex"), Some(Ability::Dexterity));
        assert_eq!(Ability::from_name("Wisdom"), Some(Ability::Wisdom));
        assert_eq!(Ability::from_name("luck"), None);
        assert_eq!(Skill::from_name("sleight_of_hand"), Some(Skill::SleightOfHand));
        assert_eq!(Skill::from_name("Animal Handling"), Some(Skill::AnimalHandling));
        assert_eq!(Skill::from_name("lockpicking"), None);
    }

    #[test]
    fn test_skill_modifier_with_proficiency_and_expertise() {
        let character = Character::new("Vex", CharacterClass::Rogue)
            .with_ability_scores(AbilityScores::new(10, 16, 10, 10, 12, 10))
            .with_skill_proficiency(Skill::Perception)
            .with_expertise(Skill::Stealth);

        assert_eq!(character.skill_modifier(Skill::Acrobatics), 3);
        assert_eq!(character.skill_modifier(Skill::Perception), 3);
        assert_eq!(character.skill_modifier(Skill::Stealth), 7);
        assert_eq!(character.passive_perception(), 13);
    }

    #[test]
    fn test_proficiency_bonus_by_level() {
        let character = Character::new("Test", CharacterClass::Fighter);
        assert_eq!(character.proficiency_bonus(), 2);
        assert_eq!(character.clone().with_level(5).proficiency_bonus(), 3);
        assert_eq!(character.clone().with_level(17).proficiency_bonus(), 6);
    }

    #[test]
    fn test_damage_hits_temporary_first() {
        let mut hp = HitPoints::new(20);
        hp.add_temp_hp(5);
        let result = hp.take_damage(8);
        assert_eq!(result.absorbed_by_temporary, 5);
        assert_eq!(hp.temporary, 0);
        assert_eq!(hp.current, 17);
    }

    #[test]
    fn test_damage_and_healing_clamped() {
        let mut hp = HitPoints::new(10);
        let result = hp.take_damage(50);
        assert_eq!(hp.current, 0);
        assert!(result.dropped_to_zero);
        assert_eq!(result.hp_lost, 10);

        assert_eq!(hp.heal(100), 10);
        assert_eq!(hp.current, 10);
        assert_eq!(hp.heal(-5), 0);
    }

    #[test]
    fn test_extreme_amounts_stay_in_bounds() {
        let mut hp = HitPoints::new(12);
        hp.current = 5;
        assert_eq!(hp.heal(i32::MAX), 7);
        assert_eq!(hp.current, 12);

        hp.add_temp_hp(3);
        let result = hp.take_damage(i32::MAX);
        assert_eq!(hp.current, 0);
        assert_eq!(hp.temporary, 0);
        assert_eq!(result.hp_lost, 12);
    }

    #[test]
    fn test_weapon_profile_saturates_damage_modifier() {
        let blade = Item::weapon(
            "Odd Blade",
            DiceNotation::new(1, 6, i32::MAX),
            DamageType::Slashing,
        )
        .equipped();
        let character = Character::new("Vex", CharacterClass::Fighter)
            .with_ability_scores(AbilityScores::new(16, 10, 10, 10, 10, 10))
            .with_item(blade);
        assert_eq!(character.weapon_profile().damage.modifier, i32::MAX);
    }

    #[test]
    fn test_inventory_remove_prefers_unequipped() {
        let mut inventory = Inventory::default();
        inventory.items.push(Item::new("Dagger", ItemType::Weapon).equipped());
        inventory.items.push(Item::new("dagger", ItemType::Weapon));

        let removed = inventory.remove_by_name("DAGGER", 1);
        assert_eq!(removed.len(), 1);
        assert!(!removed[0].equipped);
        assert!(inventory.items[0].equipped);
    }

    #[test]
    fn test_weapon_profile_finesse_uses_better_ability() {
        let rapier = Item::weapon("Rapier", DiceNotation::new(1, 8, 0), DamageType::Piercing)
            .finesse()
            .equipped();
        let character = Character::new("Vex", CharacterClass::Rogue)
            .with_ability_scores(AbilityScores::new(8, 16, 10, 10, 10, 10))
            .with_item(rapier);

        let profile = character.weapon_profile();
        assert_eq!(profile.attack_bonus, 5);
        assert_eq!(profile.damage, DiceNotation::new(1, 8, 3));
        assert_eq!(profile.damage_type, DamageType::Piercing);
    }

    #[test]
    fn test_weapon_profile_unarmed() {
        let character = Character::new("Brawler", CharacterClass::Monk)
            .with_ability_scores(AbilityScores::new(14, 10, 10, 10, 10, 10));
        let profile = character.weapon_profile();
        assert_eq!(profile.name, "Unarmed Strike");
        assert_eq!(profile.attack_bonus, 4);
    }

    #[test]
    fn test_quest_completion() {
        let mut quest = Quest::new("q1", "Clear the Cellar")
            .with_objective("rats", "Kill the rats")
            .with_objective("report", "Report back");
        assert!(!quest.is_complete());
        for objective in &mut quest.objectives {
            objective.completed = true;
        }
        assert!(quest.is_complete());
    }
}
