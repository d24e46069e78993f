//! Standard item catalog and free-text item inference.
//!
//! AI-authored rewards name items in free text. Known names resolve against
//! the catalog; anything else is classified by keyword so that an unknown
//! "Glowing Obsidian Blade +2" still becomes a sensible rare weapon.

use crate::dice::DiceNotation;
use crate::world::{DamageType, Item, ItemType, Rarity};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Highest `+N` bonus a magic item carries.
pub const MAX_ENCHANTMENT: i32 = 3;

/// Best-guess classification of a free-text item name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemClassification {
    pub item_type: ItemType,
    pub rarity: Rarity,
    pub value_gp: u32,
    /// Enchantment bonus from a `+N` marker, 0 if none, at most +3.
    pub enchantment: i32,
}

/// Look up a catalog item by name or alias (case-insensitive).
pub fn find_item(name: &str) -> Option<&'static Item> {
    let key = name.trim().to_lowercase();
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, target)| target.to_lowercase())
        .unwrap_or(key);
    CATALOG.iter().find(|i| i.name.to_lowercase() == canonical)
}

/// Build a fresh item for `name`. Never fails: catalog entries are copied,
/// everything else is built from [`classify`].
pub fn create_item(name: &str) -> Item {
    if let Some(template) = find_item(name) {
        return template.instantiate();
    }

    let name = name.trim();
    let class = classify(name);
    let mut item = Item::new(name, class.item_type)
        .with_rarity(class.rarity)
        .with_value(class.value_gp);

    let words = words(name);
    match class.item_type {
        ItemType::Weapon => {
            item.damage_dice = Some(DiceNotation::new(1, 6, class.enchantment));
            item.damage_type = Some(infer_damage_type(&words));
            item.ranged = words.iter().any(|w| RANGED_WORDS.contains(&w.as_str()));
        }
        ItemType::Potion if words.iter().any(|w| w == "healing") => {
            item.healing = Some(DiceNotation::new(2, 4, 2));
        }
        _ => {}
    }
    item
}

/// Classify a free-text item name by keyword.
///
/// Falls back to `Misc`/`Common` for names with no recognizable keyword.
pub fn classify(name: &str) -> ItemClassification {
    let words = words(name);
    let lower = name.to_lowercase();

    let item_type = TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| matches_keyword(w, keywords)))
        .map(|(item_type, _)| *item_type)
        .unwrap_or(ItemType::Misc);

    let enchantment = ENCHANTMENT_RE
        .captures(&lower)
        .map(|caps| caps[1].parse::<i32>().unwrap_or(MAX_ENCHANTMENT))
        .unwrap_or(0)
        .clamp(0, MAX_ENCHANTMENT);

    let keyword_rarity = if lower.contains("very rare") {
        Rarity::VeryRare
    } else {
        RARITY_KEYWORDS
            .iter()
            .find(|(_, keywords)| words.iter().any(|w| keywords.contains(&w.as_str())))
            .map(|(rarity, _)| *rarity)
            .unwrap_or(Rarity::Common)
    };

    let rarity = keyword_rarity.max(enchantment_rarity(enchantment));
    let value_gp = base_value(item_type) * rarity.value_multiplier();

    ItemClassification {
        item_type,
        rarity,
        value_gp,
        enchantment,
    }
}

fn words(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word match, tolerating a plural `s`.
fn matches_keyword(word: &str, keywords: &[&str]) -> bool {
    keywords
        .iter()
        .any(|k| word == *k || word.strip_suffix('s') == Some(*k))
}

fn enchantment_rarity(bonus: i32) -> Rarity {
    match bonus {
        i32::MIN..=0 => Rarity::Common,
        1 => Rarity::Uncommon,
        2 => Rarity::Rare,
        _ => Rarity::VeryRare,
    }
}

fn base_value(item_type: ItemType) -> u32 {
    match item_type {
        ItemType::Weapon => 15,
        ItemType::Armor => 50,
        ItemType::Shield => 10,
        ItemType::Potion => 50,
        ItemType::Scroll => 25,
        ItemType::Treasure => 25,
        ItemType::Accessory => 20,
        ItemType::Tool => 5,
        ItemType::Food | ItemType::Key | ItemType::Misc => 1,
    }
}

fn infer_damage_type(words: &[String]) -> DamageType {
    let has = |list: &[&str]| words.iter().any(|w| matches_keyword(w, list));
    if has(&["mace", "hammer", "warhammer", "club", "staff", "quarterstaff", "flail", "maul"]) {
        DamageType::Bludgeoning
    } else if has(&["dagger", "spear", "rapier", "bow", "crossbow", "arrow", "pike", "trident", "lance"]) {
        DamageType::Piercing
    } else {
        DamageType::Slashing
    }
}

const RANGED_WORDS: &[&str] = &["bow", "longbow", "shortbow", "crossbow", "sling"];

/// Checked in order; the first type with a matching word wins.
const TYPE_KEYWORDS: &[(ItemType, &[&str])] = &[
    (ItemType::Potion, &["potion", "elixir", "draught", "tonic", "philter", "vial"]),
    (ItemType::Scroll, &["scroll", "tome", "spellbook", "parchment"]),
    (ItemType::Shield, &["shield", "buckler"]),
    (
        ItemType::Armor,
        &["armor", "armour", "mail", "plate", "breastplate", "leather", "hauberk", "brigandine"],
    ),
    (
        ItemType::Weapon,
        &[
            "sword", "longsword", "shortsword", "greatsword", "blade", "axe", "battleaxe",
            "greataxe", "handaxe", "dagger", "knife", "bow", "longbow", "shortbow", "crossbow",
            "mace", "hammer", "warhammer", "spear", "rapier", "scimitar", "club", "staff",
            "quarterstaff", "flail", "halberd", "glaive", "pike", "trident", "whip", "maul",
            "sling", "lance", "sickle", "javelin",
        ],
    ),
    (
        ItemType::Accessory,
        &[
            "ring", "amulet", "necklace", "cloak", "boots", "gloves", "gauntlets", "bracers",
            "belt", "circlet", "pendant", "talisman", "brooch", "helm", "helmet",
        ],
    ),
    (ItemType::Key, &["key", "keyring"]),
    (
        ItemType::Food,
        &["ration", "bread", "apple", "meat", "cheese", "food", "ale", "wine", "jerky", "stew"],
    ),
    (
        ItemType::Tool,
        &["kit", "tools", "rope", "torch", "lantern", "pick", "shovel", "crowbar", "bedroll", "map"],
    ),
    (
        ItemType::Treasure,
        &[
            "gem", "ruby", "emerald", "diamond", "sapphire", "pearl", "jewel", "crown", "idol",
            "chalice", "coin", "goblet", "statuette", "gold", "silver",
        ],
    ),
];

const RARITY_KEYWORDS: &[(Rarity, &[&str])] = &[
    (Rarity::Legendary, &["legendary", "artifact", "godly", "divine"]),
    (Rarity::Rare, &["rare", "dragon", "dragonbone", "mithral", "adamantine"]),
    (
        Rarity::Uncommon,
        &["uncommon", "magic", "magical", "enchanted", "glowing", "ancient", "elven", "dwarven"],
    ),
];

fn weapon(name: &str, count: u32, sides: u32, damage_type: DamageType, value_gp: u32) -> Item {
    Item::weapon(name, DiceNotation::new(count, sides, 0), damage_type).with_value(value_gp)
}

fn potion(name: &str, count: u32, sides: u32, bonus: i32, rarity: Rarity, value_gp: u32) -> Item {
    Item::potion(name, DiceNotation::new(count, sides, bonus))
        .with_rarity(rarity)
        .with_value(value_gp)
}

fn gear(name: &str, item_type: ItemType, value_gp: u32) -> Item {
    Item::new(name, item_type).with_value(value_gp)
}

lazy_static! {
    static ref ENCHANTMENT_RE: Regex = Regex::new(r"\+\s*(\d+)").expect("enchantment regex is valid");

    /// Standard items the AI is likely to name.
    pub static ref CATALOG: Vec<Item> = vec![
        // Weapons
        weapon("Club", 1, 4, DamageType::Bludgeoning, 1),
        weapon("Dagger", 1, 4, DamageType::Piercing, 2).finesse(),
        weapon("Handaxe", 1, 6, DamageType::Slashing, 5),
        weapon("Mace", 1, 6, DamageType::Bludgeoning, 5),
        weapon("Quarterstaff", 1, 6, DamageType::Bludgeoning, 1),
        weapon("Spear", 1, 6, DamageType::Piercing, 1),
        weapon("Shortsword", 1, 6, DamageType::Piercing, 10).finesse(),
        weapon("Scimitar", 1, 6, DamageType::Slashing, 25).finesse(),
        weapon("Rapier", 1, 8, DamageType::Piercing, 25).finesse(),
        weapon("Longsword", 1, 8, DamageType::Slashing, 15),
        weapon("Battleaxe", 1, 8, DamageType::Slashing, 10),
        weapon("Warhammer", 1, 8, DamageType::Bludgeoning, 15),
        weapon("Greatsword", 2, 6, DamageType::Slashing, 50),
        weapon("Greataxe", 1, 12, DamageType::Slashing, 30),
        weapon("Shortbow", 1, 6, DamageType::Piercing, 25).ranged(),
        weapon("Longbow", 1, 8, DamageType::Piercing, 50).ranged(),
        weapon("Light Crossbow", 1, 8, DamageType::Piercing, 25).ranged(),
        // Armor
        gear("Leather Armor", ItemType::Armor, 10),
        gear("Studded Leather Armor", ItemType::Armor, 45),
        gear("Scale Mail", ItemType::Armor, 50),
        gear("Chain Mail", ItemType::Armor, 75),
        gear("Breastplate", ItemType::Armor, 400),
        gear("Plate Armor", ItemType::Armor, 1500),
        gear("Shield", ItemType::Shield, 10),
        // Potions
        potion("Potion of Healing", 2, 4, 2, Rarity::Common, 50),
        potion("Potion of Greater Healing", 4, 4, 4, Rarity::Uncommon, 150),
        potion("Potion of Superior Healing", 8, 4, 8, Rarity::Rare, 500),
        potion("Potion of Supreme Healing", 10, 4, 20, Rarity::VeryRare, 1350),
        // Adventuring gear
        gear("Rope", ItemType::Tool, 1),
        gear("Torch", ItemType::Tool, 1),
        gear("Lantern", ItemType::Tool, 5),
        gear("Bedroll", ItemType::Tool, 1),
        gear("Healer's Kit", ItemType::Tool, 5),
        gear("Thieves' Tools", ItemType::Tool, 25),
        gear("Rations", ItemType::Food, 1),
    ];

    static ref ALIASES: Vec<(&'static str, &'static str)> = vec![
        ("healing potion", "Potion of Healing"),
        ("greater healing potion", "Potion of Greater Healing"),
        ("superior healing potion", "Potion of Superior Healing"),
        ("supreme healing potion", "Potion of Supreme Healing"),
        ("long sword", "Longsword"),
        ("short sword", "Shortsword"),
        ("great sword", "Greatsword"),
        ("short bow", "Shortbow"),
        ("long bow", "Longbow"),
        ("crossbow", "Light Crossbow"),
        ("leather", "Leather Armor"),
        ("plate", "Plate Armor"),
        ("ration", "Rations"),
        ("thieves tools", "Thieves' Tools"),
    ];
}
