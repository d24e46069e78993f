//! Rules configuration.
//!
//! Holds the numeric limits the rules layer enforces against AI proposals
//! (reward caps, DC clamping, inventory size) and the house-rule choices
//! (hit point growth on level-up, flee DC). Every engine receives its
//! configuration explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How maximum hit points grow on level-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum HpGrowth {
    /// Fixed average of the hit die (`sides / 2 + 1`) plus CON modifier.
    #[default]
    Average,
    /// Roll the hit die plus CON modifier.
    Rolled,
}

/// Limits and house rules for one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RulesConfig {
    pub gold_cap_base: u32,
    pub gold_cap_per_level: u32,
    pub xp_cap_base: u32,
    pub xp_cap_per_level: u32,
    /// Maximum number of item entries a character can carry.
    pub inventory_capacity: usize,
    pub flee_dc: i32,
    /// Proposed DCs are clamped into `min_dc..=max_dc`.
    pub min_dc: i32,
    pub max_dc: i32,
    pub hp_growth: HpGrowth,
    pub max_level: u8,
    /// Largest reputation change a single reward may apply, either direction.
    pub reputation_cap: i32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            gold_cap_base: 50,
            gold_cap_per_level: 25,
            xp_cap_base: 100,
            xp_cap_per_level: 50,
            inventory_capacity: 30,
            flee_dc: 10,
            min_dc: 1,
            max_dc: 30,
            hp_growth: HpGrowth::Average,
            max_level: 20,
            reputation_cap: 10,
        }
    }
}

impl RulesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overrides from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RulesConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_dc > self.max_dc {
            return Err(ConfigError::Invalid(format!(
                "min_dc {} exceeds max_dc {}",
                self.min_dc, self.max_dc
            )));
        }
        if !(1..=20).contains(&self.max_level) {
            return Err(ConfigError::Invalid(format!(
                "max_level must be 1-20, got {}",
                self.max_level
            )));
        }
        if self.inventory_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inventory_capacity must be positive".to_string(),
            ));
        }
        if self.reputation_cap < 0 {
            return Err(ConfigError::Invalid(
                "reputation_cap must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Most gold a single proposal may grant at `level`.
    pub fn gold_cap(&self, level: u8) -> u32 {
        self.gold_cap_base + self.gold_cap_per_level * level as u32
    }

    /// Most experience a single proposal may grant at `level`.
    pub fn xp_cap(&self, level: u8) -> u32 {
        self.xp_cap_base + self.xp_cap_per_level * level as u32
    }

    pub fn clamp_dc(&self, dc: i32) -> i32 {
        dc.clamp(self.min_dc, self.max_dc)
    }

    pub fn with_gold_cap(mut self, base: u32, per_level: u32) -> Self {
        self.gold_cap_base = base;
        self.gold_cap_per_level = per_level;
        self
    }

    pub fn with_xp_cap(mut self, base: u32, per_level: u32) -> Self {
        self.xp_cap_base = base;
        self.xp_cap_per_level = per_level;
        self
    }

    pub fn with_inventory_capacity(mut self, capacity: usize) -> Self {
        self.inventory_capacity = capacity;
        self
    }

    pub fn with_flee_dc(mut self, dc: i32) -> Self {
        self.flee_dc = dc;
        self
    }

    pub fn with_dc_range(mut self, min: i32, max: i32) -> Self {
        self.min_dc = min;
        self.max_dc = max;
        self
    }

    pub fn with_hp_growth(mut self, growth: HpGrowth) -> Self {
        self.hp_growth = growth;
        self
    }

    pub fn with_max_level(mut self, level: u8) -> Self {
        self.max_level = level;
        self
    }

    pub fn with_reputation_cap(mut self, cap: i32) -> Self {
        self.reputation_cap = cap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps() {
        let config = RulesConfig::default();
        assert_eq!(config.gold_cap(1), 75);
        assert_eq!(config.xp_cap(1), 150);
        assert_eq!(config.gold_cap(10), 300);
        assert_eq!(config.xp_cap(10), 600);
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = RulesConfig::from_json_str(r#"{"fleeDc": 12, "hpGrowth": "rolled"}"#).unwrap();
        assert_eq!(config.flee_dc, 12);
        assert_eq!(config.hp_growth, HpGrowth::Rolled);
        assert_eq!(config.gold_cap_base, 50);
    }

    #[test]
    fn test_from_json_rejects_inverted_dc_range() {
        let result = RulesConfig::from_json_str(r#"{"minDc": 25, "maxDc": 10}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_clamp_dc() {
        let config = RulesConfig::default().with_dc_range(5, 25);
        assert_eq!(config.clamp_dc(99), 25);
        assert_eq!(config.clamp_dc(-3), 5);
        assert_eq!(config.clamp_dc(15), 15);
    }
}
