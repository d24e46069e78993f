//! D&D 5e rules core for an AI Game Master.
//!
//! This crate provides:
//! - Dice mechanics with an injectable, seedable roller
//! - Skill checks, saving throws, and contested checks
//! - Attack, damage, healing, and level-up resolution
//! - A turn-based combat state machine
//! - Validation and capped execution of AI-proposed actions
//!
//! Every operation takes a state snapshot and returns a new one along with
//! the story events it produced. Nothing here performs I/O.
//!
//! # Quick Start
//!
//! ```ignore
//! use dnd_rules::dm::{GameMaster, ParsedAIProposal, ProposedReward};
//! use dnd_rules::world::{Character, CharacterClass, GameState};
//!
//! let mut gm = GameMaster::seeded(7);
//! let state = GameState::new(Character::new("Thorin", CharacterClass::Fighter));
//!
//! let proposal = ParsedAIProposal::narration("The innkeeper tosses you a purse.")
//!     .with_reward(ProposedReward::gold(500));
//! let response = gm.process_ai_response(&state, "I ask for my wages", &proposal);
//!
//! // Rewards are capped by level: 75 gold at level 1.
//! assert_eq!(response.updated_state.player.inventory.gold, 75);
//! ```

pub mod actions;
pub mod combat;
pub mod config;
pub mod dice;
pub mod dm;
pub mod encounter;
pub mod items;
pub mod monsters;
pub mod rules;
pub mod skills;
pub mod story;
pub mod testing;
pub mod world;

// Primary public API
pub use actions::{ActionError, GameAction, ProposedAction};
pub use config::{ConfigError, RulesConfig};
pub use dice::{Advantage, DiceEngine, DiceError, DiceNotation};
pub use dm::{GameMaster, GameMasterResponse, ParsedAIProposal};
pub use encounter::{CombatAction, CombatManager, CombatPhase, CombatState};
pub use rules::{ActionExecutor, ActionValidator, ValidationResult};
pub use story::{StoryEvent, StoryEventKind};
pub use world::{Character, CharacterClass, GameState};
