//! Game Master layer.
//!
//! Takes structured proposals from the narrative AI, checks them against the
//! rules, and applies what is allowed.

mod game_master;
pub mod proposal;

pub use game_master::{GameMaster, GameMasterResponse};
pub use proposal::{
    CombatTrigger, NpcDialogue, ParsedAIProposal, PlayerChoice, ProposedReward, RewardType,
    SceneChange, TriggeredEnemy,
};
