//! # Warlord Core
//!
//! Deterministic rule engine for a turn-based territorial strategy game.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No input decoding
//! - No system randomness (every roll comes from a seeded ChaCha stream)
//!
//! Given the same seed and the same commands, two runs produce the same
//! state hash. This enables:
//! - Headless AI-vs-AI batches
//! - Determinism testing
//! - Save/load that resumes a game exactly
//!
//! ## Crate Structure
//!
//! - [`map`] - Terrain grid, unit storage, cities and ruins
//! - [`map_generation`] - Seeded terrain and setup
//! - [`movement`] - Reachability and attack targets
//! - [`combat`] - Damage resolution
//! - [`phase`] - Interaction phase machine
//! - [`game`] - Turn controller
//! - [`ai`] - Heuristic AI player
//! - [`save`] - Save payload and stores

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod map;
pub mod map_generation;
pub mod math;
pub mod movement;
pub mod phase;
pub mod save;
pub mod terrain;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiAction, AiController, AiTurnReport};
    pub use crate::combat::{calculate_damage, CombatOutcome, Damage};
    pub use crate::components::*;
    pub use crate::config::{AiConfig, GameConfig, PlayerSlot};
    pub use crate::error::{ActionError, ActionResult, GameError, Result};
    pub use crate::events::{EventListener, EventLog, GameEvent};
    pub use crate::game::{Command, CommandOutcome, Game, Selection};
    pub use crate::map::Map;
    pub use crate::math::{Fixed, GridPos};
    pub use crate::phase::Phase;
    pub use crate::save::{load_game, save_game, SaveData, SaveFormat, SaveStore};
    pub use crate::terrain::Terrain;
    pub use crate::unit_kind::UnitType;
}
