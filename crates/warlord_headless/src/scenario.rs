//! Scenario loading and configuration.
//!
//! A scenario wraps a [`GameConfig`] with the knobs a headless run needs:
//! a turn limit and the AI tuning. Scenarios are stored as RON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warlord_core::config::{AiConfig, GameConfig, PlayerSlot};
use warlord_core::error::GameError;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The game config is not playable.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
    /// No built-in scenario has this name.
    #[error("Unknown scenario: {0}")]
    Unknown(String),
}

/// A complete headless scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Game setup. Every seat is played by the AI regardless of its flag.
    pub game: GameConfig,
    /// AI tuning.
    pub ai: AiConfig,
    /// Stop after this many full rounds without a winner.
    pub max_turns: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish_1v1()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.game.validate()?;
        Ok(scenario)
    }

    /// Standard two-player duel on the default 20x15 map.
    #[must_use]
    pub fn skirmish_1v1() -> Self {
        Self {
            name: "skirmish_1v1".to_string(),
            description: "Two AI warlords on the default map".to_string(),
            game: GameConfig::default().all_ai(),
            ai: AiConfig::default(),
            max_turns: 100,
        }
    }

    /// Four-player free-for-all on a larger map.
    #[must_use]
    pub fn ffa_4p() -> Self {
        let players = ["Red", "Blue", "Green", "Gold"]
            .into_iter()
            .map(PlayerSlot::ai)
            .collect();
        let mut game = GameConfig::default().with_size(28, 20).with_players(players);
        game.neutral_cities = 10;
        game.ruins = 6;
        Self {
            name: "ffa_4p".to_string(),
            description: "Four AI warlords, every one for themselves".to_string(),
            game,
            ai: AiConfig::default(),
            max_turns: 150,
        }
    }

    /// Built-in scenario by name.
    pub fn builtin(name: &str) -> Result<Self, ScenarioError> {
        match name {
            "skirmish_1v1" => Ok(Self::skirmish_1v1()),
            "ffa_4p" => Ok(Self::ffa_4p()),
            other => Err(ScenarioError::Unknown(other.to_string())),
        }
    }

    /// A built-in name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Err(ScenarioError::Unknown(_)) => Self::load(name_or_path),
            found => found,
        }
    }

    /// Game config for one seeded run, every seat AI-controlled.
    #[must_use]
    pub fn game_config(&self, seed: u64) -> GameConfig {
        self.game.clone().all_ai().with_seed(seed)
    }
}
