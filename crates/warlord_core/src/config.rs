//! Game and AI configuration.
//!
//! Configs are plain serde data, loadable from RON so scenarios can be kept
//! as data files next to the binaries.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::components::STARTING_GOLD;
use crate::error::{GameError, Result};

/// Most players a game supports.
pub const MAX_PLAYERS: usize = 4;

/// Smallest side length the generator accepts.
pub const MIN_GENERATED_SIDE: u32 = 8;

/// Largest side length the generator accepts.
pub const MAX_GENERATED_SIDE: u32 = 256;

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// Display name.
    pub name: String,
    /// Controlled by the heuristic AI.
    pub is_ai: bool,
}

impl PlayerSlot {
    /// A human-controlled seat.
    #[must_use]
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ai: false,
        }
    }

    /// An AI-controlled seat.
    #[must_use]
    pub fn ai(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_ai: true,
        }
    }
}

/// Everything needed to set up a new game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Random seed for terrain, setup, combat rolls and ruin loot.
    pub seed: u64,
    /// Seats, in turn order.
    pub players: Vec<PlayerSlot>,
    /// Gold each player starts with.
    pub starting_gold: u32,
    /// Target share of forest tiles, in percent.
    pub forest_percent: u32,
    /// Target share of mountain tiles, in percent.
    pub mountain_percent: u32,
    /// Target share of water tiles, in percent.
    pub water_percent: u32,
    /// Neutral cities to scatter.
    pub neutral_cities: u32,
    /// Ruins to scatter.
    pub ruins: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 15,
            seed: 12345,
            players: vec![PlayerSlot::human("Red"), PlayerSlot::ai("Blue")],
            starting_gold: STARTING_GOLD,
            forest_percent: 20,
            mountain_percent: 15,
            water_percent: 5,
            neutral_cities: 6,
            ruins: 4,
        }
    }
}

impl GameConfig {
    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the map size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Replace the seats.
    #[must_use]
    pub fn with_players(mut self, players: Vec<PlayerSlot>) -> Self {
        self.players = players;
        self
    }

    /// Make every seat AI-controlled.
    #[must_use]
    pub fn all_ai(mut self) -> Self {
        for slot in &mut self.players {
            slot.is_ai = true;
        }
        self
    }

    /// Check the config describes a game the generator can lay out.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for a bad player count, a map
    /// side outside [`MIN_GENERATED_SIDE`]..=[`MAX_GENERATED_SIDE`], or
    /// terrain ratios above 100%.
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_PLAYERS).contains(&self.players.len()) {
            return Err(GameError::InvalidConfig(format!(
                "expected 2-{MAX_PLAYERS} players, got {}",
                self.players.len()
            )));
        }
        if self.width < MIN_GENERATED_SIDE || self.height < MIN_GENERATED_SIDE {
            return Err(GameError::InvalidConfig(format!(
                "map must be at least {MIN_GENERATED_SIDE}x{MIN_GENERATED_SIDE}, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_GENERATED_SIDE || self.height > MAX_GENERATED_SIDE {
            return Err(GameError::InvalidConfig(format!(
                "map must be at most {MAX_GENERATED_SIDE}x{MAX_GENERATED_SIDE}, got {}x{}",
                self.width, self.height
            )));
        }
        let terrain_total = self.forest_percent + self.mountain_percent + self.water_percent;
        if terrain_total > 100 {
            return Err(GameError::InvalidConfig(format!(
                "terrain ratios sum to {terrain_total}%"
            )));
        }
        Ok(())
    }

    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the text is not a valid config.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::ConfigParse {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let label = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| GameError::ConfigParse {
            path: label.clone(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&content, &label)
    }
}

/// Tuning for the heuristic AI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Light infantry to keep before diversifying production.
    pub min_cheap_units: usize,
    /// Pause a spectator-facing presenter should leave between logged
    /// actions. The engine never sleeps.
    pub action_delay: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            min_cheap_units: 3,
            action_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.width, config.height), (20, 15));
        assert_eq!(config.starting_gold, 50);
    }

    #[test]
    fn test_rejects_too_many_players() {
        let config = GameConfig::default().with_players(vec![PlayerSlot::ai("x"); 5]);
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_tiny_map() {
        let config = GameConfig::default().with_size(4, 4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_map() {
        let config = GameConfig::default().with_size(70_000, 70_000);
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        let tall = GameConfig::default().with_size(20, MAX_GENERATED_SIDE + 1);
        assert!(tall.validate().is_err());

        let largest = GameConfig::default().with_size(MAX_GENERATED_SIDE, MAX_GENERATED_SIDE);
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_ron() {
        let config = GameConfig::from_ron_str("(width: 12, height: 10, seed: 99)", "inline").unwrap();
        assert_eq!(config.width, 12);
        assert_eq!(config.seed, 99);
        assert_eq!(config.players.len(), 2);
    }

    #[test]
    fn test_parse_error_reports_label() {
        let err = GameConfig::from_ron_str("(width: \"wide\")", "bad.ron").unwrap_err();
        assert!(err.to_string().contains("bad.ron"));
    }

    #[test]
    fn test_all_ai() {
        let config = GameConfig::default().all_ai();
        assert!(config.players.iter().all(|p| p.is_ai));
    }
}
