//! Single-game runner.
//!
//! Drives a game with the heuristic AI in every seat until someone wins or
//! the turn limit runs out, and records the result.

use std::path::Path;

use serde::{Deserialize, Serialize};
use warlord_core::ai::AiController;
use warlord_core::components::PlayerId;
use warlord_core::error::SaveError;
use warlord_core::events::GameEvent;
use warlord_core::game::Game;
use warlord_core::save::{FileStore, SaveData, SaveFormat, SaveStore};

use crate::scenario::{Scenario, ScenarioError};

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// One player remains.
    Victory(PlayerId),
    /// Everyone fell at once.
    Draw,
    /// The turn limit ran out first.
    TurnLimit,
}

/// Summary of one finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Seed the game was generated from.
    pub seed: u64,
    /// How it ended.
    pub outcome: GameOutcome,
    /// Winner's display name, if any.
    pub winner_name: Option<String>,
    /// Turn counter when play stopped.
    pub turns: u32,
    /// AI turns played.
    pub ai_turns: u32,
    /// Living units per player at the end.
    pub units_alive: Vec<usize>,
    /// Cities held per player at the end.
    pub cities_held: Vec<usize>,
    /// Errors the AI logged along the way.
    pub ai_errors: Vec<String>,
    /// Final state hash.
    pub final_hash: u64,
}

impl GameResult {
    /// Winning player id, if any.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match self.outcome {
            GameOutcome::Victory(id) => Some(id),
            GameOutcome::Draw | GameOutcome::TurnLimit => None,
        }
    }
}

/// Play until the game ends or the turn counter passes `max_turns`.
///
/// Drained events are appended to `events` when given.
pub fn play_game(
    game: &mut Game,
    controller: &AiController,
    max_turns: u32,
    mut events: Option<&mut Vec<GameEvent>>,
) -> GameResult {
    let mut ai_turns = 0;
    let mut ai_errors = Vec::new();

    while !game.is_game_over() && game.turn() <= max_turns {
        match controller.play_turn(game) {
            Ok(report) => {
                ai_turns += 1;
                ai_errors.extend(report.errors);
            }
            Err(error) => {
                tracing::error!(%error, "AI refused to play");
                ai_errors.push(error.to_string());
                break;
            }
        }
        let drained = game.drain_events();
        if let Some(sink) = events.as_deref_mut() {
            sink.extend(drained);
        }
    }

    let outcome = if game.is_game_over() {
        game.winner().map_or(GameOutcome::Draw, GameOutcome::Victory)
    } else {
        GameOutcome::TurnLimit
    };
    let map = game.map();
    let result = GameResult {
        seed: game.seed(),
        outcome,
        winner_name: game
            .winner()
            .and_then(|id| game.player(id))
            .map(|p| p.name.clone()),
        turns: game.turn(),
        ai_turns,
        units_alive: game
            .players()
            .iter()
            .map(|p| map.units_of(p.id).count())
            .collect(),
        cities_held: game
            .players()
            .iter()
            .map(|p| map.cities_of(p.id).count())
            .collect(),
        ai_errors,
        final_hash: game.state_hash(),
    };
    tracing::info!(
        seed = result.seed,
        outcome = ?result.outcome,
        turns = result.turns,
        "Game finished"
    );
    result
}

/// Generate and play one seeded game of a scenario.
pub fn run_scenario(
    scenario: &Scenario,
    seed: u64,
    events: Option<&mut Vec<GameEvent>>,
) -> Result<(Game, GameResult), ScenarioError> {
    let mut game = Game::new(&scenario.game_config(seed))?;
    let controller = AiController::new(scenario.ai.clone());
    let result = play_game(&mut game, &controller, scenario.max_turns, events);
    Ok((game, result))
}

/// Save format implied by a file name: `.json` is JSON, anything else bincode.
#[must_use]
pub fn format_for(path: &Path) -> SaveFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => SaveFormat::Json,
        _ => SaveFormat::Binary,
    }
}

fn split(path: &Path) -> (FileStore, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let slot = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (FileStore::new(dir), slot)
}

/// Write a game to a file.
pub fn save_to_file(game: &Game, path: &Path) -> Result<(), SaveError> {
    let (mut store, slot) = split(path);
    game.save_to(&mut store, &slot, format_for(path))?;
    tracing::debug!(path = %store.path(&slot).display(), "Save written");
    Ok(())
}

/// Read a game from a file, `None` if it is missing or corrupt.
#[must_use]
pub fn load_from_file(path: &Path) -> Option<Game> {
    let (store, slot) = split(path);
    Game::load_from(&store, &slot, format_for(path))
}

/// Read a save for headless play: every seat is handed to the AI.
///
/// `None` if the file is missing or corrupt.
#[must_use]
pub fn load_for_ai(path: &Path) -> Option<Game> {
    let (store, slot) = split(path);
    let loaded = store
        .read(&slot)
        .and_then(|bytes| SaveData::decode(&bytes, format_for(path)))
        .and_then(|mut data| {
            for player in &mut data.players {
                player.is_ai = true;
            }
            data.restore()
        });
    match loaded {
        Ok(game) => Some(game),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "Failed to load save");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> Scenario {
        let mut scenario = Scenario::skirmish_1v1();
        scenario.max_turns = 10;
        scenario
    }

    #[test]
    fn test_run_respects_turn_limit() {
        let (game, result) = run_scenario(&quick(), 3, None).unwrap();
        assert!(result.turns <= 11);
        assert_eq!(result.final_hash, game.state_hash());
        if result.outcome == GameOutcome::TurnLimit {
            assert!(!game.is_game_over());
        }
    }

    #[test]
    fn test_events_collected() {
        let mut events = Vec::new();
        run_scenario(&quick(), 3, Some(&mut events)).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::AiTurnStarted { .. })));
    }

    #[test]
    fn test_same_seed_same_result() {
        let (_, a) = run_scenario(&quick(), 21, None).unwrap();
        let (_, b) = run_scenario(&quick(), 21, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_format_for_extension() {
        assert_eq!(format_for(Path::new("a/b.json")), SaveFormat::Json);
        assert_eq!(format_for(Path::new("a/b.sav")), SaveFormat::Binary);
    }
}
