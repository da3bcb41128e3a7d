//! Batch game runner for balance testing.
//!
//! Runs many seeded games of one scenario in parallel using rayon and
//! summarises who won.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{run_scenario, GameOutcome, GameResult};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or RON path
    pub scenario: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Seed of the first game; game `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "skirmish_1v1".to_string(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Aggregate numbers over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games that finished
    pub total_games: u32,
    /// Wins by player name
    pub wins: BTreeMap<String, u32>,
    /// Win rate by player name, 0.0..=1.0
    pub win_rates: BTreeMap<String, f64>,
    /// Games where everyone fell at once
    pub draws: u32,
    /// Games stopped by the turn limit
    pub turn_limits: u32,
    /// Mean final turn counter
    pub average_turns: f64,
}

impl BatchSummary {
    /// Summarise finished games.
    pub fn from_games(games: &[GameResult]) -> Self {
        let mut summary = Self {
            total_games: games.len() as u32,
            ..Self::default()
        };
        if games.is_empty() {
            return summary;
        }
        for game in games {
            match (&game.outcome, &game.winner_name) {
                (GameOutcome::Victory(_), Some(name)) => {
                    *summary.wins.entry(name.clone()).or_insert(0) += 1;
                }
                (GameOutcome::Victory(_), None) | (GameOutcome::Draw, _) => summary.draws += 1,
                (GameOutcome::TurnLimit, _) => summary.turn_limits += 1,
            }
        }
        let total = f64::from(summary.total_games);
        summary.win_rates = summary
            .wins
            .iter()
            .map(|(name, wins)| (name.clone(), f64::from(*wins) / total))
            .collect();
        summary.average_turns = games.iter().map(|g| f64::from(g.turns)).sum::<f64>() / total;
        summary
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game results, in seed order
    pub games: Vec<GameResult>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

fn play_all(scenario: &Scenario, config: &BatchConfig) -> Vec<Result<GameResult, BatchError>> {
    (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_scenario(scenario, seed, None) {
                Ok((_, result)) => {
                    debug!(game = i, seed, outcome = ?result.outcome, "Game done");
                    Ok(result)
                }
                Err(e) => {
                    warn!("Game {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect()
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let scenario = Scenario::resolve(&config.scenario)?;
    let start = Instant::now();

    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, scenario.name
    );

    let pool = (config.parallel_games > 0)
        .then(|| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel_games as usize)
                .build()
        })
        .transpose()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Could not build thread pool, using the global one");
            None
        });
    let results = match &pool {
        Some(pool) => pool.install(|| play_all(&scenario, &config)),
        None => play_all(&scenario, &config),
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameResult> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    })
}

/// Play the same seed `runs` times and check every run ends identically.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool, ScenarioError> {
    let (_, expected) = run_scenario(scenario, seed, None)?;
    for run in 1..runs {
        let (_, result) = run_scenario(scenario, seed, None)?;
        if result != expected {
            warn!(
                run,
                expected = expected.final_hash,
                found = result.final_hash,
                "Run diverged"
            );
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config(count: u32) -> BatchConfig {
        BatchConfig::new("skirmish_1v1", count).with_seed(100)
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("ffa_4p", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345);

        assert_eq!(config.scenario, "ffa_4p");
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(quick_config(4)).unwrap();

        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103]);
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(run_batch(BatchConfig::new("nope.ron", 1)).is_err());
    }

    #[test]
    fn test_summary_counts() {
        let game = |outcome, name: Option<&str>, turns| GameResult {
            seed: 0,
            outcome,
            winner_name: name.map(str::to_string),
            turns,
            ai_turns: 0,
            units_alive: vec![],
            cities_held: vec![],
            ai_errors: vec![],
            final_hash: 0,
        };
        let summary = BatchSummary::from_games(&[
            game(GameOutcome::Victory(0), Some("Red"), 10),
            game(GameOutcome::Victory(0), Some("Red"), 20),
            game(GameOutcome::TurnLimit, None, 30),
            game(GameOutcome::Draw, None, 40),
        ]);
        assert_eq!(summary.wins["Red"], 2);
        assert!((summary.win_rates["Red"] - 0.5).abs() < 1e-9);
        assert_eq!(summary.turn_limits, 1);
        assert_eq!(summary.draws, 1);
        assert!((summary.average_turns - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_verify_determinism() {
        let mut scenario = Scenario::skirmish_1v1();
        scenario.max_turns = 8;
        assert!(verify_determinism(&scenario, 12345, 3).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(quick_config(2)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config.scenario, "skirmish_1v1");
    }
}
