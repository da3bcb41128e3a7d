//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the rule engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always visited in sorted id order.
//!
//! - **System randomness**: every roll comes from the game's seeded
//!   ChaCha stream, never from `thread_rng`.
//!
//! - **Floating-point math**: combat multipliers use fixed-point
//!   arithmetic via [`warlord_core::math::Fixed`].

use std::thread;

use warlord_core::ai::AiController;
use warlord_core::config::{AiConfig, GameConfig};
use warlord_core::game::Game;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps per run.
    pub steps: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Game is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine several times and compare final hashes.
///
/// # Example
///
/// ```ignore
/// let result = verify_determinism(3, 20, || ai_game(7), play_ai_turn, Game::state_hash);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    tracing::debug!(runs, steps, is_deterministic, "Determinism check finished");
    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// A generated game where every seat is AI-controlled.
///
/// # Panics
///
/// Panics if the default config fails validation, which would be a bug.
#[must_use]
pub fn ai_game(seed: u64) -> Game {
    Game::new(&GameConfig::default().all_ai().with_seed(seed)).expect("default config is valid")
}

/// Let the AI play the current player's turn. A finished game is left as is.
///
/// # Panics
///
/// Panics if the AI refuses the turn or records an error while playing it,
/// so a failing AI never passes for a deterministic one.
pub fn play_ai_turn(game: &mut Game) {
    if game.is_game_over() {
        return;
    }
    let turn = game.turn();
    let controller = AiController::new(AiConfig::default());
    let report = controller
        .play_turn(game)
        .unwrap_or_else(|error| panic!("AI refused turn {turn}: {error}"));
    assert!(report.errors.is_empty(), "AI errors: {:?}", report.errors);
}

/// Play the same AI game twice and compare hashes.
#[must_use]
pub fn verify_game_determinism(seed: u64, turns: u32) -> bool {
    verify_determinism(2, turns, || ai_game(seed), play_ai_turn, Game::state_hash).is_deterministic
}

/// Play AI games on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn run_parallel_games<F>(setup: F, games: usize, turns: u32) -> Vec<u64>
where
    F: Fn() -> Game + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..games)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup();
                    for _ in 0..turns {
                        play_ai_turn(&mut game);
                    }
                    game.state_hash()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("game thread panicked"))
            .collect()
    })
}

/// Step two copies of a game side by side and report the first AI turn
/// after which their hashes differ.
///
/// `None` if they never diverge.
pub fn find_first_divergence<F>(setup: F, turns: u32) -> Option<u32>
where
    F: Fn() -> Game,
{
    let mut a = setup();
    let mut b = setup();
    if a.state_hash() != b.state_hash() {
        return Some(0);
    }
    for turn in 1..=turns {
        play_ai_turn(&mut a);
        play_ai_turn(&mut b);
        if a.state_hash() != b.state_hash() {
            return Some(turn);
        }
    }
    None
}

/// Proptest strategies for rule engine inputs.
pub mod strategies {
    use proptest::prelude::*;
    use warlord_core::components::Artifact;
    use warlord_core::config::GameConfig;
    use warlord_core::math::GridPos;
    use warlord_core::terrain::Terrain;
    use warlord_core::unit_kind::UnitType;

    /// Any archetype, heroes included.
    pub fn arb_unit_type() -> impl Strategy<Value = UnitType> {
        proptest::sample::select(UnitType::ALL.to_vec())
    }

    /// Archetypes a city can build.
    pub fn arb_producible_type() -> impl Strategy<Value = UnitType> {
        proptest::sample::select(UnitType::BY_COST_DESC.to_vec())
    }

    /// Any terrain kind.
    pub fn arb_terrain() -> impl Strategy<Value = Terrain> {
        proptest::sample::select(Terrain::ALL.to_vec())
    }

    /// A terrain grid of the given size, row-major.
    pub fn arb_terrain_grid(width: u32, height: u32) -> impl Strategy<Value = Vec<Terrain>> {
        proptest::collection::vec(arb_terrain(), width as usize * height as usize)
    }

    /// A tile inside a `width` x `height` map.
    pub fn arb_grid_pos(width: u32, height: u32) -> impl Strategy<Value = GridPos> {
        (0..width, 0..height).prop_map(|(x, y)| GridPos::new(x, y))
    }

    /// Up to three artifacts.
    pub fn arb_artifacts() -> impl Strategy<Value = Vec<Artifact>> {
        proptest::collection::vec(proptest::sample::select(Artifact::CATALOG.to_vec()), 0..3)
    }

    /// A raw damage amount, including overkill values.
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..200
    }

    /// A heal amount.
    pub fn arb_heal() -> impl Strategy<Value = u32> {
        0u32..60
    }

    /// A terrain defense bonus as found on real maps.
    pub fn arb_terrain_bonus() -> impl Strategy<Value = u32> {
        0u32..=2
    }

    /// A small all-AI game config with a random seed and size.
    pub fn arb_small_config() -> impl Strategy<Value = GameConfig> {
        (any::<u64>(), 8u32..=14, 8u32..=12).prop_map(|(seed, w, h)| {
            GameConfig::default()
                .all_ai()
                .with_size(w, h)
                .with_seed(seed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_determinism_counter() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.hashes, vec![10, 10, 10]);
    }

    #[test]
    fn test_detects_divergence() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let counter = AtomicU64::new(0);
        let result = verify_determinism(
            2,
            1,
            || counter.fetch_add(1, Ordering::SeqCst),
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_ai_game_is_deterministic() {
        assert!(verify_game_determinism(2024, 12));
    }

    #[test]
    fn test_parallel_games_match() {
        let hashes = run_parallel_games(|| ai_game(5), 4, 6);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    #[should_panic(expected = "AI refused turn")]
    fn test_play_ai_turn_fails_on_human_seat() {
        let mut game = Game::new(&GameConfig::default()).unwrap();
        play_ai_turn(&mut game);
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| ai_game(9), 8), None);
    }
}
