//! Headless game runner for AI-vs-AI games and CI verification.
//!
//! Plays complete games with every seat under the heuristic AI, without
//! any rendering. This enables:
//!
//! - **Balance testing**: batches of seeded games with win-rate summaries
//! - **CI verification**: the same seed must end in the same state hash
//! - **Save inspection**: games can be saved to disk and resumed
//!
//! # Example
//!
//! ```bash
//! # One game from a RON scenario, events dumped as JSON
//! cargo run -p warlord_headless -- run --scenario scenarios/skirmish.ron --events events.json
//!
//! # 200 seeds in parallel
//! cargo run -p warlord_headless -- batch --count 200 --output results/
//!
//! # Determinism check
//! cargo run -p warlord_headless -- verify --seed 42 --runs 3
//! ```

pub mod ascii;
pub mod batch;
pub mod runner;
pub mod scenario;

pub use ascii::render_ascii;
pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use runner::{load_for_ai, load_from_file, play_game, run_scenario, save_to_file, GameOutcome, GameResult};
pub use scenario::{Scenario, ScenarioError};
