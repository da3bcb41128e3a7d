//! Headless Warlord game runner.
//!
//! Plays AI-vs-AI games without graphics. Designed for balance testing, CI
//! determinism checks and save inspection.
//!
//! # Usage
//!
//! ```bash
//! # One game of the default duel
//! cargo run -p warlord_headless -- run --seed 7 --show-map
//!
//! # A RON scenario, events and final save written to disk
//! cargo run -p warlord_headless -- run --scenario scenarios/skirmish.ron \
//!     --events events.json --save final.json
//!
//! # Batch balance test
//! cargo run -p warlord_headless -- batch --count 500 --output results/
//!
//! # Same seed, same hash
//! cargo run -p warlord_headless -- verify --seed 42 --runs 3
//!
//! # Continue a saved game
//! cargo run -p warlord_headless -- resume final.json --max-turns 200
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warlord_core::ai::AiController;
use warlord_core::config::AiConfig;
use warlord_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    load_for_ai, play_game, render_ascii, run_scenario, save_to_file, Scenario,
};

#[derive(Parser)]
#[command(name = "warlord_headless")]
#[command(about = "Headless Warlord runner for AI games and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one AI-vs-AI game
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Map and combat seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write every game event to this JSON file
        #[arg(long)]
        events: Option<PathBuf>,

        /// Save the final position here (.json for JSON, else binary)
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the final map
        #[arg(long)]
        show_map: bool,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Check that one seed always ends in the same state
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish_1v1")]
        scenario: String,

        /// Seed to replay
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Load a save file and play it to the end
    Resume {
        /// Save file (.json for JSON, else binary)
        file: PathBuf,

        /// Turn limit
        #[arg(long, default_value = "100")]
        max_turns: u32,

        /// Save the final position here
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let outcome = match cli.command {
        Commands::Run {
            scenario,
            seed,
            events,
            save,
            show_map,
        } => cmd_run(&scenario, seed, events.as_deref(), save.as_deref(), show_map),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        } => cmd_batch(scenario, count, parallel, output, seed),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
        Commands::Resume {
            file,
            max_turns,
            save,
        } => cmd_resume(&file, max_turns, save.as_deref()),
    };

    match outcome {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Play one game
fn cmd_run(
    scenario: &str,
    seed: u64,
    events_path: Option<&Path>,
    save: Option<&Path>,
    show_map: bool,
) -> Result<ExitCode, String> {
    let scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    tracing::info!(scenario = %scenario.name, seed, "Starting game");

    let mut events = Vec::new();
    let (game, result) = run_scenario(&scenario, seed, events_path.map(|_| &mut events))
        .map_err(|e| e.to_string())?;

    if let Some(path) = events_path {
        let json = serde_json::to_string_pretty(&events).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("{}: {e}", path.display()))?;
        tracing::info!(count = events.len(), path = %path.display(), "Events written");
    }
    if let Some(path) = save {
        save_to_file(&game, path).map_err(|e| e.to_string())?;
    }
    if show_map {
        eprintln!("{}", render_ascii(game.map()));
    }
    print_json(&result)?;
    Ok(ExitCode::SUCCESS)
}

/// Run batch of games for balance testing
fn cmd_batch(
    scenario: String,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
) -> Result<ExitCode, String> {
    std::fs::create_dir_all(&output)
        .map_err(|e| format!("Cannot create output directory '{}': {e}", output.display()))?;

    let config = BatchConfig {
        scenario,
        game_count: count,
        parallel_games: parallel,
        output_dir: output.clone(),
        seed_start: seed,
    };
    let results = run_batch(config).map_err(|e| e.to_string())?;

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;
    tracing::info!(path = %results_path.display(), "Results saved");

    print_json(&results.summary)?;
    Ok(ExitCode::SUCCESS)
}

/// Verify determinism for one seed
fn cmd_verify(scenario: &str, seed: u64, runs: u32) -> Result<ExitCode, String> {
    let scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    let deterministic = verify_determinism(&scenario, seed, runs).map_err(|e| e.to_string())?;
    if deterministic {
        tracing::info!(seed, runs, "All runs matched");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(seed, runs, "Runs diverged");
        Ok(ExitCode::FAILURE)
    }
}

/// Resume a saved game
fn cmd_resume(file: &Path, max_turns: u32, save: Option<&Path>) -> Result<ExitCode, String> {
    let mut game =
        load_for_ai(file).ok_or_else(|| format!("Could not load save '{}'", file.display()))?;
    tracing::info!(turn = game.turn(), player = game.current_player_id(), "Resuming");

    let controller = AiController::new(AiConfig::default());
    let result = play_game(&mut game, &controller, max_turns, None);

    if let Some(path) = save {
        save_to_file(&game, path).map_err(|e| e.to_string())?;
    }
    print_json(&result)?;
    Ok(ExitCode::SUCCESS)
}
