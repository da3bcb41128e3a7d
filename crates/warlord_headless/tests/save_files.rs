//! Save files on disk through the headless runner.

use warlord_core::ai::AiController;
use warlord_core::config::{AiConfig, GameConfig};
use warlord_core::game::Game;
use warlord_headless::runner::GameOutcome;
use warlord_headless::{load_for_ai, load_from_file, play_game, run_scenario, save_to_file, Scenario};
use warlord_test_utils::determinism::{ai_game, play_ai_turn};

fn short_scenario() -> Scenario {
    let mut scenario = Scenario::skirmish_1v1();
    scenario.max_turns = 6;
    scenario
}

#[test]
fn test_json_and_binary_files_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let (game, _) = run_scenario(&short_scenario(), 4, None).unwrap();

    for name in ["final.json", "final.sav"] {
        let path = dir.path().join(name);
        save_to_file(&game, &path).unwrap();
        assert!(path.exists());

        let loaded = load_from_file(&path).unwrap();
        if !game.is_game_over() {
            assert_eq!(loaded.state_hash(), game.state_hash());
        }
        assert_eq!(loaded.map().terrain(), game.map().terrain());
        assert_eq!(loaded.turn(), game.turn());
    }
}

#[test]
fn test_json_save_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.json");
    save_to_file(&ai_game(8), &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["width"], 20);
    assert_eq!(value["terrain"].as_array().unwrap().len(), 15);
}

#[test]
fn test_missing_and_corrupt_files_are_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_from_file(&dir.path().join("missing.json")).is_none());

    let corrupt = dir.path().join("corrupt.sav");
    std::fs::write(&corrupt, b"\x00\x01garbage").unwrap();
    assert!(load_from_file(&corrupt).is_none());
    assert!(load_for_ai(&corrupt).is_none());
}

#[test]
fn test_resume_hands_human_seats_to_ai() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("human.json");
    let game = Game::new(&GameConfig::default().with_seed(5)).unwrap();
    assert!(!game.current_player().is_ai);
    save_to_file(&game, &path).unwrap();

    let mut resumed = load_for_ai(&path).unwrap();
    assert!(resumed.players().iter().all(|p| p.is_ai));

    let controller = AiController::new(AiConfig::default());
    let result = play_game(&mut resumed, &controller, 3, None);
    assert!(result.ai_turns > 0);
    assert!(result.ai_errors.is_empty());
}

#[test]
fn test_resumed_game_continues_turns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mid.sav");
    let mut game = ai_game(17);
    for _ in 0..4 {
        play_ai_turn(&mut game);
    }
    save_to_file(&game, &path).unwrap();

    let mut resumed = load_from_file(&path).unwrap();
    let turn = resumed.turn();
    let controller = AiController::new(AiConfig::default());
    let result = play_game(&mut resumed, &controller, turn + 2, None);
    assert!(result.turns >= turn);
    if result.outcome == GameOutcome::TurnLimit {
        assert_eq!(result.turns, turn + 3);
    }
}
