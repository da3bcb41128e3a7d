//! Turn benchmarks for warlord_core.
//!
//! Run with: `cargo bench -p warlord_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use warlord_core::ai::AiController;
use warlord_core::config::{AiConfig, GameConfig};
use warlord_core::game::Game;
use warlord_core::map_generation::generate_map;
use warlord_core::movement::reachable_tiles;

fn ai_game(seed: u64) -> Game {
    Game::new(&GameConfig::default().all_ai().with_seed(seed)).unwrap()
}

/// Map generation, movement search and a full AI turn.
pub fn turn_benchmark(c: &mut Criterion) {
    let config = GameConfig::default();
    c.bench_function("generate_map_20x15", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(black_box(7));
            generate_map(&config, &mut rng)
        });
    });

    let game = ai_game(7);
    let hero = game.map().hero_of(0).unwrap().clone();
    c.bench_function("reachable_tiles_hero", |b| {
        b.iter(|| reachable_tiles(game.map(), black_box(&hero)));
    });

    let controller = AiController::new(AiConfig::default());
    c.bench_function("ai_turn", |b| {
        b.iter_batched(
            || ai_game(7),
            |mut game| controller.play_turn(&mut game),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, turn_benchmark);
criterion_main!(benches);
