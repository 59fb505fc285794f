//! Criterion benchmarks for full-game throughput.
//!
//! Run with:
//!     cargo bench --bench game_throughput

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use dice_duel_engine::engine::arena::{run_arena, ArenaOptions};
use dice_duel_engine::engine::controller::GameController;
use dice_duel_engine::engine::models::EngineConfig;
use dice_duel_engine::engine::profiles::BUILTIN_PROFILES;
use dice_duel_engine::engine::storage::MemoryStore;
use dice_duel_engine::engine::strategy::AdaptiveStrategy;

fn bench_single_game(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_game");

    for seed in [7u64, 42, 1234] {
        group.bench_with_input(BenchmarkId::new("seeded", seed), &seed, |b, &seed| {
            b.iter(|| {
                let config = EngineConfig {
                    random_seed: Some(seed),
                    ..Default::default()
                };
                let mut game = GameController::new(
                    config,
                    Box::<AdaptiveStrategy>::default(),
                    Box::new(MemoryStore::new()),
                )
                .unwrap();
                let mut state = game.state();
                while !state.is_game_over {
                    state = game.throw_dice().unwrap();
                }
                state.player_attempts
            });
        });
    }

    group.finish();
}

fn bench_arena_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_batch");
    group.sample_size(10);

    for num_games in [10usize, 50] {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_games),
            &num_games,
            |b, &num_games| {
                b.iter(|| {
                    let options = ArenaOptions {
                        num_games,
                        base_seed: 42,
                        ..Default::default()
                    };
                    run_arena(
                        ("balanced", &BUILTIN_PROFILES["balanced"]),
                        ("daring", &BUILTIN_PROFILES["daring"]),
                        &options,
                    )
                    .unwrap()
                    .num_games
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_game, bench_arena_batch);
criterion_main!(benches);
