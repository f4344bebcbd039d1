//! Turn-processing benchmarks for hexwar_core.
//!
//! Run with: `cargo bench -p hexwar_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hexwar_core::combat::{CombatContext, CombatSimulator};
use hexwar_core::coords::AxialCoord;
use hexwar_core::moves::GameMove;
use hexwar_test_utils::fixtures::{fixed, rules, skirmish_game, terrains, units, WorldBuilder};

/// Dijkstra over the skirmish map and over a large open field.
pub fn movement_benchmark(c: &mut Criterion) {
    let game = skirmish_game(1);
    let infantry = game
        .refreshed(game.world().unit_at(AxialCoord::new(-3, 0)).expect("fixture unit"))
        .expect("refresh");
    c.bench_function("movement_options_skirmish", |b| {
        b.iter(|| {
            game.rules()
                .movement_options(game.world(), black_box(&infantry), infantry.distance_left, false)
                .expect("paths")
        });
    });

    let open = WorldBuilder::hexagon(20, terrains::GRASS)
        .unit(0, 0, 1, units::TANK)
        .build();
    let rules = rules();
    let tank = open.unit_at(AxialCoord::ORIGIN).expect("tank").clone();
    c.bench_function("movement_options_open_field", |b| {
        b.iter(|| {
            rules
                .movement_options(&open, black_box(&tank), fixed(8), false)
                .expect("paths")
        });
    });
}

/// Damage distributions at the sizes the service uses.
pub fn combat_benchmark(c: &mut Criterion) {
    let rules = rules();
    let simulator = CombatSimulator::new(&rules);
    let ctx = CombatContext {
        attacker_type: units::TANK,
        attacker_terrain: terrains::GRASS,
        attacker_health: 10,
        defender_type: units::INFANTRY,
        defender_terrain: terrains::FOREST,
        defender_health: 10,
        wound_bonus: 1,
    };
    c.bench_function("damage_distribution_200", |b| {
        b.iter(|| simulator.damage_distribution(black_box(&ctx), 200).expect("distribution"));
    });
    c.bench_function("damage_distribution_1000", |b| {
        b.iter(|| simulator.damage_distribution(black_box(&ctx), 1000).expect("distribution"));
    });
}

/// A short batch through the transactional path, and the options query.
pub fn batch_benchmark(c: &mut Criterion) {
    let batch = [
        GameMove::MoveUnit {
            from: AxialCoord::new(-3, 0),
            to: AxialCoord::new(-1, 0),
        },
        GameMove::MoveUnit {
            from: AxialCoord::new(-3, 1),
            to: AxialCoord::new(-1, 1),
        },
        GameMove::EndTurn,
    ];
    c.bench_function("process_moves_batch", |b| {
        b.iter_batched(
            || skirmish_game(1),
            |mut game| game.process_moves(black_box(&batch)).expect("batch"),
            criterion::BatchSize::SmallInput,
        );
    });

    let game = skirmish_game(1);
    c.bench_function("get_options_at_archer", |b| {
        b.iter(|| game.get_options_at(black_box(AxialCoord::new(-4, 1))).expect("options"));
    });
}

criterion_group!(benches, movement_benchmark, combat_benchmark, batch_benchmark);
criterion_main!(benches);
