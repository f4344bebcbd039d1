//! Optimistic lock tests.
//!
//! Two writers that read the same version race to save; exactly one wins
//! and the stored version moves on by one.

use std::sync::{Arc, Barrier};
use std::thread;

use hexwar_core::config::GameConfig;
use hexwar_core::coords::AxialCoord;
use hexwar_core::moves::GameMove;
use hexwar_core::state::{GameRecord, MoveGroup};
use hexwar_service::prelude::*;
use hexwar_test_utils::fixtures::{rules, skirmish_world};

fn record(id: &str) -> GameRecord {
    GameRecord {
        id: id.into(),
        name: "race".into(),
        config: GameConfig::with_players(2),
        created_at: 0,
    }
}

/// Both writers load version `v`, meet at a barrier, then save.
fn race<S>(storage: Arc<S>, game_id: &str)
where
    S: GameStorageProvider + GameStateUpdater + 'static,
{
    let start = storage.game_state_version(game_id).unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let outcomes: Vec<Result<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|writer| {
                let storage = Arc::clone(&storage);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    let (_, mut state) = storage.load_game(game_id)?;
                    let expected = state.version;
                    state.updated_at = writer;
                    barrier.wait();
                    storage.save_game_state(game_id, &state, expected)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let wins = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(wins, 1, "exactly one writer wins: {outcomes:?}");
    let loser = outcomes.iter().find_map(|o| o.as_ref().err()).unwrap();
    assert!(matches!(
        loser,
        ServiceError::VersionConflict { expected, actual, .. }
            if *expected == start && *actual == start + 1
    ));
    assert_eq!(storage.game_state_version(game_id).unwrap(), start + 1);
}

/// Eight writers append at once; every group gets its own number.
fn concurrent_appends<S>(storage: Arc<S>, game_id: &str)
where
    S: GameStorageProvider + 'static,
{
    let barrier = Arc::new(Barrier::new(8));
    let mut numbers: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let storage = Arc::clone(&storage);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    let group = MoveGroup {
                        group_number: 0,
                        player: 1,
                        turn: 1,
                        version: writer,
                        moves: Vec::new(),
                        created_at: 0,
                    };
                    barrier.wait();
                    storage.append_history(game_id, &group).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=8).collect::<Vec<u64>>());

    let history = storage.load_history(game_id).unwrap();
    let stored: Vec<u64> = history.groups.iter().map(|g| g.group_number).collect();
    assert_eq!(stored, (1..=8).collect::<Vec<u64>>());
}

#[test]
fn in_memory_appends_get_distinct_numbers() {
    let storage = Arc::new(InMemoryStorage::new());
    let service = GamesService::new(Arc::clone(&storage), rules(), ServiceConfig::default());
    service.create_game(record("mem"), skirmish_world(), 1).unwrap();
    concurrent_appends(storage, "mem");
}

#[test]
fn file_appends_get_distinct_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let service = GamesService::new(Arc::clone(&storage), rules(), ServiceConfig::default());
    service.create_game(record("disk"), skirmish_world(), 1).unwrap();
    concurrent_appends(storage, "disk");
}

#[test]
fn in_memory_race_has_one_winner() {
    let storage = Arc::new(InMemoryStorage::new());
    let service = GamesService::new(Arc::clone(&storage), rules(), ServiceConfig::default());
    service.create_game(record("mem"), skirmish_world(), 1).unwrap();
    race(storage, "mem");
}

#[test]
fn file_race_has_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let service = GamesService::new(Arc::clone(&storage), rules(), ServiceConfig::default());
    service.create_game(record("disk"), skirmish_world(), 1).unwrap();
    service.process_moves("disk", &[GameMove::EndTurn]).unwrap();
    race(storage, "disk");
}

#[test]
fn concurrent_batches_never_both_apply() {
    let storage = Arc::new(InMemoryStorage::new());
    let service = Arc::new(GamesService::new(
        Arc::clone(&storage),
        rules(),
        ServiceConfig::default(),
    ));
    service.create_game(record("g"), skirmish_world(), 1).unwrap();

    let moves = [GameMove::MoveUnit {
        from: AxialCoord::new(-3, 0),
        to: AxialCoord::new(-1, 0),
    }];
    let outcomes: Vec<Result<ProcessMovesResponse>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                let moves = &moves;
                s.spawn(move || service.process_moves("g", moves))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // The unit can only walk away from (-3,0) once; every other attempt
    // either lost the race or found the hex empty.
    let wins = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(wins, 1);
    for outcome in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert!(matches!(
            outcome,
            ServiceError::VersionConflict { .. } | ServiceError::Game(_)
        ));
    }
    assert_eq!(storage.game_state_version("g").unwrap(), 1);
    assert_eq!(service.history("g").unwrap().groups.len(), 1);
}
