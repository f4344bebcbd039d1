//! Property tests over coordinates, movement, and random move sequences.

use hexwar_core::changes::WorldChange;
use hexwar_core::combat::{CombatContext, CombatSimulator};
use hexwar_core::coords::AxialCoord;
use hexwar_core::moves::MoveResult;
use hexwar_core::math::{round_budget, Fixed};
use hexwar_core::pathfinding::reconstruct_path;
use hexwar_test_utils::determinism::strategies::{
    arb_budget, arb_coord, arb_coord_within, arb_direction, arb_health, arb_move_sequence,
    arb_wound_bonus,
};
use hexwar_test_utils::fixtures::{rules, skirmish_game, terrains, units};
use hexwar_test_utils::proptest::prelude::*;

fn all_unit_types() -> Vec<u32> {
    vec![
        units::INFANTRY,
        units::ARCHER,
        units::TANK,
        units::ARTILLERY,
        units::FIGHTER,
        units::MEDIC,
    ]
}

proptest! {
    #[test]
    fn distance_is_a_metric(a in arb_coord(50), b in arb_coord(50), c in arb_coord(50)) {
        prop_assert_eq!(a.distance(b), b.distance(a));
        prop_assert_eq!(a.distance(a), 0);
        prop_assert!(a.distance(c) <= a.distance(b) + b.distance(c));
    }

    #[test]
    fn neighbors_are_one_step_away(a in arb_coord(50), dir in arb_direction()) {
        let n = a.neighbor(dir);
        prop_assert_eq!(a.distance(n), 1);
        prop_assert_eq!(n.neighbor(dir.opposite()), a);
        prop_assert_eq!(a.direction_to(n), Some(dir));
    }

    #[test]
    fn range_and_ring_sizes(center in arb_coord(20), radius in 0u32..6) {
        let range = center.range(radius);
        prop_assert_eq!(range.len() as u32, 3 * radius * (radius + 1) + 1);
        prop_assert!(range.iter().all(|c| c.distance(center) <= radius));
        let ring = center.ring(radius);
        prop_assert_eq!(ring.len() as u32, if radius == 0 { 1 } else { 6 * radius });
        prop_assert!(ring.iter().all(|c| c.distance(center) == radius));
    }

    #[test]
    fn range_covers_every_hex_within_radius(coord in arb_coord_within(6)) {
        prop_assert!(AxialCoord::ORIGIN.range(6).contains(&coord));
        prop_assert!(!AxialCoord::ORIGIN.ring(7).contains(&coord));
    }

    #[test]
    fn key_round_trips(a in arb_coord(1000)) {
        prop_assert_eq!(AxialCoord::parse_key(&a.key()).unwrap(), a);
    }

    #[test]
    fn reachable_costs_stay_within_budget(budget in arb_budget()) {
        let game = skirmish_game(0);
        let unit = game.refreshed(game.world().unit_at(AxialCoord::new(-3, 0)).unwrap()).unwrap();
        let paths = game.rules().movement_options(game.world(), &unit, budget, false).unwrap();
        let limit = round_budget(budget);
        for target in paths.destinations() {
            let cost = paths.cost_to(target).unwrap();
            prop_assert!(cost <= limit);
            prop_assert!(cost > Fixed::ZERO);
            let path = reconstruct_path(&paths, target).unwrap();
            prop_assert_eq!(path.total_cost, cost);
            prop_assert_eq!(path.steps().last().copied(), Some(target));
        }
        // Costs never decrease along a tree edge.
        for edge in paths.edges.values() {
            prop_assert!(paths.cost_to(edge.from()).unwrap() <= edge.total_cost);
        }
    }

    #[test]
    fn damage_never_exceeds_attacker_health(
        attacker_health in arb_health(),
        defender_health in arb_health(),
        wound_bonus in arb_wound_bonus(),
        seed in any::<u64>(),
    ) {
        use rand::SeedableRng;

        let rules = rules();
        let simulator = CombatSimulator::new(&rules);
        let ctx = CombatContext {
            attacker_type: units::TANK,
            attacker_terrain: terrains::GRASS,
            attacker_health,
            defender_type: units::INFANTRY,
            defender_terrain: terrains::MOUNTAIN,
            defender_health,
            wound_bonus,
        };
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let damage = simulator.simulate_damage(&ctx, &mut rng).unwrap();
        prop_assert!(damage <= attacker_health);

        let dist = simulator.damage_distribution(&ctx, 100).unwrap();
        prop_assert!(dist.min_damage <= dist.max_damage);
        prop_assert!(dist.max_damage <= f64::from(attacker_health));
        prop_assert!(dist.expected_damage <= f64::from(attacker_health));
    }
}

fn count_changes(results: &[MoveResult], kind: &str) -> usize {
    results
        .iter()
        .flat_map(|r| r.changes.iter())
        .filter(|change| change.kind() == kind)
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_moves_keep_the_game_consistent(
        moves in arb_move_sequence(5, all_unit_types(), 40),
        seed in any::<u64>(),
    ) {
        let mut game = skirmish_game(seed);
        let mut turn = game.turn_counter();
        for game_move in &moves {
            let units_before = game.world().num_units();
            let outcome = game.process_moves(std::slice::from_ref(game_move));
            match outcome {
                Ok(results) => {
                    let built = count_changes(&results, "unit_built");
                    let killed = count_changes(&results, "unit_killed");
                    prop_assert_eq!(game.world().num_units() + killed, units_before + built);
                    if let Some(WorldChange::PlayerChanged { new_player, .. }) = results
                        .iter()
                        .flat_map(|r| r.changes.iter())
                        .find(|c| c.kind() == "player_changed")
                    {
                        prop_assert_eq!(*new_player, game.current_player());
                    }
                }
                Err(_) => prop_assert_eq!(game.world().num_units(), units_before),
            }

            prop_assert_eq!(game.world().depth(), 0);
            prop_assert!((1..=2).contains(&game.current_player()));
            prop_assert!(game.turn_counter() >= turn);
            turn = game.turn_counter();

            for unit in game.world().units() {
                let def = game.rules().unit(unit.unit_type).unwrap();
                prop_assert!(unit.available_health <= def.health);
                prop_assert!(unit.available_health > 0 || unit.last_topped_up_turn == 0);
                prop_assert!(unit.distance_left >= Fixed::ZERO);
                prop_assert!(unit.distance_left <= def.movement_points);
            }
            for tile in game.world().tiles() {
                prop_assert!(tile.player <= 2);
            }
        }
    }
}
