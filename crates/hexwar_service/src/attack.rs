//! Stateless attack simulation.
//!
//! Pits two unit types against each other on given terrains without touching
//! any stored game, and reports both directions: the attack and the counter.

use std::collections::BTreeMap;

use hexwar_core::combat::{CombatContext, CombatSimulator};
use hexwar_core::components::{TerrainTypeId, UnitTypeId};
use hexwar_core::data::DamageDistribution;
use hexwar_core::error::GameError;
use hexwar_core::rules::RulesEngine;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Inputs for [`simulate_attack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulateAttackRequest {
    /// Attacking unit type.
    pub attacker_unit_type: UnitTypeId,
    /// Terrain under the attacker.
    pub attacker_terrain: TerrainTypeId,
    /// Attacker health.
    pub attacker_health: u32,
    /// Defending unit type.
    pub defender_unit_type: UnitTypeId,
    /// Terrain under the defender.
    pub defender_terrain: TerrainTypeId,
    /// Defender health.
    pub defender_health: u32,
    /// Wound bonus for the attack (the counter never gets one).
    #[serde(default)]
    pub wound_bonus: i32,
    /// Monte-Carlo runs; zero or absent means the service default.
    #[serde(default)]
    pub num_simulations: u32,
}

/// Outcome of [`simulate_attack`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulateAttackResponse {
    /// Damage dealt by the attacker -> number of runs.
    pub attacker_damage_distribution: BTreeMap<u32, u32>,
    /// Counter damage dealt by the defender -> number of runs. Empty if the
    /// defender cannot strike back.
    pub defender_damage_distribution: BTreeMap<u32, u32>,
    /// Mean damage dealt by the attacker.
    pub attacker_mean_damage: f64,
    /// Mean counter damage.
    pub defender_mean_damage: f64,
    /// Chance the attack kills the defender.
    pub attacker_kill_probability: f64,
    /// Chance the counter kills the attacker.
    pub defender_kill_probability: f64,
}

/// Per-value counts, mean, and kill chance of a distribution.
fn summarize(dist: &DamageDistribution, runs: u32, victim_health: u32) -> (BTreeMap<u32, u32>, f64, f64) {
    let mut counts = BTreeMap::new();
    let mut mean = 0.0;
    let mut kills = 0u32;
    for range in &dist.ranges {
        // Buckets hold whole damage values.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let damage = range.min_value.max(0.0) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = (f64::from(runs) * range.probability).round() as u32;
        counts.insert(damage, count);
        mean += range.min_value * range.probability;
        if damage >= victim_health {
            kills += count;
        }
    }
    let kill_probability = f64::from(kills) / f64::from(runs.max(1));
    (counts, mean, kill_probability)
}

/// Simulate an attack and the counter-attack.
///
/// # Errors
///
/// Returns [`GameError::Validation`] if the attacker has no strength against
/// the defender, or [`GameError::NotFound`] for unknown types.
pub fn simulate_attack(
    rules: &RulesEngine,
    request: &SimulateAttackRequest,
    default_simulations: u32,
) -> Result<SimulateAttackResponse> {
    let runs = if request.num_simulations == 0 {
        default_simulations
    } else {
        request.num_simulations
    };
    let simulator = CombatSimulator::new(rules);

    let attack = CombatContext {
        attacker_type: request.attacker_unit_type,
        attacker_terrain: request.attacker_terrain,
        attacker_health: request.attacker_health,
        defender_type: request.defender_unit_type,
        defender_terrain: request.defender_terrain,
        defender_health: request.defender_health,
        wound_bonus: request.wound_bonus,
    };
    let attack_dist = simulator.damage_distribution(&attack, runs)?;
    let (attacker_damage_distribution, attacker_mean_damage, attacker_kill_probability) =
        summarize(&attack_dist, runs, request.defender_health);

    let counter = CombatContext {
        attacker_type: request.defender_unit_type,
        attacker_terrain: request.defender_terrain,
        attacker_health: request.defender_health,
        defender_type: request.attacker_unit_type,
        defender_terrain: request.attacker_terrain,
        defender_health: request.attacker_health,
        wound_bonus: 0,
    };
    let (defender_damage_distribution, defender_mean_damage, defender_kill_probability) =
        match simulator.damage_distribution(&counter, runs) {
            Ok(dist) => summarize(&dist, runs, request.attacker_health),
            Err(GameError::Validation(_)) => (BTreeMap::new(), 0.0, 0.0),
            Err(e) => return Err(e.into()),
        };

    Ok(SimulateAttackResponse {
        attacker_damage_distribution,
        defender_damage_distribution,
        attacker_mean_damage,
        defender_mean_damage,
        attacker_kill_probability,
        defender_kill_probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexwar_test_utils::fixtures::{rules, terrains, units};

    fn request(attacker: UnitTypeId, defender: UnitTypeId) -> SimulateAttackRequest {
        SimulateAttackRequest {
            attacker_unit_type: attacker,
            attacker_terrain: terrains::GRASS,
            attacker_health: 10,
            defender_unit_type: defender,
            defender_terrain: terrains::GRASS,
            defender_health: 10,
            wound_bonus: 0,
            num_simulations: 0,
        }
    }

    #[test]
    fn test_both_directions_reported() {
        let rules = rules();
        let response =
            simulate_attack(&rules, &request(units::INFANTRY, units::INFANTRY), 1000).unwrap();
        let total: u32 = response.attacker_damage_distribution.values().sum();
        assert!((990..=1010).contains(&total));
        assert!(!response.defender_damage_distribution.is_empty());
        assert!(response.attacker_mean_damage > 0.0);
        assert!(response.attacker_mean_damage <= 10.0);
        assert!((0.0..=1.0).contains(&response.attacker_kill_probability));
    }

    #[test]
    fn test_no_counter_without_table_entry() {
        let rules = rules();
        // Fighters have no attack entry against archers.
        let response =
            simulate_attack(&rules, &request(units::ARCHER, units::FIGHTER), 200);
        assert!(response.is_err(), "archers cannot hit aircraft");

        let response = simulate_attack(&rules, &request(units::TANK, units::ARCHER), 200).unwrap();
        // Archers (Light) have an entry against Heavy, so a counter exists;
        // medics have none at all.
        assert!(!response.defender_damage_distribution.is_empty());
        let response = simulate_attack(&rules, &request(units::TANK, units::MEDIC), 200).unwrap();
        assert!(response.defender_damage_distribution.is_empty());
        assert!(response.defender_mean_damage.abs() < f64::EPSILON);
    }

    #[test]
    fn test_same_request_same_answer() {
        let rules = rules();
        let mut req = request(units::TANK, units::INFANTRY);
        req.num_simulations = 500;
        let a = simulate_attack(&rules, &req, 1000).unwrap();
        let b = simulate_attack(&rules, &req, 1000).unwrap();
        assert_eq!(a, b);
    }
}
