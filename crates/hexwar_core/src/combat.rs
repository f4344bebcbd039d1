//! Probabilistic combat and repair.
//!
//! An attack rolls six dice per attacker health point. Each die hits with
//! probability
//!
//! ```text
//! p = clamp(0.05 * ((A + Ta) - (D + Td) + B) + 0.5, 0, 1)
//! ```
//!
//! where `A` is the attacker's strength against the defender's class, `Ta` and
//! `Td` are terrain bonuses, `D` is the defender's defense, and `B` is the
//! wound bonus earned by earlier attacks this turn. Damage is `hits / 6`,
//! truncated and capped at the attacker's health.
//!
//! Every roll draws from a caller-supplied RNG so replays with the same seed
//! produce identical outcomes. Distributions use their own fixed seed.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::components::{AttackRecord, TerrainTypeId, Unit, UnitTypeId};
use crate::coords::AxialCoord;
use crate::data::{DamageDistribution, DamageRange, UnitTerrain};
use crate::error::{GameError, Result};
use crate::rules::RulesEngine;
use crate::world::World;

/// Dice rolled per attacker health point.
pub const ATTACK_DICE_PER_HEALTH: u32 = 6;

/// Dice rolled per fixer health point.
pub const FIX_DICE_PER_HEALTH: u32 = 3;

/// Default number of runs for a distribution.
pub const DEFAULT_DISTRIBUTION_SIMULATIONS: u32 = 10_000;

/// Seed used for every distribution so tooltips are stable.
pub const DISTRIBUTION_SEED: u64 = 12_345;

/// Splash totals at or below this are discarded.
pub const SPLASH_THRESHOLD: u32 = 4;

/// Everything the hit formula needs about one attacker/defender pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatContext {
    /// Attacking unit type.
    pub attacker_type: UnitTypeId,
    /// Terrain under the attacker.
    pub attacker_terrain: TerrainTypeId,
    /// Attacker health; sets the number of dice.
    pub attacker_health: u32,
    /// Defending unit type.
    pub defender_type: UnitTypeId,
    /// Terrain under the defender.
    pub defender_terrain: TerrainTypeId,
    /// Defender health, for kill probabilities.
    pub defender_health: u32,
    /// Wound bonus `B`.
    pub wound_bonus: i32,
}

impl CombatContext {
    /// Build a context from two units on the map.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] if either unit has no tile.
    pub fn between(
        world: &World,
        attacker: &Unit,
        defender: &Unit,
        wound_bonus: i32,
    ) -> Result<Self> {
        let attacker_tile = world
            .tile_at(attacker.coord())
            .ok_or_else(|| GameError::not_found_at("tile", attacker.coord()))?;
        let defender_tile = world
            .tile_at(defender.coord())
            .ok_or_else(|| GameError::not_found_at("tile", defender.coord()))?;
        Ok(Self {
            attacker_type: attacker.unit_type,
            attacker_terrain: attacker_tile.tile_type,
            attacker_health: attacker.available_health,
            defender_type: defender.unit_type,
            defender_terrain: defender_tile.tile_type,
            defender_health: defender.available_health,
            wound_bonus,
        })
    }
}

/// Wound bonus earned against `defender` by an attack from `attacker`.
///
/// A ranged attacker (two or more hexes away) gets +1 per earlier attack.
/// An adjacent attacker gets +1 per earlier ranged attack, and for earlier
/// adjacent attacks +1 if that attacker stood next to this one, +3 if it stood
/// on the opposite side, and +2 otherwise.
#[must_use]
pub fn wound_bonus(defender: &Unit, attacker: AxialCoord) -> i32 {
    let target = defender.coord();
    let current_is_ranged = attacker.distance(target) >= 2;
    defender
        .attack_history
        .iter()
        .map(|record: &AttackRecord| {
            if current_is_ranged || record.is_ranged || record.coord().distance(attacker) == 1 {
                1
            } else if is_opposite_side(target, record.coord(), attacker) {
                3
            } else {
                2
            }
        })
        .sum()
}

/// Whether `a` and `b` are mirror images through `center`.
#[must_use]
pub const fn is_opposite_side(center: AxialCoord, a: AxialCoord, b: AxialCoord) -> bool {
    a.q - center.q == center.q - b.q && a.r - center.r == center.r - b.r
}

/// Clamp a probability into `[0, 1]`.
fn clamp01(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

/// Combat maths bound to a rule set.
#[derive(Debug, Clone, Copy)]
pub struct CombatSimulator<'a> {
    rules: &'a RulesEngine,
}

impl<'a> CombatSimulator<'a> {
    /// Bind to `rules`.
    #[must_use]
    pub const fn new(rules: &'a RulesEngine) -> Self {
        Self { rules }
    }

    /// Per-die hit probability.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if the attacker has no strength
    /// against the defender's class, or [`GameError::NotFound`] for unknown types.
    pub fn hit_probability(&self, ctx: &CombatContext) -> Result<f64> {
        let attacker = self.rules.unit(ctx.attacker_type)?;
        let defender = self.rules.unit(ctx.defender_type)?;
        let attack = attacker.attack_against(defender).ok_or_else(|| {
            GameError::Validation(format!(
                "{} has no attack against {}",
                attacker.name,
                defender.class_key()
            ))
        })?;
        let attack_bonus = self.rules.attack_bonus(ctx.attacker_terrain, ctx.attacker_type);
        let defense_bonus = self
            .rules
            .defense_bonus(ctx.defender_terrain, ctx.defender_type);
        let delta = (attack + attack_bonus) - (defender.defense + defense_bonus) + ctx.wound_bonus;
        Ok(clamp01(0.05 * f64::from(delta) + 0.5))
    }

    /// Roll one attack.
    ///
    /// # Errors
    ///
    /// As [`Self::hit_probability`].
    pub fn simulate_damage<R: Rng + ?Sized>(
        &self,
        ctx: &CombatContext,
        rng: &mut R,
    ) -> Result<u32> {
        let p = self.hit_probability(ctx)?;
        Ok(roll_dice(rng, ctx.attacker_health, ATTACK_DICE_PER_HEALTH, p).min(ctx.attacker_health))
    }

    /// Empirical damage distribution over `simulations` runs (zero means the default).
    ///
    /// # Errors
    ///
    /// As [`Self::hit_probability`].
    pub fn damage_distribution(
        &self,
        ctx: &CombatContext,
        simulations: u32,
    ) -> Result<DamageDistribution> {
        let p = self.hit_probability(ctx)?;
        let mut rng = ChaCha8Rng::seed_from_u64(DISTRIBUTION_SEED);
        Ok(distribution(simulations, || {
            roll_dice(&mut rng, ctx.attacker_health, ATTACK_DICE_PER_HEALTH, p)
                .min(ctx.attacker_health)
        }))
    }

    /// Roll splash damage against every unit next to `defender_coord`.
    ///
    /// Air units and the attacker itself are spared, as are units the
    /// attacker has no strength against. Each target takes `splash_damage`
    /// rolls with no wound bonus; totals of [`SPLASH_THRESHOLD`] or less are
    /// dropped. Returns `(coord, damage)` in direction order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for unknown unit types or missing tiles.
    pub fn splash_damage<R: Rng + ?Sized>(
        &self,
        world: &World,
        attacker: &Unit,
        defender_coord: AxialCoord,
        rng: &mut R,
    ) -> Result<Vec<(AxialCoord, u32)>> {
        let rolls = self.rules.unit(attacker.unit_type)?.splash_damage;
        if rolls == 0 {
            return Ok(Vec::new());
        }
        let mut hits = Vec::new();
        for coord in defender_coord.neighbors() {
            if coord == attacker.coord() {
                continue;
            }
            let Some(target) = world.unit_at(coord) else {
                continue;
            };
            let target_def = self.rules.unit(target.unit_type)?;
            if target_def.unit_terrain == UnitTerrain::Air {
                continue;
            }
            let ctx = CombatContext::between(world, attacker, target, 0)?;
            let Ok(p) = self.hit_probability(&ctx) else {
                continue;
            };
            let total: u32 = (0..rolls)
                .map(|_| {
                    roll_dice(&mut *rng, ctx.attacker_health, ATTACK_DICE_PER_HEALTH, p)
                        .min(ctx.attacker_health)
                })
                .sum();
            if total > SPLASH_THRESHOLD {
                hits.push((coord, total));
            }
        }
        Ok(hits)
    }

    /// Per-die repair probability for a fixer type: `clamp(0.05 * F, 0, 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown type.
    pub fn fix_probability(&self, fixer_type: UnitTypeId) -> Result<f64> {
        let fix_value = self.rules.unit(fixer_type)?.fix_value;
        Ok(clamp01(0.05 * f64::from(fix_value)))
    }

    /// Roll one repair: three dice per fixer health point, health restored is `fixes / 3`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown type.
    pub fn simulate_fix<R: Rng + ?Sized>(
        &self,
        fixer_type: UnitTypeId,
        fixer_health: u32,
        rng: &mut R,
    ) -> Result<u32> {
        let p = self.fix_probability(fixer_type)?;
        Ok(roll_dice(rng, fixer_health, FIX_DICE_PER_HEALTH, p))
    }

    /// Empirical repair distribution over `simulations` runs (zero means the default).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown type.
    pub fn fix_distribution(
        &self,
        fixer_type: UnitTypeId,
        fixer_health: u32,
        simulations: u32,
    ) -> Result<DamageDistribution> {
        let p = self.fix_probability(fixer_type)?;
        let mut rng = ChaCha8Rng::seed_from_u64(DISTRIBUTION_SEED);
        Ok(distribution(simulations, || {
            roll_dice(&mut rng, fixer_health, FIX_DICE_PER_HEALTH, p)
        }))
    }
}

/// Roll `dice_per_health` dice per health point and return `successes / dice_per_health`.
fn roll_dice<R: Rng + ?Sized>(rng: &mut R, health: u32, dice_per_health: u32, p: f64) -> u32 {
    let mut successes = 0u32;
    for _ in 0..health * dice_per_health {
        if rng.gen::<f64>() < p {
            successes += 1;
        }
    }
    successes / dice_per_health
}

/// Run `sample` repeatedly and bucket the outcomes per value.
fn distribution(simulations: u32, mut sample: impl FnMut() -> u32) -> DamageDistribution {
    let runs = if simulations == 0 {
        DEFAULT_DISTRIBUTION_SIMULATIONS
    } else {
        simulations
    };
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    let mut total = 0u64;
    for _ in 0..runs {
        let value = sample();
        *counts.entry(value).or_default() += 1;
        total += u64::from(value);
    }

    let n = f64::from(runs);
    #[allow(clippy::cast_precision_loss)]
    let expected_damage = total as f64 / n;
    let min_damage = counts.keys().next().copied().unwrap_or(0);
    let max_damage = counts.keys().next_back().copied().unwrap_or(0);
    let ranges = counts
        .into_iter()
        .map(|(value, count)| DamageRange {
            min_value: f64::from(value),
            max_value: f64::from(value),
            probability: f64::from(count) / n,
        })
        .collect();

    DamageDistribution {
        min_damage: f64::from(min_damage),
        max_damage: f64::from(max_damage),
        expected_damage,
        ranges,
    }
}
