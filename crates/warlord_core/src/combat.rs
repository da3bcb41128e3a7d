//! Combat resolution.
//!
//! Damage for one attack:
//! 1. type-advantage multiplier from a fixed matrix (unlisted pairs 1.0)
//! 2. raw = (2 x attack - (defense + terrain) / 2) x multiplier
//! 3. raw is floored at 15% of the defender's max hp
//! 4. x a uniform variance in [0.8, 1.2]
//! 5. critical hits double the damage (20% base, +10 on strong matchups,
//!    -10 on weak ones)
//! 6. the result is floored; there is no cap
//!
//! The random part is drawn up front into a [`DamageRoll`], so
//! [`resolve_damage`] is a pure function of its inputs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{CityId, PlayerId, Unit, UnitId};
use crate::map::Map;
use crate::math::{fixed_serde, percent, Fixed, GridPos};
use crate::unit_kind::UnitType;

/// Minimum raw damage as a share of the defender's max hp.
pub const MIN_DAMAGE_PERCENT: u32 = 15;

/// Base critical-hit chance in percent.
pub const BASE_CRIT_CHANCE: u32 = 20;

/// Type-advantage multiplier in percent for an (attacker, defender) pair.
#[must_use]
pub const fn type_multiplier_percent(attacker: UnitType, defender: UnitType) -> u32 {
    use UnitType::{Archer, Catapult, Cavalry, Dragon, HeavyInfantry, Hero, LightInfantry};
    match (attacker, defender) {
        (Cavalry, Archer | Catapult) => 150,
        (Cavalry, HeavyInfantry) => 70,
        (Cavalry, Dragon) => 60,

        (HeavyInfantry, Cavalry) => 150,
        (HeavyInfantry, LightInfantry) => 120,
        (HeavyInfantry, Archer) => 80,

        (Archer, LightInfantry | Dragon) => 130,
        (Archer, HeavyInfantry) => 80,

        (LightInfantry, Archer) => 120,
        (LightInfantry, Catapult) => 130,
        (LightInfantry, Cavalry) => 80,

        (Catapult, HeavyInfantry) => 150,
        (Catapult, LightInfantry) => 120,
        (Catapult, Cavalry) => 70,

        (Dragon, Cavalry) => 150,
        (Dragon, LightInfantry) => 130,
        (Dragon, Archer) => 80,

        (Hero, Dragon) => 130,

        _ => 100,
    }
}

/// Type-advantage multiplier as a fixed-point factor.
#[must_use]
pub fn type_multiplier(attacker: UnitType, defender: UnitType) -> Fixed {
    percent(type_multiplier_percent(attacker, defender) as i32)
}

/// Critical-hit chance in percent for a matchup multiplier.
#[must_use]
pub const fn crit_chance(multiplier_percent: u32) -> u32 {
    if multiplier_percent > 120 {
        BASE_CRIT_CHANCE + 10
    } else if multiplier_percent < 90 {
        BASE_CRIT_CHANCE - 10
    } else {
        BASE_CRIT_CHANCE
    }
}

/// The random draws behind one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRoll {
    /// Variance in thousandths, `800..=1200`.
    pub variance_permille: u32,
    /// Crit roll, `0..100`; a crit lands when below the crit chance.
    pub crit_roll: u32,
}

impl DamageRoll {
    /// Mean variance, no crit. Used for forecasts.
    pub const EXPECTED: Self = Self {
        variance_permille: 1000,
        crit_roll: 99,
    };

    /// Draw a roll.
    pub fn draw<R: Rng>(rng: &mut R) -> Self {
        Self {
            variance_permille: rng.gen_range(800..=1200),
            crit_roll: rng.gen_range(0..100),
        }
    }
}

/// Numbers that feed the damage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageInputs {
    /// Attacker effective attack.
    pub attack: u32,
    /// Defender effective defense.
    pub defense: u32,
    /// Defense bonus of the defender's terrain.
    pub terrain_bonus: u32,
    /// Defender max hp (for the damage floor).
    pub defender_max_hp: u32,
    /// Type multiplier in percent.
    pub multiplier_percent: u32,
}

impl DamageInputs {
    /// Gather inputs for `attacker` hitting `defender` on terrain with `terrain_bonus`.
    #[must_use]
    pub fn between(attacker: &Unit, defender: &Unit, terrain_bonus: u32) -> Self {
        Self {
            attack: attacker.effective_attack(),
            defense: defender.effective_defense(),
            terrain_bonus,
            defender_max_hp: defender.max_hp(),
            multiplier_percent: type_multiplier_percent(attacker.unit_type, defender.unit_type),
        }
    }
}

/// Outcome of the damage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    /// Final damage.
    pub amount: u32,
    /// A critical hit landed.
    pub critical: bool,
    /// Type multiplier applied.
    pub multiplier: Fixed,
}

/// Evaluate the damage formula for fixed inputs and a fixed roll.
#[must_use]
pub fn resolve_damage(inputs: DamageInputs, roll: DamageRoll) -> Damage {
    let hundred = Fixed::from_num(100);
    let multiplier = percent(inputs.multiplier_percent as i32);
    let offense = Fixed::from_num(2 * inputs.attack);
    let mitigation = Fixed::from_num(inputs.defense + inputs.terrain_bonus) / Fixed::from_num(2);
    // Scale before dividing so whole-number results stay exact.
    let mut value = (offense - mitigation) * Fixed::from_num(inputs.multiplier_percent) / hundred;

    let floor = Fixed::from_num(MIN_DAMAGE_PERCENT * inputs.defender_max_hp) / hundred;
    if value < floor {
        value = floor;
    }

    value = value * Fixed::from_num(roll.variance_permille) / Fixed::from_num(1000);

    let critical = roll.crit_roll < crit_chance(inputs.multiplier_percent);
    if critical {
        value *= Fixed::from_num(2);
    }

    Damage {
        amount: value.floor().to_num::<i64>().max(0) as u32,
        critical,
        multiplier,
    }
}

/// Damage `attacker` deals to `defender`, drawing the roll from `rng`.
pub fn calculate_damage<R: Rng>(
    attacker: &Unit,
    defender: &Unit,
    terrain_bonus: u32,
    rng: &mut R,
) -> Damage {
    resolve_damage(
        DamageInputs::between(attacker, defender, terrain_bonus),
        DamageRoll::draw(rng),
    )
}

/// Forecast damage with mean variance and no crit.
#[must_use]
pub fn expected_damage(attacker: &Unit, defender: &Unit, terrain_bonus: u32) -> u32 {
    resolve_damage(
        DamageInputs::between(attacker, defender, terrain_bonus),
        DamageRoll::EXPECTED,
    )
    .amount
}

/// A city that changes hands because its last defender fell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCapture {
    /// City taken.
    pub city: CityId,
    /// Owner before capture, `None` if neutral.
    pub previous_owner: Option<PlayerId>,
    /// New owner.
    pub new_owner: PlayerId,
}

/// Full result of one attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    /// Attacking unit.
    pub attacker: UnitId,
    /// Defending unit.
    pub defender: UnitId,
    /// Defender's owner.
    pub defender_owner: PlayerId,
    /// Tile attacked.
    pub target: GridPos,
    /// Damage dealt.
    pub damage: u32,
    /// Damage was doubled by a critical hit.
    pub critical: bool,
    /// Type multiplier applied.
    #[serde(with = "fixed_serde")]
    pub multiplier: Fixed,
    /// Defender hp after the hit.
    pub defender_hp: u32,
    /// Defender died and was removed.
    pub defender_killed: bool,
    /// City capture for the caller to apply.
    pub capture: Option<CityCapture>,
}

/// Resolve an attack by `attacker_id` on the stack at `target`.
///
/// Returns `None` when the attacker is missing or the target holds no living
/// unit. Otherwise damages the stack's combat unit, removes it at 0 hp and
/// marks the attacker as having moved and attacked. Range and ownership
/// checks are the caller's job (see [`crate::movement::can_attack`]).
pub fn perform_attack<R: Rng>(
    map: &mut Map,
    attacker_id: UnitId,
    target: GridPos,
    rng: &mut R,
) -> Option<CombatOutcome> {
    let attacker = map.unit(attacker_id)?.clone();
    let defender = map.stack_at(target).combat_unit()?.clone();

    let terrain_bonus = map.defense_bonus(target);
    let damage = calculate_damage(&attacker, &defender, terrain_bonus, rng);

    let defender_hp = {
        let unit = map.unit_mut(defender.id)?;
        unit.take_damage(damage.amount);
        unit.hp()
    };
    let defender_killed = defender_hp == 0;
    if defender_killed {
        map.remove_unit(defender.id);
    }

    let attacker_alive = map.unit_mut(attacker_id).is_some_and(|unit| {
        unit.has_moved = true;
        unit.has_attacked = true;
        unit.is_alive()
    });

    let capture = if defender_killed && attacker_alive && map.stack_at(target).is_empty() {
        map.city_at(target)
            .filter(|city| !city.is_owned_by(attacker.owner))
            .map(|city| CityCapture {
                city: city.id,
                previous_owner: city.owner,
                new_owner: attacker.owner,
            })
    } else {
        None
    };

    tracing::debug!(
        attacker = attacker_id,
        defender = defender.id,
        %target,
        damage = damage.amount,
        critical = damage.critical,
        killed = defender_killed,
        "Attack resolved"
    );

    Some(CombatOutcome {
        attacker: attacker_id,
        defender: defender.id,
        defender_owner: defender.owner,
        target,
        damage: damage.amount,
        critical: damage.critical,
        multiplier: damage.multiplier,
        defender_hp,
        defender_killed,
        capture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CitySize;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn inputs(attack: u32, defense: u32) -> DamageInputs {
        DamageInputs {
            attack,
            defense,
            terrain_bonus: 0,
            defender_max_hp: 20,
            multiplier_percent: 100,
        }
    }

    #[test]
    fn test_matrix_examples() {
        assert_eq!(type_multiplier_percent(UnitType::Cavalry, UnitType::Archer), 150);
        assert_eq!(type_multiplier_percent(UnitType::Cavalry, UnitType::HeavyInfantry), 70);
        assert_eq!(type_multiplier_percent(UnitType::Cavalry, UnitType::Dragon), 60);
        assert_eq!(type_multiplier_percent(UnitType::Hero, UnitType::LightInfantry), 100);
        assert_eq!(type_multiplier(UnitType::Archer, UnitType::Dragon), percent(130));
    }

    #[test]
    fn test_crit_chance_shifts() {
        assert_eq!(crit_chance(100), 20);
        assert_eq!(crit_chance(120), 20);
        assert_eq!(crit_chance(130), 30);
        assert_eq!(crit_chance(80), 10);
    }

    #[test]
    fn test_expected_hero_vs_infantry() {
        // (2*7 - 2/2) * 1.0 = 13
        let damage = resolve_damage(inputs(7, 2), DamageRoll::EXPECTED);
        assert_eq!(damage.amount, 13);
        assert!(!damage.critical);
    }

    #[test]
    fn test_damage_floor() {
        // Raw would be negative; floor is 15% of 20 = 3.
        let damage = resolve_damage(inputs(1, 20), DamageRoll::EXPECTED);
        assert_eq!(damage.amount, 3);
    }

    #[test]
    fn test_crit_doubles() {
        let roll = DamageRoll {
            variance_permille: 1000,
            crit_roll: 0,
        };
        let damage = resolve_damage(inputs(7, 2), roll);
        assert!(damage.critical);
        assert_eq!(damage.amount, 26);
    }

    #[test]
    fn test_variance_bounds() {
        let low = DamageRoll {
            variance_permille: 800,
            crit_roll: 99,
        };
        let high = DamageRoll {
            variance_permille: 1200,
            crit_roll: 99,
        };
        let lo = resolve_damage(inputs(7, 2), low).amount;
        let hi = resolve_damage(inputs(7, 2), high).amount;
        assert!((10..=11).contains(&lo));
        assert!((15..=16).contains(&hi));
    }

    #[test]
    fn test_draw_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let roll = DamageRoll::draw(&mut rng);
            assert!((800..=1200).contains(&roll.variance_permille));
            assert!(roll.crit_roll < 100);
        }
    }

    #[test]
    fn test_perform_attack_empty_tile() {
        let mut map = Map::new(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let id = map.add_unit(Unit::new(UnitType::Hero, 0, GridPos::new(0, 0)));
        assert!(perform_attack(&mut map, id, GridPos::new(1, 0), &mut rng).is_none());
        assert!(!map.unit(id).unwrap().has_attacked);
    }

    #[test]
    fn test_perform_attack_marks_attacker() {
        let mut map = Map::new(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let id = map.add_unit(Unit::new(UnitType::LightInfantry, 0, GridPos::new(0, 0)));
        let target = map.add_unit(Unit::new(UnitType::Dragon, 1, GridPos::new(1, 0)));

        let outcome = perform_attack(&mut map, id, GridPos::new(1, 0), &mut rng).unwrap();

        let attacker = map.unit(id).unwrap();
        assert!(attacker.has_moved && attacker.has_attacked);
        assert_eq!(outcome.defender, target);
        assert!(!outcome.defender_killed);
        assert_eq!(map.unit(target).unwrap().hp(), 40 - outcome.damage);
    }

    #[test]
    fn test_kill_on_city_reports_capture() {
        let mut map = Map::new(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let city = map.add_city(GridPos::new(1, 1), CitySize::Medium, Some(1));
        let id = map.add_unit(Unit::new(UnitType::Dragon, 0, GridPos::new(0, 1)));
        let victim = map.add_unit(Unit::new(UnitType::Archer, 1, GridPos::new(1, 1)));
        map.unit_mut(victim).unwrap().set_hp(1);

        let outcome = perform_attack(&mut map, id, GridPos::new(1, 1), &mut rng).unwrap();

        assert!(outcome.defender_killed);
        assert!(map.unit(victim).is_none());
        assert_eq!(
            outcome.capture,
            Some(CityCapture {
                city,
                previous_owner: Some(1),
                new_owner: 0
            })
        );
        // Applying the capture is the controller's job.
        assert_eq!(map.city(city).unwrap().owner, Some(1));
    }

    #[test]
    fn test_kill_off_city_reports_no_capture() {
        let mut map = Map::new(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let id = map.add_unit(Unit::new(UnitType::Dragon, 0, GridPos::new(0, 1)));
        let victim = map.add_unit(Unit::new(UnitType::Archer, 1, GridPos::new(1, 1)));
        map.unit_mut(victim).unwrap().set_hp(1);

        let outcome = perform_attack(&mut map, id, GridPos::new(1, 1), &mut rng).unwrap();
        assert!(outcome.defender_killed);
        assert_eq!(outcome.capture, None);
    }
}
