//! Test fixtures and helpers.
//!
//! Hand-built maps and games for consistent testing. Everything here is
//! plains unless a fixture says otherwise, so movement and combat numbers
//! are easy to reason about.

use fixed::types::I32F32;
use warlord_core::components::{CitySize, Player, Unit, UnitId};
use warlord_core::game::Game;
use warlord_core::map::Map;
use warlord_core::math::GridPos;
use warlord_core::unit_kind::UnitType;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for [`GridPos::new`].
#[must_use]
pub const fn pos(x: u32, y: u32) -> GridPos {
    GridPos::new(x, y)
}

/// Two players with the default starting gold: Red (human), Blue (AI).
#[must_use]
pub fn two_players() -> Vec<Player> {
    vec![
        Player::new(0, "Red", false, 50),
        Player::new(1, "Blue", true, 50),
    ]
}

/// Place a fresh unit and return its id.
pub fn spawn(map: &mut Map, unit_type: UnitType, owner: u8, at: GridPos) -> UnitId {
    map.add_unit(Unit::new(unit_type, owner, at))
}

/// Two heroes on large cities in opposite corners of a plains map.
///
/// # Panics
///
/// Panics if the map is smaller than 2x2.
#[must_use]
pub fn duel_map(width: u32, height: u32) -> Map {
    let mut map = Map::new(width, height);
    let far = pos(width - 1, height - 1);
    map.add_city(pos(0, 0), CitySize::Large, Some(0));
    map.add_city(far, CitySize::Large, Some(1));
    spawn(&mut map, UnitType::Hero, 0, pos(0, 0));
    spawn(&mut map, UnitType::Hero, 1, far);
    map
}

/// [`duel_map`] wrapped in a game with [`two_players`].
#[must_use]
pub fn duel_game(width: u32, height: u32, seed: u64) -> Game {
    Game::from_parts(duel_map(width, height), two_players(), seed)
}

/// Handles into [`corner_skirmish`].
#[derive(Debug, Clone, Copy)]
pub struct Skirmish {
    /// Red's hero at (0, 0).
    pub hero: UnitId,
    /// Blue's light infantry at (1, 1), standing on Blue's city.
    pub infantry: UnitId,
    /// The tile under attack.
    pub target: GridPos,
}

/// A 2x2 plains map: Red's hero in one corner, Blue's light infantry on a
/// medium Blue city in the opposite corner. Red acts first.
#[must_use]
pub fn corner_skirmish(seed: u64) -> (Game, Skirmish) {
    let mut map = Map::new(2, 2);
    let target = pos(1, 1);
    map.add_city(target, CitySize::Medium, Some(1));
    let hero = spawn(&mut map, UnitType::Hero, 0, pos(0, 0));
    let infantry = spawn(&mut map, UnitType::LightInfantry, 1, target);
    let game = Game::from_parts(map, two_players(), seed);
    (
        game,
        Skirmish {
            hero,
            infantry,
            target,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_skirmish_layout() {
        let (game, s) = corner_skirmish(1);
        assert_eq!(game.map().unit(s.hero).unwrap().position, pos(0, 0));
        assert_eq!(game.map().unit_at(s.target).unwrap().id, s.infantry);
        assert!(game.map().city_at(s.target).is_some());
    }

    #[test]
    fn test_duel_map_corners() {
        let map = duel_map(6, 6);
        assert_eq!(map.units().len(), 2);
        assert_eq!(map.cities().len(), 2);
        assert_eq!(map.city_at(pos(5, 5)).unwrap().owner, Some(1));
    }
}
