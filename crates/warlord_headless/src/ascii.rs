//! ASCII map dump for terminal review.
//!
//! Each tile is two characters: a glyph and an owner digit. Units win over
//! cities, cities over ruins, ruins over bare terrain.

use std::fmt::Write;

use warlord_core::map::Map;
use warlord_core::math::GridPos;
use warlord_core::unit_kind::UnitType;

/// Character for a unit archetype.
fn unit_char(unit_type: UnitType) -> char {
    match unit_type {
        UnitType::Hero => 'H',
        UnitType::LightInfantry => 'i',
        UnitType::HeavyInfantry => 'I',
        UnitType::Archer => 'a',
        UnitType::Cavalry => 'c',
        UnitType::Catapult => 'k',
        UnitType::Dragon => 'D',
    }
}

fn owner_char(owner: Option<u8>) -> char {
    owner
        .and_then(|o| char::from_digit(u32::from(o), 10))
        .unwrap_or('-')
}

fn tile(map: &Map, pos: GridPos) -> [char; 2] {
    if let Some(unit) = map.unit_at(pos) {
        return [unit_char(unit.unit_type), owner_char(Some(unit.owner))];
    }
    if let Some(city) = map.city_at(pos) {
        return ['#', owner_char(city.owner)];
    }
    if let Some(ruin) = map.ruin_at(pos) {
        return ['?', if ruin.explored { '.' } else { '!' }];
    }
    [map.terrain_at(pos).map_or(' ', |t| t.glyph()), ' ']
}

/// Render the whole map, one row per line, with a legend.
#[must_use]
pub fn render_ascii(map: &Map) -> String {
    let mut out = String::with_capacity(((map.width() * 2 + 1) * (map.height() + 4)) as usize);
    for y in 0..map.height() {
        for x in 0..map.width() {
            out.extend(tile(map, GridPos::new(x, y)));
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "H hero  i/I light/heavy inf  a archer  c cavalry  k catapult  D dragon  # city  ? ruin"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use warlord_core::components::{CitySize, Unit};

    #[test]
    fn test_render_layers() {
        let mut map = Map::new(3, 1);
        map.add_city(GridPos::new(0, 0), CitySize::Small, None);
        map.add_city(GridPos::new(1, 0), CitySize::Small, Some(1));
        map.add_unit(Unit::new(UnitType::Hero, 1, GridPos::new(1, 0)));
        map.add_ruin(GridPos::new(2, 0));

        let text = render_ascii(&map);
        assert_eq!(text.lines().next(), Some("#-H1?!"));
    }

    #[test]
    fn test_render_size() {
        let map = Map::new(4, 3);
        let text = render_ascii(&map);
        let rows: Vec<&str> = text.lines().take(3).collect();
        assert!(rows.iter().all(|r| r.chars().count() == 8));
    }
}
