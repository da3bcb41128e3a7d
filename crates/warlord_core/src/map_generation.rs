//! Procedural terrain and initial game layout.
//!
//! Generation is driven by a seeded RNG, so the same config always yields the
//! same map:
//! - plains everywhere, then random-walk patches of forest, mountains, water
//! - start corners with a cleared plains pocket, a large owned city, a hero
//!   and an escort
//! - size-weighted neutral cities and ruins on open ground

use rand::Rng;

use crate::components::{CitySize, Player, PlayerId, Unit};
use crate::config::GameConfig;
use crate::map::Map;
use crate::math::GridPos;
use crate::terrain::Terrain;
use crate::unit_kind::UnitType;

/// Distance of start tiles from the map edge.
const START_INSET: u32 = 2;

/// Minimum Chebyshev distance between any two cities.
const CITY_SPACING: u32 = 3;

/// Placement attempts per requested city or ruin before giving up.
const PLACEMENT_ATTEMPTS: u32 = 50;

/// Target terrain shares, in percent of all tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainRatios {
    /// Forest share.
    pub forest: u32,
    /// Mountain share.
    pub mountains: u32,
    /// Water share.
    pub water: u32,
}

impl Default for TerrainRatios {
    fn default() -> Self {
        Self {
            forest: 20,
            mountains: 15,
            water: 5,
        }
    }
}

impl From<&GameConfig> for TerrainRatios {
    fn from(config: &GameConfig) -> Self {
        Self {
            forest: config.forest_percent,
            mountains: config.mountain_percent,
            water: config.water_percent,
        }
    }
}

/// Generate a row-major terrain grid.
///
/// Starts from plains, then grows contiguous patches of each feature by a
/// random walk from random seed points until the target count is met. Walks
/// only convert plains, so earlier features are never overwritten.
#[must_use]
pub fn generate_terrain<R: Rng>(
    width: u32,
    height: u32,
    ratios: TerrainRatios,
    rng: &mut R,
) -> Vec<Terrain> {
    let total = width as usize * height as usize;
    let mut cells = vec![Terrain::Plains; total];

    for (kind, pct) in [
        (Terrain::Forest, ratios.forest),
        (Terrain::Mountains, ratios.mountains),
        (Terrain::Water, ratios.water),
    ] {
        let target = total * pct as usize / 100;
        let mut placed = 0;
        let mut attempts = 0;
        while placed < target && attempts < total * 4 {
            attempts += 1;
            let mut pos = GridPos::new(rng.gen_range(0..width), rng.gen_range(0..height));
            let steps = rng.gen_range(3..=10);
            for _ in 0..steps {
                let idx = pos.y as usize * width as usize + pos.x as usize;
                if cells[idx] == Terrain::Plains {
                    cells[idx] = kind;
                    placed += 1;
                    if placed >= target {
                        break;
                    }
                }
                let (dx, dy) = crate::math::ORTHOGONAL[rng.gen_range(0..4)];
                if let Some(next) = pos.offset(dx, dy).filter(|p| p.x < width && p.y < height) {
                    pos = next;
                }
            }
        }
    }

    cells
}

/// Start tiles for up to four players, opposite corners first.
#[must_use]
pub fn start_positions(width: u32, height: u32) -> [GridPos; 4] {
    let left = START_INSET.min(width - 1);
    let top = START_INSET.min(height - 1);
    let right = width.saturating_sub(1 + START_INSET).max(left);
    let bottom = height.saturating_sub(1 + START_INSET).max(top);
    [
        GridPos::new(left, top),
        GridPos::new(right, bottom),
        GridPos::new(right, top),
        GridPos::new(left, bottom),
    ]
}

fn roll_city_size<R: Rng>(rng: &mut R) -> CitySize {
    match rng.gen_range(0..100) {
        0..=49 => CitySize::Small,
        50..=84 => CitySize::Medium,
        _ => CitySize::Large,
    }
}

/// Build the starting map and roster for a validated config.
///
/// Each player gets a large city on its start tile, a hero on the city and a
/// light infantry escort on the first free orthogonal neighbour.
#[must_use]
pub fn generate_map<R: Rng>(config: &GameConfig, rng: &mut R) -> (Map, Vec<Player>) {
    let (width, height) = (config.width, config.height);
    let terrain = generate_terrain(width, height, TerrainRatios::from(config), rng);
    let mut map = Map::from_terrain(width, height, terrain);
    let mut players = Vec::with_capacity(config.players.len());

    let starts = start_positions(width, height);
    for (index, slot) in config.players.iter().enumerate() {
        let id = index as PlayerId;
        let start = starts[index];

        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(p) = start.offset(dx, dy).filter(|p| map.in_bounds(*p)) {
                    map.set_terrain(p, Terrain::Plains);
                }
            }
        }

        map.add_city(start, CitySize::Large, Some(id));
        map.add_unit(Unit::new(UnitType::Hero, id, start));
        let escort_tile = map
            .neighbors(start)
            .find(|p| map.is_free_for(*p, UnitType::LightInfantry));
        if let Some(tile) = escort_tile {
            map.add_unit(Unit::new(UnitType::LightInfantry, id, tile));
        }

        players.push(Player::new(id, slot.name.clone(), slot.is_ai, config.starting_gold));
    }

    let mut placed = 0;
    for _ in 0..config.neutral_cities * PLACEMENT_ATTEMPTS {
        if placed >= config.neutral_cities {
            break;
        }
        let pos = GridPos::new(rng.gen_range(0..width), rng.gen_range(0..height));
        let open = map.terrain_at(pos) == Some(Terrain::Plains) && map.unit_at(pos).is_none();
        let spaced = map
            .cities()
            .iter()
            .all(|c| c.position.chebyshev(pos) >= CITY_SPACING);
        if open && spaced {
            let size = roll_city_size(rng);
            map.add_city(pos, size, None);
            placed += 1;
        }
    }

    let mut placed = 0;
    for _ in 0..config.ruins * PLACEMENT_ATTEMPTS {
        if placed >= config.ruins {
            break;
        }
        let pos = GridPos::new(rng.gen_range(0..width), rng.gen_range(0..height));
        let ground = matches!(
            map.terrain_at(pos),
            Some(Terrain::Plains | Terrain::Forest)
        );
        if ground
            && map.city_at(pos).is_none()
            && map.unit_at(pos).is_none()
            && map.ruin_at(pos).is_none()
        {
            map.add_ruin(pos);
            placed += 1;
        }
    }

    tracing::info!(
        width,
        height,
        seed = config.seed,
        cities = map.cities().len(),
        ruins = map.ruins().len(),
        "Map generated"
    );

    (map, players)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_terrain_ratios_met() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cells = generate_terrain(20, 15, TerrainRatios::default(), &mut rng);
        let count = |t: Terrain| cells.iter().filter(|c| **c == t).count();
        assert_eq!(count(Terrain::Forest), 60);
        assert_eq!(count(Terrain::Mountains), 45);
        assert_eq!(count(Terrain::Water), 15);
        assert_eq!(count(Terrain::Plains), 180);
    }

    #[test]
    fn test_determinism() {
        let config = GameConfig::default().with_seed(42);
        let (a, _) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(config.seed));
        let (b, _) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(config.seed));
        assert_eq!(a.terrain(), b.terrain());
        assert_eq!(a.cities(), b.cities());
    }

    #[test]
    fn test_different_seeds() {
        let config = GameConfig::default();
        let (a, _) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(1));
        let (b, _) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(2));
        assert_ne!(a.terrain(), b.terrain());
    }

    #[test]
    fn test_each_player_has_hero_escort_and_city() {
        let config = GameConfig::default().with_players(vec![
            crate::config::PlayerSlot::ai("A"),
            crate::config::PlayerSlot::ai("B"),
            crate::config::PlayerSlot::ai("C"),
            crate::config::PlayerSlot::ai("D"),
        ]);
        let (map, players) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(players.len(), 4);
        for player in &players {
            let hero = map.hero_of(player.id).unwrap();
            let city = map.city_at(hero.position).unwrap();
            assert_eq!(city.owner, Some(player.id));
            assert_eq!(city.size, CitySize::Large);
            assert_eq!(map.units_of(player.id).count(), 2);
            assert_eq!(player.gold, 50);
        }
    }

    #[test]
    fn test_neutral_cities_are_spaced() {
        let config = GameConfig::default();
        let (map, _) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(9));
        let cities = map.cities();
        for (i, a) in cities.iter().enumerate() {
            for b in &cities[i + 1..] {
                assert!(a.position.chebyshev(b.position) >= CITY_SPACING);
            }
        }
    }

    #[test]
    fn test_ruins_on_open_ground() {
        let config = GameConfig::default();
        let (map, _) = generate_map(&config, &mut ChaCha8Rng::seed_from_u64(5));
        for ruin in map.ruins() {
            assert!(matches!(
                map.terrain_at(ruin.position),
                Some(Terrain::Plains | Terrain::Forest)
            ));
            assert!(map.city_at(ruin.position).is_none());
        }
    }

    #[test]
    fn test_start_positions_inset() {
        let starts = start_positions(20, 15);
        assert_eq!(starts[0], GridPos::new(2, 2));
        assert_eq!(starts[1], GridPos::new(17, 12));
    }
}
