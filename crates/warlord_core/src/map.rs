//! The game map: terrain grid, unit arena, cities and ruins.
//!
//! Units live in a single arena keyed by [`UnitId`]. A position index is
//! maintained alongside it on every insert, move and removal, so "units on a
//! tile" and "units of a player" are both derived from one source of truth.
//!
//! Mutators treat out-of-bounds coordinates as programmer errors and panic.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{
    Artifact, City, CityId, CitySize, PlayerId, Ruin, Unit, UnitId, CITY_HEAL_PERCENT,
};
use crate::math::GridPos;
use crate::terrain::Terrain;

/// Storage for every living unit on the map.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitStorage {
    /// Units by id.
    units: HashMap<UnitId, Unit>,
    /// Tile -> occupant.
    by_position: HashMap<GridPos, UnitId>,
    /// Next id to hand out.
    next_id: UnitId,
}

impl UnitStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            by_position: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit under a fresh id.
    fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        unit.id = id;
        self.by_position.insert(unit.position, id);
        self.units.insert(id, unit);
        id
    }

    /// Insert a unit keeping its existing id (used by load).
    fn insert_with_id(&mut self, unit: Unit) {
        self.next_id = self.next_id.max(unit.id + 1);
        self.by_position.insert(unit.position, unit.id);
        self.units.insert(unit.id, unit);
    }

    fn remove(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if self.by_position.get(&unit.position) == Some(&id) {
            self.by_position.remove(&unit.position);
        }
        Some(unit)
    }

    fn relocate(&mut self, id: UnitId, to: GridPos) {
        if let Some(unit) = self.units.get_mut(&id) {
            if self.by_position.get(&unit.position) == Some(&id) {
                self.by_position.remove(&unit.position);
            }
            unit.position = to;
            self.by_position.insert(to, id);
        }
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Id of the unit on a tile.
    #[must_use]
    pub fn id_at(&self, pos: GridPos) -> Option<UnitId> {
        self.by_position.get(&pos).copied()
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate units in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.units.get(&id))
    }
}

/// The living units on one tile.
///
/// Attacks target a tile, not a unit id, so the defender is picked from the
/// stack. Under the one-unit-per-tile rule a stack has at most one member.
#[derive(Debug, Clone)]
pub struct Stack<'a> {
    /// Tile.
    pub position: GridPos,
    /// Living units on the tile.
    pub units: Vec<&'a Unit>,
}

impl<'a> Stack<'a> {
    /// Owner of the stack, `None` when empty.
    #[must_use]
    pub fn owner(&self) -> Option<PlayerId> {
        self.units.first().map(|u| u.owner)
    }

    /// Whether the stack has no living unit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The unit that defends the tile: highest attack+defense+hp, lowest id on ties.
    #[must_use]
    pub fn combat_unit(&self) -> Option<&'a Unit> {
        self.units
            .iter()
            .copied()
            .max_by(|a, b| {
                a.defensive_worth()
                    .cmp(&b.defensive_worth())
                    .then_with(|| b.id.cmp(&a.id))
            })
    }
}

/// Units healed at end of turn: `(unit, hp gained)`.
pub type HealReport = Vec<(UnitId, u32)>;

/// Terrain grid plus everything standing on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Map {
    width: u32,
    height: u32,
    /// Row-major terrain cells.
    terrain: Vec<Terrain>,
    units: UnitStorage,
    cities: Vec<City>,
    ruins: Vec<Ruin>,
}

impl Map {
    /// Create an all-plains map.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "Map width must be positive");
        assert!(height > 0, "Map height must be positive");
        Self::from_terrain(width, height, vec![Terrain::Plains; width as usize * height as usize])
    }

    /// Create a map from a row-major terrain grid.
    ///
    /// # Panics
    ///
    /// Panics if the grid does not hold `width * height` cells.
    #[must_use]
    pub fn from_terrain(width: u32, height: u32, terrain: Vec<Terrain>) -> Self {
        assert_eq!(
            terrain.len(),
            (width as usize) * (height as usize),
            "terrain grid must hold {width}x{height} cells"
        );
        Self {
            width,
            height,
            terrain,
            units: UnitStorage::new(),
            cities: Vec::new(),
            ruins: Vec::new(),
        }
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Check if a position is on the map.
    #[must_use]
    pub const fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn assert_in_bounds(&self, pos: GridPos, op: &str) {
        assert!(
            self.in_bounds(pos),
            "{op}: {pos} is outside the {}x{} map",
            self.width,
            self.height
        );
    }

    /// Terrain at a tile, `None` when out of bounds.
    #[must_use]
    pub fn terrain_at(&self, pos: GridPos) -> Option<Terrain> {
        self.in_bounds(pos).then(|| self.terrain[self.index(pos)])
    }

    /// Overwrite terrain (setup and tests only).
    pub fn set_terrain(&mut self, pos: GridPos, terrain: Terrain) {
        self.assert_in_bounds(pos, "set_terrain");
        let idx = self.index(pos);
        self.terrain[idx] = terrain;
    }

    /// Row-major terrain cells.
    #[must_use]
    pub fn terrain(&self) -> &[Terrain] {
        &self.terrain
    }

    /// Defense bonus of the terrain at a tile (0 off-map).
    #[must_use]
    pub fn defense_bonus(&self, pos: GridPos) -> u32 {
        self.terrain_at(pos).map_or(0, Terrain::defense_bonus)
    }

    /// Orthogonal neighbours inside the map.
    pub fn neighbors(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        pos.orthogonal_neighbors().filter(|p| self.in_bounds(*p))
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// The unit arena.
    #[must_use]
    pub const fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// Get a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Mutable access to a unit (flags, hp, artifacts).
    ///
    /// Position must be changed through [`Map::move_unit`] so the index stays
    /// consistent.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// The living unit on a tile.
    #[must_use]
    pub fn unit_at(&self, pos: GridPos) -> Option<&Unit> {
        self.units
            .id_at(pos)
            .and_then(|id| self.units.get(id))
            .filter(|u| u.is_alive())
    }

    /// All living units on a tile.
    #[must_use]
    pub fn units_at(&self, pos: GridPos) -> Vec<&Unit> {
        self.unit_at(pos).into_iter().collect()
    }

    /// The stack on a tile.
    #[must_use]
    pub fn stack_at(&self, pos: GridPos) -> Stack<'_> {
        Stack {
            position: pos,
            units: self.units_at(pos),
        }
    }

    /// Whether a tile holds a living unit not owned by `player`.
    #[must_use]
    pub fn has_enemy_of(&self, pos: GridPos, player: PlayerId) -> bool {
        self.unit_at(pos).is_some_and(|u| u.owner != player)
    }

    /// Living units owned by a player, in id order.
    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units
            .iter()
            .filter(move |u| u.owner == player && u.is_alive())
    }

    /// The player's living hero, if any.
    #[must_use]
    pub fn hero_of(&self, player: PlayerId) -> Option<&Unit> {
        self.units_of(player).find(|u| u.is_hero())
    }

    /// Place a new unit, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if the position is off the map or already occupied.
    pub fn add_unit(&mut self, unit: Unit) -> UnitId {
        self.assert_in_bounds(unit.position, "add_unit");
        assert!(
            self.unit_at(unit.position).is_none(),
            "add_unit: {} is already occupied",
            unit.position
        );
        self.units.insert(unit)
    }

    /// Restore a unit with a known id (load path).
    ///
    /// # Panics
    ///
    /// Panics if the position is off the map.
    pub fn restore_unit(&mut self, unit: Unit) {
        self.assert_in_bounds(unit.position, "restore_unit");
        self.units.insert_with_id(unit);
    }

    /// Move a unit and mark it as having moved.
    ///
    /// Legality (reachability, occupancy) is the caller's concern.
    ///
    /// # Panics
    ///
    /// Panics if the destination is off the map.
    pub fn move_unit(&mut self, id: UnitId, to: GridPos) {
        self.assert_in_bounds(to, "move_unit");
        self.units.relocate(id, to);
        if let Some(unit) = self.units.get_mut(id) {
            unit.has_moved = true;
        }
    }

    /// Remove a unit from the map.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(id)
    }

    // ------------------------------------------------------------------
    // Cities
    // ------------------------------------------------------------------

    /// Add a city, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if the position is off the map.
    pub fn add_city(&mut self, position: GridPos, size: CitySize, owner: Option<PlayerId>) -> CityId {
        self.assert_in_bounds(position, "add_city");
        let id = self.cities.iter().map(|c| c.id + 1).max().unwrap_or(1);
        self.cities.push(City {
            id,
            position,
            size,
            owner,
        });
        id
    }

    /// Restore a city with a known id (load path).
    pub fn restore_city(&mut self, city: City) {
        self.assert_in_bounds(city.position, "restore_city");
        self.cities.push(city);
    }

    /// All cities.
    #[must_use]
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    /// City by id.
    #[must_use]
    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.iter().find(|c| c.id == id)
    }

    /// City on a tile.
    #[must_use]
    pub fn city_at(&self, pos: GridPos) -> Option<&City> {
        self.cities.iter().find(|c| c.position == pos)
    }

    /// Cities owned by a player.
    pub fn cities_of(&self, player: PlayerId) -> impl Iterator<Item = &City> {
        self.cities.iter().filter(move |c| c.owner == Some(player))
    }

    /// Change a city's owner, returning the previous one.
    pub fn set_city_owner(&mut self, id: CityId, owner: Option<PlayerId>) -> Option<PlayerId> {
        self.cities
            .iter_mut()
            .find(|c| c.id == id)
            .and_then(|c| std::mem::replace(&mut c.owner, owner))
    }

    /// True iff an orthogonal neighbour of the city holds a living unit not owned by `owner`.
    #[must_use]
    pub fn is_city_blockaded(&self, city: &City, owner: PlayerId) -> bool {
        self.neighbors(city.position)
            .any(|p| self.has_enemy_of(p, owner))
    }

    /// Heal every unit standing in a city its owner holds.
    ///
    /// Each heals `floor(20% of max hp)`, clamped to max.
    pub fn heal_units_in_cities(&mut self) -> HealReport {
        let mut healed = Vec::new();
        for city in &self.cities {
            let Some(owner) = city.owner else {
                continue;
            };
            let Some(id) = self.units.id_at(city.position) else {
                continue;
            };
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            if unit.owner != owner || !unit.is_alive() {
                continue;
            }
            let amount = unit.max_hp() * CITY_HEAL_PERCENT / 100;
            let gained = unit.heal(amount);
            if gained > 0 {
                healed.push((id, gained));
            }
        }
        healed
    }

    // ------------------------------------------------------------------
    // Ruins
    // ------------------------------------------------------------------

    /// Add a ruin.
    ///
    /// # Panics
    ///
    /// Panics if the position is off the map.
    pub fn add_ruin(&mut self, position: GridPos) {
        self.assert_in_bounds(position, "add_ruin");
        self.ruins.push(Ruin {
            position,
            explored: false,
        });
    }

    /// Restore a ruin with its explored flag (load path).
    pub fn restore_ruin(&mut self, ruin: Ruin) {
        self.assert_in_bounds(ruin.position, "restore_ruin");
        self.ruins.push(ruin);
    }

    /// All ruins.
    #[must_use]
    pub fn ruins(&self) -> &[Ruin] {
        &self.ruins
    }

    /// Ruin on a tile.
    #[must_use]
    pub fn ruin_at(&self, pos: GridPos) -> Option<&Ruin> {
        self.ruins.iter().find(|r| r.position == pos)
    }

    /// Explore the ruin on a tile.
    ///
    /// Returns `None` if there is no ruin or it was already explored;
    /// otherwise marks it explored and draws one artifact uniformly from the
    /// catalog.
    ///
    /// # Panics
    ///
    /// Panics if the position is off the map.
    pub fn explore_ruin<R: Rng>(&mut self, pos: GridPos, rng: &mut R) -> Option<Artifact> {
        self.assert_in_bounds(pos, "explore_ruin");
        let ruin = self
            .ruins
            .iter_mut()
            .find(|r| r.position == pos && !r.explored)?;
        ruin.explored = true;
        let artifact = Artifact::CATALOG[rng.gen_range(0..Artifact::CATALOG.len())];
        tracing::debug!(%pos, artifact = artifact.name(), "Ruin explored");
        Some(artifact)
    }

    /// Whether a tile holds no unit at all and its terrain admits the type.
    #[must_use]
    pub fn is_free_for(&self, pos: GridPos, unit_type: crate::unit_kind::UnitType) -> bool {
        self.terrain_at(pos).is_some_and(|t| unit_type.can_enter(t)) && self.unit_at(pos).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_kind::UnitType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pos(x: u32, y: u32) -> GridPos {
        GridPos::new(x, y)
    }

    #[test]
    fn test_new_map_is_plains() {
        let map = Map::new(4, 3);
        assert_eq!(map.terrain_at(pos(3, 2)), Some(Terrain::Plains));
        assert_eq!(map.terrain_at(pos(4, 0)), None);
    }

    #[test]
    fn test_add_and_move_unit_keeps_index() {
        let mut map = Map::new(5, 5);
        let id = map.add_unit(Unit::new(UnitType::LightInfantry, 0, pos(1, 1)));

        map.move_unit(id, pos(2, 1));
        assert!(map.unit_at(pos(1, 1)).is_none());
        let unit = map.unit_at(pos(2, 1)).unwrap();
        assert_eq!(unit.id, id);
        assert!(unit.has_moved);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_move_out_of_bounds_panics() {
        let mut map = Map::new(3, 3);
        let id = map.add_unit(Unit::new(UnitType::Hero, 0, pos(0, 0)));
        map.move_unit(id, pos(3, 0));
    }

    #[test]
    fn test_dead_unit_not_queryable() {
        let mut map = Map::new(3, 3);
        let id = map.add_unit(Unit::new(UnitType::Archer, 0, pos(1, 1)));
        map.unit_mut(id).unwrap().take_damage(100);
        assert!(map.units_at(pos(1, 1)).is_empty());
        assert!(map.stack_at(pos(1, 1)).is_empty());
    }

    #[test]
    fn test_remove_unit() {
        let mut map = Map::new(3, 3);
        let id = map.add_unit(Unit::new(UnitType::Archer, 1, pos(2, 2)));
        assert!(map.remove_unit(id).is_some());
        assert!(map.unit(id).is_none());
        assert!(map.unit_at(pos(2, 2)).is_none());
        assert_eq!(map.units_of(1).count(), 0);
    }

    #[test]
    fn test_blockade_orthogonal_only() {
        let mut map = Map::new(5, 5);
        let city_id = map.add_city(pos(2, 2), CitySize::Small, Some(0));
        map.add_unit(Unit::new(UnitType::Cavalry, 1, pos(3, 3)));
        let city = map.city(city_id).unwrap().clone();
        assert!(!map.is_city_blockaded(&city, 0));

        map.add_unit(Unit::new(UnitType::Cavalry, 0, pos(2, 1)));
        assert!(!map.is_city_blockaded(&city, 0));

        map.add_unit(Unit::new(UnitType::Cavalry, 1, pos(1, 2)));
        assert!(map.is_city_blockaded(&city, 0));
    }

    #[test]
    fn test_explore_ruin_once() {
        let mut map = Map::new(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        map.add_ruin(pos(1, 1));

        assert!(map.explore_ruin(pos(1, 1), &mut rng).is_some());
        assert!(map.explore_ruin(pos(1, 1), &mut rng).is_none());
        assert!(map.ruin_at(pos(1, 1)).unwrap().explored);
        assert!(map.explore_ruin(pos(0, 0), &mut rng).is_none());
    }

    #[test]
    fn test_heal_in_own_city_only() {
        let mut map = Map::new(4, 4);
        map.add_city(pos(0, 0), CitySize::Large, Some(0));
        map.add_city(pos(3, 3), CitySize::Large, Some(1));
        let own = map.add_unit(Unit::new(UnitType::HeavyInfantry, 0, pos(0, 0)));
        let intruder = map.add_unit(Unit::new(UnitType::HeavyInfantry, 0, pos(3, 3)));
        map.unit_mut(own).unwrap().take_damage(20);
        map.unit_mut(intruder).unwrap().take_damage(20);

        let healed = map.heal_units_in_cities();

        assert_eq!(healed, vec![(own, 6)]);
        assert_eq!(map.unit(own).unwrap().hp(), 16);
        assert_eq!(map.unit(intruder).unwrap().hp(), 10);
    }

    #[test]
    fn test_combat_unit_prefers_strongest() {
        let mut map = Map::new(3, 3);
        map.add_unit(Unit::new(UnitType::HeavyInfantry, 1, pos(1, 1)));
        let stack = map.stack_at(pos(1, 1));
        assert_eq!(stack.owner(), Some(1));
        assert_eq!(
            stack.combat_unit().map(|u| u.unit_type),
            Some(UnitType::HeavyInfantry)
        );
    }

    #[test]
    fn test_set_city_owner() {
        let mut map = Map::new(3, 3);
        let id = map.add_city(pos(1, 1), CitySize::Medium, None);
        assert_eq!(map.set_city_owner(id, Some(2)), None);
        assert_eq!(map.set_city_owner(id, Some(1)), Some(2));
        assert_eq!(map.cities_of(1).count(), 1);
    }
}
