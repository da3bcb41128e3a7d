//! Movement reachability and attack eligibility.
//!
//! Reachability is a uniform-cost search over orthogonal steps. Tiles the
//! unit's type cannot enter are never enqueued. Enemy-held tiles are recorded
//! as attack candidates but not expanded. Friendly-held tiles are expanded
//! (units may pass through allies) and filtered out only when destinations are
//! presented.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::components::Unit;
use crate::map::Map;
use crate::math::GridPos;

/// A tile found by [`reachable_tiles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReachableTile {
    /// Tile.
    pub position: GridPos,
    /// Movement points spent to get there.
    pub cost: u32,
    /// Holds a living enemy; terminal for the search.
    pub is_enemy: bool,
}

/// Frontier entry for the cost search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchNode {
    position: GridPos,
    cost: u32,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost; ties broken by position for a stable order.
        match other.cost.cmp(&self.cost) {
            Ordering::Equal => other.position.cmp(&self.position),
            ord => ord,
        }
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Every tile the unit can reach or threaten by moving this turn.
///
/// Uses the unit's effective movement as the budget. The origin is excluded.
/// Results are sorted by position.
#[must_use]
pub fn reachable_tiles(map: &Map, unit: &Unit) -> Vec<ReachableTile> {
    let budget = unit.effective_movement();
    let origin = unit.position;

    let mut best: HashMap<GridPos, u32> = HashMap::new();
    let mut found: HashMap<GridPos, ReachableTile> = HashMap::new();
    let mut frontier = BinaryHeap::new();

    best.insert(origin, 0);
    frontier.push(SearchNode {
        position: origin,
        cost: 0,
    });

    while let Some(SearchNode { position, cost }) = frontier.pop() {
        if best.get(&position).is_some_and(|&c| c < cost) {
            continue;
        }

        for next in map.neighbors(position) {
            let Some(terrain) = map.terrain_at(next) else {
                continue;
            };
            if !unit.unit_type.can_enter(terrain) {
                continue;
            }
            let next_cost = cost + terrain.movement_cost();
            if next_cost > budget || best.get(&next).is_some_and(|&c| c <= next_cost) {
                continue;
            }
            best.insert(next, next_cost);

            let is_enemy = map.has_enemy_of(next, unit.owner);
            found.insert(
                next,
                ReachableTile {
                    position: next,
                    cost: next_cost,
                    is_enemy,
                },
            );
            if !is_enemy {
                frontier.push(SearchNode {
                    position: next,
                    cost: next_cost,
                });
            }
        }
    }

    let mut tiles: Vec<_> = found.into_values().collect();
    tiles.sort_unstable_by_key(|t| t.position);
    tiles
}

/// Reachable tiles that are legal move destinations: no enemy, no occupant.
#[must_use]
pub fn move_destinations(map: &Map, unit: &Unit) -> Vec<ReachableTile> {
    reachable_tiles(map, unit)
        .into_iter()
        .filter(|t| !t.is_enemy && map.unit_at(t.position).is_none())
        .collect()
}

/// Movement cost to a legal destination, `None` if it is not one.
#[must_use]
pub fn path_cost(map: &Map, unit: &Unit, to: GridPos) -> Option<u32> {
    move_destinations(map, unit)
        .into_iter()
        .find(|t| t.position == to)
        .map(|t| t.cost)
}

/// Tiles within attack range (Chebyshev) that hold a living enemy.
///
/// Independent of movement and of whether the unit already attacked.
#[must_use]
pub fn attack_targets(map: &Map, unit: &Unit) -> Vec<GridPos> {
    let range = unit.range();
    let origin = unit.position;
    let min_x = origin.x.saturating_sub(range);
    let min_y = origin.y.saturating_sub(range);
    let max_x = (origin.x + range).min(map.width() - 1);
    let max_y = (origin.y + range).min(map.height() - 1);

    let mut targets = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let pos = GridPos::new(x, y);
            if pos != origin && map.has_enemy_of(pos, unit.owner) {
                targets.push(pos);
            }
        }
    }
    targets
}

/// The one attack-eligibility rule for every unit type.
///
/// True iff the attacker is alive, has not attacked this turn, the target is
/// within its Chebyshev range and holds a living enemy. Melee units reach
/// range 1 by moving first; ranged units may fire without moving.
#[must_use]
pub fn can_attack(map: &Map, unit: &Unit, target: GridPos) -> bool {
    unit.is_alive()
        && !unit.has_attacked
        && target != unit.position
        && unit.position.chebyshev(target) <= unit.range()
        && map.has_enemy_of(target, unit.owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Terrain;
    use crate::unit_kind::UnitType;

    fn pos(x: u32, y: u32) -> GridPos {
        GridPos::new(x, y)
    }

    fn place(map: &mut Map, kind: UnitType, owner: u8, at: GridPos) -> Unit {
        let id = map.add_unit(Unit::new(kind, owner, at));
        map.unit(id).unwrap().clone()
    }

    #[test]
    fn test_open_plains_diamond() {
        let mut map = Map::new(9, 9);
        let unit = place(&mut map, UnitType::HeavyInfantry, 0, pos(4, 4));
        let tiles = reachable_tiles(&map, &unit);
        // Manhattan ball of radius 2 minus origin.
        assert_eq!(tiles.len(), 12);
        assert!(tiles.iter().all(|t| t.cost <= 2));
        assert!(tiles.iter().all(|t| t.position.manhattan(unit.position) <= 2));
    }

    #[test]
    fn test_mountains_cost_two() {
        let mut map = Map::new(5, 1);
        map.set_terrain(pos(1, 0), Terrain::Mountains);
        let unit = place(&mut map, UnitType::LightInfantry, 0, pos(0, 0));
        let tiles = reachable_tiles(&map, &unit);
        let costs: Vec<_> = tiles.iter().map(|t| (t.position.x, t.cost)).collect();
        assert_eq!(costs, vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn test_impassable_never_returned() {
        let mut map = Map::new(5, 1);
        map.set_terrain(pos(1, 0), Terrain::Water);
        let unit = place(&mut map, UnitType::Cavalry, 0, pos(0, 0));
        assert!(reachable_tiles(&map, &unit).is_empty());

        let dragon = place(&mut map, UnitType::Dragon, 0, pos(4, 0));
        assert!(reachable_tiles(&map, &dragon)
            .iter()
            .any(|t| t.position == pos(1, 0)));
    }

    #[test]
    fn test_enemy_tiles_are_terminal() {
        let mut map = Map::new(5, 1);
        let unit = place(&mut map, UnitType::Cavalry, 0, pos(0, 0));
        place(&mut map, UnitType::LightInfantry, 1, pos(2, 0));

        let tiles = reachable_tiles(&map, &unit);
        assert_eq!(tiles.len(), 2);
        assert!(tiles[1].is_enemy);
        assert_eq!(tiles[1].position, pos(2, 0));
    }

    #[test]
    fn test_friendly_tiles_traversed_not_destinations() {
        let mut map = Map::new(4, 1);
        let unit = place(&mut map, UnitType::LightInfantry, 0, pos(0, 0));
        place(&mut map, UnitType::LightInfantry, 0, pos(1, 0));

        let reach: Vec<_> = reachable_tiles(&map, &unit)
            .iter()
            .map(|t| t.position.x)
            .collect();
        assert_eq!(reach, vec![1, 2, 3]);

        let dest: Vec<_> = move_destinations(&map, &unit)
            .iter()
            .map(|t| t.position.x)
            .collect();
        assert_eq!(dest, vec![2, 3]);
        assert_eq!(path_cost(&map, &unit, pos(1, 0)), None);
        assert_eq!(path_cost(&map, &unit, pos(3, 0)), Some(3));
    }

    #[test]
    fn test_attack_targets_use_chebyshev() {
        let mut map = Map::new(6, 6);
        let archer = place(&mut map, UnitType::Archer, 0, pos(2, 2));
        place(&mut map, UnitType::LightInfantry, 1, pos(4, 4));
        place(&mut map, UnitType::LightInfantry, 1, pos(5, 2));
        place(&mut map, UnitType::LightInfantry, 0, pos(3, 3));

        assert_eq!(attack_targets(&map, &archer), vec![pos(4, 4)]);
    }

    #[test]
    fn test_can_attack_rules() {
        let mut map = Map::new(5, 5);
        let mut hero = place(&mut map, UnitType::Hero, 0, pos(1, 1));
        place(&mut map, UnitType::LightInfantry, 1, pos(2, 2));
        place(&mut map, UnitType::LightInfantry, 0, pos(1, 2));

        assert!(can_attack(&map, &hero, pos(2, 2)));
        assert!(!can_attack(&map, &hero, pos(1, 2)));
        assert!(!can_attack(&map, &hero, pos(3, 3)));

        hero.has_attacked = true;
        assert!(!can_attack(&map, &hero, pos(2, 2)));
    }
}
