//! Fixed-point math and grid coordinates.
//!
//! Combat arithmetic uses fixed-point numbers so that a given seed replays to
//! the same damage on every platform. Grid positions are plain unsigned tile
//! coordinates.

use std::fmt;

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all rule math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build a fixed-point fraction from a whole percentage (`percent(15)` = 0.15).
#[inline]
#[must_use]
pub fn percent(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Orthogonal neighbour offsets: north, east, south, west.
pub const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// A tile coordinate on the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl GridPos {
    /// Create a new grid position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offset by `(dx, dy)`, returning `None` when the result would be negative.
    ///
    /// Upper bounds are the map's concern.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Self { x, y })
    }

    /// The up-to-four orthogonal neighbours (lower bound checked only).
    pub fn orthogonal_neighbors(self) -> impl Iterator<Item = Self> {
        ORTHOGONAL
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// Chebyshev (8-directional) distance, used for attack range.
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Manhattan (4-directional) distance, used by AI approach heuristics.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(100), Fixed::ONE);
        assert_eq!(percent(50) * Fixed::from_num(20), Fixed::from_num(10));
    }

    #[test]
    fn test_offset_rejects_negative() {
        let origin = GridPos::new(0, 0);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(1, 2), Some(GridPos::new(1, 2)));
    }

    #[test]
    fn test_orthogonal_neighbors_at_corner() {
        let neighbors: Vec<_> = GridPos::new(0, 0).orthogonal_neighbors().collect();
        assert_eq!(neighbors, vec![GridPos::new(1, 0), GridPos::new(0, 1)]);
    }

    #[test]
    fn test_distances() {
        let a = GridPos::new(1, 1);
        let b = GridPos::new(3, 2);
        assert_eq!(a.chebyshev(b), 2);
        assert_eq!(a.manhattan(b), 3);
        assert_eq!(a.chebyshev(a), 0);
    }
}
