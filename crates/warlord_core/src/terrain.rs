//! Terrain cell kinds.

use serde::{Deserialize, Serialize};

/// Terrain for one map cell.
///
/// Terrain is generated once per game and only changes through load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open ground.
    #[default]
    Plains,
    /// Woodland, light cover.
    Forest,
    /// High ground, heavy cover, slow to cross.
    Mountains,
    /// Lakes and rivers; only flyers cross.
    Water,
}

impl Terrain {
    /// All terrain kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::Plains, Self::Forest, Self::Mountains, Self::Water];

    /// Defense bonus granted to a unit standing on this terrain.
    #[must_use]
    pub const fn defense_bonus(self) -> u32 {
        match self {
            Self::Plains => 0,
            Self::Forest => 1,
            Self::Mountains => 2,
            Self::Water => 0,
        }
    }

    /// Movement points spent entering this terrain (passability is per unit type).
    #[must_use]
    pub const fn movement_cost(self) -> u32 {
        match self {
            Self::Plains | Self::Forest | Self::Water => 1,
            Self::Mountains => 2,
        }
    }

    /// One-character glyph for ASCII dumps.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Plains => '.',
            Self::Forest => 'f',
            Self::Mountains => '^',
            Self::Water => '~',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defense_bonus() {
        assert_eq!(Terrain::Plains.defense_bonus(), 0);
        assert_eq!(Terrain::Forest.defense_bonus(), 1);
        assert_eq!(Terrain::Mountains.defense_bonus(), 2);
        assert_eq!(Terrain::Water.defense_bonus(), 0);
    }

    #[test]
    fn test_movement_cost() {
        assert_eq!(Terrain::Mountains.movement_cost(), 2);
        assert!(Terrain::ALL
            .iter()
            .filter(|t| **t != Terrain::Mountains)
            .all(|t| t.movement_cost() == 1));
    }
}
