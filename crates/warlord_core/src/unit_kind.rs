//! Unit archetypes and their base statistics.
//!
//! Seven fixed archetypes. Stats are compile-time constants; there are no
//! faction variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::terrain::Terrain;

/// Base statistics for a unit archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitStats {
    /// Maximum hit points.
    pub max_hp: u32,
    /// Base attack.
    pub attack: u32,
    /// Base defense.
    pub defense: u32,
    /// Movement points per turn.
    pub movement: u32,
    /// Attack range (Chebyshev tiles).
    pub range: u32,
    /// Gold cost; `None` when the type cannot be produced.
    pub cost: Option<u32>,
}

/// The seven unit archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    /// Player leader. Explores ruins and carries artifacts.
    Hero,
    /// Cheap line troops.
    LightInfantry,
    /// Slow, armoured anti-cavalry.
    HeavyInfantry,
    /// Ranged skirmisher.
    Archer,
    /// Fast shock troops.
    Cavalry,
    /// Long-range siege engine.
    Catapult,
    /// Flying monster; crosses any terrain.
    Dragon,
}

impl UnitType {
    /// Every archetype.
    pub const ALL: [Self; 7] = [
        Self::Hero,
        Self::LightInfantry,
        Self::HeavyInfantry,
        Self::Archer,
        Self::Cavalry,
        Self::Catapult,
        Self::Dragon,
    ];

    /// Producible archetypes from most to least expensive.
    pub const BY_COST_DESC: [Self; 6] = [
        Self::Dragon,
        Self::Catapult,
        Self::Cavalry,
        Self::HeavyInfantry,
        Self::Archer,
        Self::LightInfantry,
    ];

    /// Base statistics for this archetype.
    #[must_use]
    pub const fn stats(self) -> UnitStats {
        match self {
            Self::Hero => UnitStats {
                max_hp: 30,
                attack: 7,
                defense: 4,
                movement: 4,
                range: 1,
                cost: None,
            },
            Self::LightInfantry => UnitStats {
                max_hp: 20,
                attack: 4,
                defense: 2,
                movement: 3,
                range: 1,
                cost: Some(10),
            },
            Self::HeavyInfantry => UnitStats {
                max_hp: 30,
                attack: 5,
                defense: 5,
                movement: 2,
                range: 1,
                cost: Some(20),
            },
            Self::Archer => UnitStats {
                max_hp: 15,
                attack: 5,
                defense: 1,
                movement: 3,
                range: 2,
                cost: Some(15),
            },
            Self::Cavalry => UnitStats {
                max_hp: 25,
                attack: 6,
                defense: 3,
                movement: 5,
                range: 1,
                cost: Some(25),
            },
            Self::Catapult => UnitStats {
                max_hp: 15,
                attack: 8,
                defense: 1,
                movement: 2,
                range: 3,
                cost: Some(30),
            },
            Self::Dragon => UnitStats {
                max_hp: 40,
                attack: 9,
                defense: 5,
                movement: 5,
                range: 1,
                cost: Some(50),
            },
        }
    }

    /// Whether this archetype may enter the given terrain.
    #[must_use]
    pub const fn can_enter(self, terrain: Terrain) -> bool {
        match self {
            Self::Dragon => true,
            Self::Hero | Self::LightInfantry => !matches!(terrain, Terrain::Water),
            Self::HeavyInfantry | Self::Archer | Self::Cavalry => {
                matches!(terrain, Terrain::Plains | Terrain::Forest)
            }
            Self::Catapult => matches!(terrain, Terrain::Plains),
        }
    }

    /// Display / save name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hero => "Hero",
            Self::LightInfantry => "LightInfantry",
            Self::HeavyInfantry => "HeavyInfantry",
            Self::Archer => "Archer",
            Self::Cavalry => "Cavalry",
            Self::Catapult => "Catapult",
            Self::Dragon => "Dragon",
        }
    }

    /// Look up an archetype by its name.
    ///
    /// # Panics
    ///
    /// Panics on an unrecognized name. Callers holding untrusted input should
    /// use [`UnitType::try_from_name`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::try_from_name(name).unwrap_or_else(|| panic!("unrecognized unit type '{name}'"))
    }

    /// Look up an archetype by its name, `None` if unknown.
    #[must_use]
    pub fn try_from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Production cost, `None` for heroes.
    #[must_use]
    pub const fn cost(self) -> Option<u32> {
        self.stats().cost
    }

    /// Whether the type attacks beyond adjacent tiles.
    #[must_use]
    pub const fn is_ranged(self) -> bool {
        self.stats().range > 1
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
