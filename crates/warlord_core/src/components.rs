//! Entity records: units, cities, ruins, artifacts and players.
//!
//! These are plain data with small derived-value accessors. Ownership
//! relations (which units and cities a player holds) are not stored on the
//! player; they are derived from the map by filtering on `owner`.

use serde::{Deserialize, Serialize};

use crate::math::GridPos;
use crate::unit_kind::UnitType;

/// Unique identifier for units.
pub type UnitId = u32;

/// Unique identifier for cities.
pub type CityId = u32;

/// Player identifier (index into the player list).
pub type PlayerId = u8;

/// Fraction of max hp restored per turn to a unit resting in a friendly city.
pub const CITY_HEAL_PERCENT: u32 = 20;

/// Equippable treasure found in ruins.
///
/// Bonuses are additive on top of the carrier's base stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    /// +2 attack.
    SwordOfValor,
    /// +2 defense.
    AegisShield,
    /// +1 movement.
    BootsOfHaste,
    /// +1 attack, +1 defense.
    CrownOfCommand,
    /// +3 defense.
    DragonscaleCloak,
    /// +3 attack.
    BowOfTheAncients,
}

impl Artifact {
    /// Everything a ruin can yield.
    pub const CATALOG: [Self; 6] = [
        Self::SwordOfValor,
        Self::AegisShield,
        Self::BootsOfHaste,
        Self::CrownOfCommand,
        Self::DragonscaleCloak,
        Self::BowOfTheAncients,
    ];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SwordOfValor => "Sword of Valor",
            Self::AegisShield => "Aegis Shield",
            Self::BootsOfHaste => "Boots of Haste",
            Self::CrownOfCommand => "Crown of Command",
            Self::DragonscaleCloak => "Dragonscale Cloak",
            Self::BowOfTheAncients => "Bow of the Ancients",
        }
    }

    /// Additive attack bonus.
    #[must_use]
    pub const fn attack(self) -> u32 {
        match self {
            Self::SwordOfValor => 2,
            Self::CrownOfCommand => 1,
            Self::BowOfTheAncients => 3,
            _ => 0,
        }
    }

    /// Additive defense bonus.
    #[must_use]
    pub const fn defense(self) -> u32 {
        match self {
            Self::AegisShield => 2,
            Self::CrownOfCommand => 1,
            Self::DragonscaleCloak => 3,
            _ => 0,
        }
    }

    /// Additive movement bonus.
    #[must_use]
    pub const fn movement(self) -> u32 {
        match self {
            Self::BootsOfHaste => 1,
            _ => 0,
        }
    }
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id, assigned by the map arena.
    pub id: UnitId,
    /// Archetype.
    pub unit_type: UnitType,
    /// Owning player.
    pub owner: PlayerId,
    /// Tile the unit stands on.
    pub position: GridPos,
    /// Current hit points, always within `0..=max_hp()`.
    hp: u32,
    /// Moved this turn.
    pub has_moved: bool,
    /// Attacked this turn.
    pub has_attacked: bool,
    /// Carried artifacts.
    pub artifacts: Vec<Artifact>,
}

impl Unit {
    /// Create a unit at full health. The id is replaced on insertion.
    #[must_use]
    pub fn new(unit_type: UnitType, owner: PlayerId, position: GridPos) -> Self {
        Self {
            id: 0,
            unit_type,
            owner,
            position,
            hp: unit_type.stats().max_hp,
            has_moved: false,
            has_attacked: false,
            artifacts: Vec::new(),
        }
    }

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Set hit points, clamped to `0..=max_hp`.
    pub fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.max_hp());
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.unit_type.stats().max_hp
    }

    /// Whether the unit still stands.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether this is a hero.
    #[must_use]
    pub fn is_hero(&self) -> bool {
        self.unit_type == UnitType::Hero
    }

    /// Attack plus artifact bonuses.
    #[must_use]
    pub fn effective_attack(&self) -> u32 {
        self.unit_type.stats().attack + self.artifacts.iter().map(|a| a.attack()).sum::<u32>()
    }

    /// Defense plus artifact bonuses.
    #[must_use]
    pub fn effective_defense(&self) -> u32 {
        self.unit_type.stats().defense + self.artifacts.iter().map(|a| a.defense()).sum::<u32>()
    }

    /// Movement plus artifact bonuses.
    #[must_use]
    pub fn effective_movement(&self) -> u32 {
        self.unit_type.stats().movement + self.artifacts.iter().map(|a| a.movement()).sum::<u32>()
    }

    /// Attack range in Chebyshev tiles.
    #[must_use]
    pub const fn range(&self) -> u32 {
        self.unit_type.stats().range
    }

    /// Apply damage, returning hp actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Restore hp up to max, returning hp actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.hp;
        self.set_hp(self.hp.saturating_add(amount));
        self.hp - before
    }

    /// Clear per-turn flags.
    pub fn reset_turn(&mut self) {
        self.has_moved = false;
        self.has_attacked = false;
    }

    /// Whether the unit has nothing left to do this turn.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.has_moved && self.has_attacked
    }

    /// Value used to pick a tile's defender and to order AI moves
    /// (`attack + defense + hp`).
    #[must_use]
    pub fn defensive_worth(&self) -> u32 {
        self.effective_attack() + self.effective_defense() + self.hp
    }
}

/// City size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CitySize {
    /// 5 gold per turn.
    Small,
    /// 10 gold per turn.
    Medium,
    /// 20 gold per turn.
    Large,
}

impl CitySize {
    /// Gold credited to the owner each turn.
    #[must_use]
    pub const fn income(self) -> u32 {
        match self {
            Self::Small => 5,
            Self::Medium => 10,
            Self::Large => 20,
        }
    }
}

/// A city tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct City {
    /// Unique id.
    pub id: CityId,
    /// Tile.
    pub position: GridPos,
    /// Size class.
    pub size: CitySize,
    /// Owner, `None` for neutral.
    pub owner: Option<PlayerId>,
}

impl City {
    /// Income per turn.
    #[must_use]
    pub const fn income(&self) -> u32 {
        self.size.income()
    }

    /// Whether `player` owns this city.
    #[must_use]
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }
}

/// A treasure site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ruin {
    /// Tile.
    pub position: GridPos,
    /// Already looted.
    pub explored: bool,
}

/// Starting gold for every player.
pub const STARTING_GOLD: u32 = 50;

/// A participant in the game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Player id (also its index in the turn order).
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Controlled by the heuristic AI.
    pub is_ai: bool,
    /// Gold balance.
    pub gold: u32,
    /// Still in the game.
    pub is_alive: bool,
}

impl Player {
    /// Create a player with the given starting gold.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, is_ai: bool, gold: u32) -> Self {
        Self {
            id,
            name: name.into(),
            is_ai,
            gold,
            is_alive: true,
        }
    }

    /// Spend gold if the balance allows it.
    ///
    /// Returns true if the transaction succeeded.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.gold >= amount {
            self.gold -= amount;
            true
        } else {
            false
        }
    }
}
