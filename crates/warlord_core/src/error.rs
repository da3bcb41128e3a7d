//! Error types for the rule engine.
//!
//! Invariant violations (bad coordinates handed to a map mutator, an unknown
//! unit type) are programmer errors and panic. Everything in this module is
//! a *recoverable* rejection: the action is a no-op and the state is left
//! untouched.

use thiserror::Error;

use crate::components::{CityId, PlayerId, UnitId};
use crate::math::GridPos;
use crate::phase::Phase;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Result of a player or AI action.
pub type ActionResult<T> = std::result::Result<T, ActionError>;

/// Top-level error type for the rule engine.
#[derive(Debug, Error)]
pub enum GameError {
    /// A player or AI action was rejected.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Save payload could not be produced or read.
    #[error(transparent)]
    Save(#[from] SaveError),

    /// The AI turn could not start.
    #[error(transparent)]
    Ai(#[from] AiError),

    /// Configuration data failed to parse.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path or label of the config source.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Configuration parsed but describes an unplayable game.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// An illegal phase transition (not in the whitelist).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal phase transition {from:?} -> {to:?}")]
pub struct PhaseError {
    /// Phase the machine was in.
    pub from: Phase,
    /// Phase that was requested.
    pub to: Phase,
}

/// Illegal-but-reachable actions, rejected locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The game has ended.
    #[error("The game is over")]
    GameOver,

    /// An AI turn is executing; interactive input is refused.
    #[error("An AI turn is in progress")]
    AiTurnInProgress,

    /// Phase machine refused the transition.
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// No unit or city is selected.
    #[error("Nothing is selected")]
    NothingSelected,

    /// Unit id not present on the map.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// City id not present on the map.
    #[error("City not found: {0}")]
    CityNotFound(CityId),

    /// No unit stands on the tile.
    #[error("No unit at {0}")]
    NoUnitAt(GridPos),

    /// No city stands on the tile.
    #[error("No city at {0}")]
    NoCityAt(GridPos),

    /// The acting player does not own the unit or city.
    #[error("Player {player} does not own this piece")]
    NotOwned {
        /// Player attempting the action.
        player: PlayerId,
    },

    /// Unit already spent its movement this turn.
    #[error("Unit {0} has already moved")]
    AlreadyMoved(UnitId),

    /// Unit already attacked this turn.
    #[error("Unit {0} has already attacked")]
    AlreadyAttacked(UnitId),

    /// Destination not reachable this turn.
    #[error("{0} is not reachable")]
    Unreachable(GridPos),

    /// Destination already holds a unit.
    #[error("{0} is occupied")]
    TileOccupied(GridPos),

    /// Target outside attack range or holds no enemy.
    #[error("No attackable enemy at {0}")]
    InvalidTarget(GridPos),

    /// Unit type cannot be produced in cities.
    #[error("{0} cannot be produced")]
    NotProducible(&'static str),

    /// City has an enemy unit orthogonally adjacent.
    #[error("City {0} is blockaded")]
    Blockaded(CityId),

    /// Player cannot pay for the action.
    #[error("Insufficient gold: need {required}, have {available}")]
    InsufficientGold {
        /// Gold required.
        required: u32,
        /// Gold available.
        available: u32,
    },

    /// Neither the city tile nor any orthogonal neighbour can take the unit.
    #[error("No free tile around city {0}")]
    NoSpawnTile(CityId),
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Payload could not be encoded.
    #[error("Failed to encode save: {0}")]
    Encode(String),

    /// Payload could not be decoded.
    #[error("Failed to decode save: {0}")]
    Decode(String),

    /// Payload version is not understood.
    #[error("Save version mismatch: expected {expected}, got {found}")]
    VersionMismatch {
        /// Version this build writes.
        expected: u32,
        /// Version found in the payload.
        found: u32,
    },

    /// Storage medium failed.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons the AI refuses to start a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// Another AI turn is already executing.
    #[error("AI turn already running")]
    AlreadyRunning,

    /// The current player is not AI-controlled.
    #[error("Player {0} is not AI-controlled")]
    NotAiPlayer(PlayerId),

    /// The game has ended.
    #[error("The game is over")]
    GameOver,
}
