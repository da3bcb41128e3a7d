//! Save payload and storage.
//!
//! A save is a flat, versioned record of the whole game position, encodable
//! as JSON or bincode. Loading rebuilds the map (units first) and then the
//! roster, whose unit and city lists are derived from the map again rather
//! than trusted from the payload.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::components::{Artifact, City, CityId, CitySize, Player, PlayerId, Ruin, Unit, UnitId};
use crate::config::MAX_PLAYERS;
use crate::error::SaveError;
use crate::game::Game;
use crate::map::Map;
use crate::math::GridPos;
use crate::terrain::Terrain;
use crate::unit_kind::UnitType;

/// Save format version for compatibility.
pub const SAVE_VERSION: u32 = 1;

/// A city in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Id.
    pub id: CityId,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Size class.
    pub size: CitySize,
    /// Owner, `None` for neutral.
    pub owner: Option<PlayerId>,
}

/// A ruin in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuinRecord {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Already looted.
    pub explored: bool,
}

/// A unit in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Id.
    pub id: UnitId,
    /// Archetype.
    pub unit_type: UnitType,
    /// Owner.
    pub owner: PlayerId,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Current hp.
    pub hp: u32,
    /// Moved this turn.
    pub has_moved: bool,
    /// Attacked this turn.
    pub has_attacked: bool,
    /// Carried artifacts.
    pub artifacts: Vec<Artifact>,
}

/// A player in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// AI-controlled.
    pub is_ai: bool,
    /// Gold.
    pub gold: u32,
    /// Still in the game.
    pub is_alive: bool,
    /// Units owned at save time (informational; rebuilt on load).
    pub units: Vec<UnitId>,
    /// Cities owned at save time (informational; rebuilt on load).
    pub cities: Vec<CityId>,
}

/// Complete save payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    /// Format version.
    pub version: u32,
    /// Capture time, seconds since the Unix epoch.
    pub timestamp: u64,
    /// Map width.
    pub width: u32,
    /// Map height.
    pub height: u32,
    /// Terrain, one row per `y`.
    pub terrain: Vec<Vec<Terrain>>,
    /// Cities.
    pub cities: Vec<CityRecord>,
    /// Ruins.
    pub ruins: Vec<RuinRecord>,
    /// Living units.
    pub units: Vec<UnitRecord>,
    /// Players in turn order.
    pub players: Vec<PlayerRecord>,
    /// Index of the acting player.
    pub current_player: usize,
    /// Turn number.
    pub turn: u32,
    /// Game seed.
    pub seed: u64,
}

/// Payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    /// Human-readable JSON.
    #[default]
    Json,
    /// Compact bincode.
    Binary,
}

impl SaveData {
    /// Snapshot a game, stamped with the current time.
    #[must_use]
    pub fn capture(game: &Game) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self::capture_at(game, timestamp)
    }

    /// Snapshot a game with an explicit timestamp.
    #[must_use]
    pub fn capture_at(game: &Game, timestamp: u64) -> Self {
        let map = game.map();
        let width = map.width() as usize;
        let terrain = map.terrain().chunks(width).map(<[Terrain]>::to_vec).collect();

        let cities = map
            .cities()
            .iter()
            .map(|c| CityRecord {
                id: c.id,
                x: c.position.x,
                y: c.position.y,
                size: c.size,
                owner: c.owner,
            })
            .collect();
        let ruins = map
            .ruins()
            .iter()
            .map(|r| RuinRecord {
                x: r.position.x,
                y: r.position.y,
                explored: r.explored,
            })
            .collect();
        let units = map
            .units()
            .iter()
            .filter(|u| u.is_alive())
            .map(|u| UnitRecord {
                id: u.id,
                unit_type: u.unit_type,
                owner: u.owner,
                x: u.position.x,
                y: u.position.y,
                hp: u.hp(),
                has_moved: u.has_moved,
                has_attacked: u.has_attacked,
                artifacts: u.artifacts.clone(),
            })
            .collect();
        let players = game
            .players()
            .iter()
            .map(|p| PlayerRecord {
                id: p.id,
                name: p.name.clone(),
                is_ai: p.is_ai,
                gold: p.gold,
                is_alive: p.is_alive,
                units: map.units_of(p.id).map(|u| u.id).collect(),
                cities: map.cities_of(p.id).map(|c| c.id).collect(),
            })
            .collect();

        Self {
            version: SAVE_VERSION,
            timestamp,
            width: map.width(),
            height: map.height(),
            terrain,
            cities,
            ruins,
            units,
            players,
            current_player: game.current_player_index(),
            turn: game.turn(),
            seed: game.seed(),
        }
    }

    /// Encode in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Encode`] if serialization fails.
    pub fn encode(&self, format: SaveFormat) -> Result<Vec<u8>, SaveError> {
        match format {
            SaveFormat::Json => {
                serde_json::to_vec_pretty(self).map_err(|e| SaveError::Encode(e.to_string()))
            }
            SaveFormat::Binary => {
                bincode::serialize(self).map_err(|e| SaveError::Encode(e.to_string()))
            }
        }
    }

    /// Decode from the given format and check the version.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Decode`] for malformed payloads and
    /// [`SaveError::VersionMismatch`] for other versions.
    pub fn decode(bytes: &[u8], format: SaveFormat) -> Result<Self, SaveError> {
        let data: Self = match format {
            SaveFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| SaveError::Decode(e.to_string()))?
            }
            SaveFormat::Binary => {
                bincode::deserialize(bytes).map_err(|e| SaveError::Decode(e.to_string()))?
            }
        };
        if data.version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: data.version,
            });
        }
        Ok(data)
    }

    fn position(&self, x: u32, y: u32, what: &str) -> Result<GridPos, SaveError> {
        if x < self.width && y < self.height {
            Ok(GridPos::new(x, y))
        } else {
            Err(SaveError::Decode(format!(
                "{what} at ({x}, {y}) is outside the {}x{} map",
                self.width, self.height
            )))
        }
    }

    /// Rebuild the game. Units are restored before players; the phase
    /// machine starts Idle.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Decode`] if the payload is internally
    /// inconsistent (grid shape, out-of-map entities, stacked units,
    /// duplicate ids or city tiles, owners outside the roster, bad roster).
    pub fn restore(&self) -> Result<Game, SaveError> {
        if !(1..=MAX_PLAYERS).contains(&self.players.len())
            || self.current_player >= self.players.len()
            || self
                .players
                .iter()
                .enumerate()
                .any(|(i, p)| usize::from(p.id) != i)
        {
            return Err(SaveError::Decode("player roster is inconsistent".into()));
        }
        let seated = |owner: PlayerId| usize::from(owner) < self.players.len();

        if self.width == 0
            || self.height == 0
            || self.terrain.len() != self.height as usize
            || self.terrain.iter().any(|row| row.len() != self.width as usize)
        {
            return Err(SaveError::Decode(format!(
                "terrain grid does not match {}x{}",
                self.width, self.height
            )));
        }
        let mut map = Map::from_terrain(self.width, self.height, self.terrain.concat());

        let mut occupied = HashSet::new();
        let mut unit_ids = HashSet::new();
        for record in &self.units {
            let position = self.position(record.x, record.y, "unit")?;
            if record.hp == 0 || !occupied.insert(position) || !unit_ids.insert(record.id) {
                return Err(SaveError::Decode(format!(
                    "unit {} at {position} is dead, stacked or duplicated",
                    record.id
                )));
            }
            if !seated(record.owner) {
                return Err(SaveError::Decode(format!(
                    "unit {} belongs to unknown player {}",
                    record.id, record.owner
                )));
            }
            let mut unit = Unit::new(record.unit_type, record.owner, position);
            unit.id = record.id;
            unit.set_hp(record.hp);
            unit.has_moved = record.has_moved;
            unit.has_attacked = record.has_attacked;
            unit.artifacts.clone_from(&record.artifacts);
            map.restore_unit(unit);
        }

        let mut city_tiles = HashSet::new();
        let mut city_ids = HashSet::new();
        for record in &self.cities {
            let position = self.position(record.x, record.y, "city")?;
            if !city_tiles.insert(position) || !city_ids.insert(record.id) {
                return Err(SaveError::Decode(format!(
                    "city {} at {position} is duplicated",
                    record.id
                )));
            }
            if record.owner.is_some_and(|owner| !seated(owner)) {
                return Err(SaveError::Decode(format!(
                    "city {} belongs to unknown player {:?}",
                    record.id, record.owner
                )));
            }
            map.restore_city(City {
                id: record.id,
                position,
                size: record.size,
                owner: record.owner,
            });
        }

        for record in &self.ruins {
            let position = self.position(record.x, record.y, "ruin")?;
            map.restore_ruin(Ruin {
                position,
                explored: record.explored,
            });
        }

        let players = self
            .players
            .iter()
            .map(|p| {
                let mut player = Player::new(p.id, p.name.clone(), p.is_ai, p.gold);
                player.is_alive = p.is_alive;
                player
            })
            .collect();

        Ok(Game::restore(
            map,
            players,
            self.current_player,
            self.turn,
            self.seed,
        ))
    }
}

/// A place save payloads can be written to and read from.
pub trait SaveStore {
    /// Store bytes under a slot name, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium fails.
    fn write(&mut self, slot: &str, bytes: &[u8]) -> Result<(), SaveError>;

    /// Read the bytes stored under a slot name.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is missing or the medium fails.
    fn read(&self, slot: &str) -> Result<Vec<u8>, SaveError>;
}

/// Saves as files in a directory, one file per slot.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store slots under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a slot.
    #[must_use]
    pub fn path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }

    /// Directory the store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveStore for FileStore {
    fn write(&mut self, slot: &str, bytes: &[u8]) -> Result<(), SaveError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(slot), bytes)?;
        Ok(())
    }

    fn read(&self, slot: &str) -> Result<Vec<u8>, SaveError> {
        Ok(std::fs::read(self.path(slot))?)
    }
}

/// Keeps saves in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a slot with raw bytes.
    pub fn put_raw(&mut self, slot: &str, bytes: Vec<u8>) {
        self.slots.insert(slot.to_string(), bytes);
    }
}

impl SaveStore for MemoryStore {
    fn write(&mut self, slot: &str, bytes: &[u8]) -> Result<(), SaveError> {
        self.put_raw(slot, bytes.to_vec());
        Ok(())
    }

    fn read(&self, slot: &str) -> Result<Vec<u8>, SaveError> {
        self.slots.get(slot).cloned().ok_or_else(|| {
            SaveError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no save in slot '{slot}'"),
            ))
        })
    }
}

/// Capture and write a game.
///
/// # Errors
///
/// Returns an error if encoding or the store fails.
pub fn save_game<S: SaveStore + ?Sized>(
    game: &Game,
    store: &mut S,
    slot: &str,
    format: SaveFormat,
) -> Result<(), SaveError> {
    let bytes = SaveData::capture(game).encode(format)?;
    store.write(slot, &bytes)?;
    tracing::info!(slot, bytes = bytes.len(), turn = game.turn(), "Game saved");
    Ok(())
}

/// Read and rebuild a game. Any failure is logged and yields `None`.
#[must_use]
pub fn load_game<S: SaveStore + ?Sized>(store: &S, slot: &str, format: SaveFormat) -> Option<Game> {
    let result = store
        .read(slot)
        .and_then(|bytes| SaveData::decode(&bytes, format))
        .and_then(|data| data.restore());
    match result {
        Ok(game) => {
            tracing::info!(slot, turn = game.turn(), "Game loaded");
            Some(game)
        }
        Err(error) => {
            tracing::warn!(slot, %error, "Failed to load save");
            None
        }
    }
}

impl Game {
    /// The "save" UI command: write this game to a store slot.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store fails.
    pub fn save_to<S: SaveStore + ?Sized>(
        &self,
        store: &mut S,
        slot: &str,
        format: SaveFormat,
    ) -> Result<(), SaveError> {
        save_game(self, store, slot, format)
    }

    /// The "load" UI command: read a game from a store slot, `None` if the
    /// slot is missing or corrupt.
    #[must_use]
    pub fn load_from<S: SaveStore + ?Sized>(store: &S, slot: &str, format: SaveFormat) -> Option<Self> {
        load_game(store, slot, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::phase::Phase;

    fn sample_game() -> Game {
        Game::new(&GameConfig::default().with_seed(77)).unwrap()
    }

    #[test]
    fn test_capture_shapes() {
        let game = sample_game();
        let data = SaveData::capture_at(&game, 1_700_000_000);
        assert_eq!(data.version, SAVE_VERSION);
        assert_eq!(data.terrain.len(), 15);
        assert!(data.terrain.iter().all(|row| row.len() == 20));
        assert_eq!(data.players[0].units.len(), 2);
        assert_eq!(data.players[0].cities.len(), 1);
    }

    #[test]
    fn test_json_roundtrip_rebuilds_game() {
        let mut game = sample_game();
        game.end_turn().unwrap();
        let data = SaveData::capture_at(&game, 5);

        let bytes = data.encode(SaveFormat::Json).unwrap();
        let loaded = SaveData::decode(&bytes, SaveFormat::Json).unwrap().restore().unwrap();

        assert_eq!(loaded.map().terrain(), game.map().terrain());
        assert_eq!(loaded.map().cities(), game.map().cities());
        assert_eq!(loaded.map().ruins(), game.map().ruins());
        assert_eq!(loaded.current_player_index(), 1);
        assert_eq!(loaded.turn(), game.turn());
        assert_eq!(loaded.phase(), Phase::Idle);
        assert_eq!(SaveData::capture_at(&loaded, 5), data);
    }

    #[test]
    fn test_binary_roundtrip() {
        let game = sample_game();
        let data = SaveData::capture_at(&game, 9);
        let bytes = data.encode(SaveFormat::Binary).unwrap();
        assert_eq!(SaveData::decode(&bytes, SaveFormat::Binary).unwrap(), data);
    }

    #[test]
    fn test_version_mismatch() {
        let game = sample_game();
        let mut data = SaveData::capture_at(&game, 0);
        data.version = 99;
        let bytes = data.encode(SaveFormat::Json).unwrap();
        assert!(matches!(
            SaveData::decode(&bytes, SaveFormat::Json),
            Err(SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: 99
            })
        ));
    }

    #[test]
    fn test_out_of_map_unit_rejected() {
        let game = sample_game();
        let mut data = SaveData::capture_at(&game, 0);
        data.units[0].x = 500;
        assert!(matches!(data.restore(), Err(SaveError::Decode(_))));
    }

    #[test]
    fn test_unknown_owner_rejected() {
        let game = sample_game();
        let mut data = SaveData::capture_at(&game, 0);
        data.units[0].owner = 7;
        assert!(matches!(data.restore(), Err(SaveError::Decode(_))));

        let mut data = SaveData::capture_at(&game, 0);
        data.cities[0].owner = Some(7);
        assert!(matches!(data.restore(), Err(SaveError::Decode(_))));
    }

    #[test]
    fn test_duplicate_cities_rejected() {
        let game = sample_game();
        let mut data = SaveData::capture_at(&game, 0);
        let mut twin = data.cities[0].clone();
        twin.x = data.cities[1].x;
        twin.y = data.cities[1].y;
        twin.id = 99;
        data.cities.push(twin);
        assert!(matches!(data.restore(), Err(SaveError::Decode(_))));

        let mut data = SaveData::capture_at(&game, 0);
        let mut same_id = data.cities[0].clone();
        same_id.x = (data.cities[0].x + 1) % data.width;
        data.cities.push(same_id);
        assert!(matches!(data.restore(), Err(SaveError::Decode(_))));
    }

    #[test]
    fn test_corrupt_owner_loads_as_none() {
        let game = sample_game();
        let mut data = SaveData::capture_at(&game, 0);
        data.units[0].owner = 7;
        let mut store = MemoryStore::new();
        store.put_raw("slot", data.encode(SaveFormat::Json).unwrap());
        assert!(load_game(&store, "slot", SaveFormat::Json).is_none());
    }

    #[test]
    fn test_memory_store_load_missing_is_none() {
        let store = MemoryStore::new();
        assert!(load_game(&store, "nope", SaveFormat::Json).is_none());
    }

    #[test]
    fn test_memory_store_corrupt_is_none() {
        let mut store = MemoryStore::new();
        store.put_raw("slot", b"{ not json".to_vec());
        assert!(load_game(&store, "slot", SaveFormat::Json).is_none());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let game = sample_game();
        let mut store = MemoryStore::new();
        save_game(&game, &mut store, "slot", SaveFormat::Binary).unwrap();
        let loaded = load_game(&store, "slot", SaveFormat::Binary).unwrap();
        assert_eq!(loaded.state_hash(), game.state_hash());
    }
}
