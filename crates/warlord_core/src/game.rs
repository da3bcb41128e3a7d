//! Turn controller.
//!
//! [`Game`] owns the map, the player roster, the phase machine and the RNG,
//! and is the only place rules are applied. Commands are either direct
//! (`move_unit`, `attack`, `produce`, `end_turn`, shared by the AI and the UI)
//! or selection-based UI [`Command`]s routed through [`Game::execute`], which
//! refuses input while an AI turn is running.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::combat::{perform_attack, CityCapture, CombatOutcome};
use crate::components::{Artifact, CityId, Player, PlayerId, Unit, UnitId};
use crate::config::{GameConfig, MAX_PLAYERS};
use crate::error::{ActionError, ActionResult, PhaseError, Result};
use crate::events::{EventListener, EventSink, GameEvent};
use crate::map::Map;
use crate::map_generation::generate_map;
use crate::math::GridPos;
use crate::movement::{attack_targets, can_attack, move_destinations, path_cost};
use crate::phase::{Phase, PhaseMachine};
use crate::unit_kind::UnitType;

/// What the UI has picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing.
    #[default]
    None,
    /// One of the current player's units.
    Unit(UnitId),
    /// One of the current player's cities.
    City(CityId),
}

/// Input accepted from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Finish the current player's turn.
    EndTurn,
    /// Build a unit in a city.
    Produce {
        /// City.
        city: CityId,
        /// Archetype.
        unit_type: UnitType,
    },
    /// Pick the unit on a tile.
    SelectUnitAt(GridPos),
    /// Pick the city on a tile.
    SelectCityAt(GridPos),
    /// Drop the current selection.
    Deselect,
    /// Move the selected unit.
    MoveSelected(GridPos),
    /// Attack a tile with the selected unit.
    AttackSelected(GridPos),
}

/// What a successful move did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Unit moved.
    pub unit: UnitId,
    /// Origin.
    pub from: GridPos,
    /// Destination.
    pub to: GridPos,
    /// Movement points spent.
    pub cost: u32,
    /// City taken by walking in.
    pub capture: Option<CityCapture>,
    /// Artifact found by a hero.
    pub artifact: Option<Artifact>,
}

/// Result of an executed [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Selection or turn state changed; nothing else to report.
    Done,
    /// A unit moved.
    Moved(MoveReport),
    /// An attack resolved.
    Attacked(CombatOutcome),
    /// A unit was produced.
    Produced(UnitId),
}

/// A running game.
#[derive(Debug)]
pub struct Game {
    map: Map,
    players: Vec<Player>,
    current_player: usize,
    turn: u32,
    phase: PhaseMachine,
    selection: Selection,
    seed: u64,
    rng: ChaCha8Rng,
    events: EventSink,
    ai_turn_active: bool,
}

impl Game {
    /// Generate a fresh game from a config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn new(config: &GameConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let (map, players) = generate_map(config, &mut rng);
        let mut game = Self::assemble(map, players, 0, 1, config.seed, rng);
        game.emit_turn_started();
        tracing::info!(
            players = game.players.len(),
            seed = config.seed,
            "New game started"
        );
        Ok(game)
    }

    /// Build a game around a hand-made map. Player ids must equal their index.
    ///
    /// # Panics
    ///
    /// Panics if there are no players, more than four, or ids are out of order.
    #[must_use]
    pub fn from_parts(map: Map, players: Vec<Player>, seed: u64) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::assemble(map, players, 0, 1, seed, rng)
    }

    /// Rebuild a game at a saved position. The phase machine starts Idle.
    ///
    /// # Panics
    ///
    /// Panics on an invalid roster or a current player index out of range.
    #[must_use]
    pub fn restore(
        map: Map,
        players: Vec<Player>,
        current_player: usize,
        turn: u32,
        seed: u64,
    ) -> Self {
        assert!(
            current_player < players.len(),
            "current player {current_player} out of range for {} players",
            players.len()
        );
        let stream = seed ^ (u64::from(turn) << 32) ^ current_player as u64;
        let rng = ChaCha8Rng::seed_from_u64(stream);
        Self::assemble(map, players, current_player, turn, seed, rng)
    }

    fn assemble(
        map: Map,
        players: Vec<Player>,
        current_player: usize,
        turn: u32,
        seed: u64,
        rng: ChaCha8Rng,
    ) -> Self {
        assert!(
            (1..=MAX_PLAYERS).contains(&players.len()),
            "a game needs 1-{MAX_PLAYERS} players, got {}",
            players.len()
        );
        for (index, player) in players.iter().enumerate() {
            assert_eq!(
                usize::from(player.id),
                index,
                "player ids must match turn order"
            );
        }
        Self {
            map,
            players,
            current_player,
            turn,
            phase: PhaseMachine::new(),
            selection: Selection::None,
            seed,
            rng,
            events: EventSink::default(),
            ai_turn_active: false,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The map.
    #[must_use]
    pub const fn map(&self) -> &Map {
        &self.map
    }

    /// All players in turn order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id))
    }

    /// Index of the acting player.
    #[must_use]
    pub const fn current_player_index(&self) -> usize {
        self.current_player
    }

    /// The acting player.
    #[must_use]
    pub fn current_player(&self) -> &Player {
        &self.players[self.current_player]
    }

    /// Id of the acting player.
    #[must_use]
    pub fn current_player_id(&self) -> PlayerId {
        self.current_player().id
    }

    /// Turn number, starting at 1; increments when play wraps to player 0.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase.current()
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Seed the game was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether the game has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.phase.is_game_over()
    }

    /// The last player standing, once the game is over.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        if !self.is_game_over() {
            return None;
        }
        let mut alive = self.players.iter().filter(|p| p.is_alive);
        match (alive.next(), alive.next()) {
            (Some(p), None) => Some(p.id),
            _ => None,
        }
    }

    /// Whether an AI turn is executing.
    #[must_use]
    pub const fn is_ai_turn_active(&self) -> bool {
        self.ai_turn_active
    }

    pub(crate) fn set_ai_turn_active(&mut self, active: bool) {
        self.ai_turn_active = active;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Inject an observer.
    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.events.subscribe(listener);
    }

    /// Take the events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.emit(event);
    }

    fn emit_turn_started(&mut self) {
        let event = GameEvent::TurnStarted {
            player: self.current_player_id(),
            turn: self.turn,
        };
        self.emit(event);
    }

    fn set_phase(&mut self, to: Phase) -> std::result::Result<(), PhaseError> {
        let from = self.phase.transition(to)?;
        if from != to {
            self.emit(GameEvent::PhaseChanged { from, to });
        }
        Ok(())
    }

    fn return_to_idle(&mut self) {
        self.selection = Selection::None;
        if !self.is_game_over() && self.set_phase(Phase::Idle).is_err() {
            self.phase.reset();
        }
    }

    // ------------------------------------------------------------------
    // Direct commands
    // ------------------------------------------------------------------

    fn ensure_running(&self) -> ActionResult<()> {
        if self.is_game_over() {
            Err(ActionError::GameOver)
        } else {
            Ok(())
        }
    }

    fn own_unit(&self, id: UnitId) -> ActionResult<&Unit> {
        let unit = self.map.unit(id).ok_or(ActionError::UnitNotFound(id))?;
        let player = self.current_player_id();
        if unit.owner != player {
            return Err(ActionError::NotOwned { player });
        }
        Ok(unit)
    }

    /// Move a unit of the current player.
    ///
    /// Walking onto a city the mover does not own captures it. A hero walking
    /// onto an unexplored ruin loots it and equips the artifact.
    ///
    /// # Errors
    ///
    /// Rejects the move (state untouched) if the game is over, the unit is
    /// missing or not the current player's, it already moved, or the
    /// destination is occupied or unreachable.
    pub fn move_unit(&mut self, id: UnitId, to: GridPos) -> ActionResult<MoveReport> {
        self.ensure_running()?;
        let unit = self.own_unit(id)?;
        if unit.has_moved {
            return Err(ActionError::AlreadyMoved(id));
        }
        if self.map.unit_at(to).is_some() {
            return Err(ActionError::TileOccupied(to));
        }
        let cost = path_cost(&self.map, unit, to).ok_or(ActionError::Unreachable(to))?;
        let from = unit.position;
        let owner = unit.owner;
        let is_hero = unit.is_hero();

        self.map.move_unit(id, to);
        self.emit(GameEvent::UnitMoved { unit: id, from, to });
        tracing::debug!(unit = id, %from, %to, cost, "Unit moved");

        let capture = self.map.city_at(to).filter(|c| !c.is_owned_by(owner)).map(|c| CityCapture {
            city: c.id,
            previous_owner: c.owner,
            new_owner: owner,
        });
        if let Some(capture) = capture {
            self.apply_capture(capture);
        }

        let mut artifact = None;
        if is_hero {
            artifact = self.map.explore_ruin(to, &mut self.rng);
            if let Some(found) = artifact {
                if let Some(hero) = self.map.unit_mut(id) {
                    hero.artifacts.push(found);
                }
                self.emit(GameEvent::RuinExplored {
                    position: to,
                    unit: id,
                    artifact: found,
                });
            }
        }

        if capture.is_some() {
            self.check_victory();
        }

        Ok(MoveReport {
            unit: id,
            from,
            to,
            cost,
            capture,
            artifact,
        })
    }

    /// Attack a tile with a unit of the current player.
    ///
    /// # Errors
    ///
    /// Rejects the attack (state untouched) if the game is over, the unit is
    /// missing or not the current player's, it already attacked, or the tile
    /// holds no enemy within range.
    pub fn attack(&mut self, id: UnitId, target: GridPos) -> ActionResult<CombatOutcome> {
        self.ensure_running()?;
        let unit = self.own_unit(id)?;
        if unit.has_attacked {
            return Err(ActionError::AlreadyAttacked(id));
        }
        if !can_attack(&self.map, unit, target) {
            return Err(ActionError::InvalidTarget(target));
        }

        let outcome = perform_attack(&mut self.map, id, target, &mut self.rng)
            .ok_or(ActionError::InvalidTarget(target))?;

        self.emit(GameEvent::CombatResolved(outcome.clone()));
        self.emit(GameEvent::UnitDamaged {
            unit: outcome.defender,
            amount: outcome.damage,
            hp: outcome.defender_hp,
        });
        if outcome.defender_killed {
            self.emit(GameEvent::UnitRemoved {
                unit: outcome.defender,
                owner: outcome.defender_owner,
            });
        }
        if let Some(capture) = outcome.capture {
            self.apply_capture(capture);
        }
        self.check_victory();
        Ok(outcome)
    }

    fn apply_capture(&mut self, capture: CityCapture) {
        self.map.set_city_owner(capture.city, Some(capture.new_owner));
        tracing::info!(
            city = capture.city,
            from = ?capture.previous_owner,
            to = capture.new_owner,
            "City captured"
        );
        self.emit(GameEvent::CityCaptured {
            city: capture.city,
            previous_owner: capture.previous_owner,
            new_owner: capture.new_owner,
        });
    }

    /// First tile a new unit of `unit_type` can appear on: the city tile if
    /// empty, else the first free orthogonal neighbour (N, E, S, W).
    #[must_use]
    pub fn spawn_tile(&self, city: CityId, unit_type: UnitType) -> Option<GridPos> {
        let position = self.map.city(city)?.position;
        if self.map.is_free_for(position, unit_type) {
            return Some(position);
        }
        self.map
            .neighbors(position)
            .find(|p| self.map.is_free_for(*p, unit_type))
    }

    /// Produce a unit in one of the current player's cities.
    ///
    /// The new unit cannot act until next turn.
    ///
    /// # Errors
    ///
    /// Rejects production (gold untouched) if the game is over, the city is
    /// missing or not owned, the type cannot be built, the city is
    /// blockaded, gold is short, or no spawn tile is free.
    pub fn produce(&mut self, city_id: CityId, unit_type: UnitType) -> ActionResult<UnitId> {
        self.ensure_running()?;
        let player = self.current_player_id();
        let city = self
            .map
            .city(city_id)
            .ok_or(ActionError::CityNotFound(city_id))?;
        if !city.is_owned_by(player) {
            return Err(ActionError::NotOwned { player });
        }
        let cost = unit_type
            .cost()
            .ok_or(ActionError::NotProducible(unit_type.name()))?;
        if self.map.is_city_blockaded(city, player) {
            return Err(ActionError::Blockaded(city_id));
        }
        let available = self.current_player().gold;
        if available < cost {
            return Err(ActionError::InsufficientGold {
                required: cost,
                available,
            });
        }
        let spawn = self
            .spawn_tile(city_id, unit_type)
            .ok_or(ActionError::NoSpawnTile(city_id))?;

        let buyer = &mut self.players[self.current_player];
        if !buyer.spend(cost) {
            return Err(ActionError::InsufficientGold {
                required: cost,
                available: buyer.gold,
            });
        }
        let gold = buyer.gold;
        self.emit(GameEvent::GoldChanged { player, gold });

        let mut unit = Unit::new(unit_type, player, spawn);
        unit.has_moved = true;
        unit.has_attacked = true;
        let id = self.map.add_unit(unit);
        tracing::debug!(unit = id, city = city_id, %unit_type, %spawn, "Unit produced");
        self.emit(GameEvent::UnitProduced {
            unit: id,
            city: city_id,
            unit_type,
            position: spawn,
        });
        Ok(id)
    }

    /// Finish the current player's turn.
    ///
    /// Runs, in order: city income, healing in owned cities, unit flag reset,
    /// rotation to the next living player (turn + 1 on wraparound), selection
    /// clear, victory check.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::GameOver`] once the game has ended.
    pub fn end_turn(&mut self) -> ActionResult<()> {
        self.ensure_running()?;

        let mut income = vec![0u32; self.players.len()];
        for city in self.map.cities() {
            if let Some(owner) = city.owner {
                if let Some(slot) = income.get_mut(usize::from(owner)) {
                    *slot += city.income();
                }
            }
        }
        for (index, amount) in income.into_iter().enumerate() {
            if amount > 0 {
                let player = &mut self.players[index];
                player.gold += amount;
                let event = GameEvent::GoldChanged {
                    player: player.id,
                    gold: player.gold,
                };
                self.emit(event);
            }
        }

        for (unit, amount) in self.map.heal_units_in_cities() {
            self.emit(GameEvent::UnitHealed { unit, amount });
        }

        for id in self.map.units().sorted_ids() {
            if let Some(unit) = self.map.unit_mut(id) {
                unit.reset_turn();
            }
        }

        let count = self.players.len();
        for _ in 0..count {
            self.current_player = (self.current_player + 1) % count;
            if self.current_player == 0 {
                self.turn += 1;
            }
            if self.players[self.current_player].is_alive {
                break;
            }
        }

        self.return_to_idle();
        self.check_victory();

        if !self.is_game_over() {
            tracing::info!(
                player = self.current_player_id(),
                turn = self.turn,
                "Turn started"
            );
            self.emit_turn_started();
        }
        Ok(())
    }

    /// Refresh every player's alive flag and end the game if one remains.
    ///
    /// A player is out once it has no living hero and no city. Returns true
    /// if the game is over.
    pub fn check_victory(&mut self) -> bool {
        if self.is_game_over() {
            return true;
        }

        let mut defeated = Vec::new();
        for player in self.players.iter().filter(|p| p.is_alive) {
            let has_hero = self.map.hero_of(player.id).is_some();
            let has_city = self.map.cities_of(player.id).next().is_some();
            if !has_hero && !has_city {
                defeated.push(player.id);
            }
        }
        for id in defeated {
            self.players[usize::from(id)].is_alive = false;
            tracing::info!(player = id, "Player defeated");
            self.emit(GameEvent::PlayerDefeated { player: id });
        }

        let alive = self.players.iter().filter(|p| p.is_alive).count();
        if alive <= 1 && self.players.len() > 1 {
            self.selection = Selection::None;
            if self.set_phase(Phase::GameOver).is_ok() {
                let winner = self.winner();
                tracing::info!(?winner, turn = self.turn, "Game over");
                self.emit(GameEvent::GameOver { winner });
            }
        }
        self.is_game_over()
    }

    // ------------------------------------------------------------------
    // UI commands
    // ------------------------------------------------------------------

    /// Run a UI command.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::AiTurnInProgress`] while an AI turn runs, and
    /// otherwise whatever the underlying action rejects with.
    pub fn execute(&mut self, command: Command) -> ActionResult<CommandOutcome> {
        if self.ai_turn_active {
            return Err(ActionError::AiTurnInProgress);
        }
        let result = match command {
            Command::EndTurn => self.end_turn().map(|()| CommandOutcome::Done),
            Command::Produce { city, unit_type } => {
                self.produce(city, unit_type).map(CommandOutcome::Produced)
            }
            Command::SelectUnitAt(pos) => self.select_unit_at(pos).map(|()| CommandOutcome::Done),
            Command::SelectCityAt(pos) => self.select_city_at(pos).map(|()| CommandOutcome::Done),
            Command::Deselect => {
                self.deselect();
                Ok(CommandOutcome::Done)
            }
            Command::MoveSelected(pos) => self.move_selected(pos).map(CommandOutcome::Moved),
            Command::AttackSelected(pos) => self.attack_selected(pos).map(CommandOutcome::Attacked),
        };
        if let Err(ref error) = result {
            tracing::warn!(?command, %error, "Command rejected");
        }
        result
    }

    fn select_unit_at(&mut self, pos: GridPos) -> ActionResult<()> {
        self.ensure_running()?;
        let unit = self.map.unit_at(pos).ok_or(ActionError::NoUnitAt(pos))?;
        let player = self.current_player_id();
        if unit.owner != player {
            return Err(ActionError::NotOwned { player });
        }
        let (id, moved) = (unit.id, unit.has_moved);

        self.return_to_idle();
        self.set_phase(Phase::Selected)?;
        if moved {
            self.set_phase(Phase::Moved)?;
        }
        self.selection = Selection::Unit(id);
        Ok(())
    }

    fn select_city_at(&mut self, pos: GridPos) -> ActionResult<()> {
        self.ensure_running()?;
        let city = self.map.city_at(pos).ok_or(ActionError::NoCityAt(pos))?;
        let player = self.current_player_id();
        if !city.is_owned_by(player) {
            return Err(ActionError::NotOwned { player });
        }
        let id = city.id;

        self.return_to_idle();
        self.set_phase(Phase::Production)?;
        self.selection = Selection::City(id);
        Ok(())
    }

    fn deselect(&mut self) {
        self.return_to_idle();
    }

    fn move_selected(&mut self, to: GridPos) -> ActionResult<MoveReport> {
        let Selection::Unit(id) = self.selection else {
            return Err(ActionError::NothingSelected);
        };
        let from = self.phase();
        if !from.can_transition_to(Phase::Moved) {
            tracing::warn!(?from, to = ?Phase::Moved, "Rejected illegal phase transition");
            return Err(PhaseError {
                from,
                to: Phase::Moved,
            }
            .into());
        }

        let report = self.move_unit(id, to)?;
        if self.is_game_over() {
            return Ok(report);
        }

        let can_still_attack = self
            .map
            .unit(id)
            .is_some_and(|u| !u.has_attacked && !attack_targets(&self.map, u).is_empty());
        if can_still_attack {
            self.set_phase(Phase::Moved)?;
        } else {
            self.return_to_idle();
        }
        Ok(report)
    }

    fn attack_selected(&mut self, target: GridPos) -> ActionResult<CombatOutcome> {
        let Selection::Unit(id) = self.selection else {
            return Err(ActionError::NothingSelected);
        };
        let outcome = self.attack(id, target)?;
        self.return_to_idle();
        Ok(outcome)
    }

    /// Legal move destinations for the selected unit, for highlighting.
    #[must_use]
    pub fn selected_destinations(&self) -> Vec<GridPos> {
        match self.selection {
            Selection::Unit(id) => self
                .map
                .unit(id)
                .filter(|u| !u.has_moved)
                .map(|u| move_destinations(&self.map, u).into_iter().map(|t| t.position).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Attackable tiles for the selected unit, for highlighting.
    #[must_use]
    pub fn selected_targets(&self) -> Vec<GridPos> {
        match self.selection {
            Selection::Unit(id) => self
                .map
                .unit(id)
                .filter(|u| !u.has_attacked)
                .map(|u| attack_targets(&self.map, u))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------

    /// Hash of all gameplay state, for determinism checks.
    ///
    /// Covers turn, current player, phase, players, units (in id order),
    /// cities and ruins. Events and listeners are excluded.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.hash(&mut hasher);
        self.current_player.hash(&mut hasher);
        self.phase().hash(&mut hasher);
        self.players.hash(&mut hasher);
        self.map.terrain().hash(&mut hasher);
        for unit in self.map.units().iter() {
            unit.hash(&mut hasher);
        }
        self.map.cities().hash(&mut hasher);
        self.map.ruins().hash(&mut hasher);
        hasher.finish()
    }
}
