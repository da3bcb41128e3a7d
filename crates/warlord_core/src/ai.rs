//! Heuristic AI.
//!
//! Plays one full turn for the current AI player in three phases, each
//! finishing before the next starts:
//!
//! 1. production in every non-blockaded city, by a fixed priority ladder
//! 2. non-hero units, strongest first: attack in place if possible, otherwise
//!    move to the best-scoring tile and attack from there
//! 3. the hero: loot a ruin, else take an undefended city, else generic move,
//!    then attack
//!
//! The turn is always ended afterwards, even if a step failed. Every action is
//! recorded in an [`AiTurnReport`] so a presenter can replay it at its own pace.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::combat::expected_damage;
use crate::components::{CityId, PlayerId, Unit, UnitId};
use crate::config::AiConfig;
use crate::error::{ActionResult, AiError};
use crate::events::GameEvent;
use crate::game::Game;
use crate::map::Map;
use crate::math::GridPos;
use crate::movement::{attack_targets, can_attack, move_destinations, ReachableTile};
use crate::unit_kind::UnitType;

/// Flat score for any legal attack.
const ATTACK_BASE: i32 = 10;
/// Extra score for hitting a hero.
const HERO_TARGET_BONUS: i32 = 50;
/// Extra score when the forecast kills.
const KILL_BONUS: i32 = 40;
/// Extra score when the target stands in a city.
const CITY_TARGET_BONUS: i32 = 30;

/// Score for walking onto an unexplored ruin (heroes).
const RUIN_BONUS: i32 = 100;
/// Score for walking into a neutral city.
const NEUTRAL_CITY_BONUS: i32 = 80;
/// Score for walking into an undefended enemy city.
const ENEMY_CITY_BONUS: i32 = 100;
/// Per-tile weight for closing on the nearest enemy unit.
const APPROACH_ENEMY_WEIGHT: i32 = 5;
/// Per-tile weight for closing on the nearest neutral city.
const APPROACH_CITY_WEIGHT: i32 = 3;
/// Per-tile weight for closing on the nearest unexplored ruin (heroes).
const APPROACH_RUIN_WEIGHT: i32 = 4;
/// Weight per point of terrain defense.
const TERRAIN_WEIGHT: i32 = 3;

/// One thing the AI did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiAction {
    /// Built a unit.
    Produced {
        /// City.
        city: CityId,
        /// Archetype.
        unit_type: UnitType,
        /// New unit.
        unit: UnitId,
    },
    /// Skipped a blockaded city.
    Blockaded {
        /// City.
        city: CityId,
    },
    /// Moved a unit.
    Moved {
        /// Unit.
        unit: UnitId,
        /// Origin.
        from: GridPos,
        /// Destination.
        to: GridPos,
    },
    /// Attacked a tile.
    Attacked {
        /// Attacker.
        unit: UnitId,
        /// Target tile.
        target: GridPos,
        /// Damage dealt.
        damage: u32,
        /// Defender died.
        killed: bool,
    },
    /// Ended the turn.
    EndedTurn,
}

/// Replayable log of one AI turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiTurnReport {
    /// AI player.
    pub player: PlayerId,
    /// Turn number the actions were taken in.
    pub turn: u32,
    /// Actions in execution order.
    pub actions: Vec<AiAction>,
    /// Failures that cut the turn short.
    pub errors: Vec<String>,
}

impl AiTurnReport {
    fn new(player: PlayerId, turn: u32) -> Self {
        Self {
            player,
            turn,
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Actions paired with the offset at which a presenter should show them,
    /// leaving `delay` between consecutive actions.
    pub fn schedule(&self, delay: Duration) -> impl Iterator<Item = (Duration, &AiAction)> {
        self.actions
            .iter()
            .enumerate()
            .map(move |(i, action)| (delay * i as u32, action))
    }
}

/// Drives AI players.
#[derive(Debug, Clone, Default)]
pub struct AiController {
    config: AiConfig,
}

impl AiController {
    /// Create a controller with the given tuning.
    #[must_use]
    pub const fn new(config: AiConfig) -> Self {
        Self { config }
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Play the current player's whole turn and end it.
    ///
    /// Failures inside the decision loop are logged and recorded in the
    /// report; the turn is still ended.
    ///
    /// # Errors
    ///
    /// Refuses to start if an AI turn is already running, the game is over,
    /// or the current player is human.
    pub fn play_turn(&self, game: &mut Game) -> Result<AiTurnReport, AiError> {
        if game.is_ai_turn_active() {
            return Err(AiError::AlreadyRunning);
        }
        if game.is_game_over() {
            return Err(AiError::GameOver);
        }
        let player = game.current_player_id();
        if !game.current_player().is_ai {
            return Err(AiError::NotAiPlayer(player));
        }

        game.set_ai_turn_active(true);
        game.emit(GameEvent::AiTurnStarted { player });
        tracing::debug!(player, turn = game.turn(), "AI turn started");

        let mut report = AiTurnReport::new(player, game.turn());
        if let Err(error) = self.run_phases(game, player, &mut report) {
            tracing::error!(player, %error, "AI turn aborted");
            report.errors.push(error.to_string());
        }

        game.set_ai_turn_active(false);
        if !game.is_game_over() {
            match game.end_turn() {
                Ok(()) => report.actions.push(AiAction::EndedTurn),
                Err(error) => {
                    tracing::error!(player, %error, "AI failed to end turn");
                    report.errors.push(error.to_string());
                }
            }
        }
        game.emit(GameEvent::AiTurnEnded { player });
        tracing::debug!(player, actions = report.actions.len(), "AI turn ended");
        Ok(report)
    }

    fn run_phases(
        &self,
        game: &mut Game,
        player: PlayerId,
        report: &mut AiTurnReport,
    ) -> ActionResult<()> {
        self.production_phase(game, player, report)?;
        if game.is_game_over() {
            return Ok(());
        }
        self.unit_phase(game, player, report)?;
        if game.is_game_over() {
            return Ok(());
        }
        self.hero_phase(game, player, report)
    }

    // ------------------------------------------------------------------
    // Production
    // ------------------------------------------------------------------

    /// Archetype the ladder picks for `player` with `gold` to spend.
    ///
    /// Keeps a minimum of light infantry, then one each of cavalry, archers
    /// and heavy infantry, then the most expensive affordable type.
    #[must_use]
    pub fn choose_production(&self, map: &Map, player: PlayerId, gold: u32) -> Option<UnitType> {
        let affordable = |t: UnitType| t.cost().is_some_and(|c| c <= gold);
        let count = |t: UnitType| map.units_of(player).filter(|u| u.unit_type == t).count();

        if count(UnitType::LightInfantry) < self.config.min_cheap_units {
            return affordable(UnitType::LightInfantry).then_some(UnitType::LightInfantry);
        }
        for t in [UnitType::Cavalry, UnitType::Archer, UnitType::HeavyInfantry] {
            if count(t) == 0 && affordable(t) {
                return Some(t);
            }
        }
        UnitType::BY_COST_DESC.into_iter().find(|t| affordable(*t))
    }

    fn production_phase(
        &self,
        game: &mut Game,
        player: PlayerId,
        report: &mut AiTurnReport,
    ) -> ActionResult<()> {
        let cities: Vec<CityId> = game.map().cities_of(player).map(|c| c.id).collect();
        for city_id in cities {
            let Some(city) = game.map().city(city_id) else {
                continue;
            };
            if game.map().is_city_blockaded(city, player) {
                game.emit(GameEvent::AiBlockaded { city: city_id });
                report.actions.push(AiAction::Blockaded { city: city_id });
                continue;
            }
            let gold = game.current_player().gold;
            let Some(unit_type) = self.choose_production(game.map(), player, gold) else {
                continue;
            };
            if game.spawn_tile(city_id, unit_type).is_none() {
                continue;
            }
            game.emit(GameEvent::AiProducing {
                city: city_id,
                unit_type,
            });
            let unit = game.produce(city_id, unit_type)?;
            report.actions.push(AiAction::Produced {
                city: city_id,
                unit_type,
                unit,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    fn unit_phase(
        &self,
        game: &mut Game,
        player: PlayerId,
        report: &mut AiTurnReport,
    ) -> ActionResult<()> {
        let mut order: Vec<(u32, UnitId)> = game
            .map()
            .units_of(player)
            .filter(|u| !u.is_hero())
            .map(|u| (strength(u), u.id))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (_, id) in order {
            if game.is_game_over() {
                break;
            }
            let Some(unit) = game.map().unit(id) else {
                continue;
            };
            if unit.has_attacked {
                continue;
            }

            if let Some(target) = best_attack(game.map(), unit) {
                attack(game, id, target, report)?;
                continue;
            }

            if !unit.has_moved {
                if let Some(to) = best_move(game.map(), unit) {
                    step(game, id, to, report)?;
                    if game.is_game_over() {
                        break;
                    }
                    if let Some(target) = game.map().unit(id).and_then(|u| best_attack(game.map(), u)) {
                        attack(game, id, target, report)?;
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hero
    // ------------------------------------------------------------------

    fn hero_phase(
        &self,
        game: &mut Game,
        player: PlayerId,
        report: &mut AiTurnReport,
    ) -> ActionResult<()> {
        let Some(hero) = game.map().hero_of(player) else {
            return Ok(());
        };
        let id = hero.id;

        if !hero.has_moved {
            let map = game.map();
            let destinations = move_destinations(map, hero);
            let ruin = destinations
                .iter()
                .filter(|t| map.ruin_at(t.position).is_some_and(|r| !r.explored))
                .min_by_key(|t| (t.cost, t.position));
            let city = destinations
                .iter()
                .filter(|t| map.city_at(t.position).is_some_and(|c| !c.is_owned_by(player)))
                .min_by_key(|t| (t.cost, t.position));

            let goal = ruin
                .or(city)
                .map(|t| t.position)
                .or_else(|| best_move(map, hero));
            if let Some(to) = goal {
                step(game, id, to, report)?;
            }
            if game.is_game_over() {
                return Ok(());
            }
        }

        if let Some(target) = game.map().unit(id).and_then(|u| best_attack(game.map(), u)) {
            attack(game, id, target, report)?;
        }
        Ok(())
    }
}

/// Static ordering score: attack + defense + hp / 10.
#[must_use]
pub fn strength(unit: &Unit) -> u32 {
    unit.effective_attack() + unit.effective_defense() + unit.hp() / 10
}

fn step(game: &mut Game, id: UnitId, to: GridPos, report: &mut AiTurnReport) -> ActionResult<()> {
    let moved = game.move_unit(id, to)?;
    report.actions.push(AiAction::Moved {
        unit: id,
        from: moved.from,
        to: moved.to,
    });
    Ok(())
}

fn attack(game: &mut Game, id: UnitId, target: GridPos, report: &mut AiTurnReport) -> ActionResult<()> {
    let outcome = game.attack(id, target)?;
    report.actions.push(AiAction::Attacked {
        unit: id,
        target,
        damage: outcome.damage,
        killed: outcome.defender_killed,
    });
    Ok(())
}

/// Score for attacking `target` from where `attacker` stands.
#[must_use]
pub fn score_attack(map: &Map, attacker: &Unit, target: GridPos) -> Option<i32> {
    let defender = map.stack_at(target).combat_unit()?;
    let damage = expected_damage(attacker, defender, map.defense_bonus(target));

    let mut score = ATTACK_BASE;
    if defender.is_hero() {
        score += HERO_TARGET_BONUS;
    }
    score += defender.unit_type.cost().unwrap_or(0) as i32 / 2;
    score += damage as i32 * 2;
    if damage >= defender.hp() {
        score += KILL_BONUS;
    }
    if map.city_at(target).is_some() {
        score += CITY_TARGET_BONUS;
    }
    Some(score)
}

/// Best attack available without moving, if any scores above zero.
#[must_use]
pub fn best_attack(map: &Map, unit: &Unit) -> Option<GridPos> {
    attack_targets(map, unit)
        .into_iter()
        .filter(|t| can_attack(map, unit, *t))
        .filter_map(|t| score_attack(map, unit, t).map(|s| (s, t)))
        .filter(|(s, _)| *s > 0)
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, t)| t)
}

fn nearest_distance(from: GridPos, targets: impl Iterator<Item = GridPos>) -> Option<u32> {
    targets.map(|t| from.manhattan(t)).min()
}

fn approach(before: Option<u32>, after: Option<u32>, weight: i32) -> i32 {
    match (before, after) {
        (Some(b), Some(a)) => (b as i32 - a as i32) * weight,
        _ => 0,
    }
}

/// Score for moving `unit` to a reachable tile. Movement cost counts against it.
#[must_use]
pub fn score_move(map: &Map, unit: &Unit, tile: &ReachableTile) -> i32 {
    let to = tile.position;
    let from = unit.position;
    let mut score = 0;

    if unit.is_hero() {
        let ruins = || {
            map.ruins()
                .iter()
                .filter(|r| !r.explored)
                .map(|r| r.position)
        };
        if map.ruin_at(to).is_some_and(|r| !r.explored) {
            score += RUIN_BONUS;
        }
        score += approach(
            nearest_distance(from, ruins()),
            nearest_distance(to, ruins()),
            APPROACH_RUIN_WEIGHT,
        );
    }

    if let Some(city) = map.city_at(to) {
        match city.owner {
            None => score += NEUTRAL_CITY_BONUS,
            Some(owner) if owner != unit.owner => score += ENEMY_CITY_BONUS,
            Some(_) => {}
        }
    }

    let enemies = || {
        map.units()
            .iter()
            .filter(|u| u.owner != unit.owner && u.is_alive())
            .map(|u| u.position)
    };
    score += approach(
        nearest_distance(from, enemies()),
        nearest_distance(to, enemies()),
        APPROACH_ENEMY_WEIGHT,
    );

    let neutral = || {
        map.cities()
            .iter()
            .filter(|c| c.owner.is_none() && c.position != to)
            .map(|c| c.position)
    };
    score += approach(
        nearest_distance(from, neutral()),
        nearest_distance(to, neutral()),
        APPROACH_CITY_WEIGHT,
    );

    score += map.defense_bonus(to) as i32 * TERRAIN_WEIGHT;
    score -= tile.cost as i32;
    score
}

/// Highest-scoring move destination; `None` only when nothing is reachable.
/// Ties keep the first tile in search order.
#[must_use]
pub fn best_move(map: &Map, unit: &Unit) -> Option<GridPos> {
    let mut best: Option<(i32, GridPos)> = None;
    for tile in move_destinations(map, unit) {
        let score = score_move(map, unit, &tile);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, tile.position));
        }
    }
    best.map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CitySize, Player};

    fn pos(x: u32, y: u32) -> GridPos {
        GridPos::new(x, y)
    }

    fn ai_duel_with(setup: impl FnOnce(&mut Map, &mut Vec<Player>)) -> Game {
        let mut map = Map::new(8, 8);
        map.add_city(pos(0, 0), CitySize::Large, Some(0));
        map.add_city(pos(7, 7), CitySize::Large, Some(1));
        map.add_unit(Unit::new(UnitType::Hero, 0, pos(0, 0)));
        let mut players = vec![
            Player::new(0, "Red", true, 50),
            Player::new(1, "Blue", true, 50),
        ];
        setup(&mut map, &mut players);
        if map.hero_of(1).is_none() {
            map.add_unit(Unit::new(UnitType::Hero, 1, pos(7, 7)));
        }
        Game::from_parts(map, players, 4)
    }

    fn ai_duel() -> Game {
        ai_duel_with(|_, _| {})
    }

    #[test]
    fn test_ladder_prefers_cheap_units_first() {
        let game = ai_duel();
        let ai = AiController::default();
        assert_eq!(
            ai.choose_production(game.map(), 0, 50),
            Some(UnitType::LightInfantry)
        );
        assert_eq!(ai.choose_production(game.map(), 0, 5), None);
    }

    #[test]
    fn test_ladder_diversifies_then_spends_top_down() {
        let mut map = Map::new(8, 8);
        for x in 0..3 {
            map.add_unit(Unit::new(UnitType::LightInfantry, 0, pos(x, 0)));
        }
        let ai = AiController::default();
        assert_eq!(ai.choose_production(&map, 0, 100), Some(UnitType::Cavalry));

        map.add_unit(Unit::new(UnitType::Cavalry, 0, pos(3, 0)));
        assert_eq!(ai.choose_production(&map, 0, 100), Some(UnitType::Archer));

        map.add_unit(Unit::new(UnitType::Archer, 0, pos(4, 0)));
        map.add_unit(Unit::new(UnitType::HeavyInfantry, 0, pos(5, 0)));
        assert_eq!(ai.choose_production(&map, 0, 100), Some(UnitType::Dragon));
        assert_eq!(ai.choose_production(&map, 0, 29), Some(UnitType::Cavalry));
    }

    #[test]
    fn test_refuses_human_player() {
        let mut game = ai_duel_with(|_, players| players[0].is_ai = false);
        assert_eq!(
            AiController::default().play_turn(&mut game),
            Err(AiError::NotAiPlayer(0))
        );
    }

    #[test]
    fn test_rejects_reentry() {
        let mut game = ai_duel();
        game.set_ai_turn_active(true);
        assert_eq!(
            AiController::default().play_turn(&mut game),
            Err(AiError::AlreadyRunning)
        );
    }

    #[test]
    fn test_turn_produces_and_ends() {
        let mut game = ai_duel();
        let report = AiController::default().play_turn(&mut game).unwrap();

        assert!(report
            .actions
            .iter()
            .any(|a| matches!(a, AiAction::Produced { unit_type: UnitType::LightInfantry, .. })));
        assert_eq!(report.actions.last(), Some(&AiAction::EndedTurn));
        assert!(report.errors.is_empty());
        assert_eq!(game.current_player_id(), 1);
        assert!(!game.is_ai_turn_active());
    }

    #[test]
    fn test_blockaded_city_skipped() {
        let mut game = ai_duel_with(|map, _| {
            map.add_unit(Unit::new(UnitType::Hero, 1, pos(1, 0)));
        });
        let report = AiController::default().play_turn(&mut game).unwrap();
        assert!(report.actions.contains(&AiAction::Blockaded { city: 1 }));
    }

    #[test]
    fn test_attack_score_kill_bonus() {
        let mut map = Map::new(4, 4);
        let a = map.add_unit(Unit::new(UnitType::Dragon, 0, pos(0, 0)));
        let weak = map.add_unit(Unit::new(UnitType::Archer, 1, pos(1, 0)));
        map.unit_mut(weak).unwrap().set_hp(1);
        let attacker = map.unit(a).unwrap().clone();

        let score = score_attack(&map, &attacker, pos(1, 0)).unwrap();
        let damage = expected_damage(&attacker, map.unit(weak).unwrap(), 0) as i32;
        assert_eq!(score, ATTACK_BASE + 15 / 2 + damage * 2 + KILL_BONUS);
        assert_eq!(best_attack(&map, &attacker), Some(pos(1, 0)));
    }

    #[test]
    fn test_move_prefers_neutral_city() {
        let mut map = Map::new(6, 1);
        map.add_city(pos(3, 0), CitySize::Small, None);
        let id = map.add_unit(Unit::new(UnitType::LightInfantry, 0, pos(0, 0)));
        let unit = map.unit(id).unwrap().clone();
        assert_eq!(best_move(&map, &unit), Some(pos(3, 0)));
    }

    #[test]
    fn test_move_taken_even_when_every_score_is_negative() {
        let mut map = Map::new(2, 1);
        let id = map.add_unit(Unit::new(UnitType::LightInfantry, 0, pos(0, 0)));
        let unit = map.unit(id).unwrap().clone();
        let tile = move_destinations(&map, &unit).remove(0);
        assert!(score_move(&map, &unit, &tile) < 0);
        assert_eq!(best_move(&map, &unit), Some(pos(1, 0)));
    }

    #[test]
    fn test_hero_heads_for_ruin() {
        let mut game = ai_duel_with(|map, _| map.add_ruin(pos(2, 1)));
        let report = AiController::default().play_turn(&mut game).unwrap();
        let hero = game.map().hero_of(0).unwrap();
        assert_eq!(hero.position, pos(2, 1));
        assert_eq!(hero.artifacts.len(), 1);
        assert!(report.actions.iter().any(|a| matches!(a, AiAction::Moved { to, .. } if *to == pos(2, 1))));
    }

    #[test]
    fn test_schedule_offsets() {
        let report = AiTurnReport {
            player: 0,
            turn: 1,
            actions: vec![AiAction::EndedTurn, AiAction::EndedTurn],
            errors: Vec::new(),
        };
        let offsets: Vec<_> = report
            .schedule(Duration::from_millis(250))
            .map(|(d, _)| d)
            .collect();
        assert_eq!(offsets, vec![Duration::ZERO, Duration::from_millis(250)]);
    }
}
