//! Observable game events.
//!
//! The turn controller queues one [`GameEvent`] per observable occurrence and
//! hands each to any injected [`EventListener`] as it happens. Presentation
//! layers either subscribe or drain the queue after each command.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combat::CombatOutcome;
use crate::components::{Artifact, CityId, PlayerId, UnitId};
use crate::math::GridPos;
use crate::phase::Phase;
use crate::unit_kind::UnitType;

/// Something a renderer, log or test may want to observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A unit changed tile.
    UnitMoved {
        /// Unit.
        unit: UnitId,
        /// Origin.
        from: GridPos,
        /// Destination.
        to: GridPos,
    },
    /// A unit lost hp.
    UnitDamaged {
        /// Unit.
        unit: UnitId,
        /// Hp lost.
        amount: u32,
        /// Hp left.
        hp: u32,
    },
    /// A unit regained hp.
    UnitHealed {
        /// Unit.
        unit: UnitId,
        /// Hp gained.
        amount: u32,
    },
    /// A unit died and left the map.
    UnitRemoved {
        /// Unit.
        unit: UnitId,
        /// Its owner.
        owner: PlayerId,
    },
    /// A city produced a unit.
    UnitProduced {
        /// New unit.
        unit: UnitId,
        /// Producing city.
        city: CityId,
        /// Archetype.
        unit_type: UnitType,
        /// Spawn tile.
        position: GridPos,
    },
    /// A city changed owner.
    CityCaptured {
        /// City.
        city: CityId,
        /// Owner before, `None` if neutral.
        previous_owner: Option<PlayerId>,
        /// New owner.
        new_owner: PlayerId,
    },
    /// A hero looted a ruin.
    RuinExplored {
        /// Ruin tile.
        position: GridPos,
        /// Hero that explored it.
        unit: UnitId,
        /// Loot, equipped immediately.
        artifact: Artifact,
    },
    /// A player's balance changed.
    GoldChanged {
        /// Player.
        player: PlayerId,
        /// New balance.
        gold: u32,
    },
    /// A player lost its last hero and last city.
    PlayerDefeated {
        /// Player.
        player: PlayerId,
    },
    /// An attack was resolved.
    CombatResolved(CombatOutcome),
    /// The phase machine moved.
    PhaseChanged {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
    /// A player's turn began.
    TurnStarted {
        /// Player now acting.
        player: PlayerId,
        /// Turn number.
        turn: u32,
    },
    /// One player remains.
    GameOver {
        /// Winner, `None` if everyone fell at once.
        winner: Option<PlayerId>,
    },
    /// The AI took control for a turn.
    AiTurnStarted {
        /// AI player.
        player: PlayerId,
    },
    /// The AI queued production in a city.
    AiProducing {
        /// City.
        city: CityId,
        /// Archetype chosen.
        unit_type: UnitType,
    },
    /// The AI skipped a blockaded city.
    AiBlockaded {
        /// City.
        city: CityId,
    },
    /// The AI handed control back.
    AiTurnEnded {
        /// AI player.
        player: PlayerId,
    },
}

/// Receives events synchronously as the controller emits them.
pub trait EventListener: Send {
    /// Handle one event.
    fn on_event(&mut self, event: &GameEvent);
}

/// Listener that keeps every event, for tests and headless dumps.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    /// Events received, oldest first.
    pub events: Vec<GameEvent>,
}

impl EventListener for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}

/// Most events held for draining. Older events fall off the front once a
/// front end stops draining; listeners still see every event.
pub const MAX_QUEUED_EVENTS: usize = 1024;

/// Owns the pending queue and the injected listeners.
#[derive(Default)]
pub struct EventSink {
    queue: VecDeque<GameEvent>,
    listeners: Vec<Box<dyn EventListener>>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("queued", &self.queue.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventSink {
    /// Register a listener.
    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Notify listeners and queue the event.
    pub fn emit(&mut self, event: GameEvent) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
        if self.queue.len() == MAX_QUEUED_EVENTS {
            self.queue.pop_front();
        }
        self.queue.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.queue.drain(..).collect()
    }

    /// Events queued since the last drain, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &GameEvent> + '_ {
        self.queue.iter()
    }
}
