//! Turn/phase state machine.
//!
//! Guards which player actions are legal at any moment. Transitions are an
//! explicit whitelist; anything else is rejected without changing state.

use serde::{Deserialize, Serialize};

use crate::error::PhaseError;

/// Interaction phase of the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing picked.
    #[default]
    Idle,
    /// A unit is picked and has not moved yet.
    Selected,
    /// The selected unit has moved and may still attack.
    Moved,
    /// A city is picked for production.
    Production,
    /// Terminal.
    GameOver,
}

impl Phase {
    /// Phases reachable from this one.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::Selected, Self::Production, Self::GameOver],
            Self::Selected => &[Self::Idle, Self::Moved, Self::GameOver],
            Self::Moved => &[Self::Idle, Self::GameOver],
            Self::Production => &[Self::Idle, Self::GameOver],
            Self::GameOver => &[],
        }
    }

    /// Whether `self -> to` is in the whitelist.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.successors().contains(&to)
    }
}

/// Holds the current phase and enforces the whitelist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMachine {
    current: Phase,
}

impl PhaseMachine {
    /// Start in [`Phase::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current phase.
    #[must_use]
    pub const fn current(&self) -> Phase {
        self.current
    }

    /// Whether the machine is in the terminal phase.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.current == Phase::GameOver
    }

    /// Move to `to`.
    ///
    /// Transitioning to the current phase is a no-op success, so repeated
    /// selections do not need special casing by callers.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError`] if the transition is not whitelisted. The
    /// phase is left unchanged.
    pub fn transition(&mut self, to: Phase) -> Result<Phase, PhaseError> {
        let from = self.current;
        if from == to && from != Phase::GameOver {
            return Ok(from);
        }
        if !from.can_transition_to(to) {
            tracing::warn!(?from, ?to, "Rejected illegal phase transition");
            return Err(PhaseError { from, to });
        }
        self.current = to;
        tracing::debug!(?from, ?to, "Phase changed");
        Ok(from)
    }

    /// Force the machine back to [`Phase::Idle`] (new game, load).
    pub fn reset(&mut self) {
        self.current = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        assert_eq!(PhaseMachine::new().current(), Phase::Idle);
    }

    #[test]
    fn test_select_move_idle_cycle() {
        let mut machine = PhaseMachine::new();
        machine.transition(Phase::Selected).unwrap();
        machine.transition(Phase::Moved).unwrap();
        machine.transition(Phase::Idle).unwrap();
        assert_eq!(machine.current(), Phase::Idle);
    }

    #[test]
    fn test_selected_to_production_rejected() {
        let mut machine = PhaseMachine::new();
        machine.transition(Phase::Selected).unwrap();

        let err = machine.transition(Phase::Production).unwrap_err();
        assert_eq!(
            err,
            PhaseError {
                from: Phase::Selected,
                to: Phase::Production
            }
        );
        assert_eq!(machine.current(), Phase::Selected);
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut machine = PhaseMachine::new();
        machine.transition(Phase::GameOver).unwrap();
        for phase in [
            Phase::Idle,
            Phase::Selected,
            Phase::Moved,
            Phase::Production,
            Phase::GameOver,
        ] {
            assert!(machine.transition(phase).is_err());
        }
        assert!(machine.is_game_over());
    }

    #[test]
    fn test_reset_forces_idle() {
        let mut machine = PhaseMachine::new();
        machine.transition(Phase::GameOver).unwrap();
        machine.reset();
        assert_eq!(machine.current(), Phase::Idle);
    }

    #[test]
    fn test_moved_cannot_go_back_to_selected() {
        let mut machine = PhaseMachine::new();
        machine.transition(Phase::Selected).unwrap();
        machine.transition(Phase::Moved).unwrap();
        assert!(machine.transition(Phase::Selected).is_err());
    }
}
