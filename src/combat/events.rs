//! Combat lifecycle notifications
//!
//! Mutating graph operations settle every registry and flag first and
//! collect the resulting notifications here; only then are they handed to
//! observers and the host's hooks.

use serde::{Deserialize, Serialize};

use crate::core::types::CombatantId;

/// A combat state transition or AI notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Aggregate flag became true; owner-level enter-combat side effects
    EnterCombatState { who: CombatantId },
    /// Non-creature combatant engaged with a target
    Engage {
        who: CombatantId,
        target: Option<CombatantId>,
    },
    /// Aggregate flag became false; owner-level exit-combat side effects
    ExitCombatState { who: CombatantId },
    /// Non-creature combatant disengaged
    Disengage { who: CombatantId },
    /// Whether any unit the controller owns is in combat changed
    PetControllerCombatStateChanged {
        controller: CombatantId,
        pets_in_combat: bool,
    },
    /// AI hook: combat started against `opponent`
    JustEnteredCombat {
        who: CombatantId,
        opponent: CombatantId,
    },
    /// AI hook: combat ended
    JustExitedCombat { who: CombatantId },
}

impl CombatEvent {
    /// The combatant this notification is addressed to
    pub fn subject(&self) -> CombatantId {
        match *self {
            CombatEvent::EnterCombatState { who }
            | CombatEvent::Engage { who, .. }
            | CombatEvent::ExitCombatState { who }
            | CombatEvent::Disengage { who }
            | CombatEvent::JustEnteredCombat { who, .. }
            | CombatEvent::JustExitedCombat { who } => who,
            CombatEvent::PetControllerCombatStateChanged { controller, .. } => controller,
        }
    }
}

/// Passive listener that sees every dispatched event
///
/// Scripting bridges and loggers register here.
pub trait CombatObserver {
    fn notify(&mut self, event: &CombatEvent);
}

impl<F: FnMut(&CombatEvent)> CombatObserver for F {
    fn notify(&mut self, event: &CombatEvent) {
        self(event)
    }
}

/// Notifications produced by one operation, in dispatch order
#[derive(Debug, Default)]
pub(crate) struct PendingEvents {
    events: Vec<CombatEvent>,
}

impl PendingEvents {
    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<CombatEvent> {
        self.events
    }
}
