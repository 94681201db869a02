//! Combat edges - the relationship between two combatants that are fighting
//!
//! An edge is shared: both endpoints' registries file the same `EdgeId`,
//! keyed by the opposite endpoint. The edge object itself lives in the
//! graph's slot map and is only ever removed by `CombatGraph::end_combat`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::core::types::CombatantId;

new_key_type! {
    /// Stable handle for combat edges backed by a generational slot map.
    pub struct EdgeId;
}

/// PvP decay countdown
///
/// Ticked only by the edge's canonical first endpoint so the shared timer
/// is never decremented twice per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayTimer {
    remaining: Duration,
}

impl DecayTimer {
    pub fn new(timeout: Duration) -> Self {
        Self { remaining: timeout }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Advance the countdown by `dt`
    ///
    /// Returns false once the countdown would reach zero; the timer is left
    /// untouched in that case and the caller must tear the edge down.
    pub fn update(&mut self, dt: Duration) -> bool {
        if self.remaining <= dt {
            return false;
        }
        self.remaining -= dt;
        true
    }

    /// Reset the countdown after renewed PvP activity
    pub fn refresh(&mut self, timeout: Duration) {
        self.remaining = timeout;
    }
}

/// PvE edges persist until ended; PvP edges carry a decay timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    Pve,
    Pvp(DecayTimer),
}

/// An undirected combat relationship between two distinct combatants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEdge {
    first: CombatantId,
    second: CombatantId,
    kind: EdgeKind,
    suppressed_first: bool,
    suppressed_second: bool,
}

impl CombatEdge {
    pub(crate) fn new(first: CombatantId, second: CombatantId, kind: EdgeKind) -> Self {
        debug_assert_ne!(first, second, "combat edge must connect two distinct combatants");
        Self {
            first,
            second,
            kind,
            suppressed_first: false,
            suppressed_second: false,
        }
    }

    /// The canonical first endpoint (the side that created the edge)
    pub fn first(&self) -> CombatantId {
        self.first
    }

    pub fn second(&self) -> CombatantId {
        self.second
    }

    pub fn is_pvp(&self) -> bool {
        matches!(self.kind, EdgeKind::Pvp(_))
    }

    pub fn timer(&self) -> Option<&DecayTimer> {
        match &self.kind {
            EdgeKind::Pvp(timer) => Some(timer),
            EdgeKind::Pve => None,
        }
    }

    pub(crate) fn timer_mut(&mut self) -> Option<&mut DecayTimer> {
        match &mut self.kind {
            EdgeKind::Pvp(timer) => Some(timer),
            EdgeKind::Pve => None,
        }
    }

    pub fn involves(&self, who: CombatantId) -> bool {
        self.first == who || self.second == who
    }

    /// The endpoint opposite `who`
    pub fn other(&self, who: CombatantId) -> CombatantId {
        if self.first == who {
            self.second
        } else {
            self.first
        }
    }

    /// False for combatants that are not an endpoint
    pub fn is_suppressed_for(&self, who: CombatantId) -> bool {
        if self.first == who {
            self.suppressed_first
        } else {
            self.second == who && self.suppressed_second
        }
    }

    /// Mark `who`'s side suppressed without touching combat state
    pub(crate) fn suppress(&mut self, who: CombatantId) {
        if self.first == who {
            self.suppressed_first = true;
        } else if self.second == who {
            self.suppressed_second = true;
        }
    }

    /// Clear both suppression flags
    ///
    /// Returns which sides (first, second) were suppressed before the call.
    pub(crate) fn unsuppress(&mut self) -> (bool, bool) {
        let previous = (self.suppressed_first, self.suppressed_second);
        self.suppressed_first = false;
        self.suppressed_second = false;
        previous
    }
}
