//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for combatants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulation tick counter
pub type Tick = u64;

/// Map (instance) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapId(pub u32);

/// Faction identifier; combatants of the same faction are friendly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u32);

/// Phase membership as a bit mask
///
/// Two combatants see each other when their masks share at least one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseMask(pub u32);

impl PhaseMask {
    pub const NORMAL: PhaseMask = PhaseMask(1);

    pub fn intersects(&self, other: &PhaseMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for PhaseMask {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Transient unit states that block combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Returning home after losing a fight; cannot be engaged
    Evading,
    /// Riding a taxi path
    InFlight,
}

/// Broad category of a combatant
///
/// Creatures engage through their threat list, so they skip the
/// engage/disengage side effects that accompany combat state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    Player,
    Creature,
}

impl CombatantKind {
    pub fn engages_on_combat(&self) -> bool {
        !matches!(self, CombatantKind::Creature)
    }
}
