//! Combatant records held by the reference world

use ahash::AHashSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{CombatantId, CombatantKind, FactionId, MapId, PhaseMask, UnitState};

/// Everything the world knows about one combatant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub kind: CombatantKind,
    pub faction: FactionId,
    pub in_world: bool,
    pub alive: bool,
    pub map: MapId,
    pub phase: PhaseMask,
    pub position: Vec3,
    pub states: AHashSet<UnitState>,
    pub combat_disallowed: bool,
    /// Player or player-owned (pets, charmed units)
    pub player_controlled: bool,
    pub game_master: bool,
    pub immune_to_pc: bool,
    pub immune_to_npc: bool,
    pub owner: Option<CombatantId>,
    pub charmer: Option<CombatantId>,
    /// Joins the controller's fights when the controller enters combat
    pub assist_controller: bool,
}

impl Combatant {
    pub fn controller(&self) -> Option<CombatantId> {
        self.charmer.or(self.owner)
    }
}

/// Blueprint for spawning a combatant
#[derive(Debug, Clone)]
pub struct CombatantSpec {
    pub name: String,
    pub kind: CombatantKind,
    pub faction: FactionId,
    pub owner: Option<CombatantId>,
    pub map: MapId,
    pub position: Vec3,
}

impl CombatantSpec {
    pub fn creature(name: &str, faction: FactionId) -> Self {
        Self {
            name: name.to_string(),
            kind: CombatantKind::Creature,
            faction,
            owner: None,
            map: MapId(0),
            position: Vec3::ZERO,
        }
    }

    pub fn player(name: &str, faction: FactionId) -> Self {
        Self {
            kind: CombatantKind::Player,
            ..Self::creature(name, faction)
        }
    }

    /// A creature owned by `owner`; it inherits the owner's player control
    pub fn pet_of(owner: CombatantId, name: &str, faction: FactionId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::creature(name, faction)
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn on_map(mut self, map: MapId) -> Self {
        self.map = map;
        self
    }
}
