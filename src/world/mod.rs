//! Reference world - an in-memory host for the combat graph
//!
//! Stores combatant records and a per-combatant threat table, records every
//! dispatched combat event, and can react to events by re-entering the
//! graph (pets assisting their controller, fallback targets on combat exit).

pub mod combatant;

use ahash::AHashMap;
use glam::Vec3;

use crate::combat::events::CombatEvent;
use crate::combat::graph::CombatGraph;
use crate::combat::host::{CombatHooks, CombatantQuery, OpponentFilter, ThreatCollaborator};
use crate::core::types::{CombatantId, CombatantKind, MapId, PhaseMask, Tick, UnitState};

pub use combatant::{Combatant, CombatantSpec};

/// Longest charm/ownership chain followed when looking for a player
const MAX_CONTROL_DEPTH: usize = 8;

/// The simulated world containing all combatants
pub struct World {
    pub current_tick: Tick,
    combatants: AHashMap<CombatantId, Combatant>,
    /// owner -> (victim -> threat)
    threat: AHashMap<CombatantId, AHashMap<CombatantId, f32>>,
    /// who -> target engaged when `who` drops out of combat
    fallback_targets: AHashMap<CombatantId, CombatantId>,
    events: Vec<CombatEvent>,
}

impl World {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            combatants: AHashMap::new(),
            threat: AHashMap::new(),
            fallback_targets: AHashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn spawn(&mut self, spec: CombatantSpec) -> CombatantId {
        let id = CombatantId::new();
        let player_controlled = match spec.kind {
            CombatantKind::Player => true,
            CombatantKind::Creature => spec
                .owner
                .and_then(|owner| self.combatants.get(&owner))
                .map_or(false, |owner| owner.player_controlled),
        };

        self.combatants.insert(
            id,
            Combatant {
                id,
                name: spec.name,
                kind: spec.kind,
                faction: spec.faction,
                in_world: true,
                alive: true,
                map: spec.map,
                phase: PhaseMask::NORMAL,
                position: spec.position,
                states: Default::default(),
                combat_disallowed: false,
                player_controlled,
                game_master: false,
                immune_to_pc: false,
                immune_to_npc: false,
                owner: spec.owner,
                charmer: None,
                assist_controller: false,
            },
        );
        id
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn name(&self, id: CombatantId) -> &str {
        self.combatants.get(&id).map_or("<gone>", |c| c.name.as_str())
    }

    /// All combatant ids in a stable order
    pub fn ids(&self) -> Vec<CombatantId> {
        let mut ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn combatant_count(&self) -> usize {
        self.combatants.len()
    }

    pub fn kill(&mut self, id: CombatantId) {
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.alive = false;
        }
    }

    /// Take a combatant out of the world; the record stays until `forget`
    pub fn despawn(&mut self, id: CombatantId) {
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.in_world = false;
        }
    }

    pub fn forget(&mut self, id: CombatantId) -> Option<Combatant> {
        self.threat.remove(&id);
        self.fallback_targets.remove(&id);
        self.combatants.remove(&id)
    }

    pub fn move_to(&mut self, id: CombatantId, position: Vec3) {
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.position = position;
        }
    }

    pub fn teleport(&mut self, id: CombatantId, map: MapId, position: Vec3) {
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.map = map;
            combatant.position = position;
        }
    }

    /// Put `unit` under `charmer`'s control, taking on its allegiance
    pub fn charm(&mut self, unit: CombatantId, charmer: CombatantId) {
        let Some((faction, player_controlled)) = self
            .combatants
            .get(&charmer)
            .map(|c| (c.faction, c.player_controlled))
        else {
            return;
        };
        if let Some(combatant) = self.combatants.get_mut(&unit) {
            combatant.charmer = Some(charmer);
            combatant.faction = faction;
            combatant.player_controlled = player_controlled;
        }
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }

    // === THREAT ===

    pub fn add_threat(&mut self, owner: CombatantId, victim: CombatantId, amount: f32) {
        *self.threat.entry(owner).or_default().entry(victim).or_insert(0.0) += amount;
    }

    pub fn threat(&self, owner: CombatantId, victim: CombatantId) -> f32 {
        self.threat
            .get(&owner)
            .and_then(|list| list.get(&victim))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn threat_list_len(&self, owner: CombatantId) -> usize {
        self.threat.get(&owner).map_or(0, |list| list.len())
    }

    // === SCRIPTED REACTIONS ===

    /// When `who` drops out of combat, it immediately engages `target`
    pub fn engage_on_exit(&mut self, who: CombatantId, target: CombatantId) {
        self.fallback_targets.insert(who, target);
    }

    // === EVENT LOG ===

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn count_events(&self, predicate: impl Fn(&CombatEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }

    pub fn events_for(&self, who: CombatantId) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter().filter(move |event| event.subject() == who)
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatantQuery for World {
    fn is_in_world(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(false, |c| c.in_world)
    }

    fn is_alive(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(false, |c| c.alive)
    }

    fn map_id(&self, id: CombatantId) -> Option<MapId> {
        self.combatants.get(&id).map(|c| c.map)
    }

    fn phase_mask(&self, id: CombatantId) -> PhaseMask {
        self.combatants.get(&id).map_or(PhaseMask(0), |c| c.phase)
    }

    fn has_state(&self, id: CombatantId, state: UnitState) -> bool {
        self.combatants
            .get(&id)
            .map_or(false, |c| c.states.contains(&state))
    }

    fn is_combat_disallowed(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(true, |c| c.combat_disallowed)
    }

    fn is_friendly_to(&self, id: CombatantId, other: CombatantId) -> bool {
        match (self.combatants.get(&id), self.combatants.get(&other)) {
            (Some(a), Some(b)) => a.faction == b.faction,
            _ => false,
        }
    }

    fn kind(&self, id: CombatantId) -> CombatantKind {
        self.combatants
            .get(&id)
            .map_or(CombatantKind::Creature, |c| c.kind)
    }

    fn is_controlled_by_player(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(false, |c| c.player_controlled)
    }

    fn controlling_player(&self, id: CombatantId) -> Option<CombatantId> {
        let mut current = self.combatants.get(&id)?;
        for _ in 0..MAX_CONTROL_DEPTH {
            if current.kind == CombatantKind::Player {
                return Some(current.id);
            }
            current = self.combatants.get(&current.controller()?)?;
        }
        None
    }

    fn is_game_master(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(false, |c| c.game_master)
    }

    fn is_within_distance(&self, id: CombatantId, other: CombatantId, range: f32) -> bool {
        match (self.combatants.get(&id), self.combatants.get(&other)) {
            (Some(a), Some(b)) => a.map == b.map && a.position.distance(b.position) <= range,
            _ => false,
        }
    }

    fn is_immune_to_pc(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(false, |c| c.immune_to_pc)
    }

    fn is_immune_to_npc(&self, id: CombatantId) -> bool {
        self.combatants.get(&id).map_or(false, |c| c.immune_to_npc)
    }

    fn charmer_or_owner(&self, id: CombatantId) -> Option<CombatantId> {
        self.combatants.get(&id).and_then(Combatant::controller)
    }

    fn controlled_units(&self, id: CombatantId) -> Vec<CombatantId> {
        let mut units: Vec<CombatantId> = self
            .combatants
            .values()
            .filter(|c| c.controller() == Some(id))
            .map(|c| c.id)
            .collect();
        units.sort();
        units
    }
}

impl ThreatCollaborator for World {
    fn clear_threat(&mut self, owner: CombatantId, victim: CombatantId) {
        if let Some(list) = self.threat.get_mut(&owner) {
            list.remove(&victim);
        }
    }

    fn clear_all_threat(&mut self, owner: CombatantId) {
        if let Some(list) = self.threat.get_mut(&owner) {
            list.clear();
        }
    }

    fn remove_from_all_threat_lists(
        &mut self,
        owner: CombatantId,
        filter: Option<OpponentFilter<'_, Self>>,
    ) {
        let holders: Vec<CombatantId> = self
            .threat
            .iter()
            .filter(|(_, list)| list.contains_key(&owner))
            .map(|(holder, _)| *holder)
            .filter(|holder| filter.map_or(true, |f| f(self, *holder)))
            .collect();

        for holder in holders {
            self.clear_threat(holder, owner);
        }
    }
}

impl CombatHooks for World {
    fn dispatch(&mut self, graph: &mut CombatGraph, event: &CombatEvent) {
        self.events.push(*event);

        match *event {
            CombatEvent::JustEnteredCombat { who, .. } => {
                let helpers: Vec<CombatantId> = self
                    .controlled_units(who)
                    .into_iter()
                    .filter(|unit| self.combatants.get(unit).map_or(false, |c| c.assist_controller))
                    .collect();
                for helper in helpers {
                    graph.inherit_combat_states_from(self, helper, who, None);
                }
            }
            CombatEvent::JustExitedCombat { who } => {
                if let Some(target) = self.fallback_targets.remove(&who) {
                    graph.set_in_combat_with(self, who, target, false);
                }
            }
            _ => {}
        }
    }
}
