//! Per-combatant combat registry
//!
//! Each combatant owns one registry holding handles to every edge that
//! touches it, split into PvE and PvP collections keyed by the opponent.
//! Queries that depend on edge contents resolve handles through the graph's
//! edge arena.

use std::collections::BTreeMap;

use slotmap::SlotMap;

use crate::combat::edge::{CombatEdge, EdgeId};
use crate::core::error::CombatError;
use crate::core::types::CombatantId;

pub type EdgeArena = SlotMap<EdgeId, CombatEdge>;

/// Combat references held by a single combatant
#[derive(Debug, Clone)]
pub struct CombatRegistry {
    owner: CombatantId,
    pve: BTreeMap<CombatantId, EdgeId>,
    pvp: BTreeMap<CombatantId, EdgeId>,
    /// Recorded aggregate "in combat" flag
    in_combat: bool,
    /// Derived flag: some unit this combatant controls is in combat
    pet_in_combat: bool,
}

impl CombatRegistry {
    pub fn new(owner: CombatantId) -> Self {
        Self {
            owner,
            pve: BTreeMap::new(),
            pvp: BTreeMap::new(),
            in_combat: false,
            pet_in_combat: false,
        }
    }

    pub fn owner(&self) -> CombatantId {
        self.owner
    }

    pub fn is_in_combat(&self) -> bool {
        self.in_combat
    }

    pub(crate) fn set_in_combat(&mut self, value: bool) {
        self.in_combat = value;
    }

    pub fn is_pet_in_combat(&self) -> bool {
        self.pet_in_combat
    }

    pub(crate) fn set_pet_in_combat(&mut self, value: bool) {
        self.pet_in_combat = value;
    }

    pub fn pve_refs(&self) -> &BTreeMap<CombatantId, EdgeId> {
        &self.pve
    }

    pub fn pvp_refs(&self) -> &BTreeMap<CombatantId, EdgeId> {
        &self.pvp
    }

    pub fn is_empty(&self) -> bool {
        self.pve.is_empty() && self.pvp.is_empty()
    }

    /// Edge filed under `who`, looking in both collections
    pub fn reference_to(&self, who: CombatantId) -> Option<EdgeId> {
        self.pvp.get(&who).or_else(|| self.pve.get(&who)).copied()
    }

    /// Is there a relationship with `who`, suppressed or not?
    pub fn is_in_combat_with(&self, who: CombatantId) -> bool {
        self.pve.contains_key(&who) || self.pvp.contains_key(&who)
    }

    /// File `edge` under `who`
    ///
    /// # Panics
    ///
    /// Panics if a reference to `who` already exists in the target
    /// collection; overwriting it would leak the previous edge.
    pub fn put_reference(&mut self, who: CombatantId, edge: EdgeId, pvp: bool) {
        let refs = if pvp { &mut self.pvp } else { &mut self.pve };
        if refs.contains_key(&who) {
            panic!(
                "{}",
                CombatError::DuplicateReference {
                    owner: self.owner,
                    opponent: who,
                    pvp,
                }
            );
        }
        refs.insert(who, edge);
    }

    /// Forget the reference to `who`; missing references are ignored
    pub fn purge_reference(&mut self, who: CombatantId, pvp: bool) -> Option<EdgeId> {
        if pvp {
            self.pvp.remove(&who)
        } else {
            self.pve.remove(&who)
        }
    }

    fn active<'a>(
        &'a self,
        refs: &'a BTreeMap<CombatantId, EdgeId>,
        edges: &'a EdgeArena,
    ) -> impl Iterator<Item = &'a CombatEdge> + 'a {
        let owner = self.owner;
        refs.values()
            .filter_map(move |id| edges.get(*id))
            .filter(move |edge| !edge.is_suppressed_for(owner))
    }

    pub fn has_pve_combat(&self, edges: &EdgeArena) -> bool {
        self.active(&self.pve, edges).next().is_some()
    }

    pub fn has_pvp_combat(&self, edges: &EdgeArena) -> bool {
        self.active(&self.pvp, edges).next().is_some()
    }

    pub fn has_combat(&self, edges: &EdgeArena) -> bool {
        self.has_pve_combat(edges) || self.has_pvp_combat(edges)
    }

    /// Any active PvE opponent accepted by `is_player_controlled`
    pub fn has_pve_combat_with(
        &self,
        edges: &EdgeArena,
        mut is_player_controlled: impl FnMut(CombatantId) -> bool,
    ) -> bool {
        self.active(&self.pve, edges)
            .any(|edge| is_player_controlled(edge.other(self.owner)))
    }

    /// First active PvE opponent, else first active PvP opponent
    pub fn any_target(&self, edges: &EdgeArena) -> Option<CombatantId> {
        self.active(&self.pve, edges)
            .chain(self.active(&self.pvp, edges))
            .map(|edge| edge.other(self.owner))
            .next()
    }

    /// Snapshot of (opponent, edge) pairs for iteration while mutating
    pub(crate) fn snapshot(&self, pvp: bool) -> Vec<(CombatantId, EdgeId)> {
        let refs = if pvp { &self.pvp } else { &self.pve };
        refs.iter().map(|(who, id)| (*who, *id)).collect()
    }
}
