//! The combat reference graph
//!
//! Owns every combat edge (in a generational slot map) and every
//! combatant's registry of edge handles. All graph mutations go through
//! here so both endpoints of an edge are always updated together.
//!
//! Each mutating operation runs in two phases:
//! 1. Settle: registries, edges and aggregate flags are updated, and the
//!    resulting notifications are queued.
//! 2. Flush: queued notifications go to observers and then to the host's
//!    hooks, which may re-enter the graph freely.

use std::time::Duration;

use ahash::AHashMap;

use crate::combat::edge::{CombatEdge, DecayTimer, EdgeId, EdgeKind};
use crate::combat::events::{CombatEvent, CombatObserver, PendingEvents};
use crate::combat::host::{CombatHost, CombatantQuery, OpponentFilter};
use crate::combat::registry::{CombatRegistry, EdgeArena};
use crate::combat::validity::can_begin_combat;
use crate::core::config::{config, CombatConfig};
use crate::core::error::{CombatError, Result};
use crate::core::types::CombatantId;

/// Combat relationships for every combatant in a simulation shard
pub struct CombatGraph {
    edges: EdgeArena,
    registries: AHashMap<CombatantId, CombatRegistry>,
    config: CombatConfig,
    observers: Vec<Box<dyn CombatObserver>>,
}

impl CombatGraph {
    /// Create a graph using the global combat config
    pub fn new() -> Self {
        Self::with_config(config().clone())
    }

    pub fn with_config(config: CombatConfig) -> Self {
        Self {
            edges: EdgeArena::with_key(),
            registries: AHashMap::new(),
            config,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Register a passive observer that sees every dispatched event
    pub fn add_observer(&mut self, observer: Box<dyn CombatObserver>) {
        self.observers.push(observer);
    }

    // === REGISTRY LIFECYCLE ===

    /// Create an empty registry for `owner` if it has none
    ///
    /// Engaging creates registries on demand; a controller must be
    /// registered up front to track whether its pets are fighting.
    pub fn register(&mut self, owner: CombatantId) {
        self.registry_mut(owner);
    }

    pub fn is_registered(&self, owner: CombatantId) -> bool {
        self.registries.contains_key(&owner)
    }

    /// Registered combatants in a stable order
    pub fn combatants(&self) -> Vec<CombatantId> {
        let mut ids: Vec<CombatantId> = self.registries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn registry(&self, owner: CombatantId) -> Option<&CombatRegistry> {
        self.registries.get(&owner)
    }

    fn registry_mut(&mut self, owner: CombatantId) -> &mut CombatRegistry {
        self.registries
            .entry(owner)
            .or_insert_with(|| CombatRegistry::new(owner))
    }

    /// Destroy `owner`'s registry
    ///
    /// # Panics
    ///
    /// Panics if the registry still holds edges: they would dangle in the
    /// opponents' registries.
    pub fn release(&mut self, owner: CombatantId) {
        let Some(registry) = self.registries.remove(&owner) else {
            return;
        };
        if !registry.is_empty() {
            panic!(
                "{}",
                CombatError::LeakedReferences {
                    owner,
                    pve: registry.pve_refs().len(),
                    pvp: registry.pvp_refs().len(),
                }
            );
        }
        tracing::trace!("Released combat registry of {}", owner);
    }

    /// Tear down all of `owner`'s combat and destroy its registry
    ///
    /// The host should already report `owner` as out of the world so that
    /// no hook can pull it back into combat.
    pub fn remove_combatant<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId) {
        self.end_all_combat(host, owner);
        self.release(owner);
    }

    // === EDGE ACCESS ===

    pub fn edge(&self, id: EdgeId) -> Option<&CombatEdge> {
        self.edges.get(id)
    }

    pub fn edge_between(&self, a: CombatantId, b: CombatantId) -> Option<EdgeId> {
        self.registries.get(&a).and_then(|registry| registry.reference_to(b))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn pve_refs(&self, owner: CombatantId) -> impl Iterator<Item = (CombatantId, EdgeId)> + '_ {
        self.registries
            .get(&owner)
            .into_iter()
            .flat_map(|registry| registry.pve_refs().iter().map(|(who, id)| (*who, *id)))
    }

    pub fn pvp_refs(&self, owner: CombatantId) -> impl Iterator<Item = (CombatantId, EdgeId)> + '_ {
        self.registries
            .get(&owner)
            .into_iter()
            .flat_map(|registry| registry.pvp_refs().iter().map(|(who, id)| (*who, *id)))
    }

    fn snapshot(&self, owner: CombatantId, pvp: bool) -> Vec<(CombatantId, EdgeId)> {
        self.registries
            .get(&owner)
            .map(|registry| registry.snapshot(pvp))
            .unwrap_or_default()
    }

    // === QUERIES ===

    pub fn has_pve_combat(&self, owner: CombatantId) -> bool {
        self.registries
            .get(&owner)
            .map_or(false, |registry| registry.has_pve_combat(&self.edges))
    }

    pub fn has_pvp_combat(&self, owner: CombatantId) -> bool {
        self.registries
            .get(&owner)
            .map_or(false, |registry| registry.has_pvp_combat(&self.edges))
    }

    pub fn has_combat(&self, owner: CombatantId) -> bool {
        self.has_pve_combat(owner) || self.has_pvp_combat(owner)
    }

    pub fn has_pve_combat_with_players<Q: CombatantQuery>(&self, host: &Q, owner: CombatantId) -> bool {
        self.registries.get(&owner).map_or(false, |registry| {
            registry.has_pve_combat_with(&self.edges, |who| host.is_controlled_by_player(who))
        })
    }

    /// Some active opponent, PvE preferred
    ///
    /// Which one is picked among several candidates is unspecified.
    pub fn any_target(&self, owner: CombatantId) -> Option<CombatantId> {
        self.registries
            .get(&owner)
            .and_then(|registry| registry.any_target(&self.edges))
    }

    /// Does any relationship exist between `owner` and `who`, suppressed or not?
    pub fn is_in_combat_with(&self, owner: CombatantId, who: CombatantId) -> bool {
        self.registries
            .get(&owner)
            .map_or(false, |registry| registry.is_in_combat_with(who))
    }

    /// Recorded aggregate combat flag
    pub fn is_in_combat(&self, owner: CombatantId) -> bool {
        self.registries
            .get(&owner)
            .map_or(false, CombatRegistry::is_in_combat)
    }

    /// Is any unit `controller` controls in combat?
    ///
    /// Always false for an unregistered controller.
    pub fn is_pet_in_combat(&self, controller: CombatantId) -> bool {
        self.registries
            .get(&controller)
            .map_or(false, CombatRegistry::is_pet_in_combat)
    }

    // === EDGE OPERATIONS ===

    /// Start combat between `owner` and `who`, or refresh existing combat
    ///
    /// Returns whether the two are in combat afterwards. A pair that fails
    /// `can_begin_combat` is silently declined.
    pub fn set_in_combat_with<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        who: CombatantId,
        suppress_opponent: bool,
    ) -> bool {
        if let Some(id) = self.edge_between(owner, who) {
            self.refresh_timer(id);
            self.refresh(host, id);
            return self.is_in_combat_with(owner, who);
        }

        if !can_begin_combat(&*host, owner, who) {
            tracing::trace!("Combat between {} and {} declined", owner, who);
            return false;
        }

        let kind = if host.is_controlled_by_player(owner) && host.is_controlled_by_player(who) {
            EdgeKind::Pvp(DecayTimer::new(self.config.pvp_combat_timeout()))
        } else {
            EdgeKind::Pve
        };
        let mut edge = CombatEdge::new(owner, who, kind);
        if suppress_opponent {
            edge.suppress(who);
        }
        let pvp = edge.is_pvp();
        let id = self.edges.insert(edge);

        self.registry_mut(owner).put_reference(who, id, pvp);
        self.registry_mut(who).put_reference(owner, id, pvp);
        tracing::debug!(
            "Combat started: {} vs {} ({})",
            owner,
            who,
            if pvp { "PvP" } else { "PvE" }
        );

        let mut pending = PendingEvents::default();
        let owner_changed = self.settle_owner_state(&*host, owner, &mut pending);
        let who_changed = self.settle_owner_state(&*host, who, &mut pending);

        if owner_changed && self.is_in_combat(owner) {
            pending.push(CombatEvent::JustEnteredCombat { who: owner, opponent: who });
        }
        if who_changed && self.is_in_combat(who) {
            pending.push(CombatEvent::JustEnteredCombat { who, opponent: owner });
        }
        self.flush(host, pending);

        self.is_in_combat_with(owner, who)
    }

    /// Lift suppression from both sides of an edge
    ///
    /// Sides that re-enter combat get their enter-combat notifications
    /// after both have been settled.
    pub fn refresh<H: CombatHost>(&mut self, host: &mut H, id: EdgeId) {
        let Some(edge) = self.edges.get_mut(id) else {
            return;
        };
        let (first, second) = (edge.first(), edge.second());
        let (was_first, was_second) = edge.unsuppress();
        if !was_first && !was_second {
            return;
        }

        let mut pending = PendingEvents::default();
        let first_entered =
            was_first && self.settle_owner_state(&*host, first, &mut pending) && self.is_in_combat(first);
        let second_entered =
            was_second && self.settle_owner_state(&*host, second, &mut pending) && self.is_in_combat(second);

        if first_entered {
            pending.push(CombatEvent::JustEnteredCombat { who: first, opponent: second });
        }
        if second_entered {
            pending.push(CombatEvent::JustEnteredCombat { who: second, opponent: first });
        }
        self.flush(host, pending);
    }

    /// Reset a PvP edge's decay countdown; false for PvE or stale edges
    pub fn refresh_timer(&mut self, id: EdgeId) -> bool {
        let timeout = self.config.pvp_combat_timeout();
        match self.edges.get_mut(id).and_then(CombatEdge::timer_mut) {
            Some(timer) => {
                timer.refresh(timeout);
                true
            }
            None => false,
        }
    }

    /// Suppress the edge for `who` only
    ///
    /// The edge survives and can be revived with `refresh`.
    pub fn suppress_for<H: CombatHost>(&mut self, host: &mut H, id: EdgeId, who: CombatantId) {
        let Some(edge) = self.edges.get_mut(id) else {
            return;
        };
        if !edge.involves(who) {
            return;
        }
        edge.suppress(who);
        tracing::debug!("Combat suppressed for {} against {}", who, edge.other(who));

        let mut pending = PendingEvents::default();
        if self.settle_owner_state(&*host, who, &mut pending) && !self.is_in_combat(who) {
            pending.push(CombatEvent::JustExitedCombat { who });
        }
        self.flush(host, pending);
    }

    /// Tear an edge down on both sides
    ///
    /// Returns false if the edge no longer exists.
    pub fn end_combat<H: CombatHost>(&mut self, host: &mut H, id: EdgeId) -> bool {
        let mut pending = PendingEvents::default();
        let ended = self.end_combat_settled(host, id, &mut pending);
        self.flush(host, pending);
        ended
    }

    fn end_combat_settled<H: CombatHost>(
        &mut self,
        host: &mut H,
        id: EdgeId,
        pending: &mut PendingEvents,
    ) -> bool {
        let Some(edge) = self.edges.get(id) else {
            return false;
        };
        let (first, second, pvp) = (edge.first(), edge.second(), edge.is_pvp());

        // No threat may outlive combat
        host.clear_threat(first, second);
        host.clear_threat(second, first);

        // Both registries must be consistent before any flag work
        self.purge(first, second, pvp);
        self.purge(second, first, pvp);

        let first_exited = self.settle_owner_state(&*host, first, pending) && !self.is_in_combat(first);
        let second_exited = self.settle_owner_state(&*host, second, pending) && !self.is_in_combat(second);

        if first_exited {
            pending.push(CombatEvent::JustExitedCombat { who: first });
        }
        if second_exited {
            pending.push(CombatEvent::JustExitedCombat { who: second });
        }

        self.edges.remove(id);
        tracing::debug!(
            "Combat ended: {} vs {} ({})",
            first,
            second,
            if pvp { "PvP" } else { "PvE" }
        );
        true
    }

    fn purge(&mut self, owner: CombatantId, who: CombatantId, pvp: bool) {
        if let Some(registry) = self.registries.get_mut(&owner) {
            registry.purge_reference(who, pvp);
        }
    }

    // === REGISTRY OPERATIONS ===

    /// Decay `owner`'s PvP edges by `dt`
    ///
    /// Only edges where `owner` is the canonical first endpoint are ticked,
    /// so a shared timer is decremented once per tick.
    pub fn update<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId, dt: Duration) {
        for (opponent, id) in self.snapshot(owner, true) {
            let Some(edge) = self.edges.get_mut(id) else {
                continue;
            };
            if edge.first() != owner {
                continue;
            }
            let still_active = edge.timer_mut().map_or(true, |timer| timer.update(dt));
            if !still_active {
                tracing::trace!("PvP combat between {} and {} timed out", owner, opponent);
                self.purge(owner, opponent, true);
                self.end_combat(host, id);
            }
        }
    }

    /// Copy a donor's fights onto `owner`
    ///
    /// Opponents `owner` already fights, opponents it is immune to and
    /// opponents rejected by `filter` are skipped.
    pub fn inherit_combat_states_from<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        donor: CombatantId,
        filter: Option<OpponentFilter<'_, H>>,
    ) {
        for pvp in [false, true] {
            for (opponent, _) in self.snapshot(donor, pvp) {
                if self.is_in_combat_with(owner, opponent) {
                    continue;
                }
                if !filter.map_or(true, |f| f(&*host, opponent)) {
                    continue;
                }
                let player_controlled = host.is_controlled_by_player(opponent);
                if (player_controlled && host.is_immune_to_pc(owner))
                    || (!player_controlled && host.is_immune_to_npc(owner))
                {
                    continue;
                }
                self.set_in_combat_with(host, owner, opponent, false);
            }
        }
    }

    /// End combat with every opponent farther than `range`
    pub fn end_combat_beyond_range<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        range: f32,
        including_pvp: bool,
    ) {
        for pvp in [false, true] {
            if pvp && !including_pvp {
                break;
            }
            for (opponent, id) in self.snapshot(owner, pvp) {
                let Some(edge) = self.edges.get(id) else {
                    continue;
                };
                if host.is_within_distance(edge.first(), edge.second(), range) {
                    continue;
                }
                self.purge(owner, opponent, pvp);
                self.end_combat(host, id);
            }
        }
    }

    /// Suppress matching PvP edges for `owner`'s side only
    pub fn suppress_pvp_combat<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        filter: Option<OpponentFilter<'_, H>>,
    ) {
        for (opponent, id) in self.snapshot(owner, true) {
            if !filter.map_or(true, |f| f(&*host, opponent)) {
                continue;
            }
            if let Some(edge) = self.edges.get_mut(id) {
                edge.suppress(owner);
            }
        }

        let mut pending = PendingEvents::default();
        if self.settle_owner_state(&*host, owner, &mut pending) && !self.is_in_combat(owner) {
            pending.push(CombatEvent::JustExitedCombat { who: owner });
        }
        self.flush(host, pending);
    }

    /// End PvE combat with every matching opponent
    ///
    /// Threat is cleared first: there is no threat without combat.
    pub fn end_all_pve_combat<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        filter: Option<OpponentFilter<'_, H>>,
    ) {
        host.remove_from_all_threat_lists(owner, filter);
        host.clear_all_threat(owner);
        self.end_matching(host, owner, false, filter);
    }

    /// End PvP combat with every matching opponent
    pub fn end_all_pvp_combat<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        filter: Option<OpponentFilter<'_, H>>,
    ) {
        self.end_matching(host, owner, true, filter);
    }

    pub fn end_all_combat<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId) {
        self.end_all_pve_combat(host, owner, None);
        self.end_all_pvp_combat(host, owner, None);
    }

    fn end_matching<H: CombatHost>(
        &mut self,
        host: &mut H,
        owner: CombatantId,
        pvp: bool,
        filter: Option<OpponentFilter<'_, H>>,
    ) {
        let doomed: Vec<EdgeId> = self
            .snapshot(owner, pvp)
            .into_iter()
            .filter(|(opponent, _)| filter.map_or(true, |f| f(&*host, *opponent)))
            .map(|(_, id)| id)
            .collect();

        for id in doomed {
            // Stale handles (ended by an earlier hook) are skipped
            self.end_combat(host, id);
        }
    }

    /// Re-check every edge of `owner` and end the ones that are no longer valid
    pub fn revalidate_combat<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId) {
        for pvp in [false, true] {
            for (opponent, id) in self.snapshot(owner, pvp) {
                if !self.edges.contains_key(id) {
                    continue;
                }
                if can_begin_combat(&*host, owner, opponent) {
                    continue;
                }
                self.purge(owner, opponent, pvp);
                self.end_combat(host, id);
            }
        }
    }

    /// Stop fighting
    ///
    /// With `mutual_pvp` every edge is ended; otherwise PvE combat ends and
    /// PvP combat is only suppressed for this side, leaving opponents still
    /// fighting `owner`.
    pub fn combat_stop<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId, mutual_pvp: bool) {
        if mutual_pvp {
            self.end_all_combat(host, owner);
        } else {
            self.end_all_pve_combat(host, owner, None);
            self.suppress_pvp_combat(host, owner, None);
        }
    }

    /// `combat_stop` for `owner` and every unit it controls
    pub fn combat_stop_with_pets<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId, mutual_pvp: bool) {
        self.combat_stop(host, owner, mutual_pvp);
        for unit in host.controlled_units(owner) {
            self.combat_stop(host, unit, mutual_pvp);
        }
    }

    // === COMBAT STATE ===

    /// Re-derive `owner`'s aggregate flag and notify on a transition
    ///
    /// Returns whether the flag changed.
    pub fn update_owner_combat_state<H: CombatHost>(&mut self, host: &mut H, owner: CombatantId) -> bool {
        let mut pending = PendingEvents::default();
        let changed = self.settle_owner_state(&*host, owner, &mut pending);
        self.flush(host, pending);
        changed
    }

    /// Re-derive whether any unit `controller` controls is in combat
    pub fn update_pet_combat_state<H: CombatHost>(&mut self, host: &mut H, controller: CombatantId) {
        let mut pending = PendingEvents::default();
        self.settle_pet_combat_state(&*host, controller, &mut pending);
        self.flush(host, pending);
    }

    fn settle_owner_state<Q: CombatantQuery>(
        &mut self,
        host: &Q,
        owner: CombatantId,
        pending: &mut PendingEvents,
    ) -> bool {
        let has_combat = self.has_combat(owner);
        // Unknown or released combatants have no flag to settle
        let Some(registry) = self.registries.get_mut(&owner) else {
            return false;
        };
        if registry.is_in_combat() == has_combat {
            return false;
        }
        registry.set_in_combat(has_combat);

        let engages = host.kind(owner).engages_on_combat();
        if has_combat {
            tracing::debug!("{} entered combat", owner);
            pending.push(CombatEvent::EnterCombatState { who: owner });
            if engages {
                let target = self.any_target(owner);
                pending.push(CombatEvent::Engage { who: owner, target });
            }
        } else {
            tracing::debug!("{} left combat", owner);
            pending.push(CombatEvent::ExitCombatState { who: owner });
            if engages {
                pending.push(CombatEvent::Disengage { who: owner });
            }
        }

        if let Some(controller) = host.charmer_or_owner(owner) {
            self.settle_pet_combat_state(host, controller, pending);
        }
        true
    }

    fn settle_pet_combat_state<Q: CombatantQuery>(
        &mut self,
        host: &Q,
        controller: CombatantId,
        pending: &mut PendingEvents,
    ) {
        let pets_in_combat = host
            .controlled_units(controller)
            .into_iter()
            .any(|unit| self.is_in_combat(unit));
        let Some(registry) = self.registries.get_mut(&controller) else {
            return;
        };
        if registry.is_pet_in_combat() == pets_in_combat {
            return;
        }
        registry.set_pet_in_combat(pets_in_combat);
        pending.push(CombatEvent::PetControllerCombatStateChanged {
            controller,
            pets_in_combat,
        });
    }

    fn flush<H: CombatHost>(&mut self, host: &mut H, pending: PendingEvents) {
        for event in pending.into_events() {
            for observer in &mut self.observers {
                observer.notify(&event);
            }
            host.dispatch(self, &event);
        }
    }

    // === DIAGNOSTICS ===

    /// Audit the structural invariants
    ///
    /// Every reference must be mirrored by the opponent under the same
    /// edge, each pair is either PvE or PvP, and no combatant fights
    /// itself.
    pub fn check_invariants(&self) -> Result<()> {
        for registry in self.registries.values() {
            let owner = registry.owner();
            for (pvp, refs) in [(false, registry.pve_refs()), (true, registry.pvp_refs())] {
                for (opponent, id) in refs {
                    let opponent = *opponent;
                    if opponent == owner {
                        return Err(CombatError::SelfReference { owner });
                    }
                    if !pvp && registry.pvp_refs().contains_key(&opponent) {
                        return Err(CombatError::DualReference { owner, opponent });
                    }

                    let mirrored = self.registries.get(&opponent).and_then(|other| {
                        let refs = if pvp { other.pvp_refs() } else { other.pve_refs() };
                        refs.get(&owner)
                    });
                    let consistent = self.edges.get(*id).map_or(false, |edge| {
                        edge.is_pvp() == pvp && edge.involves(owner) && edge.other(owner) == opponent
                    });
                    if mirrored != Some(id) || !consistent {
                        return Err(CombatError::AsymmetricReference { owner, opponent });
                    }
                }
            }
        }

        for (id, edge) in &self.edges {
            if self.edge_between(edge.first(), edge.second()) != Some(id) {
                return Err(CombatError::AsymmetricReference {
                    owner: edge.first(),
                    opponent: edge.second(),
                });
            }
        }

        Ok(())
    }
}

impl Default for CombatGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FactionId;
    use crate::world::{CombatantSpec, World};

    fn graph() -> CombatGraph {
        CombatGraph::with_config(CombatConfig::default())
    }

    #[test]
    fn test_set_in_combat_creates_shared_edge() {
        let mut world = World::new();
        let mut graph = graph();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));

        assert!(graph.set_in_combat_with(&mut world, a, b, false));

        let id = graph.edge_between(a, b).unwrap();
        assert_eq!(graph.edge_between(b, a), Some(id));
        assert_eq!(graph.edge(id).unwrap().first(), a);
        assert!(!graph.edge(id).unwrap().is_pvp());
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_existing_edge_is_refreshed_not_duplicated() {
        let mut world = World::new();
        let mut graph = graph();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));

        assert!(graph.set_in_combat_with(&mut world, a, b, false));
        assert!(graph.set_in_combat_with(&mut world, b, a, false));

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_pre_suppressed_opponent() {
        let mut world = World::new();
        let mut graph = graph();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));

        assert!(graph.set_in_combat_with(&mut world, a, b, true));

        assert!(graph.is_in_combat(a));
        assert!(!graph.is_in_combat(b));
        assert!(graph.is_in_combat_with(b, a));
        assert_eq!(world.count_events(|e| matches!(e, CombatEvent::EnterCombatState { .. })), 1);
    }

    #[test]
    fn test_end_combat_on_stale_handle_is_noop() {
        let mut world = World::new();
        let mut graph = graph();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));
        graph.set_in_combat_with(&mut world, a, b, false);
        let id = graph.edge_between(a, b).unwrap();

        assert!(graph.end_combat(&mut world, id));
        assert!(!graph.end_combat(&mut world, id));
        assert!(graph.edge(id).is_none());
    }

    #[test]
    fn test_release_empty_registry() {
        let mut graph = graph();
        let a = CombatantId::new();
        graph.register(a);
        assert!(graph.is_registered(a));
        graph.release(a);
        assert!(!graph.is_registered(a));
    }

    #[test]
    fn test_state_updates_do_not_register_unknown_combatants() {
        let mut world = World::new();
        let mut graph = graph();
        let stranger = CombatantId::new();

        graph.suppress_pvp_combat(&mut world, stranger, None);
        assert!(!graph.update_owner_combat_state(&mut world, stranger));
        graph.update_pet_combat_state(&mut world, stranger);
        graph.end_all_combat(&mut world, stranger);

        assert!(!graph.is_registered(stranger));
        assert!(graph.combatants().is_empty());
        assert!(world.events().is_empty());
    }

    #[test]
    #[should_panic(expected = "Leaked combat references")]
    fn test_release_with_live_edges_panics() {
        let mut world = World::new();
        let mut graph = graph();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));
        graph.set_in_combat_with(&mut world, a, b, false);

        graph.release(a);
    }

    #[test]
    fn test_check_invariants_detects_one_sided_reference() {
        let mut graph = graph();
        let a = CombatantId::new();
        let b = CombatantId::new();
        let id = graph.edges.insert(CombatEdge::new(a, b, EdgeKind::Pve));
        graph.registry_mut(a).put_reference(b, id, false);

        assert!(matches!(
            graph.check_invariants(),
            Err(CombatError::AsymmetricReference { .. })
        ));

        graph.registry_mut(b).put_reference(a, id, false);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_refresh_timer_only_for_pvp() {
        let mut world = World::new();
        let mut graph = graph();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));
        graph.set_in_combat_with(&mut world, a, b, false);
        let id = graph.edge_between(a, b).unwrap();

        assert!(!graph.refresh_timer(id));
    }

    #[test]
    fn test_observer_sees_every_event() {
        use std::sync::{Arc, Mutex};

        let mut world = World::new();
        let mut graph = graph();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        graph.add_observer(Box::new(move |event: &CombatEvent| {
            sink.lock().unwrap().push(*event);
        }));

        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));
        graph.set_in_combat_with(&mut world, a, b, false);

        assert_eq!(*seen.lock().unwrap(), world.events().to_vec());
    }
}
