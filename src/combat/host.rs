//! Collaborator interfaces the combat graph consumes
//!
//! The graph never owns combatants. Everything it needs to know about them
//! (liveness, placement, allegiance, control) and everything it needs to
//! tell them (threat cleanup, lifecycle hooks) goes through these traits.

use crate::combat::events::CombatEvent;
use crate::combat::graph::CombatGraph;
use crate::core::types::{CombatantId, CombatantKind, MapId, PhaseMask, UnitState};

/// Predicate over an opponent, used to scope bulk operations
pub type OpponentFilter<'a, H> = &'a dyn Fn(&H, CombatantId) -> bool;

/// Read-only view of combatant state
pub trait CombatantQuery {
    fn is_in_world(&self, id: CombatantId) -> bool;
    fn is_alive(&self, id: CombatantId) -> bool;
    fn map_id(&self, id: CombatantId) -> Option<MapId>;
    fn phase_mask(&self, id: CombatantId) -> PhaseMask;
    fn has_state(&self, id: CombatantId, state: UnitState) -> bool;
    fn is_combat_disallowed(&self, id: CombatantId) -> bool;
    fn is_friendly_to(&self, id: CombatantId, other: CombatantId) -> bool;
    fn kind(&self, id: CombatantId) -> CombatantKind;
    fn is_controlled_by_player(&self, id: CombatantId) -> bool;

    /// The player at the end of the charm/ownership chain, or the
    /// combatant itself when it is a player
    fn controlling_player(&self, id: CombatantId) -> Option<CombatantId>;
    fn is_game_master(&self, id: CombatantId) -> bool;

    fn is_within_distance(&self, id: CombatantId, other: CombatantId, range: f32) -> bool;
    fn is_immune_to_pc(&self, id: CombatantId) -> bool;
    fn is_immune_to_npc(&self, id: CombatantId) -> bool;

    /// Charmer if charmed, otherwise owner
    fn charmer_or_owner(&self, id: CombatantId) -> Option<CombatantId>;

    /// Units (pets, guardians, charmed units) this combatant controls
    fn controlled_units(&self, id: CombatantId) -> Vec<CombatantId>;
}

/// Threat bookkeeping that must stay consistent with combat
pub trait ThreatCollaborator: Sized {
    /// Drop `victim` from `owner`'s threat list
    fn clear_threat(&mut self, owner: CombatantId, victim: CombatantId);

    /// Empty `owner`'s threat list
    fn clear_all_threat(&mut self, owner: CombatantId);

    /// Remove `owner` from the threat lists of every matching combatant
    fn remove_from_all_threat_lists(
        &mut self,
        owner: CombatantId,
        filter: Option<OpponentFilter<'_, Self>>,
    );
}

/// Lifecycle hooks invoked after an operation has settled the graph
///
/// Every hook receives the graph mutably and may start or end combat
/// again; the operation that produced the notification has already
/// finished all structural and flag changes.
pub trait CombatHooks: Sized {
    fn on_enter_combat_state(&mut self, _graph: &mut CombatGraph, _who: CombatantId) {}

    fn on_engage(&mut self, _graph: &mut CombatGraph, _who: CombatantId, _target: Option<CombatantId>) {}

    fn on_exit_combat_state(&mut self, _graph: &mut CombatGraph, _who: CombatantId) {}

    fn on_disengage(&mut self, _graph: &mut CombatGraph, _who: CombatantId) {}

    fn on_pet_controller_combat_state_changed(
        &mut self,
        _graph: &mut CombatGraph,
        _controller: CombatantId,
        _pets_in_combat: bool,
    ) {
    }

    fn just_entered_combat(&mut self, _graph: &mut CombatGraph, _who: CombatantId, _opponent: CombatantId) {}

    fn just_exited_combat(&mut self, _graph: &mut CombatGraph, _who: CombatantId) {}

    /// Route one event to the matching hook
    fn dispatch(&mut self, graph: &mut CombatGraph, event: &CombatEvent) {
        match *event {
            CombatEvent::EnterCombatState { who } => self.on_enter_combat_state(graph, who),
            CombatEvent::Engage { who, target } => self.on_engage(graph, who, target),
            CombatEvent::ExitCombatState { who } => self.on_exit_combat_state(graph, who),
            CombatEvent::Disengage { who } => self.on_disengage(graph, who),
            CombatEvent::PetControllerCombatStateChanged {
                controller,
                pets_in_combat,
            } => self.on_pet_controller_combat_state_changed(graph, controller, pets_in_combat),
            CombatEvent::JustEnteredCombat { who, opponent } => {
                self.just_entered_combat(graph, who, opponent)
            }
            CombatEvent::JustExitedCombat { who } => self.just_exited_combat(graph, who),
        }
    }
}

/// Everything the graph needs from its host
pub trait CombatHost: CombatantQuery + ThreatCollaborator + CombatHooks {}

impl<T: CombatantQuery + ThreatCollaborator + CombatHooks> CombatHost for T {}
