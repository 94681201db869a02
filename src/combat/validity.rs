//! Combat validity checks
//!
//! Evaluated before an edge is created and again when existing combat is
//! revalidated. A false result is an ordinary outcome, not an error.

use crate::combat::host::CombatantQuery;
use crate::core::types::{CombatantId, UnitState};

/// Can `a` and `b` be in combat with each other right now?
pub fn can_begin_combat<Q: CombatantQuery + ?Sized>(host: &Q, a: CombatantId, b: CombatantId) -> bool {
    if a == b {
        return false;
    }

    if !host.is_in_world(a) || !host.is_in_world(b) {
        return false;
    }

    if !host.is_alive(a) || !host.is_alive(b) {
        return false;
    }

    match (host.map_id(a), host.map_id(b)) {
        (Some(map_a), Some(map_b)) if map_a == map_b => {}
        _ => return false,
    }

    if !host.phase_mask(a).intersects(&host.phase_mask(b)) {
        return false;
    }

    for state in [UnitState::Evading, UnitState::InFlight] {
        if host.has_state(a, state) || host.has_state(b, state) {
            return false;
        }
    }

    if host.is_combat_disallowed(a) || host.is_combat_disallowed(b) {
        return false;
    }

    if host.is_friendly_to(a, b) || host.is_friendly_to(b, a) {
        return false;
    }

    // Game masters (and anything they control) never enter combat
    let privileged = |id: CombatantId| {
        host.controlling_player(id)
            .map_or(false, |player| host.is_game_master(player))
    };
    !privileged(a) && !privileged(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CombatantKind, FactionId, MapId, PhaseMask};
    use crate::world::{CombatantSpec, World};

    fn hostile_pair(world: &mut World) -> (CombatantId, CombatantId) {
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("boar", FactionId(2)));
        (a, b)
    }

    #[test]
    fn test_hostile_pair_can_fight() {
        let mut world = World::new();
        let (a, b) = hostile_pair(&mut world);
        assert!(can_begin_combat(&world, a, b));
        assert!(can_begin_combat(&world, b, a));
    }

    #[test]
    fn test_cannot_fight_self() {
        let mut world = World::new();
        let (a, _) = hostile_pair(&mut world);
        assert!(!can_begin_combat(&world, a, a));
    }

    #[test]
    fn test_friendly_cannot_fight() {
        let mut world = World::new();
        let a = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        let b = world.spawn(CombatantSpec::creature("wolf", FactionId(1)));
        assert!(!can_begin_combat(&world, a, b));
    }

    #[test]
    fn test_dead_or_removed_cannot_fight() {
        let mut world = World::new();
        let (a, b) = hostile_pair(&mut world);

        world.kill(b);
        assert!(!can_begin_combat(&world, a, b));

        let (c, d) = hostile_pair(&mut world);
        world.get_mut(d).unwrap().in_world = false;
        assert!(!can_begin_combat(&world, c, d));
    }

    #[test]
    fn test_map_and_phase_must_match() {
        let mut world = World::new();
        let (a, b) = hostile_pair(&mut world);

        world.get_mut(b).unwrap().map = MapId(2);
        assert!(!can_begin_combat(&world, a, b));

        world.get_mut(b).unwrap().map = MapId(0);
        world.get_mut(b).unwrap().phase = PhaseMask(0b100);
        assert!(!can_begin_combat(&world, a, b));
    }

    #[test]
    fn test_blocking_states() {
        let mut world = World::new();
        let (a, b) = hostile_pair(&mut world);

        world.get_mut(a).unwrap().states.insert(UnitState::Evading);
        assert!(!can_begin_combat(&world, a, b));
        world.get_mut(a).unwrap().states.clear();

        world.get_mut(b).unwrap().states.insert(UnitState::InFlight);
        assert!(!can_begin_combat(&world, a, b));
        world.get_mut(b).unwrap().states.clear();

        world.get_mut(b).unwrap().combat_disallowed = true;
        assert!(!can_begin_combat(&world, a, b));
    }

    #[test]
    fn test_game_master_pet_cannot_fight() {
        let mut world = World::new();
        let gm = world.spawn(CombatantSpec::player("Admin", FactionId(1)));
        world.get_mut(gm).unwrap().game_master = true;
        let pet = world.spawn(CombatantSpec::pet_of(gm, "imp", FactionId(1)));
        let boar = world.spawn(CombatantSpec::creature("boar", FactionId(2)));

        assert_eq!(world.kind(pet), CombatantKind::Creature);
        assert!(!can_begin_combat(&world, gm, boar));
        assert!(!can_begin_combat(&world, boar, pet));
    }
}
