//! Property tests: random operation sequences never break the graph
//!
//! After every operation the reference structure must be symmetric, every
//! recorded flag must match the derived state, and combat state
//! notifications must strictly alternate per combatant. Removing everyone
//! at the end must leave no edge behind.

use std::time::Duration;

use combat_graph::combat::{CombatEvent, CombatGraph};
use combat_graph::core::config::CombatConfig;
use combat_graph::core::types::{CombatantId, FactionId, MapId};
use combat_graph::world::{CombatantSpec, World};
use glam::Vec3;
use proptest::prelude::*;

const POPULATION: usize = 8;

#[derive(Debug, Clone)]
enum Op {
    Engage { a: usize, b: usize, suppress: bool },
    Update { who: usize, ms: u64 },
    SuppressPvp { who: usize },
    SuppressFor { a: usize, b: usize },
    RefreshBetween { a: usize, b: usize },
    EndPve { who: usize },
    EndPvp { who: usize },
    Stop { who: usize, mutual: bool },
    StopWithPets { who: usize, mutual: bool },
    Revalidate { who: usize },
    Inherit { who: usize, donor: usize },
    Leash { who: usize, range: f32, pvp: bool },
    Kill { who: usize },
    Move { who: usize, x: f32 },
    Teleport { who: usize, map: u32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 0..POPULATION;
    prop_oneof![
        4 => (0..POPULATION, 0..POPULATION, any::<bool>())
            .prop_map(|(a, b, suppress)| Op::Engage { a, b, suppress }),
        2 => (who.clone(), 0u64..3_000).prop_map(|(who, ms)| Op::Update { who, ms }),
        1 => who.clone().prop_map(|who| Op::SuppressPvp { who }),
        1 => (0..POPULATION, 0..POPULATION).prop_map(|(a, b)| Op::SuppressFor { a, b }),
        1 => (0..POPULATION, 0..POPULATION).prop_map(|(a, b)| Op::RefreshBetween { a, b }),
        1 => who.clone().prop_map(|who| Op::EndPve { who }),
        1 => who.clone().prop_map(|who| Op::EndPvp { who }),
        1 => (who.clone(), any::<bool>()).prop_map(|(who, mutual)| Op::Stop { who, mutual }),
        1 => (who.clone(), any::<bool>()).prop_map(|(who, mutual)| Op::StopWithPets { who, mutual }),
        1 => who.clone().prop_map(|who| Op::Revalidate { who }),
        1 => (0..POPULATION, 0..POPULATION).prop_map(|(who, donor)| Op::Inherit { who, donor }),
        1 => (who.clone(), 0.0f32..80.0, any::<bool>())
            .prop_map(|(who, range, pvp)| Op::Leash { who, range, pvp }),
        1 => who.clone().prop_map(|who| Op::Kill { who }),
        1 => (who.clone(), -100.0f32..100.0).prop_map(|(who, x)| Op::Move { who, x }),
        1 => (who, 0u32..2).prop_map(|(who, map)| Op::Teleport { who, map }),
    ]
}

/// Three players (one with an assisting pet, one with a passive pet) and
/// three creatures from two hostile factions
fn populate(world: &mut World) -> Vec<CombatantId> {
    let p1 = world.spawn(CombatantSpec::player("p1", FactionId(1)));
    let p2 = world.spawn(CombatantSpec::player("p2", FactionId(1)));
    let p3 = world.spawn(CombatantSpec::player("p3", FactionId(2)));
    let wolf = world.spawn(CombatantSpec::pet_of(p1, "wolf", FactionId(1)));
    if let Some(pet) = world.get_mut(wolf) {
        pet.assist_controller = true;
    }
    let imp = world.spawn(CombatantSpec::pet_of(p3, "imp", FactionId(2)));
    let boar = world.spawn(CombatantSpec::creature("boar", FactionId(3)));
    let bear = world.spawn(CombatantSpec::creature("bear", FactionId(3)));
    let ogre = world.spawn(CombatantSpec::creature("ogre", FactionId(4)));
    vec![p1, p2, p3, wolf, imp, boar, bear, ogre]
}

fn apply(world: &mut World, graph: &mut CombatGraph, ids: &[CombatantId], op: &Op) {
    match *op {
        Op::Engage { a, b, suppress } => {
            graph.set_in_combat_with(world, ids[a], ids[b], suppress);
        }
        Op::Update { who, ms } => graph.update(world, ids[who], Duration::from_millis(ms)),
        Op::SuppressPvp { who } => graph.suppress_pvp_combat(world, ids[who], None),
        Op::SuppressFor { a, b } => {
            if let Some(id) = graph.edge_between(ids[a], ids[b]) {
                graph.suppress_for(world, id, ids[a]);
            }
        }
        Op::RefreshBetween { a, b } => {
            if let Some(id) = graph.edge_between(ids[a], ids[b]) {
                graph.refresh(world, id);
            }
        }
        Op::EndPve { who } => graph.end_all_pve_combat(world, ids[who], None),
        Op::EndPvp { who } => graph.end_all_pvp_combat(world, ids[who], None),
        Op::Stop { who, mutual } => graph.combat_stop(world, ids[who], mutual),
        Op::StopWithPets { who, mutual } => graph.combat_stop_with_pets(world, ids[who], mutual),
        Op::Revalidate { who } => graph.revalidate_combat(world, ids[who]),
        Op::Inherit { who, donor } => {
            graph.inherit_combat_states_from(world, ids[who], ids[donor], None);
        }
        Op::Leash { who, range, pvp } => graph.end_combat_beyond_range(world, ids[who], range, pvp),
        Op::Kill { who } => world.kill(ids[who]),
        Op::Move { who, x } => world.move_to(ids[who], Vec3::new(x, 0.0, 0.0)),
        Op::Teleport { who, map } => world.teleport(ids[who], MapId(map), Vec3::ZERO),
    }
}

fn assert_consistent(world: &World, graph: &CombatGraph, ids: &[CombatantId]) -> Result<(), TestCaseError> {
    prop_assert!(graph.check_invariants().is_ok(), "{:?}", graph.check_invariants());

    for &id in ids {
        prop_assert_eq!(graph.is_in_combat(id), graph.has_combat(id));

        let pets_fighting = world
            .ids()
            .into_iter()
            .filter(|unit| world.get(*unit).and_then(|c| c.controller()) == Some(id))
            .any(|unit| graph.is_in_combat(unit));
        prop_assert_eq!(graph.is_pet_in_combat(id), pets_fighting);

        // Enter and exit notifications strictly alternate, starting with enter
        let mut inside = false;
        for event in world.events_for(id) {
            match event {
                CombatEvent::EnterCombatState { .. } => {
                    prop_assert!(!inside);
                    inside = true;
                }
                CombatEvent::ExitCombatState { .. } => {
                    prop_assert!(inside);
                    inside = false;
                }
                _ => {}
            }
        }
        prop_assert_eq!(inside, graph.is_in_combat(id));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn random_operations_preserve_invariants(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut world = World::new();
        let mut graph = CombatGraph::with_config(CombatConfig::default());
        let ids = populate(&mut world);
        for &id in &ids {
            graph.register(id);
        }

        for op in &ops {
            apply(&mut world, &mut graph, &ids, op);
            assert_consistent(&world, &graph, &ids)?;
        }

        for &id in &ids {
            world.despawn(id);
            graph.remove_combatant(&mut world, id);
        }
        prop_assert_eq!(graph.edge_count(), 0);
        prop_assert!(graph.combatants().is_empty());
        for &id in &ids {
            prop_assert!(!graph.is_in_combat(id));
        }
    }

    #[test]
    fn pvp_edges_expire_after_accumulated_timeout(steps in prop::collection::vec(1u64..2_000, 1..20)) {
        let mut world = World::new();
        let mut graph = CombatGraph::with_config(CombatConfig::default());
        let a = world.spawn(CombatantSpec::player("a", FactionId(1)));
        let b = world.spawn(CombatantSpec::player("b", FactionId(2)));
        graph.set_in_combat_with(&mut world, a, b, false);
        let timeout = graph.config().pvp_combat_timeout();

        let mut elapsed = Duration::ZERO;
        for ms in steps {
            let dt = Duration::from_millis(ms);
            graph.update(&mut world, a, dt);
            elapsed += dt;
            prop_assert_eq!(graph.is_in_combat_with(a, b), elapsed < timeout);
            if elapsed >= timeout {
                break;
            }
        }
    }
}
