//! Tick system - drives the combat graph once per simulation step
//!
//! Order within a tick:
//! removed/dead combatants leave combat -> PvP decay -> creature leash
//!
//! Every registered combatant is visited in a stable order so runs with the
//! same seed replay identically.

use std::time::Duration;

use crate::combat::graph::CombatGraph;
use crate::combat::host::CombatantQuery;
use crate::core::types::{CombatantKind, Tick};
use crate::world::World;

/// What happened to the graph during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    /// Edges ended because a combatant died or left the world
    pub ended_by_death: usize,
    /// PvP edges that decayed
    pub expired: usize,
    /// PvE edges dropped because the fight spread beyond the leash range
    pub leashed: usize,
    /// Edges alive after the tick
    pub edges: usize,
}

/// Advance combat bookkeeping by `dt`
pub fn run_combat_tick(world: &mut World, graph: &mut CombatGraph, dt: Duration) -> TickReport {
    let mut report = TickReport {
        tick: world.current_tick,
        ..TickReport::default()
    };

    let before = graph.edge_count();
    for id in graph.combatants() {
        if !world.is_in_world(id) {
            graph.remove_combatant(world, id);
        } else if !world.is_alive(id) {
            graph.end_all_combat(world, id);
        }
    }
    report.ended_by_death = before.saturating_sub(graph.edge_count());

    let before = graph.edge_count();
    for id in graph.combatants() {
        graph.update(world, id, dt);
    }
    report.expired = before.saturating_sub(graph.edge_count());

    let leash_range = graph.config().leash_range;
    let before = graph.edge_count();
    for id in graph.combatants() {
        if world.kind(id) == CombatantKind::Creature && !world.is_controlled_by_player(id) {
            graph.end_combat_beyond_range(world, id, leash_range, false);
        }
    }
    report.leashed = before.saturating_sub(graph.edge_count());

    world.tick();
    report.edges = graph.edge_count();

    if report.expired + report.leashed + report.ended_by_death > 0 {
        tracing::debug!(
            "Tick {}: {} ended by death, {} expired, {} leashed, {} remaining",
            report.tick,
            report.ended_by_death,
            report.expired,
            report.leashed,
            report.edges
        );
    }

    report
}
