//! Skirmish - headless combat graph runner
//!
//! Spawns two player factions, their pets and a pack of hostile creatures,
//! then throws random aggression, vanishes and deaths at the combat graph
//! for a number of ticks. The graph's invariants are audited after every
//! tick and a summary is printed at the end.

use std::time::Duration;

use clap::Parser;
use combat_graph::combat::{CombatEvent, CombatGraph};
use combat_graph::core::config::{config, set_config, CombatConfig};
use combat_graph::core::error::Result;
use combat_graph::core::types::{CombatantId, FactionId};
use combat_graph::simulation::run_combat_tick;
use combat_graph::world::{CombatantSpec, World};
use glam::Vec3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Skirmish - random combat against the combat reference graph
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Drive the combat graph with a random skirmish and report what happened")]
struct Args {
    /// Players per faction (two factions)
    #[arg(long, default_value_t = 4)]
    players: usize,

    /// Hostile creatures
    #[arg(long, default_value_t = 12)]
    creatures: usize,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Simulated milliseconds per tick
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Aggression attempts per tick
    #[arg(long, default_value_t = 3)]
    attacks_per_tick: usize,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Combat config file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

/// Summary of a skirmish run
#[derive(Debug, Default, Serialize)]
struct SkirmishSummary {
    seed: u64,
    ticks: u64,
    aggression_attempts: u64,
    aggression_accepted: u64,
    vanishes: u64,
    deaths: u64,
    enter_combat: u64,
    exit_combat: u64,
    pvp_expired: u64,
    leashed: u64,
    ended_by_death: u64,
    edges_remaining: usize,
    in_combat_remaining: usize,
}

/// Chance per tick that a random player vanishes
const VANISH_CHANCE: f64 = 0.01;
/// Chance per tick that a random combatant dies
const DEATH_CHANCE: f64 = 0.005;
/// Half-width of the square arena
const ARENA_HALF_SIZE: f32 = 40.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("combat_graph=info,skirmish=info")),
        )
        .init();

    let args = Args::parse();

    if let Some(path) = &args.config {
        let loaded = CombatConfig::load(path)?;
        if set_config(loaded).is_err() {
            tracing::warn!("Combat config already initialised; ignoring {}", path);
        }
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!("Starting skirmish (seed {})", seed);

    let mut world = World::new();
    let mut graph = CombatGraph::with_config(config().clone());
    let (players, everyone) = spawn_combatants(&mut world, &args, &mut rng);
    for id in &everyone {
        graph.register(*id);
    }

    let dt = Duration::from_millis(args.tick_ms);
    let mut summary = SkirmishSummary {
        seed,
        ticks: args.ticks,
        ..SkirmishSummary::default()
    };

    for _ in 0..args.ticks {
        for _ in 0..args.attacks_per_tick {
            let (Some(&attacker), Some(&victim)) = (everyone.choose(&mut rng), everyone.choose(&mut rng))
            else {
                break;
            };
            summary.aggression_attempts += 1;
            if graph.set_in_combat_with(&mut world, attacker, victim, false) {
                summary.aggression_accepted += 1;
                world.add_threat(victim, attacker, rng.gen_range(1.0..10.0));
            }
        }

        if rng.gen_bool(VANISH_CHANCE) {
            if let Some(&rogue) = players.choose(&mut rng) {
                summary.vanishes += 1;
                tracing::debug!("{} vanishes", world.name(rogue));
                graph.combat_stop(&mut world, rogue, false);
            }
        }

        if rng.gen_bool(DEATH_CHANCE) {
            if let Some(&victim) = everyone.choose(&mut rng) {
                if world.get(victim).map_or(false, |c| c.alive) {
                    summary.deaths += 1;
                    tracing::info!("{} dies", world.name(victim));
                    world.kill(victim);
                }
            }
        }

        for id in &everyone {
            let step = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0);
            if let Some(combatant) = world.get_mut(*id) {
                combatant.position = (combatant.position + step).clamp(
                    Vec3::new(-ARENA_HALF_SIZE, -ARENA_HALF_SIZE, 0.0),
                    Vec3::new(ARENA_HALF_SIZE, ARENA_HALF_SIZE, 0.0),
                );
            }
        }

        let report = run_combat_tick(&mut world, &mut graph, dt);
        summary.pvp_expired += report.expired as u64;
        summary.leashed += report.leashed as u64;
        summary.ended_by_death += report.ended_by_death as u64;

        summary.enter_combat +=
            world.count_events(|e| matches!(e, CombatEvent::EnterCombatState { .. })) as u64;
        summary.exit_combat +=
            world.count_events(|e| matches!(e, CombatEvent::ExitCombatState { .. })) as u64;
        world.clear_events();

        graph.check_invariants()?;
    }

    summary.edges_remaining = graph.edge_count();
    summary.in_combat_remaining = everyone.iter().filter(|id| graph.is_in_combat(**id)).count();

    // Everyone leaves; registries must come back empty
    for id in &everyone {
        world.despawn(*id);
        graph.remove_combatant(&mut world, *id);
    }

    match args.format.as_str() {
        "json" => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize summary: {}", e),
        },
        _ => print_summary(&summary),
    }

    Ok(())
}

/// Returns (players, everyone)
fn spawn_combatants(
    world: &mut World,
    args: &Args,
    rng: &mut ChaCha8Rng,
) -> (Vec<CombatantId>, Vec<CombatantId>) {
    let mut players = Vec::new();
    let mut everyone = Vec::new();

    for faction in [FactionId(1), FactionId(2)] {
        for i in 0..args.players {
            let name = format!("player-{}-{}", faction.0, i);
            let player = world.spawn(CombatantSpec::player(&name, faction).at(random_position(rng)));
            players.push(player);
            everyone.push(player);

            // Every other player brings a pet that joins their fights
            if i % 2 == 0 {
                let pet_name = format!("{}-pet", name);
                let pet = world.spawn(CombatantSpec::pet_of(player, &pet_name, faction).at(random_position(rng)));
                if let Some(combatant) = world.get_mut(pet) {
                    combatant.assist_controller = true;
                }
                everyone.push(pet);
            }
        }
    }

    for i in 0..args.creatures {
        let name = format!("creature-{}", i);
        everyone.push(world.spawn(CombatantSpec::creature(&name, FactionId(3)).at(random_position(rng))));
    }

    (players, everyone)
}

fn random_position(rng: &mut ChaCha8Rng) -> Vec3 {
    Vec3::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0), 0.0)
}

fn print_summary(summary: &SkirmishSummary) {
    println!("\n=== SKIRMISH SUMMARY ===");
    println!("Seed: {}", summary.seed);
    println!("Ticks: {}", summary.ticks);
    println!(
        "Aggression: {} attempts, {} accepted",
        summary.aggression_attempts, summary.aggression_accepted
    );
    println!("Vanishes: {}  Deaths: {}", summary.vanishes, summary.deaths);
    println!(
        "Combat transitions: {} entered, {} exited",
        summary.enter_combat, summary.exit_combat
    );
    println!(
        "Edges ended: {} PvP expired, {} leashed, {} by death",
        summary.pvp_expired, summary.leashed, summary.ended_by_death
    );
    println!(
        "At end: {} edges, {} combatants in combat",
        summary.edges_remaining, summary.in_combat_remaining
    );
}
