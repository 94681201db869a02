//! Combat reference graph
//!
//! Tracks which combatants are fighting which, separates PvE from PvP
//! engagements, decays PvP engagements, supports one-sided suppression and
//! derives each combatant's aggregate "in combat" flag.

pub mod constants;
pub mod edge;
pub mod events;
pub mod graph;
pub mod host;
pub mod registry;
pub mod validity;

pub use edge::{CombatEdge, DecayTimer, EdgeId, EdgeKind};
pub use events::{CombatEvent, CombatObserver};
pub use graph::CombatGraph;
pub use host::{CombatHooks, CombatHost, CombatantQuery, OpponentFilter, ThreatCollaborator};
pub use registry::CombatRegistry;
pub use validity::can_begin_combat;
