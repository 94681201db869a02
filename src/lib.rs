//! Combat Graph - who is fighting whom in a simulation shard

pub mod combat;
pub mod core;
pub mod simulation;
pub mod world;
