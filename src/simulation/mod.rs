pub mod tick;

pub use tick::{run_combat_tick, TickReport};
