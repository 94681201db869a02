//! Combat graph constants - all tunable defaults in one place

// Decay
pub const PVP_COMBAT_TIMEOUT_MS: u64 = 5_000;

// Range
pub const DEFAULT_LEASH_RANGE: f32 = 60.0;
