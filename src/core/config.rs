//! Combat configuration with documented constants
//!
//! Tunables that shape how long combat lingers. Values are loaded from TOML
//! or fall back to the defaults in `combat::constants`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::combat::constants::{DEFAULT_LEASH_RANGE, PVP_COMBAT_TIMEOUT_MS};
use crate::core::error::{CombatError, Result};

/// Configuration for the combat reference graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// How long a PvP engagement survives without renewed aggression (ms)
    ///
    /// Every `set_in_combat_with` between two player-controlled combatants
    /// resets the countdown to this value. Only the canonical first side
    /// decrements it, so the effective timeout is independent of how many
    /// registries hold the edge.
    pub pvp_combat_timeout_ms: u64,

    /// Distance beyond which PvE combat is dropped by the simulation tick
    ///
    /// This affects:
    /// - Kiting: a target that outruns its pursuers leaves combat
    /// - Pets left behind by their master
    pub leash_range: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            pvp_combat_timeout_ms: PVP_COMBAT_TIMEOUT_MS,
            leash_range: DEFAULT_LEASH_RANGE,
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pvp_combat_timeout(&self) -> Duration {
        Duration::from_millis(self.pvp_combat_timeout_ms)
    }

    /// Parse and validate a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.pvp_combat_timeout_ms == 0 {
            return Err(CombatError::InvalidConfig(
                "pvp_combat_timeout_ms must be positive".into(),
            ));
        }

        if !(self.leash_range > 0.0) {
            return Err(CombatError::InvalidConfig(format!(
                "leash_range ({}) must be positive",
                self.leash_range
            )));
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<CombatConfig> = OnceLock::new();

/// Get the global combat config (initializes with defaults if not set)
pub fn config() -> &'static CombatConfig {
    CONFIG.get_or_init(CombatConfig::default)
}

/// Set the global combat config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: CombatConfig) -> std::result::Result<(), CombatConfig> {
    CONFIG.set(config)
}
