use crate::core::types::CombatantId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Duplicate combat reference: {owner} already holds a {} reference to {opponent}", reference_kind(.pvp))]
    DuplicateReference {
        owner: CombatantId,
        opponent: CombatantId,
        pvp: bool,
    },

    #[error("Leaked combat references: {owner} still holds {pve} PvE and {pvp} PvP references")]
    LeakedReferences {
        owner: CombatantId,
        pve: usize,
        pvp: usize,
    },

    #[error("Asymmetric combat reference: {owner} references {opponent} but not the other way round")]
    AsymmetricReference {
        owner: CombatantId,
        opponent: CombatantId,
    },

    #[error("Combat reference between {owner} and {opponent} is filed as both PvE and PvP")]
    DualReference {
        owner: CombatantId,
        opponent: CombatantId,
    },

    #[error("Combatant {owner} is in combat with itself")]
    SelfReference { owner: CombatantId },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

fn reference_kind(pvp: &bool) -> &'static str {
    if *pvp {
        "PvP"
    } else {
        "PvE"
    }
}

pub type Result<T> = std::result::Result<T, CombatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_reference_names_both_sides() {
        let owner = CombatantId::new();
        let opponent = CombatantId::new();
        let msg = CombatError::DuplicateReference { owner, opponent, pvp: true }.to_string();

        assert!(msg.contains(&owner.to_string()));
        assert!(msg.contains(&opponent.to_string()));
        assert!(msg.contains("PvP"));
    }

    #[test]
    fn test_leaked_references_counts() {
        let owner = CombatantId::new();
        let msg = CombatError::LeakedReferences { owner, pve: 2, pvp: 1 }.to_string();
        assert!(msg.contains("2 PvE"));
        assert!(msg.contains("1 PvP"));
    }
}
