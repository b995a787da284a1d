//! Engine configuration

use crate::undo_stack::DEFAULT_MAX_UNDO_LEVELS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Undo history bound (0 = unlimited)
    pub max_undo_levels: usize,

    /// Seed for generated node and slot IDs
    pub id_seed: String,

    /// Run the document integrity check after every dispatch
    pub freeze_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: DEFAULT_MAX_UNDO_LEVELS,
            id_seed: "blockform".to_string(),
            freeze_check: cfg!(debug_assertions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "maxUndoLevels": 5 }"#).unwrap();
        assert_eq!(config.max_undo_levels, 5);
        assert_eq!(config.id_seed, "blockform");
    }
}
