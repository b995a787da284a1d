use anyhow::Context;
use blockform_editor::{EngineConfig, DEFAULT_MAX_UNDO_LEVELS};
use blockform_model::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "blockform.config.json";

/// Blockform configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding template documents
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,

    /// Theme JSON applied when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_theme: Option<String>,

    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,
}

fn default_documents_dir() -> String {
    "templates".to_string()
}

fn default_max_undo_levels() -> usize {
    DEFAULT_MAX_UNDO_LEVELS
}

impl Config {
    /// Load config from a directory, falling back to defaults
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to documents directory
    pub fn get_documents_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.documents_dir)
    }

    /// The configured theme, or the builtin one
    pub fn load_theme(&self, cwd: &str) -> anyhow::Result<Theme> {
        let Some(path) = &self.default_theme else {
            return Ok(Theme::default());
        };

        let path = Path::new(cwd).join(path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading theme {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing theme {}", path.display()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_undo_levels: self.max_undo_levels,
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            default_theme: None,
            max_undo_levels: default_max_undo_levels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "documentsDir": "invoices",
            "defaultTheme": "themes/brand.json",
            "maxUndoLevels": 20
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.documents_dir, "invoices");
        assert_eq!(config.default_theme.as_deref(), Some("themes/brand.json"));
        assert_eq!(config.max_undo_levels, 20);
        assert_eq!(config.engine_config().max_undo_levels, 20);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.documents_dir, "templates");
        assert_eq!(config.default_theme, None);
        assert_eq!(config.max_undo_levels, 100);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_without_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();

        let config = Config::load(&cwd).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.load_theme(&cwd).unwrap(), Theme::default());
    }

    #[test]
    fn test_load_reads_file_and_theme() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "defaultTheme": "brand.json" }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("brand.json"), r#"{ "id": "brand", "name": "Brand" }"#).unwrap();

        let config = Config::load(&cwd).unwrap();
        let theme = config.load_theme(&cwd).unwrap();
        assert_eq!(theme.id, "brand");
        assert!(theme.document_styles.is_empty());
    }
}
