use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "pagecraft.config.json";

/// Pagecraft workspace configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Page name; seeds node ids
    #[serde(default = "default_document_name")]
    pub document_name: String,

    /// Undo depth (0 = unlimited)
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Pending requests before callers wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Autosave period; 0 disables autosave
    #[serde(default = "default_autosave_interval_ms")]
    pub autosave_interval_ms: u64,

    /// Records file, relative to the workspace root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
}

fn default_document_name() -> String {
    "home".to_string()
}

fn default_history_depth() -> usize {
    100
}

fn default_queue_capacity() -> usize {
    64
}

fn default_autosave_interval_ms() -> u64 {
    5000
}

impl WorkspaceConfig {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: WorkspaceConfig = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(WorkspaceConfig::default())
        }
    }

    /// Write config into a directory
    pub fn write(&self, cwd: &Path) -> anyhow::Result<PathBuf> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);
        std::fs::write(&config_path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", config_path.display()))?;
        Ok(config_path)
    }

    pub fn autosave_interval(&self) -> Option<Duration> {
        if self.autosave_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.autosave_interval_ms))
        }
    }

    /// Absolute path to the records file, if any
    pub fn save_path_in(&self, cwd: &Path) -> Option<PathBuf> {
        self.save_path.as_ref().map(|path| cwd.join(path))
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            document_name: default_document_name(),
            history_depth: default_history_depth(),
            queue_capacity: default_queue_capacity(),
            autosave_interval_ms: default_autosave_interval_ms(),
            save_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "documentName": "landing",
            "historyDepth": 20,
            "autosaveIntervalMs": 0,
            "savePath": "pages/landing.json"
        }"#;

        let config: WorkspaceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.document_name, "landing");
        assert_eq!(config.history_depth, 20);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.autosave_interval(), None);
        assert_eq!(
            config.save_path_in(Path::new("/site")),
            Some(PathBuf::from("/site/pages/landing.json"))
        );
    }

    #[test]
    fn test_default_config() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.document_name, "home");
        assert_eq!(config.history_depth, 100);
        assert_eq!(config.autosave_interval(), Some(Duration::from_millis(5000)));
        assert!(config.save_path.is_none());
    }

    #[test]
    fn test_load_missing_and_written() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(WorkspaceConfig::load(dir.path()).unwrap(), WorkspaceConfig::default());

        let config = WorkspaceConfig {
            document_name: "shop".to_string(),
            ..Default::default()
        };
        config.write(dir.path()).unwrap();
        assert_eq!(WorkspaceConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();

        let err = WorkspaceConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
