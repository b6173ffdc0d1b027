//! Configuration management for cfgsync
//!
//! Typed settings live here; [`core`] merges them from the embedded
//! defaults, user and repo-local files and `CFGSYNC_` environment variables.

pub mod core;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use self::core::ConfigLoader;

/// Directory name used under the platform config dir
pub const APP_DIR: &str = "cfgsync";

/// Main configuration structure for cfgsync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    pub general: GeneralSettings,

    /// Where the settings repository lives and how its remote is named
    pub repository: RepositorySettings,

    /// Commit cycle behavior
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralSettings {
    /// Same as passing `-vv`
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Repository root; defaults to `<config dir>/cfgsync/repository`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    pub remote_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Paths starting with this prefix are left out of the auto-stage sweep
    pub reserved_prefix: String,

    /// Run a sync when `watch` starts
    pub update_on_start: bool,

    /// Sweep the project-scoped subtree too, ignoring `reserved_prefix`
    pub share_project_workspace: bool,

    /// Seconds between automatic commits, 0 disables them
    pub auto_commit_interval_secs: u64,

    pub commit_message: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            path: None,
            remote_name: crate::git::DEFAULT_REMOTE_NAME.to_string(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            reserved_prefix: "projects/".to_string(),
            update_on_start: true,
            share_project_workspace: false,
            auto_commit_interval_secs: 300,
            commit_message: String::new(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a single file, format picked by extension
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match extension(path) {
            "json" => serde_json::from_str(&content).map_err(anyhow::Error::from),
            "toml" => toml::from_str(&content).map_err(anyhow::Error::from),
            other => bail!("Unsupported config format '{other}': {}", path.display()),
        }
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration as TOML, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Repository root, falling back to the platform config dir
    pub fn repository_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.repository.path {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join("repository"))
            .context("Could not determine the configuration directory")
    }

    /// `None` when periodic commits are disabled
    pub fn auto_commit_interval(&self) -> Option<Duration> {
        match self.sync.auto_commit_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// User config file written by `config set-*` commands
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.repository.remote_name.trim().is_empty() {
            bail!("repository.remote_name cannot be empty");
        }

        let prefix = &self.sync.reserved_prefix;
        if !prefix.is_empty() {
            if prefix.starts_with('/') || Path::new(prefix).is_absolute() {
                bail!("sync.reserved_prefix must be repository-relative, got '{prefix}'");
            }
            if !prefix.ends_with('/') {
                bail!("sync.reserved_prefix must end with '/', got '{prefix}'");
            }
        }

        Ok(())
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.repository.remote_name, "origin");
        assert_eq!(config.sync.reserved_prefix, "projects/");
        assert!(config.sync.update_on_start);
        assert!(!config.sync.share_project_workspace);
        assert_eq!(config.auto_commit_interval(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_disables_periodic_commits() {
        let mut config = SyncConfig::default();
        config.sync.auto_commit_interval_secs = 0;
        assert_eq!(config.auto_commit_interval(), None);
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let mut config = SyncConfig::default();
        config.sync.reserved_prefix = "/projects/".to_string();
        assert!(config.validate().is_err());

        config.sync.reserved_prefix = "projects".to_string();
        assert!(config.validate().is_err());

        config.sync.reserved_prefix = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_remote_name() {
        let mut config = SyncConfig::default();
        config.repository.remote_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_toml() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("nested/config.toml");

        let mut config = SyncConfig::default();
        config.sync.update_on_start = false;
        config.repository.path = Some(PathBuf::from("/srv/settings"));
        config.save_to_file(&path).unwrap();

        let loaded = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("config.json");
        std::fs::write(&path, r#"{"sync": {"reserved_prefix": "local/"}}"#).unwrap();

        let loaded = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.sync.reserved_prefix, "local/");
        assert!(loaded.sync.update_on_start);
        assert_eq!(loaded.repository.remote_name, "origin");
    }

    #[test]
    fn test_explicit_repository_path_wins() {
        let mut config = SyncConfig::default();
        config.repository.path = Some(PathBuf::from("/tmp/cfg"));
        assert_eq!(config.repository_path().unwrap(), PathBuf::from("/tmp/cfg"));
    }
}
