use super::{APP_DIR, SyncConfig};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};
use std::path::{Path, PathBuf};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "CFGSYNC_";
const REPO_CONFIG_STEM: &str = "cfgsync";
const FORMATS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Merges configuration sources, lowest priority first:
/// embedded defaults, user config, repo-local config, `--config` file,
/// `CFGSYNC_` environment variables (`__` separates nested keys).
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    pub fn load_with_custom_config(custom_config: Option<&Path>) -> Self {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(dir) = dirs::config_dir() {
            figment = merge_stem(figment, &dir.join(APP_DIR).join("config"));
        }
        figment = merge_stem(figment, Path::new(REPO_CONFIG_STEM));

        if let Some(custom_path) = custom_config {
            tracing::debug!(path = %custom_path.display(), "loading custom config");
            figment = merge_file(figment, custom_path);
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self { figment }
    }

    /// Extract and validate the typed configuration
    pub fn extract(&self) -> Result<SyncConfig> {
        let config: SyncConfig = self
            .figment
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }
}

fn merge_stem(figment: Figment, stem: &Path) -> Figment {
    FORMATS.iter().fold(figment, |figment, ext| {
        merge_file(figment, &with_extension(stem, ext))
    })
}

/// Missing files are skipped by figment; the format follows the extension
fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => figment.merge(Json::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}
