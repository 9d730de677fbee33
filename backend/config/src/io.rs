//! Config file discovery and loading.

use crate::schema::AltForgeConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Explicit config path override.
pub const CONFIG_PATH_VAR: &str = "ALTFORGE_CONFIG";

/// Candidates in the working directory, in priority order.
const LOCAL_CONFIG_FILES: [&str; 3] = ["altforge.yaml", "altforge.yml", "simple_config.json"];

/// Resolve the per-user config directory (`~/.altforge`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".altforge"))
        .unwrap_or_else(|| PathBuf::from(".altforge"))
}

/// Resolve which config file to load.
/// Priority: `ALTFORGE_CONFIG` > working-directory files > `~/.altforge/config.yaml`.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    LOCAL_CONFIG_FILES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .unwrap_or_else(|| config_dir().join("config.yaml"))
}

/// Parse config text. JSON is accepted since it is a subset of YAML.
pub fn parse_config(raw: &str) -> Result<AltForgeConfig> {
    if raw.trim().is_empty() {
        return Ok(AltForgeConfig::default());
    }
    serde_yaml::from_str(raw).context("Failed to parse config")
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<AltForgeConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(AltForgeConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw).with_context(|| format!("Invalid config at: {}", path.display()))?;

    info!(path = %path.display(), sheets = config.sheets.len(), "Loaded config");
    Ok(config)
}
