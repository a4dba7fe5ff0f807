//! Configuration loading.
//!
//! Config lives at `~/.fathom/config.json`. Every key is optional; a missing
//! file means defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::error::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// SQLite file; defaults to `~/.fathom/fathom.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    /// Expected days per stage, layered over the built-in table.
    #[serde(default)]
    pub stage_defaults: HashMap<String, i64>,
}

pub fn config_path() -> Result<PathBuf, EngineError> {
    let home = dirs::home_dir().ok_or(EngineError::Store(DbError::HomeDirNotFound))?;
    Ok(home.join(".fathom").join("config.json"))
}

/// Load config from the default location, falling back to defaults when the
/// file does not exist.
pub fn load_config() -> Result<Config, EngineError> {
    let path = config_path()?;
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    read_config(&path)
}

/// Load config from an explicit path. The file must exist.
pub fn load_config_from(path: &Path) -> Result<Config, EngineError> {
    if !path.exists() {
        return Err(EngineError::ConfigNotFound(path.to_path_buf()));
    }
    read_config(path)
}

fn read_config(path: &Path) -> Result<Config, EngineError> {
    let content = fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("Failed to read config: {}", e)))?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Expand a leading `~/` against the home directory.
fn expand_home(raw: &str) -> Result<PathBuf, EngineError> {
    match raw.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir().ok_or(EngineError::Store(DbError::HomeDirNotFound))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(raw)),
    }
}

impl Config {
    /// Database location: explicit override, then config, then the default.
    pub fn resolve_db_path(&self, override_path: Option<&Path>) -> Result<PathBuf, EngineError> {
        if let Some(path) = override_path {
            return Ok(path.to_path_buf());
        }
        match self.database_path.as_deref() {
            Some(raw) if !raw.trim().is_empty() => expand_home(raw.trim()),
            _ => Ok(crate::db::default_db_path()?),
        }
    }
}
