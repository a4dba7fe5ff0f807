//! Error types for the command-line surface.
//!
//! Report accessors never fail (they degrade to empty reports), so these
//! errors only come from the steps around them: loading configuration,
//! opening the store and importing snapshots.

use std::path::PathBuf;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Failed to parse snapshot: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl EngineError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            EngineError::Store(DbError::Connection(_)) => true,
            EngineError::Io(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "Check your configuration in ~/.fathom/config.json",
            EngineError::ConfigNotFound(_) => "Check the path passed to --config.",
            EngineError::Store(DbError::Migration(_)) => {
                "The database was written by a newer Fathom. Upgrade, or point --db at another file."
            }
            EngineError::Store(DbError::HomeDirNotFound) => {
                "Set HOME, or pass --db with an explicit database path."
            }
            EngineError::Store(_) => "Check the database file is readable and not in use.",
            EngineError::Import(_) => "Check the snapshot is valid JSON with camelCase keys.",
            EngineError::Io(_) => "Check file permissions and disk space.",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}
