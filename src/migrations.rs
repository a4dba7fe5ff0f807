//! Schema versioning.
//!
//! SQL files under `migrations/` are compiled in and applied in order. The
//! `schema_version` table records every version applied, so opening a store
//! twice is a no-op, and a store written by a newer build is refused rather
//! than read with the wrong schema.

use rusqlite::{Connection, OptionalExtension};

/// (version, SQL), ascending.
const MIGRATIONS: &[(i32, &str)] = &[(1, include_str!("migrations/001_baseline.sql"))];

fn latest_known() -> i32 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}

fn applied_version(conn: &Connection) -> Result<i32, String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Failed to create schema_version table: {}", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()
        .map_err(|e| format!("Failed to read schema version: {}", e))?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Bring the store up to the newest schema this build knows.
///
/// Each migration and its version stamp commit together. Returns how many
/// migrations ran.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    let current = applied_version(conn)?;
    let latest = latest_known();
    if current > latest {
        return Err(format!(
            "Store schema version ({}) is newer than this version of Fathom supports ({}). \
             Please update Fathom.",
            current, latest
        ));
    }

    let mut applied = 0;
    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| format!("Migration v{} could not start: {}", version, e))?;
        tx.execute_batch(sql)
            .map_err(|e| format!("Migration v{} failed: {}", version, e))?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
            .map_err(|e| format!("Failed to record migration v{}: {}", version, e))?;
        tx.commit()
            .map_err(|e| format!("Migration v{} could not commit: {}", version, e))?;
        log::info!("Applied schema migration v{}", version);
        applied += 1;
    }
    Ok(applied)
}
