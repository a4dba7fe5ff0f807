//! SQLite-backed event store for relationships and their event history.
//!
//! The store lives at `~/.fathom/fathom.db` unless configured otherwise. It is
//! written by upstream capture (or `fathom import`) and read by the signal
//! engines; the only engine-side write is completing a commitment.
//!
//! `FathomDb` is a borrowed view over a connection so the same query code runs
//! on a plain `rusqlite::Connection` (tests, import) and inside
//! `tokio_rusqlite::Connection::call` (the async `EventStore`).

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::util::{parse_date, parse_date_opt, parse_timestamp_opt};

pub mod commitments;
pub mod introductions;
pub mod proof_points;
pub mod relationships;
pub mod snapshot;
pub mod types;
pub use types::*;

pub struct FathomDb<'c> {
    conn: &'c Connection,
}

impl<'c> FathomDb<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Row mapping
    // =========================================================================

    /// Column order: id, name, organization, relationship_temperature,
    /// is_active, cultural_approach, last_interaction_date.
    fn map_relationship_row(row: &rusqlite::Row) -> rusqlite::Result<DbRelationship> {
        let temperature: Option<String> = row.get(3)?;
        Ok(DbRelationship {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_else(|| "Unknown".to_string()),
            organization: row.get(2)?,
            temperature: crate::types::Temperature::from_str_lossy(temperature.as_deref()),
            is_active: row.get::<_, Option<bool>>(4)?.unwrap_or(true),
            cultural_approach: row.get(5)?,
            last_interaction_date: parse_date_opt(row.get(6)?),
        })
    }

    /// Column order: id, relationship_id, meeting_date, meeting_type,
    /// cultural_context, temperature_change, outcome. Rows whose meeting date
    /// cannot be read map to `None`.
    fn map_interaction_row(row: &rusqlite::Row) -> rusqlite::Result<Option<DbInteraction>> {
        let raw_date: String = row.get(2)?;
        let Some(meeting_date) = parse_date(&raw_date) else {
            log::warn!("Skipping interaction with unreadable meeting_date {:?}", raw_date);
            return Ok(None);
        };
        let change: Option<String> = row.get(5)?;
        Ok(Some(DbInteraction {
            id: row.get(0)?,
            relationship_id: row.get(1)?,
            meeting_date,
            meeting_type: row.get(3)?,
            cultural_context: row.get(4)?,
            temperature_change: crate::types::TemperatureChange::from_str_lossy(
                change.as_deref(),
            ),
            outcome: row.get(6)?,
        }))
    }

    /// Column order: relationship_id, from_stage, to_stage, transition_date,
    /// days_in_previous_stage.
    fn map_transition_row(row: &rusqlite::Row) -> rusqlite::Result<Option<DbStageTransition>> {
        let raw_date: String = row.get(3)?;
        let Some(transition_date) = parse_date(&raw_date) else {
            log::warn!("Skipping stage transition with unreadable date {:?}", raw_date);
            return Ok(None);
        };
        Ok(Some(DbStageTransition {
            relationship_id: row.get(0)?,
            from_stage: row.get(1)?,
            to_stage: row.get(2)?,
            transition_date,
            days_in_previous_stage: row.get(4)?,
        }))
    }

    /// Column order: id, relationship_id, owner, owner_name, description,
    /// commitment_type, due_date, status, created_at, completed_at.
    fn map_commitment_row(row: &rusqlite::Row) -> rusqlite::Result<DbCommitment> {
        let owner: Option<String> = row.get(2)?;
        let status: String = row.get(7)?;
        Ok(DbCommitment {
            id: row.get(0)?,
            relationship_id: row.get(1)?,
            owner: crate::types::CommitmentOwner::normalize(owner.as_deref()),
            owner_name: row.get(3)?,
            description: row.get(4)?,
            commitment_type: row.get(5)?,
            due_date: parse_date_opt(row.get(6)?),
            status: crate::types::CommitmentStatus::from_str_lossy(&status),
            created_at: parse_timestamp_opt(row.get(8)?),
            completed_at: parse_timestamp_opt(row.get(9)?),
        })
    }

    /// Column order: id, introducer_id, introduced_id, introduced_name,
    /// introduced_organization, direction, status, made_at, first_meeting_at,
    /// outcome, outcome_relationship_id, value_generated, created_at.
    fn map_introduction_row(row: &rusqlite::Row) -> rusqlite::Result<DbIntroduction> {
        let direction: Option<String> = row.get(5)?;
        Ok(DbIntroduction {
            id: row.get(0)?,
            introducer_id: row.get(1)?,
            introduced_id: row.get(2)?,
            introduced_name: row.get(3)?,
            introduced_organization: row.get(4)?,
            direction: crate::types::IntroDirection::normalize(direction.as_deref()),
            status: row.get(6)?,
            made_at: parse_date_opt(row.get(7)?),
            first_meeting_at: parse_date_opt(row.get(8)?),
            outcome: row.get(9)?,
            outcome_relationship_id: row.get(10)?,
            value_generated: row.get(11)?,
            created_at: parse_timestamp_opt(row.get(12)?),
        })
    }
}

/// Collect mapped rows, dropping the ones the mapper rejected.
pub(crate) fn collect_present<T>(
    rows: impl Iterator<Item = rusqlite::Result<Option<T>>>,
) -> Result<Vec<T>, DbError> {
    let mut items = Vec::new();
    for row in rows {
        if let Some(item) = row? {
            items.push(item);
        }
    }
    Ok(items)
}

/// Resolve the default store path: `~/.fathom/fathom.db`.
pub fn default_db_path() -> Result<PathBuf, DbError> {
    let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
    Ok(home.join(".fathom").join("fathom.db"))
}

/// Make sure the store's parent directory exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), DbError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
        }
    }
    Ok(())
}

/// Pragmas and migrations applied to every freshly opened connection.
pub(crate) fn prepare_connection(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    crate::migrations::run_migrations(conn).map_err(DbError::Migration)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Open (or create) a synchronous connection at `path` with the schema applied.
pub fn open_connection(path: &Path) -> Result<Connection, DbError> {
    ensure_parent_dir(path)?;
    let conn = Connection::open(path)?;
    prepare_connection(&conn)?;
    Ok(conn)
}

/// Count rows in a table. Used by import reporting and tests.
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    Ok(conn.query_row(&sql, params![], |row| row.get(0))?)
}

// =============================================================================
// Shared test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use rusqlite::Connection;

    use super::snapshot::Snapshot;
    use super::FathomDb;

    /// Create a temporary store for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of the
    /// test. FK enforcement is disabled so that unit tests can insert event
    /// rows without seeding every referenced relationship.
    pub fn test_conn() -> Connection {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let conn = super::open_connection(&path).expect("Failed to open test database");
        conn.execute_batch("PRAGMA foreign_keys = OFF;")
            .expect("disable FK for tests");
        conn
    }

    /// Create a temporary store seeded from a JSON snapshot literal.
    pub fn seeded_conn(snapshot: serde_json::Value) -> Connection {
        let conn = test_conn();
        let snapshot: Snapshot = serde_json::from_value(snapshot).expect("valid snapshot");
        FathomDb::new(&conn)
            .import_snapshot(&snapshot)
            .expect("import snapshot");
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_conn;
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let conn = test_conn();
        assert_eq!(count_rows(&conn, "relationships").expect("relationships"), 0);
        assert_eq!(count_rows(&conn, "commitments").expect("commitments"), 0);
        assert_eq!(count_rows(&conn, "proof_point_usage").expect("usage"), 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let conn = test_conn();
        let db = FathomDb::new(&conn);
        let result: Result<(), DbError> = db.with_transaction(|tx| {
            tx.conn_ref().execute(
                "INSERT INTO relationships (id, name) VALUES ('r1', 'Ana')",
                [],
            )?;
            Err(DbError::Migration("forced".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(count_rows(&conn, "relationships").expect("count"), 0);
    }
}
