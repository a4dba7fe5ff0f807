use rusqlite::params_from_iter;

use super::*;

const INTRODUCTION_COLUMNS: &str = "id, introducer_id, introduced_id, introduced_name,
     introduced_organization, direction, status, made_at, first_meeting_at, outcome,
     outcome_relationship_id, value_generated, created_at";

impl<'c> FathomDb<'c> {
    // =========================================================================
    // Introductions
    // =========================================================================

    /// All introductions, newest first.
    pub fn get_introductions(&self) -> Result<Vec<DbIntroduction>, DbError> {
        let sql = format!(
            "SELECT {INTRODUCTION_COLUMNS} FROM introductions
             ORDER BY created_at DESC, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_introduction_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Introductions whose status is one of `statuses`, newest first.
    pub fn get_introductions_with_status(
        &self,
        statuses: &[String],
    ) -> Result<Vec<DbIntroduction>, DbError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {INTRODUCTION_COLUMNS} FROM introductions
             WHERE status IN ({placeholders})
             ORDER BY created_at DESC, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(statuses.iter()), Self::map_introduction_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
