use chrono::{DateTime, Utc};

use super::*;

const COMMITMENT_COLUMNS: &str = "id, relationship_id, owner, owner_name, description,
     commitment_type, due_date, status, created_at, completed_at";

impl<'c> FathomDb<'c> {
    // =========================================================================
    // Commitments
    // =========================================================================

    /// All commitments, earliest due date first (undated last).
    pub fn get_commitments(&self) -> Result<Vec<DbCommitment>, DbError> {
        let sql = format!(
            "SELECT {COMMITMENT_COLUMNS} FROM commitments
             ORDER BY due_date IS NULL, due_date, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_commitment_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_commitments_for_relationship(
        &self,
        relationship_id: &str,
    ) -> Result<Vec<DbCommitment>, DbError> {
        let sql = format!(
            "SELECT {COMMITMENT_COLUMNS} FROM commitments
             WHERE relationship_id = ?1
             ORDER BY due_date IS NULL, due_date, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![relationship_id], Self::map_commitment_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Move a pending commitment to completed, stamping `completed_at`.
    ///
    /// Returns `false` when the id is unknown or the commitment is not
    /// pending (completed, cancelled...). Single statement, so the transition
    /// is atomic.
    pub fn complete_commitment(&self, id: &str, at: DateTime<Utc>) -> Result<bool, DbError> {
        let stamp = at.to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE commitments
             SET status = 'completed', completed_at = ?2, updated_at = ?2
             WHERE id = ?1 AND lower(trim(status)) = 'pending'",
            params![id, stamp],
        )?;
        Ok(changed > 0)
    }
}
