use std::collections::HashMap;

use super::*;

/// Relevance sets are stored as JSON arrays; anything unreadable is empty.
fn parse_string_set(raw: Option<String>) -> Vec<String> {
    raw.as_deref()
        .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}

impl<'c> FathomDb<'c> {
    // =========================================================================
    // Proof points
    // =========================================================================

    pub fn get_proof_points(&self) -> Result<Vec<DbProofPoint>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, description, quantified_result, source_client,
                    can_name_publicly, relevant_personas, relevant_geographies, relevant_services
             FROM proof_points
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbProofPoint {
                id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
                description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                quantified_result: row.get(4)?,
                source_client: row.get(5)?,
                can_name_publicly: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
                relevant_personas: parse_string_set(row.get(7)?),
                relevant_geographies: parse_string_set(row.get(8)?),
                relevant_services: parse_string_set(row.get(9)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All usage records, newest first.
    pub fn get_proof_point_usage(&self) -> Result<Vec<DbProofPointUsage>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT proof_point_id, relationship_id, resonated, reaction_notes, created_at
             FROM proof_point_usage
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbProofPointUsage {
                proof_point_id: row.get(0)?,
                relationship_id: row.get(1)?,
                resonated: row.get::<_, Option<bool>>(2)?.unwrap_or(false),
                reaction_notes: row.get(3)?,
                created_at: crate::util::parse_timestamp_opt(row.get(4)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Proof points joined with their usage records (newest usage first).
    pub fn get_proof_points_with_usage(&self) -> Result<Vec<ProofPointWithUsage>, DbError> {
        let mut usage_by_point: HashMap<String, Vec<DbProofPointUsage>> = HashMap::new();
        for usage in self.get_proof_point_usage()? {
            usage_by_point
                .entry(usage.proof_point_id.clone())
                .or_default()
                .push(usage);
        }

        Ok(self
            .get_proof_points()?
            .into_iter()
            .map(|proof_point| ProofPointWithUsage {
                usage: usage_by_point.remove(&proof_point.id).unwrap_or_default(),
                proof_point,
            })
            .collect())
    }
}
