use std::collections::HashMap;

use rusqlite::params_from_iter;

use super::*;

const RELATIONSHIP_COLUMNS: &str = "id, name, organization, relationship_temperature, is_active,
     cultural_approach, last_interaction_date";

impl<'c> FathomDb<'c> {
    // =========================================================================
    // Relationships
    // =========================================================================

    /// All relationships, or only the active ones.
    pub fn get_relationships(&self, active_only: bool) -> Result<Vec<DbRelationship>, DbError> {
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
             WHERE (?1 = 0 OR is_active = 1)
             ORDER BY name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![active_only], Self::map_relationship_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_relationship(&self, id: &str) -> Result<Option<DbRelationship>, DbError> {
        let sql = format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], Self::map_relationship_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Relationships for a set of ids, in one query. Unknown ids are ignored.
    pub fn get_relationships_by_ids(&self, ids: &[String]) -> Result<Vec<DbRelationship>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), Self::map_relationship_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    /// Interactions of all (or all active) relationships, oldest first.
    pub fn get_interactions(&self, active_only: bool) -> Result<Vec<DbInteraction>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.relationship_id, i.meeting_date, i.meeting_type,
                    i.cultural_context, i.temperature_change, i.outcome
             FROM interactions i
             JOIN relationships r ON r.id = i.relationship_id
             WHERE (?1 = 0 OR r.is_active = 1)
             ORDER BY i.relationship_id, i.meeting_date",
        )?;
        let rows = stmt.query_map(params![active_only], Self::map_interaction_row)?;
        collect_present(rows)
    }

    pub fn get_interactions_for(
        &self,
        relationship_id: &str,
    ) -> Result<Vec<DbInteraction>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, relationship_id, meeting_date, meeting_type,
                    cultural_context, temperature_change, outcome
             FROM interactions
             WHERE relationship_id = ?1
             ORDER BY meeting_date",
        )?;
        let rows = stmt.query_map(params![relationship_id], Self::map_interaction_row)?;
        collect_present(rows)
    }

    // =========================================================================
    // Stage transitions
    // =========================================================================

    /// The full transition history across relationships, oldest first.
    pub fn get_stage_transitions(&self) -> Result<Vec<DbStageTransition>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT relationship_id, from_stage, to_stage, transition_date, days_in_previous_stage
             FROM stage_transitions
             ORDER BY transition_date, id",
        )?;
        let rows = stmt.query_map([], Self::map_transition_row)?;
        collect_present(rows)
    }

    pub fn get_stage_transitions_for(
        &self,
        relationship_id: &str,
    ) -> Result<Vec<DbStageTransition>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT relationship_id, from_stage, to_stage, transition_date, days_in_previous_stage
             FROM stage_transitions
             WHERE relationship_id = ?1
             ORDER BY transition_date, id",
        )?;
        let rows = stmt.query_map(params![relationship_id], Self::map_transition_row)?;
        collect_present(rows)
    }

    // =========================================================================
    // Joined history
    // =========================================================================

    /// Relationships joined with their interactions and stage transitions.
    ///
    /// Three set-based queries grouped in memory, so callers never issue a
    /// query per relationship.
    pub fn get_relationship_histories(
        &self,
        active_only: bool,
    ) -> Result<Vec<RelationshipHistory>, DbError> {
        let relationships = self.get_relationships(active_only)?;

        let mut interactions: HashMap<String, Vec<DbInteraction>> = HashMap::new();
        for interaction in self.get_interactions(active_only)? {
            interactions
                .entry(interaction.relationship_id.clone())
                .or_default()
                .push(interaction);
        }

        let mut transitions: HashMap<String, Vec<DbStageTransition>> = HashMap::new();
        for transition in self.get_stage_transitions()? {
            transitions
                .entry(transition.relationship_id.clone())
                .or_default()
                .push(transition);
        }

        Ok(relationships
            .into_iter()
            .map(|relationship| RelationshipHistory {
                interactions: interactions.remove(&relationship.id).unwrap_or_default(),
                transitions: transitions.remove(&relationship.id).unwrap_or_default(),
                relationship,
            })
            .collect())
    }

    pub fn get_relationship_history(
        &self,
        id: &str,
    ) -> Result<Option<RelationshipHistory>, DbError> {
        let Some(relationship) = self.get_relationship(id)? else {
            return Ok(None);
        };
        Ok(Some(RelationshipHistory {
            interactions: self.get_interactions_for(id)?,
            transitions: self.get_stage_transitions_for(id)?,
            relationship,
        }))
    }
}
