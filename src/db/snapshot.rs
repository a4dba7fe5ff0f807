//! JSON snapshot import.
//!
//! Upstream capture exports its tables as one JSON document. Values are
//! written as-is (loose owner/direction/temperature strings included); the
//! read path does the normalization.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub relationships: Vec<SnapshotRelationship>,
    #[serde(default)]
    pub interactions: Vec<SnapshotInteraction>,
    #[serde(default)]
    pub stage_transitions: Vec<SnapshotStageTransition>,
    #[serde(default)]
    pub commitments: Vec<SnapshotCommitment>,
    #[serde(default)]
    pub introductions: Vec<SnapshotIntroduction>,
    #[serde(default)]
    pub proof_points: Vec<SnapshotProofPoint>,
    #[serde(default)]
    pub usage: Vec<SnapshotUsage>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRelationship {
    pub id: String,
    pub name: String,
    pub organization: Option<String>,
    pub temperature: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub cultural_approach: Option<String>,
    pub last_interaction_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInteraction {
    pub id: String,
    pub relationship_id: String,
    pub meeting_date: String,
    pub meeting_type: Option<String>,
    pub cultural_context: Option<String>,
    pub temperature_change: Option<String>,
    pub outcome: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStageTransition {
    pub relationship_id: String,
    pub from_stage: Option<String>,
    pub to_stage: String,
    pub transition_date: String,
    pub days_in_previous_stage: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCommitment {
    pub id: String,
    pub relationship_id: Option<String>,
    pub owner: Option<String>,
    pub owner_name: Option<String>,
    pub description: String,
    pub commitment_type: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotIntroduction {
    pub id: String,
    pub introducer_id: Option<String>,
    pub introduced_id: Option<String>,
    pub introduced_name: Option<String>,
    pub introduced_organization: Option<String>,
    pub direction: Option<String>,
    pub status: Option<String>,
    pub made_at: Option<String>,
    pub first_meeting_at: Option<String>,
    pub outcome: Option<String>,
    pub outcome_relationship_id: Option<String>,
    pub value_generated: Option<f64>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotProofPoint {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub quantified_result: Option<String>,
    pub source_client: Option<String>,
    #[serde(default)]
    pub can_name_publicly: bool,
    #[serde(default)]
    pub relevant_personas: Vec<String>,
    #[serde(default)]
    pub relevant_geographies: Vec<String>,
    #[serde(default)]
    pub relevant_services: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotUsage {
    pub proof_point_id: String,
    pub relationship_id: Option<String>,
    #[serde(default)]
    pub resonated: bool,
    pub reaction_notes: Option<String>,
    pub created_at: Option<String>,
}

/// Read and parse a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read snapshot {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse snapshot: {}", e))
}

impl<'c> FathomDb<'c> {
    /// Upsert every record of the snapshot in one transaction.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> Result<ImportCounts, DbError> {
        self.with_transaction(|db| {
            let mut counts = ImportCounts::default();

            for r in &snapshot.relationships {
                db.conn.execute(
                    "INSERT INTO relationships (id, name, organization, relationship_temperature,
                        is_active, cultural_approach, last_interaction_date, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        organization = excluded.organization,
                        relationship_temperature = excluded.relationship_temperature,
                        is_active = excluded.is_active,
                        cultural_approach = excluded.cultural_approach,
                        last_interaction_date = excluded.last_interaction_date,
                        updated_at = datetime('now')",
                    params![
                        r.id,
                        r.name,
                        r.organization,
                        r.temperature,
                        r.is_active,
                        r.cultural_approach,
                        r.last_interaction_date,
                    ],
                )?;
                counts.relationships += 1;
            }

            for i in &snapshot.interactions {
                db.conn.execute(
                    "INSERT INTO interactions (id, relationship_id, meeting_date, meeting_type,
                        cultural_context, temperature_change, outcome)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                        relationship_id = excluded.relationship_id,
                        meeting_date = excluded.meeting_date,
                        meeting_type = excluded.meeting_type,
                        cultural_context = excluded.cultural_context,
                        temperature_change = excluded.temperature_change,
                        outcome = excluded.outcome",
                    params![
                        i.id,
                        i.relationship_id,
                        i.meeting_date,
                        i.meeting_type,
                        i.cultural_context,
                        i.temperature_change,
                        i.outcome,
                    ],
                )?;
                counts.interactions += 1;
            }

            for t in &snapshot.stage_transitions {
                // Transitions carry no natural key; an identical row is the same event.
                let changed = db.conn.execute(
                    "INSERT INTO stage_transitions (relationship_id, from_stage, to_stage,
                        transition_date, days_in_previous_stage)
                     SELECT ?1, ?2, ?3, ?4, ?5
                     WHERE NOT EXISTS (
                        SELECT 1 FROM stage_transitions
                        WHERE relationship_id = ?1 AND from_stage IS ?2
                          AND to_stage = ?3 AND transition_date = ?4
                     )",
                    params![
                        t.relationship_id,
                        t.from_stage,
                        t.to_stage,
                        t.transition_date,
                        t.days_in_previous_stage,
                    ],
                )?;
                counts.stage_transitions += changed;
            }

            // Status and completion stamps missing from the snapshot keep the
            // stored values, so a commitment completed locally stays completed.
            for c in &snapshot.commitments {
                db.conn.execute(
                    "INSERT INTO commitments (id, relationship_id, owner, owner_name, description,
                        commitment_type, due_date, status, created_at, completed_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(?8, 'pending'),
                        COALESCE(?9, datetime('now')), ?10, datetime('now'))
                     ON CONFLICT(id) DO UPDATE SET
                        relationship_id = excluded.relationship_id,
                        owner = excluded.owner,
                        owner_name = excluded.owner_name,
                        description = excluded.description,
                        commitment_type = excluded.commitment_type,
                        due_date = excluded.due_date,
                        status = COALESCE(?8, commitments.status),
                        created_at = COALESCE(?9, commitments.created_at),
                        completed_at = COALESCE(?10, commitments.completed_at),
                        updated_at = datetime('now')",
                    params![
                        c.id,
                        c.relationship_id,
                        c.owner,
                        c.owner_name,
                        c.description,
                        c.commitment_type,
                        c.due_date,
                        c.status,
                        c.created_at,
                        c.completed_at,
                    ],
                )?;
                counts.commitments += 1;
            }

            for i in &snapshot.introductions {
                db.conn.execute(
                    "INSERT INTO introductions (id, introducer_id, introduced_id, introduced_name,
                        introduced_organization, direction, status, made_at, first_meeting_at,
                        outcome, outcome_relationship_id, value_generated, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, 'discussed'), ?8, ?9, ?10, ?11,
                        ?12, COALESCE(?13, datetime('now')))
                     ON CONFLICT(id) DO UPDATE SET
                        introducer_id = excluded.introducer_id,
                        introduced_id = excluded.introduced_id,
                        introduced_name = excluded.introduced_name,
                        introduced_organization = excluded.introduced_organization,
                        direction = excluded.direction,
                        status = COALESCE(?7, introductions.status),
                        made_at = excluded.made_at,
                        first_meeting_at = excluded.first_meeting_at,
                        outcome = excluded.outcome,
                        outcome_relationship_id = excluded.outcome_relationship_id,
                        value_generated = excluded.value_generated,
                        created_at = COALESCE(?13, introductions.created_at)",
                    params![
                        i.id,
                        i.introducer_id,
                        i.introduced_id,
                        i.introduced_name,
                        i.introduced_organization,
                        i.direction,
                        i.status,
                        i.made_at,
                        i.first_meeting_at,
                        i.outcome,
                        i.outcome_relationship_id,
                        i.value_generated,
                        i.created_at,
                    ],
                )?;
                counts.introductions += 1;
            }

            // Updated in place: usage rows cascade on proof point delete.
            for p in &snapshot.proof_points {
                db.conn.execute(
                    "INSERT INTO proof_points (id, name, category, description, quantified_result,
                        source_client, can_name_publicly, relevant_personas,
                        relevant_geographies, relevant_services)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        category = excluded.category,
                        description = excluded.description,
                        quantified_result = excluded.quantified_result,
                        source_client = excluded.source_client,
                        can_name_publicly = excluded.can_name_publicly,
                        relevant_personas = excluded.relevant_personas,
                        relevant_geographies = excluded.relevant_geographies,
                        relevant_services = excluded.relevant_services",
                    params![
                        p.id,
                        p.name,
                        p.category,
                        p.description,
                        p.quantified_result,
                        p.source_client,
                        p.can_name_publicly,
                        serde_json::to_string(&p.relevant_personas).unwrap_or_default(),
                        serde_json::to_string(&p.relevant_geographies).unwrap_or_default(),
                        serde_json::to_string(&p.relevant_services).unwrap_or_default(),
                    ],
                )?;
                counts.proof_points += 1;
            }

            // Usage has no natural key either. An undated record matches an
            // existing row with the same point, relationship and reaction.
            for u in &snapshot.usage {
                let changed = db.conn.execute(
                    "INSERT INTO proof_point_usage (proof_point_id, relationship_id, resonated,
                        reaction_notes, created_at)
                     SELECT ?1, ?2, ?3, ?4, COALESCE(?5, datetime('now'))
                     WHERE NOT EXISTS (
                        SELECT 1 FROM proof_point_usage
                        WHERE proof_point_id = ?1 AND relationship_id IS ?2
                          AND resonated = ?3 AND reaction_notes IS ?4
                          AND (?5 IS NULL OR created_at = ?5)
                     )",
                    params![
                        u.proof_point_id,
                        u.relationship_id,
                        u.resonated,
                        u.reaction_notes,
                        u.created_at,
                    ],
                )?;
                counts.usage += changed;
            }

            Ok(counts)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::test_utils::test_conn;

    fn snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "relationships": [{"id": "r1", "name": "Ana"}],
            "stageTransitions": [
                {"relationshipId": "r1", "toStage": "Identified", "transitionDate": "2025-01-01"}
            ],
            "commitments": [
                {"id": "c1", "relationshipId": "r1", "owner": "ours", "description": "Send deck"}
            ],
            "proofPoints": [
                {"id": "p1", "name": "Case", "relevantPersonas": ["CFO"]}
            ],
            "usage": [{"proofPointId": "p1", "relationshipId": "r1", "resonated": true}]
        }))
        .expect("valid snapshot")
    }

    #[test]
    fn test_import_counts_and_defaults() {
        let conn = test_conn();
        let db = FathomDb::new(&conn);
        let counts = db.import_snapshot(&snapshot()).expect("import");

        assert_eq!(counts.relationships, 1);
        assert_eq!(counts.stage_transitions, 1);
        assert_eq!(counts.commitments, 1);
        assert_eq!(counts.usage, 1);

        let status: String = conn
            .query_row("SELECT status FROM commitments WHERE id = 'c1'", [], |row| {
                row.get(0)
            })
            .expect("commitment row");
        assert_eq!(status, "pending");

        let active: bool = conn
            .query_row("SELECT is_active FROM relationships WHERE id = 'r1'", [], |row| {
                row.get(0)
            })
            .expect("relationship row");
        assert!(active);
    }

    #[test]
    fn test_reimport_does_not_duplicate_keyed_rows() {
        let conn = test_conn();
        let db = FathomDb::new(&conn);
        db.import_snapshot(&snapshot()).expect("first import");
        let second = db.import_snapshot(&snapshot()).expect("second import");

        assert_eq!(second.stage_transitions, 0);
        assert_eq!(second.usage, 0);
        assert_eq!(count_rows(&conn, "relationships").expect("count"), 1);
        assert_eq!(count_rows(&conn, "stage_transitions").expect("count"), 1);
        assert_eq!(count_rows(&conn, "commitments").expect("count"), 1);
    }

    async fn import_into(store: &crate::store::SqliteEventStore, value: serde_json::Value) {
        let snapshot: Snapshot = serde_json::from_value(value).expect("valid snapshot");
        store
            .read(move |db| db.import_snapshot(&snapshot))
            .await
            .expect("import");
    }

    async fn usage_rows(store: &crate::store::SqliteEventStore) -> i64 {
        store
            .read(|db| count_rows(db.conn_ref(), "proof_point_usage"))
            .await
            .expect("count")
    }

    #[tokio::test]
    async fn test_reimport_keeps_usage_with_foreign_keys_on() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = crate::store::SqliteEventStore::open(&dir.path().join("fathom.db"))
            .await
            .expect("open");
        let usage = json!({"proofPointId": "p1", "relationshipId": "r1", "resonated": true,
                           "createdAt": "2025-04-01T10:00:00Z"});

        import_into(
            &store,
            json!({
                "relationships": [{"id": "r1", "name": "Ana"}],
                "proofPoints": [{"id": "p1", "name": "Case"}],
                "usage": [usage.clone()]
            }),
        )
        .await;
        assert_eq!(usage_rows(&store).await, 1);

        import_into(&store, json!({"proofPoints": [{"id": "p1", "name": "Case, renamed"}]})).await;
        assert_eq!(usage_rows(&store).await, 1, "updating a proof point keeps its usage");

        import_into(&store, json!({"usage": [usage.clone(), usage]})).await;
        assert_eq!(usage_rows(&store).await, 1, "repeated usage records are not duplicated");

        let name: String = store
            .read(|db| {
                Ok(db.conn_ref().query_row(
                    "SELECT name FROM proof_points WHERE id = 'p1'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .expect("name");
        assert_eq!(name, "Case, renamed");
    }

    #[test]
    fn test_reimport_without_status_keeps_completion() {
        let conn = test_conn();
        let db = FathomDb::new(&conn);
        db.import_snapshot(&snapshot()).expect("first import");
        let at = chrono::Utc::now();
        assert!(db.complete_commitment("c1", at).expect("complete"));

        db.import_snapshot(&snapshot()).expect("second import");
        let status: String = conn
            .query_row("SELECT status FROM commitments WHERE id = 'c1'", [], |row| {
                row.get(0)
            })
            .expect("commitment row");
        assert_eq!(status, "completed");
    }

    #[test]
    fn test_load_snapshot_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").expect("write");
        let err = load_snapshot(&path).unwrap_err();
        assert!(err.contains("Failed to parse snapshot"), "unexpected: {}", err);
    }
}
