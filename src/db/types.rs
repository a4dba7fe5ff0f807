//! Shared type definitions for the database layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::types::{
    CommitmentOwner, CommitmentStatus, IntroDirection, Temperature, TemperatureChange,
};

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            tokio_rusqlite::Error::Other(inner) => match inner.downcast::<DbError>() {
                Ok(db_err) => *db_err,
                Err(other) => DbError::Connection(other.to_string()),
            },
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// A row from the `relationships` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRelationship {
    pub id: String,
    pub name: String,
    pub organization: Option<String>,
    pub temperature: Temperature,
    pub is_active: bool,
    pub cultural_approach: Option<String>,
    pub last_interaction_date: Option<NaiveDate>,
}

/// A row from the `interactions` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInteraction {
    pub id: String,
    pub relationship_id: String,
    pub meeting_date: NaiveDate,
    pub meeting_type: Option<String>,
    pub cultural_context: Option<String>,
    pub temperature_change: Option<TemperatureChange>,
    pub outcome: Option<String>,
}

/// A row from the `stage_transitions` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStageTransition {
    pub relationship_id: String,
    pub from_stage: Option<String>,
    pub to_stage: String,
    pub transition_date: NaiveDate,
    pub days_in_previous_stage: Option<i64>,
}

/// A relationship joined with its event history, both lists ordered by date
/// ascending.
#[derive(Debug, Clone)]
pub struct RelationshipHistory {
    pub relationship: DbRelationship,
    pub interactions: Vec<DbInteraction>,
    pub transitions: Vec<DbStageTransition>,
}

/// A row from the `commitments` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCommitment {
    pub id: String,
    pub relationship_id: Option<String>,
    pub owner: Option<CommitmentOwner>,
    pub owner_name: Option<String>,
    pub description: String,
    pub commitment_type: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: CommitmentStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A row from the `introductions` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbIntroduction {
    pub id: String,
    pub introducer_id: Option<String>,
    pub introduced_id: Option<String>,
    pub introduced_name: Option<String>,
    pub introduced_organization: Option<String>,
    pub direction: Option<IntroDirection>,
    pub status: String,
    pub made_at: Option<NaiveDate>,
    pub first_meeting_at: Option<NaiveDate>,
    pub outcome: Option<String>,
    pub outcome_relationship_id: Option<String>,
    pub value_generated: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A row from the `proof_points` table. The relevance sets are stored as
/// JSON arrays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbProofPoint {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub description: String,
    pub quantified_result: Option<String>,
    pub source_client: Option<String>,
    pub can_name_publicly: bool,
    pub relevant_personas: Vec<String>,
    pub relevant_geographies: Vec<String>,
    pub relevant_services: Vec<String>,
}

/// A row from the `proof_point_usage` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbProofPointUsage {
    pub proof_point_id: String,
    pub relationship_id: Option<String>,
    pub resonated: bool,
    pub reaction_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProofPointWithUsage {
    pub proof_point: DbProofPoint,
    pub usage: Vec<DbProofPointUsage>,
}

/// Row counts written by a snapshot import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCounts {
    pub relationships: usize,
    pub interactions: usize,
    pub stage_transitions: usize,
    pub commitments: usize,
    pub introductions: usize,
    pub proof_points: usize,
    pub usage: usize,
}
