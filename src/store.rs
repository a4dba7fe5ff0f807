//! Async event store access.
//!
//! Report accessors only see the `EventStore` trait. `SqliteEventStore` runs
//! every query on tokio-rusqlite's connection thread, so a report awaiting
//! the store suspends instead of blocking a runtime worker, and independent
//! reports interleave freely.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::{
    DbCommitment, DbError, DbIntroduction, DbRelationship, DbStageTransition, FathomDb,
    ProofPointWithUsage, RelationshipHistory,
};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Active relationships joined with interactions and stage transitions.
    async fn active_relationship_histories(&self) -> Result<Vec<RelationshipHistory>, DbError>;

    /// One relationship with its history, regardless of the active flag.
    async fn relationship_history(&self, id: &str)
        -> Result<Option<RelationshipHistory>, DbError>;

    async fn relationships(&self) -> Result<Vec<DbRelationship>, DbError>;

    async fn relationships_by_ids(&self, ids: Vec<String>) -> Result<Vec<DbRelationship>, DbError>;

    async fn stage_transitions(&self) -> Result<Vec<DbStageTransition>, DbError>;

    async fn commitments(&self) -> Result<Vec<DbCommitment>, DbError>;

    async fn commitments_for_relationship(&self, id: &str) -> Result<Vec<DbCommitment>, DbError>;

    /// Pending → completed. `Ok(false)` when nothing transitioned.
    async fn complete_commitment(&self, id: &str, at: DateTime<Utc>) -> Result<bool, DbError>;

    /// All introductions, newest first.
    async fn introductions(&self) -> Result<Vec<DbIntroduction>, DbError>;

    async fn introductions_with_status(
        &self,
        statuses: Vec<String>,
    ) -> Result<Vec<DbIntroduction>, DbError>;

    async fn proof_points_with_usage(&self) -> Result<Vec<ProofPointWithUsage>, DbError>;
}

/// `EventStore` over a local SQLite file.
#[derive(Clone)]
pub struct SqliteEventStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteEventStore {
    /// Open (or create) the store at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        crate::db::ensure_parent_dir(path)?;
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.read(|db| crate::db::prepare_connection(db.conn_ref())).await?;
        log::info!("Event store ready at {}", path.display());
        Ok(store)
    }

    /// In-memory store with the schema applied. Used by tests and demos.
    pub async fn open_in_memory() -> Result<Self, DbError> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.read(|db| crate::db::prepare_connection(db.conn_ref())).await?;
        Ok(store)
    }

    /// Run `f` against the connection on the store thread.
    pub async fn read<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&FathomDb<'_>) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let db = FathomDb::new(conn);
                f(&db).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
            })
            .await
            .map_err(DbError::from)
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn active_relationship_histories(&self) -> Result<Vec<RelationshipHistory>, DbError> {
        self.read(|db| db.get_relationship_histories(true)).await
    }

    async fn relationship_history(
        &self,
        id: &str,
    ) -> Result<Option<RelationshipHistory>, DbError> {
        let id = id.to_string();
        self.read(move |db| db.get_relationship_history(&id)).await
    }

    async fn relationships(&self) -> Result<Vec<DbRelationship>, DbError> {
        self.read(|db| db.get_relationships(false)).await
    }

    async fn relationships_by_ids(&self, ids: Vec<String>) -> Result<Vec<DbRelationship>, DbError> {
        self.read(move |db| db.get_relationships_by_ids(&ids)).await
    }

    async fn stage_transitions(&self) -> Result<Vec<DbStageTransition>, DbError> {
        self.read(|db| db.get_stage_transitions()).await
    }

    async fn commitments(&self) -> Result<Vec<DbCommitment>, DbError> {
        self.read(|db| db.get_commitments()).await
    }

    async fn commitments_for_relationship(&self, id: &str) -> Result<Vec<DbCommitment>, DbError> {
        let id = id.to_string();
        self.read(move |db| db.get_commitments_for_relationship(&id))
            .await
    }

    async fn complete_commitment(&self, id: &str, at: DateTime<Utc>) -> Result<bool, DbError> {
        let id = id.to_string();
        self.read(move |db| db.complete_commitment(&id, at)).await
    }

    async fn introductions(&self) -> Result<Vec<DbIntroduction>, DbError> {
        self.read(|db| db.get_introductions()).await
    }

    async fn introductions_with_status(
        &self,
        statuses: Vec<String>,
    ) -> Result<Vec<DbIntroduction>, DbError> {
        self.read(move |db| db.get_introductions_with_status(&statuses))
            .await
    }

    async fn proof_points_with_usage(&self) -> Result<Vec<ProofPointWithUsage>, DbError> {
        self.read(|db| db.get_proof_points_with_usage()).await
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// A store whose every call fails, for exercising report degradation.
    pub struct FailingStore;

    fn unavailable<T>() -> Result<T, DbError> {
        Err(DbError::Connection("store unavailable".to_string()))
    }

    #[async_trait]
    impl EventStore for FailingStore {
        async fn active_relationship_histories(
            &self,
        ) -> Result<Vec<RelationshipHistory>, DbError> {
            unavailable()
        }
        async fn relationship_history(
            &self,
            _id: &str,
        ) -> Result<Option<RelationshipHistory>, DbError> {
            unavailable()
        }
        async fn relationships(&self) -> Result<Vec<DbRelationship>, DbError> {
            unavailable()
        }
        async fn relationships_by_ids(
            &self,
            _ids: Vec<String>,
        ) -> Result<Vec<DbRelationship>, DbError> {
            unavailable()
        }
        async fn stage_transitions(&self) -> Result<Vec<DbStageTransition>, DbError> {
            unavailable()
        }
        async fn commitments(&self) -> Result<Vec<DbCommitment>, DbError> {
            unavailable()
        }
        async fn commitments_for_relationship(
            &self,
            _id: &str,
        ) -> Result<Vec<DbCommitment>, DbError> {
            unavailable()
        }
        async fn complete_commitment(
            &self,
            _id: &str,
            _at: DateTime<Utc>,
        ) -> Result<bool, DbError> {
            unavailable()
        }
        async fn introductions(&self) -> Result<Vec<DbIntroduction>, DbError> {
            unavailable()
        }
        async fn introductions_with_status(
            &self,
            _statuses: Vec<String>,
        ) -> Result<Vec<DbIntroduction>, DbError> {
            unavailable()
        }
        async fn proof_points_with_usage(&self) -> Result<Vec<ProofPointWithUsage>, DbError> {
            unavailable()
        }
    }

    /// In-memory SQLite store seeded from a JSON snapshot literal.
    pub async fn seeded_store(snapshot: serde_json::Value) -> SqliteEventStore {
        let store = SqliteEventStore::open_in_memory().await.expect("open store");
        let snapshot: crate::db::snapshot::Snapshot =
            serde_json::from_value(snapshot).expect("valid snapshot");
        store
            .read(move |db| {
                db.conn_ref().execute_batch("PRAGMA foreign_keys = OFF;")?;
                db.import_snapshot(&snapshot)
            })
            .await
            .expect("import snapshot");
        store
    }
}
