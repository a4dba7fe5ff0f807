// Commitment service: delivery metrics, per-relationship lists, and the one
// write the engine performs.

use chrono::{NaiveDate, Utc};

use crate::db::DbError;
use crate::signals::commitments::{
    compute_metrics, split_by_owner, CommitmentMetrics, CommitmentsBySide,
};
use crate::store::EventStore;

use super::{or_default, today};

pub(crate) async fn metrics_as_of(
    store: &dyn EventStore,
    today: NaiveDate,
) -> Result<CommitmentMetrics, DbError> {
    let commitments = store.commitments().await?;
    Ok(compute_metrics(commitments, today))
}

/// Us/them delivery metrics plus the trust score.
pub async fn get_commitment_metrics(store: &dyn EventStore) -> CommitmentMetrics {
    or_default("Commitment metrics", metrics_as_of(store, today()).await)
}

pub async fn get_commitments_by_relationship(
    store: &dyn EventStore,
    relationship_id: &str,
) -> CommitmentsBySide {
    let commitments = store.commitments_for_relationship(relationship_id).await;
    or_default("Commitments by relationship", commitments.map(split_by_owner))
}

/// Mark a pending commitment completed. `false` when the id is unknown, the
/// commitment was already completed, or the write failed.
pub async fn complete_commitment(store: &dyn EventStore, commitment_id: &str) -> bool {
    match store.complete_commitment(commitment_id, Utc::now()).await {
        Ok(true) => {
            log::info!("Commitment {} marked completed", commitment_id);
            true
        }
        Ok(false) => {
            log::warn!("Commitment {} not pending or not found", commitment_id);
            false
        }
        Err(e) => {
            log::error!("Failed to complete commitment {}: {}", commitment_id, e);
            false
        }
    }
}
