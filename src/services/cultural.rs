// Cultural service: regional patterns and per-relationship meeting prep.

use std::collections::BTreeMap;

use crate::db::DbError;
use crate::signals::cultural::{
    build_patterns, geography_distribution, prep_for_meeting, relationship_context,
    CulturalPattern, CulturalPrep, RelationshipCulturalContext,
};
use crate::store::EventStore;

use super::or_default;

async fn patterns(store: &dyn EventStore) -> Result<BTreeMap<String, CulturalPattern>, DbError> {
    let histories = store.active_relationship_histories().await?;
    Ok(build_patterns(&histories))
}

/// Geography -> pattern over active relationships.
pub async fn get_cultural_patterns(store: &dyn EventStore) -> BTreeMap<String, CulturalPattern> {
    or_default("Cultural patterns", patterns(store).await)
}

pub async fn get_relationship_cultural_context(
    store: &dyn EventStore,
    relationship_id: &str,
) -> Option<RelationshipCulturalContext> {
    let history = store.relationship_history(relationship_id).await;
    or_default(
        "Relationship cultural context",
        history.map(|h| h.as_ref().map(relationship_context)),
    )
}

async fn prep(store: &dyn EventStore, relationship_id: &str) -> Result<CulturalPrep, DbError> {
    let Some(history) = store.relationship_history(relationship_id).await? else {
        log::warn!("Cultural prep requested for unknown relationship {}", relationship_id);
        return Ok(CulturalPrep::default());
    };
    let patterns = patterns(store).await?;
    Ok(prep_for_meeting(&relationship_context(&history), &patterns))
}

/// Notes for an upcoming meeting. Unknown relationships get the Global prep.
pub async fn get_cultural_prep_for_meeting(
    store: &dyn EventStore,
    relationship_id: &str,
) -> CulturalPrep {
    or_default("Cultural prep", prep(store, relationship_id).await)
}

pub async fn get_geography_distribution(store: &dyn EventStore) -> BTreeMap<String, usize> {
    let result = patterns(store).await.map(|p| geography_distribution(&p));
    or_default("Geography distribution", result)
}
