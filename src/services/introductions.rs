// Introduction service: funnel, introducer attribution and network ROI.

use crate::db::{DbError, DbIntroduction, DbRelationship};
use crate::signals::introductions::{
    build_lookup, build_network, introducer_stats, network_roi, referenced_relationship_ids,
    to_record, IntroducerStats, IntroductionNetwork, IntroductionRecord, NetworkRoi,
    PENDING_STATUSES,
};
use crate::store::EventStore;

use super::or_default;

/// Introductions plus every relationship they reference.
async fn load(
    store: &dyn EventStore,
) -> Result<(Vec<DbIntroduction>, Vec<DbRelationship>), DbError> {
    let intros = store.introductions().await?;
    let relationships = store
        .relationships_by_ids(referenced_relationship_ids(&intros))
        .await?;
    Ok((intros, relationships))
}

async fn network(store: &dyn EventStore) -> Result<IntroductionNetwork, DbError> {
    let (intros, relationships) = load(store).await?;
    Ok(build_network(&intros, &build_lookup(&relationships)))
}

pub async fn get_introduction_network(store: &dyn EventStore) -> IntroductionNetwork {
    or_default("Introduction network", network(store).await)
}

async fn pending(store: &dyn EventStore) -> Result<Vec<IntroductionRecord>, DbError> {
    let statuses = PENDING_STATUSES.iter().map(|s| s.to_string()).collect();
    let intros = store.introductions_with_status(statuses).await?;
    let relationships = store
        .relationships_by_ids(referenced_relationship_ids(&intros))
        .await?;
    let lookup = build_lookup(&relationships);
    Ok(intros.iter().map(|i| to_record(i, &lookup)).collect())
}

/// Introductions still waiting on a request or follow-through, newest first.
pub async fn get_pending_introductions(store: &dyn EventStore) -> Vec<IntroductionRecord> {
    or_default("Pending introductions", pending(store).await)
}

pub async fn get_network_roi(store: &dyn EventStore) -> NetworkRoi {
    or_default("Network ROI", network(store).await.map(|n| network_roi(&n)))
}

/// Stats for one introducer across all of their received introductions.
pub async fn get_introducer_stats(
    store: &dyn EventStore,
    introducer_id: &str,
) -> Option<IntroducerStats> {
    let result = load(store).await.map(|(intros, relationships)| {
        introducer_stats(&intros, &build_lookup(&relationships))
            .into_iter()
            .find(|s| s.id == introducer_id)
    });
    or_default("Introducer stats", result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::test_support::{seeded_store, FailingStore};

    async fn store() -> crate::store::SqliteEventStore {
        seeded_store(json!({
            "relationships": [
                {"id": "ana", "name": "Ana Souza", "organization": "Banco Sul"},
                {"id": "ben", "name": "Ben Okafor"},
                {"id": "new", "name": "Carla Ruiz", "organization": "Ruiz Ltda"}
            ],
            "introductions": [
                {"id": "i1", "introducerId": "ana", "introducedId": "new", "direction": "incoming",
                 "status": "completed", "firstMeetingAt": "2025-02-01", "outcome": "converted",
                 "valueGenerated": 50000.0, "createdAt": "2025-01-10T00:00:00Z"},
                {"id": "i2", "introducerId": "ana", "introducedName": "Dan", "direction": "received",
                 "status": "requested", "createdAt": "2025-03-10T00:00:00Z"},
                {"id": "i3", "introducerId": "ben", "introducedName": "Eve", "direction": "received",
                 "status": "completed", "firstMeetingAt": "2025-03-01", "outcome": "active_deal",
                 "valueGenerated": 10000.0, "createdAt": "2025-02-10T00:00:00Z"},
                {"id": "i4", "introducerId": "ana", "introducedName": "Fay", "direction": "made",
                 "status": "discussed", "createdAt": "2025-04-10T00:00:00Z"}
            ]
        }))
        .await
    }

    #[tokio::test]
    async fn test_network_report() {
        let network = get_introduction_network(&store().await).await;
        assert_eq!(network.funnel.total_intros, 4);
        assert_eq!(network.funnel.meetings_set, 2);
        assert_eq!(network.funnel.active_deals, 2);
        assert_eq!(network.network_value, 60000.0);
        assert_eq!(network.by_direction.made, 1);
        assert_eq!(network.by_direction.received, 3);

        assert_eq!(network.top_introducers[0].id, "ana");
        assert_eq!(network.top_introducers[0].intros_made, 2);
        assert_eq!(network.top_introducers[0].deals_generated, 1);
        assert_eq!(network.top_introducers[0].conversion_rate, 50);
        assert_eq!(network.top_introducers[1].deals_generated, 0, "active deals are not attributed");

        assert_eq!(network.recent_introductions[0].id, "i4");
    }

    #[tokio::test]
    async fn test_pending_resolves_names() {
        let pending = get_pending_introductions(&store().await).await;
        let ids: Vec<&str> = pending.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["i4", "i2"]);
        assert_eq!(pending[1].introduced_name, "Dan");
    }

    #[tokio::test]
    async fn test_roi_and_single_introducer() {
        let store = store().await;
        let roi = get_network_roi(&store).await;
        assert_eq!(roi.total_introductions_received, 3);
        assert_eq!(roi.avg_value_per_intro, 20000.0);
        assert_eq!(roi.top_introducer_name.as_deref(), Some("Ana Souza"));
        assert_eq!(roi.top_introducer_value, 50000.0);

        let ana = get_introducer_stats(&store, "ana").await.expect("ana");
        assert_eq!(ana.organization, "Banco Sul");
        assert_eq!(ana.introductions.len(), 2);
        assert_eq!(ana.introductions[1].introduced_name, "Carla Ruiz");
        assert!(get_introducer_stats(&store, "nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_degrades() {
        assert_eq!(get_introduction_network(&FailingStore).await.funnel.total_intros, 0);
        assert!(get_pending_introductions(&FailingStore).await.is_empty());
        assert!(get_network_roi(&FailingStore).await.top_introducer_name.is_none());
        assert!(get_introducer_stats(&FailingStore, "ana").await.is_none());
    }
}
