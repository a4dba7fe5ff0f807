// Proof point service: resonance reports and meeting recommendations.

use std::collections::{BTreeMap, HashMap};

use crate::db::{DbError, DbRelationship};
use crate::signals::proof_points::{
    best_for_persona, build_intelligence, performances, recommend, usage_relationship_ids,
    MeetingContext, ProofPointIntelligence, ProofPointPerformance, RecommendedProofPoint,
};
use crate::store::EventStore;

use super::or_default;

/// Every proof point's performance, highest resonance first.
async fn load_performances(store: &dyn EventStore) -> Result<Vec<ProofPointPerformance>, DbError> {
    let points = store.proof_points_with_usage().await?;
    let relationships = store
        .relationships_by_ids(usage_relationship_ids(&points))
        .await?;
    let by_id: HashMap<&str, &DbRelationship> =
        relationships.iter().map(|r| (r.id.as_str(), r)).collect();
    Ok(performances(&points, &by_id))
}

pub async fn get_proof_point_intelligence(store: &dyn EventStore) -> ProofPointIntelligence {
    let result = load_performances(store).await.map(build_intelligence);
    or_default("Proof point intelligence", result)
}

/// Top five proof points for a meeting, scored against its context.
pub async fn get_recommended_proof_points(
    store: &dyn EventStore,
    context: &MeetingContext,
) -> Vec<RecommendedProofPoint> {
    let result = load_performances(store)
        .await
        .map(|all| recommend(&all, context));
    or_default("Recommended proof points", result)
}

pub async fn get_proof_points_by_category(
    store: &dyn EventStore,
) -> BTreeMap<String, Vec<ProofPointPerformance>> {
    let result = load_performances(store)
        .await
        .map(|all| build_intelligence(all).by_category);
    or_default("Proof points by category", result)
}

pub async fn get_best_proof_points_for_persona(
    store: &dyn EventStore,
    persona: &str,
) -> Vec<ProofPointPerformance> {
    let result = load_performances(store)
        .await
        .map(|all| best_for_persona(&all, persona));
    or_default("Proof points for persona", result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::test_support::{seeded_store, FailingStore};
    use crate::store::SqliteEventStore;

    async fn store() -> SqliteEventStore {
        seeded_store(json!({
            "relationships": [{"id": "r1", "name": "Ana Souza"}],
            "proofPoints": [
                {"id": "p1", "name": "Bank migration", "category": "Finance",
                 "relevantPersonas": ["CFO"], "relevantGeographies": ["Brazil"]},
                {"id": "p2", "name": "Retail rollout", "category": "Retail",
                 "relevantPersonas": ["CEO"]},
                {"id": "p3", "name": "Unused story"}
            ],
            "usage": [
                {"proofPointId": "p1", "relationshipId": "r1", "resonated": true,
                 "createdAt": "2025-05-03T00:00:00Z"},
                {"proofPointId": "p1", "relationshipId": "gone", "resonated": true,
                 "createdAt": "2025-05-02T00:00:00Z"},
                {"proofPointId": "p1", "resonated": false, "createdAt": "2025-05-01T00:00:00Z"},
                {"proofPointId": "p2", "resonated": true},
                {"proofPointId": "p2", "resonated": true}
            ]
        }))
        .await
    }

    #[tokio::test]
    async fn test_intelligence_report() {
        let intel = get_proof_point_intelligence(&store().await).await;
        assert_eq!(intel.total_proof_points, 3);
        assert_eq!(intel.overall_resonance_rate, 80);

        let order: Vec<&str> = intel.proof_points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["p2", "p1", "p3"]);
        assert_eq!(intel.top_performers.len(), 1);
        assert_eq!(intel.top_performers[0].resonance_rate, 67);

        let p1 = &intel.proof_points[1];
        assert_eq!(p1.recent_usage[0].relationship_name, "Ana Souza");
        assert_eq!(p1.recent_usage[1].relationship_name, "Unknown");
        assert!(intel.by_category.contains_key("Uncategorized"));
    }

    #[tokio::test]
    async fn test_recommendations_need_a_context_match() {
        let store = store().await;
        let context = MeetingContext {
            persona: Some("CFO".to_string()),
            geography: Some("Brazil".to_string()),
            service: None,
        };
        let recs = get_recommended_proof_points(&store, &context).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].proof_point.id, "p1");
        assert_eq!(recs[0].match_score, 67 + 20 + 15);

        assert!(get_recommended_proof_points(&store, &MeetingContext::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_category_and_persona_views() {
        let store = store().await;
        let by_category = get_proof_points_by_category(&store).await;
        assert_eq!(by_category["Finance"][0].id, "p1");
        assert_eq!(by_category.len(), 3);

        let ceo = get_best_proof_points_for_persona(&store, "CEO").await;
        assert_eq!(ceo.len(), 1);
        assert_eq!(ceo[0].id, "p2");
    }

    #[tokio::test]
    async fn test_store_failure_degrades() {
        assert_eq!(get_proof_point_intelligence(&FailingStore).await.total_proof_points, 0);
        assert!(get_proof_points_by_category(&FailingStore).await.is_empty());
        assert!(get_best_proof_points_for_persona(&FailingStore, "CFO").await.is_empty());
    }
}
