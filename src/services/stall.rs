// Stall risk service: current stage per relationship against historical
// stage durations.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::db::{DbError, DbRelationship};
use crate::signals::baseline::StageBaseline;
use crate::signals::defaults::stage_defaults;
use crate::signals::stall::{
    detect_stall_risks, stage_positions, summarize, StallRisk, StallRiskSummary,
};
use crate::store::EventStore;

use super::{or_default, today};

pub(crate) async fn stall_summary_as_of(
    store: &dyn EventStore,
    overrides: &HashMap<String, i64>,
    today: NaiveDate,
) -> Result<StallRiskSummary, DbError> {
    let transitions = store.stage_transitions().await?;
    let mut ids: Vec<String> = transitions.iter().map(|t| t.relationship_id.clone()).collect();
    ids.sort();
    ids.dedup();
    let relationships = store.relationships_by_ids(ids).await?;

    let lookup: HashMap<&str, &DbRelationship> =
        relationships.iter().map(|r| (r.id.as_str(), r)).collect();
    let baseline = StageBaseline::new(&transitions, stage_defaults(overrides));
    let positions = stage_positions(&transitions, &lookup, &baseline, today);
    let risks = detect_stall_risks(&positions, today);
    Ok(summarize(&positions, risks))
}

/// At-risk relationships, most severe and most overdue first.
pub async fn get_stall_risks(
    store: &dyn EventStore,
    overrides: &HashMap<String, i64>,
) -> Vec<StallRisk> {
    get_stall_risk_summary(store, overrides).await.risks
}

pub async fn get_stall_risk_summary(
    store: &dyn EventStore,
    overrides: &HashMap<String, i64>,
) -> StallRiskSummary {
    or_default(
        "Stall risk report",
        stall_summary_as_of(store, overrides, today()).await,
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::test_support::{seeded_store, FailingStore};
    use crate::types::RiskLevel;

    #[tokio::test]
    async fn test_summary_from_store() {
        let store = seeded_store(json!({
            "relationships": [
                {"id": "r1", "name": "Ana", "temperature": "cooling",
                 "lastInteractionDate": "2025-05-01"},
                {"id": "r2", "name": "Ben"},
                {"id": "r3", "name": "Cai", "isActive": false}
            ],
            "stageTransitions": [
                {"relationshipId": "r1", "toStage": "Identified", "transitionDate": "2025-01-01"},
                {"relationshipId": "r1", "fromStage": "Identified", "toStage": "Engaged",
                 "transitionDate": "2025-03-01", "daysInPreviousStage": 10},
                {"relationshipId": "r2", "fromStage": "Engaged", "toStage": "Exploring",
                 "transitionDate": "2025-05-20", "daysInPreviousStage": 20},
                {"relationshipId": "r3", "toStage": "Engaged", "transitionDate": "2025-04-20"}
            ]
        }))
        .await;

        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let summary = stall_summary_as_of(&store, &HashMap::new(), today)
            .await
            .expect("summary");

        // Engaged baseline is the single 20-day sample: r1 at 92 days is high,
        // inactive r3 at 42 days is high too; r2 at 12 days in Exploring is fine.
        assert_eq!(summary.total_at_risk, 2);
        assert_eq!(summary.high_risk, 2);
        let first = &summary.risks[0];
        assert_eq!(first.relationship.id, "r1");
        assert_eq!(first.risk_level, RiskLevel::High);
        assert_eq!(first.avg_days_for_stage, 20);
        assert!(first
            .risk_factors
            .contains(&"No contact in 31 days".to_string()));
        assert_eq!(summary.stage_health_map["Exploring"].healthy, 1);
        assert_eq!(summary.stage_health_map["Engaged"].at_risk, 2);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let summary = get_stall_risk_summary(&FailingStore, &HashMap::new()).await;
        assert_eq!(summary.total_at_risk, 0);
        assert!(summary.risks.is_empty());
        assert!(get_stall_risks(&FailingStore, &HashMap::new()).await.is_empty());
    }
}
