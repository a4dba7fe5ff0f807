// Dashboard service: the headline reports, computed concurrently.

use std::collections::HashMap;

use serde::Serialize;

use crate::signals::commitments::CommitmentMetrics;
use crate::signals::introductions::IntroductionNetwork;
use crate::signals::momentum::TemperatureVelocityDashboard;
use crate::signals::stall::StallRiskSummary;
use crate::store::EventStore;

use super::commitments::get_commitment_metrics;
use super::introductions::get_introduction_network;
use super::momentum::get_temperature_velocity_dashboard;
use super::stall::get_stall_risk_summary;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stall_risks: StallRiskSummary,
    pub temperature: TemperatureVelocityDashboard,
    pub commitments: CommitmentMetrics,
    pub network: IntroductionNetwork,
}

/// Each part degrades on its own; one failing report leaves the others intact.
pub async fn get_dashboard(
    store: &dyn EventStore,
    stage_overrides: &HashMap<String, i64>,
) -> DashboardSnapshot {
    let (stall_risks, temperature, commitments, network) = tokio::join!(
        get_stall_risk_summary(store, stage_overrides),
        get_temperature_velocity_dashboard(store),
        get_commitment_metrics(store),
        get_introduction_network(store),
    );
    DashboardSnapshot {
        stall_risks,
        temperature,
        commitments,
        network,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::test_support::{seeded_store, FailingStore};

    #[tokio::test]
    async fn test_dashboard_collects_reports() {
        let store = seeded_store(json!({
            "relationships": [{"id": "r1", "name": "Ana"}],
            "interactions": [
                {"id": "i1", "relationshipId": "r1", "meetingDate": "2025-01-01",
                 "temperatureChange": "warmer"}
            ],
            "commitments": [{"id": "c1", "owner": "them", "description": "Send budget"}],
            "introductions": [{"id": "x1", "direction": "made", "status": "discussed"}]
        }))
        .await;

        let dashboard = get_dashboard(&store, &HashMap::new()).await;
        assert_eq!(dashboard.temperature.summary.total_active, 1);
        assert_eq!(dashboard.commitments.them.pending, 1);
        assert_eq!(dashboard.network.by_direction.made, 1);
        assert!(dashboard.stall_risks.risks.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_on_failing_store_is_empty() {
        let dashboard = get_dashboard(&FailingStore, &HashMap::new()).await;
        assert_eq!(dashboard.stall_risks.total_at_risk, 0);
        assert_eq!(dashboard.temperature.summary.total_active, 0);
        assert_eq!(dashboard.commitments.trust_score.we_deliver, 100);

        let json = serde_json::to_value(&dashboard).expect("serialize");
        assert!(json.get("stallRisks").is_some());
    }
}
