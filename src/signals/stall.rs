//! Stall risk detection.
//!
//! A relationship stalls when it has sat in its current stage well past the
//! expected duration for that stage. Current stage is the `to_stage` of the
//! newest transition; expected duration comes from [`StageBaseline`].

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{DbRelationship, DbStageTransition};
use crate::types::{RiskLevel, Temperature};
use crate::util::days_between;

use super::baseline::StageBaseline;

const AT_RISK_MULTIPLIER: f64 = 1.5;
const HIGH_RISK_MULTIPLIER: f64 = 2.0;
const NO_CONTACT_DAYS: i64 = 14;

const FALLBACK_ACTION: &str = "Schedule follow-up conversation";

/// Suggested next step per (stage, level).
const STAGE_ACTIONS: &[(&str, RiskLevel, &str)] = &[
    ("Identified", RiskLevel::High, "Immediate outreach or archive if unresponsive"),
    ("Identified", RiskLevel::Medium, "Schedule initial discovery call"),
    ("Identified", RiskLevel::Low, "Send personalized follow-up"),
    ("Engaged", RiskLevel::High, "Executive escalation or decision-maker meeting"),
    ("Engaged", RiskLevel::Medium, "Technical deep dive or needs assessment"),
    ("Engaged", RiskLevel::Low, "Share relevant case study"),
    ("Exploring", RiskLevel::High, "Proposal or formal next steps discussion"),
    ("Exploring", RiskLevel::Medium, "Address outstanding questions"),
    ("Exploring", RiskLevel::Low, "Provide additional proof points"),
    ("Qualified", RiskLevel::High, "Executive alignment meeting ASAP"),
    ("Qualified", RiskLevel::Medium, "Send formal proposal"),
    ("Qualified", RiskLevel::Low, "Confirm decision timeline"),
    ("Negotiating", RiskLevel::High, "Address blockers directly"),
    ("Negotiating", RiskLevel::Medium, "Finalize terms and conditions"),
    ("Negotiating", RiskLevel::Low, "Clarify any remaining concerns"),
    ("Committed", RiskLevel::High, "Expedite contract finalization"),
    ("Committed", RiskLevel::Medium, "Schedule kickoff planning"),
    ("Committed", RiskLevel::Low, "Confirm start date and resources"),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StallRiskRelationship {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub temperature: Temperature,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StallRisk {
    pub relationship: StallRiskRelationship,
    pub current_stage: String,
    pub days_in_stage: i64,
    pub avg_days_for_stage: i64,
    pub days_overdue: i64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub suggested_action: String,
    pub last_interaction: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHealth {
    pub healthy: usize,
    pub at_risk: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StallRiskSummary {
    pub total_at_risk: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub risks: Vec<StallRisk>,
    pub stage_health_map: BTreeMap<String, StageHealth>,
}

/// Where a relationship sits in the pipeline right now.
#[derive(Debug, Clone)]
pub struct StagePosition<'a> {
    pub relationship: &'a DbRelationship,
    pub current_stage: &'a str,
    pub days_in_stage: i64,
    pub avg_days: i64,
}

/// Risk level for a stage duration, or `None` when not at risk.
///
/// At or below 1.5x the expected duration is healthy, so `Low` never comes
/// out of here.
pub fn classify(days_in_stage: i64, avg_days: i64) -> Option<RiskLevel> {
    let days = days_in_stage as f64;
    let avg = avg_days as f64;
    if days > avg * HIGH_RISK_MULTIPLIER {
        Some(RiskLevel::High)
    } else if days > avg * AT_RISK_MULTIPLIER {
        Some(RiskLevel::Medium)
    } else {
        None
    }
}

pub fn suggested_action(stage: &str, level: RiskLevel) -> &'static str {
    STAGE_ACTIONS
        .iter()
        .find(|(s, l, _)| *s == stage && *l == level)
        .map(|(_, _, action)| *action)
        .unwrap_or(FALLBACK_ACTION)
}

/// Latest stage for every relationship that has a transition and is present
/// in `relationships`. Transitions for unknown relationships are skipped.
pub fn stage_positions<'a>(
    transitions: &'a [DbStageTransition],
    relationships: &HashMap<&str, &'a DbRelationship>,
    baseline: &StageBaseline,
    today: NaiveDate,
) -> Vec<StagePosition<'a>> {
    let mut latest: HashMap<&str, &DbStageTransition> = HashMap::new();
    for t in transitions {
        latest
            .entry(t.relationship_id.as_str())
            .and_modify(|cur| {
                if t.transition_date >= cur.transition_date {
                    *cur = t;
                }
            })
            .or_insert(t);
    }

    let mut positions: Vec<StagePosition<'a>> = latest
        .into_iter()
        .filter_map(|(id, t)| {
            let relationship = *relationships.get(id)?;
            Some(StagePosition {
                relationship,
                current_stage: t.to_stage.as_str(),
                days_in_stage: days_between(t.transition_date, today),
                avg_days: baseline.expected_days(&t.to_stage),
            })
        })
        .collect();
    positions.sort_by(|a, b| a.relationship.id.cmp(&b.relationship.id));
    positions
}

fn risk_factors(position: &StagePosition<'_>, today: NaiveDate) -> Vec<String> {
    let mut factors = Vec::new();
    if (position.days_in_stage as f64) > position.avg_days as f64 * HIGH_RISK_MULTIPLIER {
        factors.push("Significantly exceeded expected stage duration".to_string());
    }
    if position.relationship.temperature.is_cold() {
        factors.push("Relationship temperature is cold/cooling".to_string());
    }
    if let Some(last) = position.relationship.last_interaction_date {
        let since = days_between(last, today);
        if since > NO_CONTACT_DAYS {
            factors.push(format!("No contact in {} days", since));
        }
    }
    factors
}

fn assess(position: &StagePosition<'_>, today: NaiveDate) -> Option<StallRisk> {
    let level = classify(position.days_in_stage, position.avg_days)?;
    let rel = position.relationship;
    Some(StallRisk {
        relationship: StallRiskRelationship {
            id: rel.id.clone(),
            name: rel.name.clone(),
            organization: rel.organization.clone().unwrap_or_default(),
            temperature: rel.temperature,
        },
        current_stage: position.current_stage.to_string(),
        days_in_stage: position.days_in_stage,
        avg_days_for_stage: position.avg_days,
        days_overdue: position.days_in_stage - position.avg_days,
        risk_level: level,
        risk_factors: risk_factors(position, today),
        suggested_action: suggested_action(position.current_stage, level).to_string(),
        last_interaction: rel.last_interaction_date,
    })
}

/// At-risk relationships, most severe first, then most overdue first.
pub fn detect_stall_risks(positions: &[StagePosition<'_>], today: NaiveDate) -> Vec<StallRisk> {
    let mut risks: Vec<StallRisk> = positions.iter().filter_map(|p| assess(p, today)).collect();
    risks.sort_by(|a, b| {
        a.risk_level
            .severity_rank()
            .cmp(&b.risk_level.severity_rank())
            .then_with(|| b.days_overdue.cmp(&a.days_overdue))
    });
    risks
}

/// Counts per level plus healthy/at-risk tallies per current stage.
pub fn summarize(positions: &[StagePosition<'_>], risks: Vec<StallRisk>) -> StallRiskSummary {
    let mut stage_health_map: BTreeMap<String, StageHealth> = BTreeMap::new();
    for position in positions {
        let at_risk = risks
            .iter()
            .any(|r| r.relationship.id == position.relationship.id);
        let entry = stage_health_map
            .entry(position.current_stage.to_string())
            .or_default();
        if at_risk {
            entry.at_risk += 1;
        } else {
            entry.healthy += 1;
        }
    }

    let count = |level: RiskLevel| risks.iter().filter(|r| r.risk_level == level).count();
    StallRiskSummary {
        total_at_risk: risks.len(),
        high_risk: count(RiskLevel::High),
        medium_risk: count(RiskLevel::Medium),
        low_risk: count(RiskLevel::Low),
        stage_health_map,
        risks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::defaults::stage_defaults;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn rel(id: &str, temperature: Temperature, last_contact_days_ago: Option<i64>) -> DbRelationship {
        DbRelationship {
            id: id.to_string(),
            name: format!("Contact {}", id),
            organization: Some("Org".to_string()),
            temperature,
            is_active: true,
            cultural_approach: None,
            last_interaction_date: last_contact_days_ago
                .map(|d| today() - chrono::Duration::days(d)),
        }
    }

    fn entered(id: &str, stage: &str, days_ago: i64) -> DbStageTransition {
        DbStageTransition {
            relationship_id: id.to_string(),
            from_stage: None,
            to_stage: stage.to_string(),
            transition_date: today() - chrono::Duration::days(days_ago),
            days_in_previous_stage: None,
        }
    }

    fn lookup(rels: &[DbRelationship]) -> HashMap<&str, &DbRelationship> {
        rels.iter().map(|r| (r.id.as_str(), r)).collect()
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(classify(41, 20), Some(RiskLevel::High));
        assert_eq!(classify(40, 20), Some(RiskLevel::Medium));
        assert_eq!(classify(32, 20), Some(RiskLevel::Medium));
        assert_eq!(classify(30, 20), None);
        assert_eq!(classify(28, 20), None);
    }

    #[test]
    fn test_suggested_action_table_and_fallback() {
        assert_eq!(
            suggested_action("Qualified", RiskLevel::High),
            "Executive alignment meeting ASAP"
        );
        assert_eq!(
            suggested_action("Nurturing", RiskLevel::High),
            "Schedule follow-up conversation"
        );
    }

    #[test]
    fn test_detects_and_orders_risks() {
        let rels = vec![
            rel("medium", Temperature::Warm, Some(3)),
            rel("high", Temperature::Cooling, Some(20)),
            rel("fine", Temperature::Hot, None),
            rel("high2", Temperature::Warm, None),
        ];
        let transitions = vec![
            entered("medium", "Identified", 60),
            // Qualified 30 days: 1.6x
            entered("medium", "Qualified", 48),
            // Engaged 21 days: > 2x
            entered("high", "Engaged", 50),
            entered("fine", "Committed", 10),
            entered("high2", "Identified", 40),
            entered("ghost", "Engaged", 400),
        ];
        let mut overrides = HashMap::new();
        overrides.insert("Qualified".to_string(), 30);
        let baseline = StageBaseline::new(&transitions, stage_defaults(&overrides));
        let by_id = lookup(&rels);
        let positions = stage_positions(&transitions, &by_id, &baseline, today());
        assert_eq!(positions.len(), 4, "unknown relationships are skipped");

        let risks = detect_stall_risks(&positions, today());
        let ids: Vec<&str> = risks.iter().map(|r| r.relationship.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "high2", "medium"]);

        let high = &risks[0];
        assert_eq!(high.current_stage, "Engaged");
        assert_eq!(high.avg_days_for_stage, 21);
        assert_eq!(high.days_overdue, 29);
        assert_eq!(high.suggested_action, "Executive escalation or decision-maker meeting");
        assert_eq!(
            high.risk_factors,
            vec![
                "Significantly exceeded expected stage duration".to_string(),
                "Relationship temperature is cold/cooling".to_string(),
                "No contact in 20 days".to_string(),
            ]
        );

        let medium = &risks[2];
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert_eq!(medium.current_stage, "Qualified");
        assert!(medium.risk_factors.is_empty());
        assert_eq!(medium.suggested_action, "Send formal proposal");
    }

    #[test]
    fn test_summary_counts_and_stage_health() {
        let rels = vec![
            rel("a", Temperature::Warm, None),
            rel("b", Temperature::Warm, None),
            rel("c", Temperature::Warm, None),
        ];
        let transitions = vec![
            entered("a", "Engaged", 60),
            entered("b", "Engaged", 5),
            entered("c", "Qualified", 50),
        ];
        let baseline = StageBaseline::new(&transitions, stage_defaults(&HashMap::new()));
        let by_id = lookup(&rels);
        let positions = stage_positions(&transitions, &by_id, &baseline, today());
        let risks = detect_stall_risks(&positions, today());
        let summary = summarize(&positions, risks);

        assert_eq!(summary.total_at_risk, 2);
        assert_eq!(summary.high_risk, 1);
        assert_eq!(summary.medium_risk, 1);
        assert_eq!(summary.low_risk, 0);
        assert_eq!(
            summary.stage_health_map.get("Engaged"),
            Some(&StageHealth { healthy: 1, at_risk: 1 })
        );
        assert_eq!(
            summary.stage_health_map.get("Qualified"),
            Some(&StageHealth { healthy: 0, at_risk: 1 })
        );
    }

    #[test]
    fn test_empty_history_has_no_risks() {
        let baseline = StageBaseline::new(&[], stage_defaults(&HashMap::new()));
        let positions = stage_positions(&[], &HashMap::new(), &baseline, today());
        assert!(detect_stall_risks(&positions, today()).is_empty());
        let summary = summarize(&positions, Vec::new());
        assert_eq!(summary.total_at_risk, 0);
        assert!(summary.stage_health_map.is_empty());
    }
}
