//! Proof-point resonance and meeting recommendations.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{DbRelationship, ProofPointWithUsage};
use crate::util::percent;

const DEFAULT_CATEGORY: &str = "Uncategorized";
const UNKNOWN_NAME: &str = "Unknown";

const RECENT_USAGE: usize = 5;
const TOP_PERFORMERS: usize = 5;
const TOP_PERFORMER_MIN_USES: usize = 3;
const PERSONA_TOP: usize = 3;
const RECOMMENDATIONS: usize = 5;

const PERSONA_BONUS: u32 = 20;
const GEOGRAPHY_BONUS: u32 = 15;
const SERVICE_BONUS: u32 = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub relationship_name: String,
    pub date: Option<DateTime<Utc>>,
    pub resonated: bool,
    pub reaction_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPointPerformance {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub quantified_result: Option<String>,
    pub source_client: Option<String>,
    pub can_name_publicly: bool,
    pub times_used: usize,
    pub times_resonated: usize,
    pub resonance_rate: u32,
    pub relevant_personas: Vec<String>,
    pub relevant_geographies: Vec<String>,
    pub relevant_services: Vec<String>,
    pub recent_usage: Vec<UsageSummary>,
    pub best_with_personas: Vec<String>,
    pub best_in_geographies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRate {
    pub proof_point: String,
    pub rate: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPointIntelligence {
    pub total_proof_points: usize,
    pub overall_resonance_rate: u32,
    pub proof_points: Vec<ProofPointPerformance>,
    pub top_performers: Vec<ProofPointPerformance>,
    pub by_category: BTreeMap<String, Vec<ProofPointPerformance>>,
    pub persona_effectiveness: BTreeMap<String, Vec<PersonaRate>>,
}

/// What the upcoming meeting looks like. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct MeetingContext {
    pub persona: Option<String>,
    pub geography: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProofPoint {
    #[serde(flatten)]
    pub proof_point: ProofPointPerformance,
    pub match_score: u32,
}

/// Relationship ids referenced by any usage record.
pub fn usage_relationship_ids(points: &[ProofPointWithUsage]) -> Vec<String> {
    let mut ids: Vec<String> = points
        .iter()
        .flat_map(|p| p.usage.iter().filter_map(|u| u.relationship_id.clone()))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Performance record for one proof point. `usage` is expected newest first.
pub fn performance(
    point: &ProofPointWithUsage,
    relationships: &HashMap<&str, &DbRelationship>,
) -> ProofPointPerformance {
    let pp = &point.proof_point;
    let times_used = point.usage.len();
    let times_resonated = point.usage.iter().filter(|u| u.resonated).count();

    let recent_usage = point
        .usage
        .iter()
        .take(RECENT_USAGE)
        .map(|u| UsageSummary {
            relationship_name: u
                .relationship_id
                .as_deref()
                .and_then(|id| relationships.get(id))
                .map(|r| r.name.clone())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            date: u.created_at,
            resonated: u.resonated,
            reaction_notes: u.reaction_notes.clone(),
        })
        .collect();

    ProofPointPerformance {
        id: pp.id.clone(),
        name: pp.name.clone(),
        category: pp
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        description: pp.description.clone(),
        quantified_result: pp.quantified_result.clone(),
        source_client: pp.source_client.clone(),
        can_name_publicly: pp.can_name_publicly,
        times_used,
        times_resonated,
        resonance_rate: percent(times_resonated, times_used),
        relevant_personas: pp.relevant_personas.clone(),
        relevant_geographies: pp.relevant_geographies.clone(),
        relevant_services: pp.relevant_services.clone(),
        recent_usage,
        best_with_personas: pp.relevant_personas.clone(),
        best_in_geographies: pp.relevant_geographies.clone(),
    }
}

/// All proof points, highest resonance first.
pub fn performances(
    points: &[ProofPointWithUsage],
    relationships: &HashMap<&str, &DbRelationship>,
) -> Vec<ProofPointPerformance> {
    let mut all: Vec<ProofPointPerformance> =
        points.iter().map(|p| performance(p, relationships)).collect();
    all.sort_by(|a, b| b.resonance_rate.cmp(&a.resonance_rate));
    all
}

pub fn build_intelligence(performances: Vec<ProofPointPerformance>) -> ProofPointIntelligence {
    let total_used: usize = performances.iter().map(|p| p.times_used).sum();
    let total_resonated: usize = performances.iter().map(|p| p.times_resonated).sum();

    let top_performers: Vec<ProofPointPerformance> = performances
        .iter()
        .filter(|p| p.times_used >= TOP_PERFORMER_MIN_USES)
        .take(TOP_PERFORMERS)
        .cloned()
        .collect();

    let mut by_category: BTreeMap<String, Vec<ProofPointPerformance>> = BTreeMap::new();
    let mut persona_effectiveness: BTreeMap<String, Vec<PersonaRate>> = BTreeMap::new();
    for p in &performances {
        by_category
            .entry(p.category.clone())
            .or_default()
            .push(p.clone());
        for persona in &p.relevant_personas {
            persona_effectiveness
                .entry(persona.clone())
                .or_default()
                .push(PersonaRate {
                    proof_point: p.name.clone(),
                    rate: p.resonance_rate,
                });
        }
    }
    for rates in persona_effectiveness.values_mut() {
        rates.sort_by(|a, b| b.rate.cmp(&a.rate));
        rates.truncate(PERSONA_TOP);
    }

    ProofPointIntelligence {
        total_proof_points: performances.len(),
        overall_resonance_rate: percent(total_resonated, total_used),
        top_performers,
        by_category,
        persona_effectiveness,
        proof_points: performances,
    }
}

fn in_set(value: Option<&str>, set: &[String]) -> bool {
    value.is_some_and(|v| set.iter().any(|s| s == v))
}

/// Resonance rate plus context bonuses.
pub fn match_score(p: &ProofPointPerformance, context: &MeetingContext) -> u32 {
    let mut score = p.resonance_rate;
    if in_set(context.persona.as_deref(), &p.relevant_personas) {
        score += PERSONA_BONUS;
    }
    if in_set(context.geography.as_deref(), &p.relevant_geographies) {
        score += GEOGRAPHY_BONUS;
    }
    if in_set(context.service.as_deref(), &p.relevant_services) {
        score += SERVICE_BONUS;
    }
    score
}

/// Top proof points for a meeting. Only points matching at least one part of
/// the context qualify.
pub fn recommend(
    performances: &[ProofPointPerformance],
    context: &MeetingContext,
) -> Vec<RecommendedProofPoint> {
    let mut eligible: Vec<RecommendedProofPoint> = performances
        .iter()
        .filter_map(|p| {
            let score = match_score(p, context);
            (score > p.resonance_rate).then(|| RecommendedProofPoint {
                proof_point: p.clone(),
                match_score: score,
            })
        })
        .collect();
    eligible.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| b.proof_point.resonance_rate.cmp(&a.proof_point.resonance_rate))
    });
    eligible.truncate(RECOMMENDATIONS);
    eligible
}

pub fn best_for_persona(
    performances: &[ProofPointPerformance],
    persona: &str,
) -> Vec<ProofPointPerformance> {
    let mut matching: Vec<ProofPointPerformance> = performances
        .iter()
        .filter(|p| p.relevant_personas.iter().any(|s| s == persona))
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.resonance_rate.cmp(&a.resonance_rate));
    matching.truncate(RECOMMENDATIONS);
    matching
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::{DbProofPoint, DbProofPointUsage};

    fn point(id: &str, uses: &[bool], personas: &[&str], geos: &[&str]) -> ProofPointWithUsage {
        ProofPointWithUsage {
            proof_point: DbProofPoint {
                id: id.to_string(),
                name: format!("Case {}", id),
                category: None,
                description: String::new(),
                quantified_result: None,
                source_client: None,
                can_name_publicly: false,
                relevant_personas: personas.iter().map(|s| s.to_string()).collect(),
                relevant_geographies: geos.iter().map(|s| s.to_string()).collect(),
                relevant_services: Vec::new(),
            },
            usage: uses
                .iter()
                .enumerate()
                .map(|(n, resonated)| DbProofPointUsage {
                    proof_point_id: id.to_string(),
                    relationship_id: Some(format!("r{}", n)),
                    resonated: *resonated,
                    reaction_notes: None,
                    created_at: Some(Utc.with_ymd_and_hms(2025, 1, 10 - n as u32, 0, 0, 0).unwrap()),
                })
                .collect(),
        }
    }

    fn perf(id: &str, rate: u32, personas: &[&str]) -> ProofPointPerformance {
        let mut p = performance(&point(id, &[], personas, &[]), &HashMap::new());
        p.resonance_rate = rate;
        p
    }

    #[test]
    fn test_resonance_rate_and_defaults() {
        let unused = performance(&point("a", &[], &[], &[]), &HashMap::new());
        assert_eq!(unused.resonance_rate, 0);
        assert_eq!(unused.category, "Uncategorized");

        let used = performance(&point("b", &[true, false, true], &[], &[]), &HashMap::new());
        assert_eq!(used.times_used, 3);
        assert_eq!(used.times_resonated, 2);
        assert_eq!(used.resonance_rate, 67);
        assert_eq!(used.recent_usage[0].relationship_name, "Unknown");
    }

    #[test]
    fn test_recent_usage_resolves_names_and_caps() {
        let rel = DbRelationship {
            id: "r0".to_string(),
            name: "Ana".to_string(),
            organization: None,
            temperature: crate::types::Temperature::Warm,
            is_active: true,
            cultural_approach: None,
            last_interaction_date: None,
        };
        let mut lookup = HashMap::new();
        lookup.insert("r0", &rel);
        let p = performance(&point("a", &[true; 7], &[], &[]), &lookup);
        assert_eq!(p.recent_usage.len(), 5);
        assert_eq!(p.recent_usage[0].relationship_name, "Ana");
    }

    #[test]
    fn test_intelligence_rollups() {
        let points = vec![
            point("a", &[true, true, true, false], &["CFO"], &[]),
            point("b", &[true, false], &["CFO", "COO"], &[]),
            point("c", &[false, false, false], &["CFO"], &[]),
            point("d", &[], &["CFO"], &[]),
        ];
        let intel = build_intelligence(performances(&points, &HashMap::new()));
        assert_eq!(intel.total_proof_points, 4);
        // 4 of 9 uses resonated
        assert_eq!(intel.overall_resonance_rate, 44);
        let top: Vec<&str> = intel.top_performers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(top, vec!["a", "c"]);
        assert_eq!(intel.by_category["Uncategorized"].len(), 4);
        let cfo: Vec<u32> = intel.persona_effectiveness["CFO"].iter().map(|r| r.rate).collect();
        assert_eq!(cfo, vec![75, 50, 0]);
        assert_eq!(intel.persona_effectiveness["COO"].len(), 1);
    }

    #[test]
    fn test_context_match_outranks_popularity() {
        let matched = perf("matched", 50, &["CFO"]);
        let popular = perf("popular", 65, &[]);
        let picks = recommend(
            &[popular, matched],
            &MeetingContext {
                persona: Some("CFO".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(picks.len(), 1, "no-match points are never recommended");
        assert_eq!(picks[0].proof_point.id, "matched");
        assert_eq!(picks[0].match_score, 70);
    }

    #[test]
    fn test_recommend_ties_prefer_resonance() {
        let mut geo = perf("geo", 55, &[]);
        geo.relevant_geographies = vec!["Brazil".to_string()];
        let persona = perf("persona", 50, &["CFO"]);
        let picks = recommend(
            &[persona, geo],
            &MeetingContext {
                persona: Some("CFO".to_string()),
                geography: Some("Brazil".to_string()),
                service: None,
            },
        );
        let ids: Vec<&str> = picks.iter().map(|p| p.proof_point.id.as_str()).collect();
        assert_eq!(ids, vec!["geo", "persona"]);
        assert!(recommend(&[perf("x", 90, &["CFO"])], &MeetingContext::default()).is_empty());
    }

    #[test]
    fn test_best_for_persona() {
        let all = vec![perf("a", 10, &["CFO"]), perf("b", 80, &["CFO"]), perf("c", 99, &["CTO"])];
        let best: Vec<String> = best_for_persona(&all, "CFO").into_iter().map(|p| p.id).collect();
        assert_eq!(best, vec!["b", "a"]);
    }
}
