//! Introduction funnel and introducer attribution.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{DbIntroduction, DbRelationship};
use crate::types::IntroDirection;
use crate::util::percent;

/// Statuses that still need someone to act on them.
pub const PENDING_STATUSES: &[&str] = &["discussed", "requested", "pending"];

const TOP_INTRODUCERS: usize = 10;
const RECENT_INTRODUCTIONS: usize = 10;

const OUTCOME_ACTIVE_DEAL: &str = "active_deal";
const OUTCOME_CONVERTED: &str = "converted";
const UNKNOWN_NAME: &str = "Unknown";

/// id -> relationship, built once per report.
pub type RelationshipLookup<'a> = HashMap<&'a str, &'a DbRelationship>;

pub fn build_lookup(relationships: &[DbRelationship]) -> RelationshipLookup<'_> {
    relationships.iter().map(|r| (r.id.as_str(), r)).collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionRecord {
    pub id: String,
    pub direction: Option<IntroDirection>,
    pub introduced_name: String,
    pub introduced_org: String,
    pub status: String,
    pub made_at: Option<NaiveDate>,
    pub first_meeting_at: Option<NaiveDate>,
    pub outcome: Option<String>,
    pub value_generated: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroducerStats {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub intros_made: usize,
    pub meetings_generated: usize,
    pub deals_generated: usize,
    pub total_value_generated: f64,
    pub conversion_rate: u32,
    pub introductions: Vec<IntroductionRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRates {
    pub intro_to_meeting: u32,
    pub meeting_to_deal: u32,
    pub overall: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionFunnel {
    pub total_intros: usize,
    pub meetings_set: usize,
    pub active_deals: usize,
    pub total_value: f64,
    pub conversion_rates: ConversionRates,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionCounts {
    pub made: usize,
    pub received: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionNetwork {
    pub funnel: IntroductionFunnel,
    pub top_introducers: Vec<IntroducerStats>,
    pub by_direction: DirectionCounts,
    pub recent_introductions: Vec<IntroductionRecord>,
    pub network_value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRoi {
    pub total_introductions_received: usize,
    pub total_value_generated: f64,
    pub avg_value_per_intro: f64,
    pub top_introducer_name: Option<String>,
    pub top_introducer_value: f64,
}

/// Every relationship id an introduction refers to, deduplicated.
pub fn referenced_relationship_ids(intros: &[DbIntroduction]) -> Vec<String> {
    let ids: BTreeSet<&str> = intros
        .iter()
        .flat_map(|i| [i.introducer_id.as_deref(), i.introduced_id.as_deref()])
        .flatten()
        .collect();
    ids.into_iter().map(str::to_string).collect()
}

/// Funnel deal: an active or converted outcome, or a relationship came out of it.
fn is_funnel_deal(intro: &DbIntroduction) -> bool {
    intro.outcome_relationship_id.is_some()
        || matches!(
            intro.outcome.as_deref(),
            Some(OUTCOME_ACTIVE_DEAL) | Some(OUTCOME_CONVERTED)
        )
}

/// Attributed deal: only converted outcomes credit the introducer.
fn is_attributed_deal(intro: &DbIntroduction) -> bool {
    intro.outcome_relationship_id.is_some() || intro.outcome.as_deref() == Some(OUTCOME_CONVERTED)
}

pub fn to_record(intro: &DbIntroduction, lookup: &RelationshipLookup<'_>) -> IntroductionRecord {
    let introduced = intro
        .introduced_id
        .as_deref()
        .and_then(|id| lookup.get(id).copied());
    IntroductionRecord {
        id: intro.id.clone(),
        direction: intro.direction,
        introduced_name: introduced
            .map(|r| r.name.clone())
            .or_else(|| intro.introduced_name.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        introduced_org: introduced
            .and_then(|r| r.organization.clone())
            .or_else(|| intro.introduced_organization.clone())
            .unwrap_or_default(),
        status: intro.status.clone(),
        made_at: intro.made_at,
        first_meeting_at: intro.first_meeting_at,
        outcome: intro.outcome.clone(),
        value_generated: intro.value_generated,
    }
}

pub fn compute_funnel(intros: &[DbIntroduction]) -> IntroductionFunnel {
    let total_intros = intros.len();
    let meetings_set = intros.iter().filter(|i| i.first_meeting_at.is_some()).count();
    let active_deals = intros.iter().filter(|i| is_funnel_deal(i)).count();
    let total_value: f64 = intros.iter().filter_map(|i| i.value_generated).sum();

    IntroductionFunnel {
        total_intros,
        meetings_set,
        active_deals,
        total_value,
        conversion_rates: ConversionRates {
            intro_to_meeting: percent(meetings_set, total_intros),
            meeting_to_deal: percent(active_deals, meetings_set),
            overall: percent(active_deals, total_intros),
        },
    }
}

/// Per-introducer rollup of received introductions, highest value first.
pub fn introducer_stats(
    intros: &[DbIntroduction],
    lookup: &RelationshipLookup<'_>,
) -> Vec<IntroducerStats> {
    let mut order: Vec<IntroducerStats> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for intro in intros {
        if intro.direction != Some(IntroDirection::Received) {
            continue;
        }
        let Some(introducer_id) = intro.introducer_id.as_deref() else {
            continue;
        };

        let slot = *index.entry(introducer_id).or_insert_with(|| {
            let introducer = lookup.get(introducer_id).copied();
            order.push(IntroducerStats {
                id: introducer_id.to_string(),
                name: introducer
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                organization: introducer
                    .and_then(|r| r.organization.clone())
                    .unwrap_or_default(),
                intros_made: 0,
                meetings_generated: 0,
                deals_generated: 0,
                total_value_generated: 0.0,
                conversion_rate: 0,
                introductions: Vec::new(),
            });
            order.len() - 1
        });

        let stats = &mut order[slot];
        stats.intros_made += 1;
        if intro.first_meeting_at.is_some() {
            stats.meetings_generated += 1;
        }
        if is_attributed_deal(intro) {
            stats.deals_generated += 1;
        }
        stats.total_value_generated += intro.value_generated.unwrap_or(0.0);
        stats.introductions.push(to_record(intro, lookup));
    }

    for stats in &mut order {
        stats.conversion_rate = percent(stats.deals_generated, stats.intros_made);
    }
    order.sort_by(|a, b| b.total_value_generated.total_cmp(&a.total_value_generated));
    order
}

pub fn direction_counts(intros: &[DbIntroduction]) -> DirectionCounts {
    DirectionCounts {
        made: intros
            .iter()
            .filter(|i| i.direction == Some(IntroDirection::Made))
            .count(),
        received: intros
            .iter()
            .filter(|i| i.direction == Some(IntroDirection::Received))
            .count(),
    }
}

/// Full network report. `intros` must be newest first.
pub fn build_network(
    intros: &[DbIntroduction],
    lookup: &RelationshipLookup<'_>,
) -> IntroductionNetwork {
    let funnel = compute_funnel(intros);
    let mut top_introducers = introducer_stats(intros, lookup);
    top_introducers.truncate(TOP_INTRODUCERS);

    IntroductionNetwork {
        network_value: funnel.total_value,
        funnel,
        top_introducers,
        by_direction: direction_counts(intros),
        recent_introductions: intros
            .iter()
            .take(RECENT_INTRODUCTIONS)
            .map(|i| to_record(i, lookup))
            .collect(),
    }
}

pub fn network_roi(network: &IntroductionNetwork) -> NetworkRoi {
    let received = network.by_direction.received;
    let avg_value_per_intro = if received > 0 {
        (network.network_value / received as f64).round()
    } else {
        0.0
    };
    let top = network.top_introducers.first();

    NetworkRoi {
        total_introductions_received: received,
        total_value_generated: network.network_value,
        avg_value_per_intro,
        top_introducer_name: top.map(|t| t.name.clone()),
        top_introducer_value: top.map(|t| t.total_value_generated).unwrap_or(0.0),
    }
}
