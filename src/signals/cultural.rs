//! Regional pattern inference from free-text cultural notes.
//!
//! Each relationship lands in exactly one geography. Rules are evaluated in
//! table order and the first rule with a whole-word keyword hit wins;
//! approach text and interaction notes have their own keyword lists.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::db::RelationshipHistory;
use crate::util::round_to;

use super::defaults::GLOBAL_GEOGRAPHY;

/// (geography, approach keywords, interaction-note keywords)
pub const GEOGRAPHY_RULES: &[(&str, &[&str], &[&str])] = &[
    ("Brazil", &["brazil", "brazilian"], &["brazil", "brazilian"]),
    ("Latin America", &["latam", "latin america"], &["latam", "latin america"]),
    ("United States", &["us", "usa", "american"], &["american"]),
    ("Europe", &["europe", "european", "eu"], &["european"]),
    ("United Kingdom", &["uk", "british"], &["british"]),
    ("Asia-Pacific", &["asia", "apac", "asian"], &["asian"]),
    ("Japan", &["japan", "japanese"], &["japanese"]),
    ("Africa", &["africa", "african"], &["african"]),
    ("Middle East", &["middle east"], &["middle east"]),
];

/// (keyword in a common approach, style note)
const STYLE_RULES: &[(&str, &str)] = &[
    ("formal", "Formal communication preferred"),
    ("relationship", "Relationship-first approach"),
    ("direct", "Direct communication style"),
];

const EXTENDED_BUILDING_NOTE: &str = "Extended relationship building";
const EXTENDED_BUILDING_ABOVE: f64 = 4.0;

const PROPOSAL_STAGES: &[&str] = &["Qualified", "Committed"];
const COMMON_APPROACHES: usize = 3;
const KEY_INSIGHTS: usize = 5;
const INSIGHTS_PER_NOTE: usize = 2;
const CONTEXT_INSIGHTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalPattern {
    pub geography: String,
    pub relationship_count: usize,
    pub common_approaches: Vec<String>,
    pub avg_meetings_before_proposal: f64,
    pub key_insights: Vec<String>,
    pub communication_style: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipCulturalContext {
    pub relationship_id: String,
    pub name: String,
    pub organization: String,
    pub geography: String,
    pub cultural_approach: Option<String>,
    pub cultural_insights: Vec<String>,
    pub meeting_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalPrep {
    pub geography: String,
    pub approach: Option<String>,
    pub avg_meetings_in_region: f64,
    pub key_considerations: Vec<String>,
    pub previous_cultural_notes: Vec<String>,
}

impl Default for CulturalPrep {
    fn default() -> Self {
        Self {
            geography: GLOBAL_GEOGRAPHY.to_string(),
            approach: None,
            avg_meetings_in_region: 0.0,
            key_considerations: Vec::new(),
            previous_cultural_notes: Vec::new(),
        }
    }
}

struct CompiledRule {
    geography: &'static str,
    approach: Regex,
    context: Regex,
}

fn word_pattern(keywords: &[&str]) -> Regex {
    let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("geography keyword pattern")
}

fn compiled_rules() -> &'static [CompiledRule] {
    static RULES: OnceLock<Vec<CompiledRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        GEOGRAPHY_RULES
            .iter()
            .map(|(geography, approach, context)| CompiledRule {
                geography: *geography,
                approach: word_pattern(approach),
                context: word_pattern(context),
            })
            .collect()
    })
}

/// True when some word in `text` starts with `stem`, so plurals and
/// suffixed forms match but a stem buried mid-word ("informal") does not.
fn has_word_with_stem(text: &str, stem: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.starts_with(stem))
}

/// Geography for an approach string plus interaction notes. Matching is
/// case-insensitive; no hit means "Global".
pub fn infer_geography<'a, I>(approach: Option<&str>, notes: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    let approach = approach.unwrap_or_default().to_lowercase();
    let notes = notes
        .into_iter()
        .filter(|n| !n.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    compiled_rules()
        .iter()
        .find(|rule| rule.approach.is_match(&approach) || rule.context.is_match(&notes))
        .map(|rule| rule.geography)
        .unwrap_or(GLOBAL_GEOGRAPHY)
}

pub fn geography_of(history: &RelationshipHistory) -> &'static str {
    infer_geography(
        history.relationship.cultural_approach.as_deref(),
        history
            .interactions
            .iter()
            .filter_map(|i| i.cultural_context.as_deref()),
    )
}

/// Short sentences from a note, at most two per note.
pub fn extract_insights(note: &str) -> Vec<String> {
    note.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| {
            let len = s.chars().count();
            len > 10 && len < 100
        })
        .take(INSIGHTS_PER_NOTE)
        .map(str::to_string)
        .collect()
}

fn common_approaches(group: &[&RelationshipHistory]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for approach in group
        .iter()
        .filter_map(|h| h.relationship.cultural_approach.as_deref())
        .filter(|a| !a.trim().is_empty())
    {
        match counts.iter_mut().find(|(a, _)| *a == approach) {
            Some((_, n)) => *n += 1,
            None => counts.push((approach, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(COMMON_APPROACHES)
        .map(|(a, _)| a.to_string())
        .collect()
}

fn key_insights(group: &[&RelationshipHistory]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    group
        .iter()
        .flat_map(|h| h.interactions.iter())
        .filter_map(|i| i.cultural_context.as_deref())
        .flat_map(extract_insights)
        .filter(|insight| seen.insert(insight.clone()))
        .take(KEY_INSIGHTS)
        .collect()
}

/// Mean meetings on or before the first move into a proposal stage, over the
/// relationships that made that move.
fn avg_meetings_before_proposal(group: &[&RelationshipHistory]) -> f64 {
    let counts: Vec<usize> = group
        .iter()
        .filter_map(|h| {
            let reached = h
                .transitions
                .iter()
                .filter(|t| PROPOSAL_STAGES.contains(&t.to_stage.as_str()))
                .map(|t| t.transition_date)
                .min()?;
            Some(
                h.interactions
                    .iter()
                    .filter(|i| i.meeting_date <= reached)
                    .count(),
            )
        })
        .collect();
    if counts.is_empty() {
        return 0.0;
    }
    round_to(counts.iter().sum::<usize>() as f64 / counts.len() as f64, 1)
}

fn communication_style(approaches: &[String], avg_meetings: f64) -> Vec<String> {
    let lowered: Vec<String> = approaches.iter().map(|a| a.to_lowercase()).collect();
    let mut notes: Vec<String> = STYLE_RULES
        .iter()
        .filter(|(keyword, _)| lowered.iter().any(|a| has_word_with_stem(a, keyword)))
        .map(|(_, note)| note.to_string())
        .collect();
    if avg_meetings > EXTENDED_BUILDING_ABOVE {
        notes.push(EXTENDED_BUILDING_NOTE.to_string());
    }
    notes
}

/// Geography -> pattern over the given relationships.
pub fn build_patterns(histories: &[RelationshipHistory]) -> BTreeMap<String, CulturalPattern> {
    let mut groups: BTreeMap<&'static str, Vec<&RelationshipHistory>> = BTreeMap::new();
    for history in histories {
        groups.entry(geography_of(history)).or_default().push(history);
    }

    groups
        .into_iter()
        .map(|(geography, group)| {
            let approaches = common_approaches(&group);
            let avg_meetings = avg_meetings_before_proposal(&group);
            let pattern = CulturalPattern {
                geography: geography.to_string(),
                relationship_count: group.len(),
                communication_style: communication_style(&approaches, avg_meetings),
                common_approaches: approaches,
                avg_meetings_before_proposal: avg_meetings,
                key_insights: key_insights(&group),
            };
            (geography.to_string(), pattern)
        })
        .collect()
}

pub fn relationship_context(history: &RelationshipHistory) -> RelationshipCulturalContext {
    let mut noted: Vec<_> = history
        .interactions
        .iter()
        .filter(|i| i.cultural_context.as_deref().is_some_and(|c| !c.trim().is_empty()))
        .collect();
    noted.sort_by(|a, b| b.meeting_date.cmp(&a.meeting_date));

    let rel = &history.relationship;
    RelationshipCulturalContext {
        relationship_id: rel.id.clone(),
        name: rel.name.clone(),
        organization: rel.organization.clone().unwrap_or_default(),
        geography: geography_of(history).to_string(),
        cultural_approach: rel.cultural_approach.clone(),
        cultural_insights: noted
            .into_iter()
            .take(CONTEXT_INSIGHTS)
            .filter_map(|i| i.cultural_context.clone())
            .collect(),
        meeting_count: history.interactions.len(),
    }
}

/// Per-relationship notes merged with what its region tends to look like.
pub fn prep_for_meeting(
    context: &RelationshipCulturalContext,
    patterns: &BTreeMap<String, CulturalPattern>,
) -> CulturalPrep {
    let region = patterns.get(&context.geography);
    CulturalPrep {
        geography: context.geography.clone(),
        approach: context.cultural_approach.clone(),
        avg_meetings_in_region: region.map(|p| p.avg_meetings_before_proposal).unwrap_or(0.0),
        key_considerations: region
            .map(|p| p.communication_style.clone())
            .unwrap_or_default(),
        previous_cultural_notes: context.cultural_insights.clone(),
    }
}

pub fn geography_distribution(
    patterns: &BTreeMap<String, CulturalPattern>,
) -> BTreeMap<String, usize> {
    patterns
        .iter()
        .map(|(geography, p)| (geography.clone(), p.relationship_count))
        .collect()
}
