//! Temperature momentum over a short window of recent interactions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{DbInteraction, RelationshipHistory};
use crate::types::{Momentum, MomentumStrength, Temperature, TemperatureChange};

/// Window used for the heating/cooling dashboard.
pub const DASHBOARD_WINDOW: usize = 3;
/// Window used when looking at a single relationship.
pub const DETAIL_WINDOW: usize = 5;

const MIN_BUCKET_COUNT: usize = 2;
const STRONG_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChange {
    pub date: NaiveDate,
    pub change: TemperatureChange,
    pub context: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureVelocity {
    pub relationship_id: String,
    pub current_temp: Temperature,
    pub momentum: Momentum,
    pub momentum_strength: MomentumStrength,
    pub recent_changes: Vec<RecentChange>,
    pub consecutive_direction: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumEntry {
    pub relationship_id: String,
    pub name: String,
    pub organization: String,
    pub current_temp: Temperature,
    pub momentum: Momentum,
    pub recent_changes: Vec<RecentChange>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumSummary {
    pub total_active: usize,
    pub heating: usize,
    pub cooling: usize,
    pub stable: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureVelocityDashboard {
    pub heating: Vec<MomentumEntry>,
    pub cooling: Vec<MomentumEntry>,
    pub summary: MomentumSummary,
}

/// Tallies over one window of changes, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentumReading {
    pub momentum: Momentum,
    pub strength: MomentumStrength,
    pub winning_count: usize,
    /// Run length of the newest change, before any stable override.
    pub run_length: usize,
}

/// The newest `window` interactions that carry a temperature change.
pub fn recent_changes(interactions: &[DbInteraction], window: usize) -> Vec<RecentChange> {
    let mut with_change: Vec<&DbInteraction> = interactions
        .iter()
        .rev()
        .filter(|i| i.temperature_change.is_some())
        .collect();
    // Stable sort keeps later-recorded entries first within a day.
    with_change.sort_by(|a, b| b.meeting_date.cmp(&a.meeting_date));

    with_change
        .into_iter()
        .take(window)
        .filter_map(|i| {
            Some(RecentChange {
                date: i.meeting_date,
                change: i.temperature_change?,
                context: i.outcome.clone().unwrap_or_default(),
            })
        })
        .collect()
}

pub fn read_momentum(changes: &[TemperatureChange]) -> MomentumReading {
    let warmer = changes.iter().filter(|c| **c == TemperatureChange::Warmer).count();
    let cooler = changes.iter().filter(|c| **c == TemperatureChange::Cooler).count();
    let run_length = changes
        .first()
        .map(|first| changes.iter().take_while(|c| *c == first).count())
        .unwrap_or(0);

    let (momentum, winning_count) = if warmer > cooler {
        (Momentum::Heating, warmer)
    } else if cooler > warmer {
        (Momentum::Cooling, cooler)
    } else {
        (Momentum::Stable, 0)
    };

    let strength = match momentum {
        Momentum::Stable => MomentumStrength::Weak,
        _ if winning_count >= STRONG_COUNT || run_length >= STRONG_COUNT => {
            MomentumStrength::Strong
        }
        _ if winning_count >= MIN_BUCKET_COUNT => MomentumStrength::Moderate,
        _ => MomentumStrength::Weak,
    };

    MomentumReading {
        momentum,
        strength,
        winning_count,
        run_length,
    }
}

/// Velocity for one relationship over the newest `window` changes.
pub fn velocity(history: &RelationshipHistory, window: usize) -> TemperatureVelocity {
    let recent = recent_changes(&history.interactions, window);
    let changes: Vec<TemperatureChange> = recent.iter().map(|c| c.change).collect();
    let reading = read_momentum(&changes);

    TemperatureVelocity {
        relationship_id: history.relationship.id.clone(),
        current_temp: history.relationship.temperature,
        momentum: reading.momentum,
        momentum_strength: reading.strength,
        recent_changes: recent,
        consecutive_direction: if reading.momentum == Momentum::Stable {
            0
        } else {
            reading.run_length
        },
    }
}

pub fn all_velocities(histories: &[RelationshipHistory]) -> BTreeMap<String, TemperatureVelocity> {
    histories
        .iter()
        .map(|h| (h.relationship.id.clone(), velocity(h, DETAIL_WINDOW)))
        .collect()
}

/// Heating and cooling buckets over active relationships.
///
/// A relationship needs at least two changes in the winning direction to be
/// bucketed; everything else counts as stable.
pub fn build_dashboard(histories: &[RelationshipHistory]) -> TemperatureVelocityDashboard {
    let mut dashboard = TemperatureVelocityDashboard::default();

    for history in histories {
        let recent = recent_changes(&history.interactions, DASHBOARD_WINDOW);
        let changes: Vec<TemperatureChange> = recent.iter().map(|c| c.change).collect();
        let reading = read_momentum(&changes);

        let bucket = match reading.momentum {
            Momentum::Heating if reading.winning_count >= MIN_BUCKET_COUNT => {
                Some(&mut dashboard.heating)
            }
            Momentum::Cooling if reading.winning_count >= MIN_BUCKET_COUNT => {
                Some(&mut dashboard.cooling)
            }
            _ => None,
        };

        match bucket {
            Some(entries) => entries.push(MomentumEntry {
                relationship_id: history.relationship.id.clone(),
                name: history.relationship.name.clone(),
                organization: history.relationship.organization.clone().unwrap_or_default(),
                current_temp: history.relationship.temperature,
                momentum: reading.momentum,
                recent_changes: recent,
            }),
            None => dashboard.summary.stable += 1,
        }
    }

    dashboard.summary.total_active = histories.len();
    dashboard.summary.heating = dashboard.heating.len();
    dashboard.summary.cooling = dashboard.cooling.len();
    dashboard
}
