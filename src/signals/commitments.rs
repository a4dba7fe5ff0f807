//! Commitment delivery and reciprocity scoring.
//!
//! Commitments split by owning side. Each side gets its own pending/overdue
//! picture and a trailing 30-day completion rate; the ratio between the two
//! sides' totals is the reciprocity balance.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::db::DbCommitment;
use crate::types::{CommitmentOwner, CommitmentStatus, ReciprocitySignal};
use crate::util::{days_between, percent, round_to};

use super::defaults::{DEFAULT_COMPLETION_RATE, DEFAULT_RECIPROCITY_BALANCE};

const COMPLETION_WINDOW_DAYS: i64 = 30;
const WE_OVER_COMMITTED_ABOVE: f64 = 1.5;
const THEY_OVER_COMMITTED_BELOW: f64 = 0.667;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueCommitment {
    #[serde(flatten)]
    pub commitment: DbCommitment,
    pub days_overdue: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideMetrics {
    pub pending: usize,
    pub overdue: usize,
    pub completion_rate_30d: u32,
    pub avg_days_to_complete: i64,
    pub overdue_items: Vec<OverdueCommitment>,
}

impl Default for SideMetrics {
    fn default() -> Self {
        Self {
            pending: 0,
            overdue: 0,
            completion_rate_30d: DEFAULT_COMPLETION_RATE,
            avg_days_to_complete: 0,
            overdue_items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustScore {
    pub we_deliver: u32,
    pub they_deliver: u32,
    pub reciprocity_balance: f64,
    pub reciprocity_signal: ReciprocitySignal,
}

impl Default for TrustScore {
    fn default() -> Self {
        Self {
            we_deliver: DEFAULT_COMPLETION_RATE,
            they_deliver: DEFAULT_COMPLETION_RATE,
            reciprocity_balance: DEFAULT_RECIPROCITY_BALANCE,
            reciprocity_signal: ReciprocitySignal::Balanced,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentMetrics {
    pub us: SideMetrics,
    pub them: SideMetrics,
    pub trust_score: TrustScore,
}

/// One relationship's commitments, split by side. Unattributed ones are left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitmentsBySide {
    pub us: Vec<DbCommitment>,
    pub them: Vec<DbCommitment>,
}

pub fn split_by_owner(commitments: Vec<DbCommitment>) -> CommitmentsBySide {
    let mut sides = CommitmentsBySide::default();
    for c in commitments {
        match c.owner {
            Some(CommitmentOwner::Us) => sides.us.push(c),
            Some(CommitmentOwner::Them) => sides.them.push(c),
            None => {}
        }
    }
    sides
}

pub fn reciprocity_balance(ours: usize, theirs: usize) -> f64 {
    if theirs == 0 {
        return DEFAULT_RECIPROCITY_BALANCE;
    }
    round_to(ours as f64 / theirs as f64, 2)
}

pub fn reciprocity_signal(balance: f64) -> ReciprocitySignal {
    if balance > WE_OVER_COMMITTED_ABOVE {
        ReciprocitySignal::WeOverCommitted
    } else if balance < THEY_OVER_COMMITTED_BELOW {
        ReciprocitySignal::TheyOverCommitted
    } else {
        ReciprocitySignal::Balanced
    }
}

fn side_metrics(items: &[DbCommitment], today: NaiveDate) -> SideMetrics {
    let pending: Vec<&DbCommitment> = items
        .iter()
        .filter(|c| c.status == CommitmentStatus::Pending)
        .collect();

    let mut overdue_items: Vec<OverdueCommitment> = pending
        .iter()
        .filter_map(|c| {
            let due = c.due_date.filter(|due| *due < today)?;
            Some(OverdueCommitment {
                commitment: (*c).clone(),
                days_overdue: days_between(due, today),
            })
        })
        .collect();
    overdue_items.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));

    let window_start = today - Duration::days(COMPLETION_WINDOW_DAYS);
    let due_in_window: Vec<&DbCommitment> = items
        .iter()
        .filter(|c| matches!(c.due_date, Some(due) if due >= window_start && due <= today))
        .collect();
    let completion_rate_30d = if due_in_window.is_empty() {
        DEFAULT_COMPLETION_RATE
    } else {
        let completed = due_in_window
            .iter()
            .filter(|c| c.status == CommitmentStatus::Completed)
            .count();
        percent(completed, due_in_window.len())
    };

    let durations: Vec<f64> = items
        .iter()
        .filter(|c| c.status == CommitmentStatus::Completed)
        .filter_map(|c| {
            let elapsed = c.completed_at? - c.created_at?;
            Some(elapsed.num_seconds() as f64 / 86_400.0)
        })
        .collect();
    let avg_days_to_complete = if durations.is_empty() {
        0
    } else {
        (durations.iter().sum::<f64>() / durations.len() as f64).round() as i64
    };

    SideMetrics {
        pending: pending.len(),
        overdue: overdue_items.len(),
        completion_rate_30d,
        avg_days_to_complete,
        overdue_items,
    }
}

/// Us/them metrics and the trust score over every attributed commitment.
pub fn compute_metrics(commitments: Vec<DbCommitment>, today: NaiveDate) -> CommitmentMetrics {
    let sides = split_by_owner(commitments);
    let us = side_metrics(&sides.us, today);
    let them = side_metrics(&sides.them, today);
    let balance = reciprocity_balance(sides.us.len(), sides.them.len());

    CommitmentMetrics {
        trust_score: TrustScore {
            we_deliver: us.completion_rate_30d,
            they_deliver: them.completion_rate_30d,
            reciprocity_balance: balance,
            reciprocity_signal: reciprocity_signal(balance),
        },
        us,
        them,
    }
}
