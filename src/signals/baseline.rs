//! Historical stage durations.
//!
//! Every transition records how long the relationship sat in the stage it
//! left. Averaging those per `from_stage` gives the expected dwell time the
//! stall detector measures against.

use std::collections::HashMap;

use crate::db::DbStageTransition;

use super::defaults::GENERIC_STAGE_DAYS;

/// Mean days spent per stage, rounded to whole days.
///
/// Transitions without a `from_stage` or a recorded duration contribute no
/// sample. Empty history yields an empty map.
pub fn compute_stage_averages(transitions: &[DbStageTransition]) -> HashMap<String, i64> {
    let mut samples: HashMap<&str, (i64, i64)> = HashMap::new();
    for t in transitions {
        let (Some(stage), Some(days)) = (t.from_stage.as_deref(), t.days_in_previous_stage) else {
            continue;
        };
        let entry = samples.entry(stage).or_insert((0, 0));
        entry.0 += days;
        entry.1 += 1;
    }

    samples
        .into_iter()
        .map(|(stage, (total, count))| {
            let avg = (total as f64 / count as f64).round() as i64;
            (stage.to_string(), avg)
        })
        .collect()
}

/// Expected stage durations: measured history first, then the fallback table.
#[derive(Debug, Clone)]
pub struct StageBaseline {
    averages: HashMap<String, i64>,
    fallback: HashMap<String, i64>,
}

impl StageBaseline {
    pub fn new(transitions: &[DbStageTransition], fallback: HashMap<String, i64>) -> Self {
        Self {
            averages: compute_stage_averages(transitions),
            fallback,
        }
    }

    /// Expected days for `stage`. A measured average of zero days is treated
    /// as no sample, since it cannot anchor a multiplier.
    pub fn expected_days(&self, stage: &str) -> i64 {
        self.averages
            .get(stage)
            .copied()
            .filter(|avg| *avg > 0)
            .or_else(|| self.fallback.get(stage).copied())
            .unwrap_or(GENERIC_STAGE_DAYS)
    }
}
