//! Fallback values used when there is nothing to measure.
//!
//! Several engines share the same convention: absence of data is not a
//! failure. An empty window scores as fully delivered, a missing counterpart
//! scores as balanced, and a stage without history uses its documented
//! expected duration.

use std::collections::HashMap;

/// Completion rate reported when nothing fell due in the window.
pub const DEFAULT_COMPLETION_RATE: u32 = 100;

/// Reciprocity balance reported when the other side has no commitments.
pub const DEFAULT_RECIPROCITY_BALANCE: f64 = 1.0;

/// Expected days for a stage that is neither in history nor in the table.
pub const GENERIC_STAGE_DAYS: i64 = 21;

/// Expected days per pipeline stage when the history has no samples.
pub const DEFAULT_STAGE_DAYS: &[(&str, i64)] = &[
    ("Identified", 14),
    ("Engaged", 21),
    ("Exploring", 21),
    ("Qualified", 30),
    ("Negotiating", 30),
    ("Committed", 45),
    ("Active", 60),
    ("Nurturing", 30),
];

/// Geography label for relationships no regional rule matched.
pub const GLOBAL_GEOGRAPHY: &str = "Global";

/// The stage fallback table, with configured overrides applied on top.
pub fn stage_defaults(overrides: &HashMap<String, i64>) -> HashMap<String, i64> {
    let mut table: HashMap<String, i64> = DEFAULT_STAGE_DAYS
        .iter()
        .map(|(stage, days)| (stage.to_string(), *days))
        .collect();
    for (stage, days) in overrides {
        if *days > 0 {
            table.insert(stage.clone(), *days);
        } else {
            log::warn!("Ignoring non-positive stage default {}={}", stage, days);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_defaults_apply_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("Qualified".to_string(), 40);
        overrides.insert("Pilot".to_string(), 10);
        overrides.insert("Engaged".to_string(), 0);

        let table = stage_defaults(&overrides);
        assert_eq!(table.get("Qualified"), Some(&40));
        assert_eq!(table.get("Pilot"), Some(&10));
        assert_eq!(table.get("Engaged"), Some(&21));
        assert_eq!(table.get("Identified"), Some(&14));
    }
}
