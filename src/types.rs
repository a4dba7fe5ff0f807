//! Closed vocabularies shared by the store and the signal engines.
//!
//! Capture tools write these values as loose strings ("ours", "360",
//! "Incoming"...). They are normalized exactly once, when a row is read out
//! of the store, so the scoring code only ever matches on enums.

use serde::{Deserialize, Serialize};

/// Categorical warmth of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temperature {
    Hot,
    Warm,
    Cool,
    Cold,
    Cooling,
    Unknown,
}

impl Temperature {
    /// Parse from SQL string. Missing or unrecognized values are `Unknown`.
    pub fn from_str_lossy(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("hot") => Temperature::Hot,
            Some("warm") => Temperature::Warm,
            Some("cool") => Temperature::Cool,
            Some("cold") => Temperature::Cold,
            Some("cooling") => Temperature::Cooling,
            _ => Temperature::Unknown,
        }
    }

    /// Cold and cooling relationships count as a stall risk factor.
    pub fn is_cold(&self) -> bool {
        matches!(self, Temperature::Cold | Temperature::Cooling)
    }
}

/// Direction recorded on a single interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureChange {
    Warmer,
    Cooler,
    Stable,
}

impl TemperatureChange {
    /// `None` means the interaction carries no temperature signal at all.
    pub fn from_str_lossy(s: Option<&str>) -> Option<Self> {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("warmer") | Some("warming") | Some("up") => Some(TemperatureChange::Warmer),
            Some("cooler") | Some("cooling") | Some("down") => Some(TemperatureChange::Cooler),
            Some("stable") | Some("same") | Some("unchanged") => Some(TemperatureChange::Stable),
            _ => None,
        }
    }
}

/// Which side of the relationship owes a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentOwner {
    Us,
    Them,
}

impl CommitmentOwner {
    /// Normalize the owner labels used by capture. Anything else has no
    /// side and stays out of trust scoring.
    pub fn normalize(s: Option<&str>) -> Option<Self> {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("us") | Some("ours") | Some("360") => Some(CommitmentOwner::Us),
            Some("them") | Some("theirs") | Some("partner") | Some("client") => {
                Some(CommitmentOwner::Them)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentStatus {
    Pending,
    Completed,
    /// Cancelled, deferred or any other state capture writes. Not owed and
    /// not delivered.
    Other,
}

impl CommitmentStatus {
    /// Only an explicit pending status is still owed.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => CommitmentStatus::Pending,
            "completed" | "complete" | "done" => CommitmentStatus::Completed,
            _ => CommitmentStatus::Other,
        }
    }
}

/// Whether we made an introduction for someone or someone made one to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntroDirection {
    Made,
    Received,
}

impl IntroDirection {
    pub fn normalize(s: Option<&str>) -> Option<Self> {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("made") | Some("outgoing") | Some("given") => Some(IntroDirection::Made),
            Some("received") | Some("incoming") => Some(IntroDirection::Received),
            _ => None,
        }
    }
}

/// Stall severity. Ordered by urgency: `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn severity_rank(&self) -> u8 {
        match self {
            RiskLevel::High => 0,
            RiskLevel::Medium => 1,
            RiskLevel::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Heating,
    Cooling,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumStrength {
    Strong,
    Moderate,
    Weak,
}

/// Reading of the us/them commitment ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReciprocitySignal {
    WeOverCommitted,
    TheyOverCommitted,
    Balanced,
}
