//! Multi-factor risk composition.
//!
//! Each factor contributes a level; the composite is a weighted sum mapped
//! back to a level. The result is informational: handlers decide whether a
//! High or Critical composite promotes a decision to a block.

use serde::{Deserialize, Serialize};

/// Discrete risk level with a fixed numeric mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Numeric score for weighting: NONE=0, LOW=25, MEDIUM=50, HIGH=75, CRITICAL=100.
    pub fn score(&self) -> u32 {
        match self {
            RiskLevel::None => 0,
            RiskLevel::Low => 25,
            RiskLevel::Medium => 50,
            RiskLevel::High => 75,
            RiskLevel::Critical => 100,
        }
    }

    /// Inverse mapping from a weighted composite score.
    pub fn from_score(score: u32) -> RiskLevel {
        match score {
            90.. => RiskLevel::Critical,
            65.. => RiskLevel::High,
            35.. => RiskLevel::Medium,
            10.. => RiskLevel::Low,
            _ => RiskLevel::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const WEIGHT_PATH: u32 = 30;
const WEIGHT_CONTENT: u32 = 25;
const WEIGHT_OPERATION: u32 = 20;
const WEIGHT_FREQUENCY: u32 = 15;
const WEIGHT_CONTEXT: u32 = 10;

/// Per-factor levels for one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RiskFactors {
    pub path: RiskLevel,
    pub content: RiskLevel,
    pub operation: RiskLevel,
    pub frequency: RiskLevel,
    pub context: RiskLevel,
}

impl RiskFactors {
    /// Weighted composite score in 0..=100.
    pub fn composite_score(&self) -> u32 {
        (self.path.score() * WEIGHT_PATH
            + self.content.score() * WEIGHT_CONTENT
            + self.operation.score() * WEIGHT_OPERATION
            + self.frequency.score() * WEIGHT_FREQUENCY
            + self.context.score() * WEIGHT_CONTEXT)
            / 100
    }

    /// Composite level via the inverse mapping.
    pub fn composite(&self) -> RiskLevel {
        RiskLevel::from_score(self.composite_score())
    }
}
