//! Cosmetic risk tagging for approval cards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low risk",
            RiskLevel::Medium => "medium risk",
            RiskLevel::High => "high risk",
            RiskLevel::Unknown => "unknown risk",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            RiskLevel::Low => "Calculation, usually safe",
            RiskLevel::Medium => "Touches files or the network, check the target",
            RiskLevel::High => "Calls an external service, confirm carefully",
            RiskLevel::Unknown => "Review the operation before approving",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a request by keywords in its description.
pub fn classify_risk(description: &str) -> RiskLevel {
    let lower = description.to_lowercase();

    if lower.contains("calculate") {
        RiskLevel::Low
    } else if lower.contains("file") {
        RiskLevel::Medium
    } else if lower.contains("web") || lower.contains("search") {
        RiskLevel::Medium
    } else if lower.contains("mcp") {
        RiskLevel::High
    } else {
        RiskLevel::Unknown
    }
}
