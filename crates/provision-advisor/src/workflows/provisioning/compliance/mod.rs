mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::ResourceRequest;
use rules::{ComplianceRule, STANDARD_RULES};

pub const PASSING_SCORE: u8 = 80;
const STARTING_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Passed,
    Failed,
}

impl ComplianceStatus {
    pub fn for_score(score: u8) -> Self {
        if score >= PASSING_SCORE {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

/// Score, verdict, and findings in rule evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    #[serde(rename = "compliance_score")]
    pub score: u8,
    pub status: ComplianceStatus,
    pub suggestions: Vec<String>,
}

/// Stateless scorer. Every call starts from 100 with no findings.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceAdvisor {
    rules: &'static [ComplianceRule],
}

impl Default for ComplianceAdvisor {
    fn default() -> Self {
        Self {
            rules: &STANDARD_RULES,
        }
    }
}

impl ComplianceAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_rules(rules: &'static [ComplianceRule]) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, resource: &ResourceRequest) -> ComplianceResult {
        let mut score = STARTING_SCORE;
        let mut suggestions = Vec::new();

        for rule in self.rules {
            if (rule.violated)(resource) {
                debug!(
                    resource = %resource.resource_name,
                    category = ?rule.category,
                    deduction = rule.deduction,
                    "compliance rule violated"
                );
                score = score.saturating_sub(rule.deduction);
                suggestions.push(rule.message.to_string());
            }
        }

        ComplianceResult {
            score,
            status: ComplianceStatus::for_score(score),
            suggestions,
        }
    }
}
