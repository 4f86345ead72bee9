use serde::{Deserialize, Serialize};

use super::domain::JobPosting;
use super::safety::{ApplicationActivity, ApplicationOutcome};

/// Per-company intelligence used by risk scoring and timing analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    /// 1.0..=5.0 employee satisfaction rating.
    pub employee_satisfaction: f64,
    /// Average hours until the company responds to an application.
    pub avg_response_hours: f64,
}

/// Market-wide intelligence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Relative hiring velocity; 1.0 is baseline.
    pub hiring_velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn for_score(score: f64) -> Self {
        if score <= 0.3 {
            RiskLevel::Low
        } else if score <= 0.6 {
            RiskLevel::Medium
        } else if score <= 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Accumulated risk view for one prospective submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f64,
    pub factors: Vec<String>,
    pub mitigations: Vec<String>,
    pub proceed: bool,
}

const THIN_DESCRIPTION_CHARS: usize = 200;
const RECENT_OUTCOME_WINDOW: usize = 10;
const REJECTION_ALARM: usize = 5;

/// Additive risk model over posting quality, company reputation, and recent
/// submission outcomes.
pub fn assess_risk(
    job: &JobPosting,
    company: &CompanySnapshot,
    market: &MarketSnapshot,
    activity: &ApplicationActivity,
) -> RiskAssessment {
    let mut factors = Vec::new();
    let mut score = 0.0;

    if job.description.chars().count() < THIN_DESCRIPTION_CHARS {
        factors.push("Low-quality job description".to_string());
        score += 0.2;
    }

    if company.employee_satisfaction < 3.0 {
        factors.push("Low employee satisfaction ratings".to_string());
        score += 0.3;
    }

    if job.salary.and_then(|salary| salary.midpoint()).is_none() {
        factors.push("No salary information provided".to_string());
        score += 0.1;
    }

    let recent_rejections = activity
        .recent_outcomes
        .iter()
        .take(RECENT_OUTCOME_WINDOW)
        .filter(|outcome| **outcome == ApplicationOutcome::Rejected)
        .count();
    if recent_rejections >= REJECTION_ALARM {
        factors.push("High recent rejection rate".to_string());
        score += 0.4;
    }

    if market.hiring_velocity < 1.0 {
        factors.push("Low market hiring velocity".to_string());
        score += 0.2;
    }

    let level = RiskLevel::for_score(score);
    let mitigations = factors.iter().map(|factor| mitigation(factor)).collect();

    RiskAssessment {
        level,
        score,
        factors,
        mitigations,
        proceed: matches!(level, RiskLevel::Low | RiskLevel::Medium),
    }
}

fn mitigation(factor: &str) -> String {
    if factor.contains("description") {
        "Research the company before relying on the posting text".to_string()
    } else if factor.contains("satisfaction") {
        "Review employee feedback before investing further".to_string()
    } else if factor.contains("salary") {
        "Clarify compensation expectations early in the process".to_string()
    } else if factor.contains("rejection") {
        "Revisit profile positioning before submitting more applications".to_string()
    } else {
        "Prioritize higher-velocity segments of the market".to_string()
    }
}
