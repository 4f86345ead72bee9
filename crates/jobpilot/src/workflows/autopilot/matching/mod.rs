pub mod oracle;
pub mod scoring;

pub use oracle::{HttpMatchOracle, MatchOracle, OracleAssessment, OracleError};
pub use scoring::{
    AlgorithmicScore, FactorScores, MatchFactor, MatchTier, ScoreComponent,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{JobId, JobPosting, RemotePreference, UserId, UserProfile, WorkMode};

/// Closed set of scoring strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Algorithmic,
    AiAugmented,
    Hybrid,
}

impl MatchStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            MatchStrategy::Algorithmic => "algorithmic",
            MatchStrategy::AiAugmented => "ai_augmented",
            MatchStrategy::Hybrid => "hybrid",
        }
    }
}

/// Records which path actually produced the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreProvenance {
    Algorithmic,
    Oracle,
    Hybrid,
    AlgorithmicFallback,
}

/// Composite scoring output for one profile/posting pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub user_id: UserId,
    pub job_id: JobId,
    pub overall: f64,
    pub tier: MatchTier,
    pub priority: u8,
    pub success_probability: f64,
    pub confidence: f64,
    pub provenance: ScoreProvenance,
    pub components: Vec<ScoreComponent>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub red_flags: Vec<String>,
    pub suggestions: Vec<String>,
}

impl MatchResult {
    /// Short human-readable rationale lines for queue entries.
    pub fn reasons(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|component| {
                format!(
                    "{}: {:.0} ({})",
                    component.factor.label(),
                    component.score,
                    component.notes
                )
            })
            .collect()
    }
}

/// Why a posting was excluded before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterRejection {
    InactivePosting,
    RemoteMismatch,
    SalaryBelowMinimum,
}

impl FilterRejection {
    pub const fn label(self) -> &'static str {
        match self {
            FilterRejection::InactivePosting => "inactive_posting",
            FilterRejection::RemoteMismatch => "remote_mismatch",
            FilterRejection::SalaryBelowMinimum => "salary_below_minimum",
        }
    }
}

/// Hard filters applied before any scoring work.
pub fn passes_filters(profile: &UserProfile, job: &JobPosting) -> Result<(), FilterRejection> {
    if !job.is_active {
        return Err(FilterRejection::InactivePosting);
    }

    if profile.remote_preference == RemotePreference::RemoteOnly && job.work_mode == WorkMode::OnSite
    {
        return Err(FilterRejection::RemoteMismatch);
    }

    if let (Some(minimum), Some(salary)) = (profile.salary_expectation.minimum, job.salary.as_ref())
    {
        if let Some(max) = salary.max {
            if max < minimum {
                return Err(FilterRejection::SalaryBelowMinimum);
            }
        }
    }

    Ok(())
}

/// Stateless engine composing the factor rubric with the optional oracle.
pub struct MatchingEngine {
    oracle: Option<Arc<dyn MatchOracle>>,
}

impl MatchingEngine {
    pub fn new(oracle: Option<Arc<dyn MatchOracle>>) -> Self {
        Self { oracle }
    }

    /// Score one pair with the requested strategy. Oracle failures degrade to
    /// the algorithmic result rather than erroring.
    pub async fn score(
        &self,
        profile: &UserProfile,
        job: &JobPosting,
        strategy: MatchStrategy,
    ) -> MatchResult {
        let algorithmic = scoring::score_profile(profile, job);

        let assessment = match strategy {
            MatchStrategy::Algorithmic => None,
            MatchStrategy::AiAugmented | MatchStrategy::Hybrid => match &self.oracle {
                Some(oracle) => match oracle.assess(profile, job).await {
                    Ok(assessment) => Some(assessment),
                    Err(err) => {
                        tracing::warn!(
                            job = %job.id.0,
                            strategy = strategy.label(),
                            error = %err,
                            "oracle unavailable; falling back to algorithmic score"
                        );
                        None
                    }
                },
                None => {
                    tracing::debug!(
                        strategy = strategy.label(),
                        "no oracle configured; falling back to algorithmic score"
                    );
                    None
                }
            },
        };

        self.compose(profile, job, strategy, algorithmic, assessment)
    }

    fn compose(
        &self,
        profile: &UserProfile,
        job: &JobPosting,
        strategy: MatchStrategy,
        algorithmic: AlgorithmicScore,
        assessment: Option<OracleAssessment>,
    ) -> MatchResult {
        let algorithmic_probability =
            scoring::success_probability(algorithmic.overall, &algorithmic.factors);

        let (overall, confidence, success_probability, provenance) =
            match (strategy, assessment.as_ref()) {
                (MatchStrategy::Algorithmic, _) | (_, None) => {
                    let provenance = if strategy == MatchStrategy::Algorithmic {
                        ScoreProvenance::Algorithmic
                    } else {
                        ScoreProvenance::AlgorithmicFallback
                    };
                    (
                        algorithmic.overall,
                        (algorithmic.overall / 100.0).min(0.9),
                        algorithmic_probability,
                        provenance,
                    )
                }
                (MatchStrategy::AiAugmented, Some(oracle)) => (
                    (oracle.score * 10.0).round() / 10.0,
                    oracle.confidence,
                    oracle.success_probability,
                    ScoreProvenance::Oracle,
                ),
                (MatchStrategy::Hybrid, Some(oracle)) => {
                    let blended = oracle.score * 0.7 + algorithmic.overall * 0.3;
                    (
                        (blended * 10.0).round() / 10.0,
                        oracle.confidence,
                        // Conservative: trust the lower of the two probabilities.
                        oracle.success_probability.min(algorithmic_probability),
                        ScoreProvenance::Hybrid,
                    )
                }
            };

        let mut suggestions = algorithmic.suggestions;
        let mut red_flags = algorithmic.red_flags;
        if let Some(oracle) = assessment {
            if !oracle.category_breakdown.is_empty() {
                tracing::debug!(
                    job = %job.id.0,
                    breakdown = ?oracle.category_breakdown,
                    "oracle category breakdown"
                );
            }
            if let Some(narrative) = oracle.narrative {
                suggestions.insert(0, narrative);
            }
            suggestions.extend(oracle.strengths.into_iter().map(|s| format!("Lean on: {s}")));
            red_flags.extend(oracle.concerns);
        }

        MatchResult {
            user_id: profile.user_id.clone(),
            job_id: job.id.clone(),
            overall,
            tier: MatchTier::for_score(overall),
            priority: scoring::priority_for(overall),
            success_probability,
            confidence,
            provenance,
            components: algorithmic.components,
            matched_skills: algorithmic.matched_skills,
            missing_skills: algorithmic.missing_skills,
            red_flags,
            suggestions,
        }
    }
}
