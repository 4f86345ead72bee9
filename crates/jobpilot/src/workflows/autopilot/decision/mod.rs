mod cache;

pub use cache::DecisionCache;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{JobId, UserId};
use super::matching::MatchResult;
use super::risk::{RiskAssessment, RiskLevel};
use super::safety::SafetyReport;
use super::timing::{next_optimal_slot, TimingAnalysis};

/// Final verdict for one prospective submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ApplyImmediately,
    ApplyScheduled,
    ReviewRequired,
    SkipTemporarily,
    SkipPermanently,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::ApplyImmediately => "apply_immediately",
            Verdict::ApplyScheduled => "apply_scheduled",
            Verdict::ReviewRequired => "review_required",
            Verdict::SkipTemporarily => "skip_temporarily",
            Verdict::SkipPermanently => "skip_permanently",
        }
    }

    pub const fn is_apply(self) -> bool {
        matches!(self, Verdict::ApplyImmediately | Verdict::ApplyScheduled)
    }
}

/// Synthesized decision with its full audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: String,
    pub confidence: f64,
    pub match_score: f64,
    pub timing_score: f64,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub decided_at: DateTime<Utc>,
}

/// Everything the ladder consumes for one pair. `match_result: None` means
/// scoring itself was unavailable.
pub struct DecisionInputs<'a> {
    pub user_id: &'a UserId,
    pub job_id: &'a JobId,
    pub match_result: Option<&'a MatchResult>,
    pub safety: &'a SafetyReport,
    pub risk: &'a RiskAssessment,
    pub timing: &'a TimingAnalysis,
}

/// Synthesizer applying the ordered verdict ladder behind the decision cache.
pub struct DecisionEngine {
    cache: Arc<DecisionCache>,
}

impl DecisionEngine {
    pub fn new(cache: Arc<DecisionCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    /// Decide for one pair, consulting the cache first and storing the result.
    /// Safety-blocked outcomes are not cached: the gate can clear well inside
    /// the TTL (a new day starts, an hour passes), and the pair must be
    /// re-evaluated when it does.
    pub fn decide(&self, inputs: DecisionInputs<'_>, now: DateTime<Utc>) -> Decision {
        if let Some(cached) = self.cache.get(inputs.user_id, inputs.job_id, now) {
            return cached;
        }

        let decision = synthesize(&inputs, now);
        if inputs.safety.passed {
            self.cache.put(
                inputs.user_id.clone(),
                inputs.job_id.clone(),
                decision.clone(),
                now,
            );
        }
        decision
    }
}

/// First-match-wins ladder over the scoring, safety, risk, and timing inputs.
pub fn synthesize(inputs: &DecisionInputs<'_>, now: DateTime<Utc>) -> Decision {
    let risk = inputs.risk;
    let timing = inputs.timing.overall;

    let base = |verdict: Verdict, reason: &str, confidence: f64, match_score: f64| Decision {
        verdict,
        reason: reason.to_string(),
        confidence,
        match_score,
        timing_score: timing,
        risk_level: risk.level,
        risk_score: risk.score,
        recommendations: Vec::new(),
        scheduled_for: None,
        decided_at: now,
    };

    let Some(result) = inputs.match_result else {
        return base(
            Verdict::ReviewRequired,
            "Scoring unavailable - human review required",
            0.0,
            0.0,
        );
    };

    let score = result.overall;
    let confidence = result.confidence;

    if !inputs.safety.passed {
        let mut decision = base(
            Verdict::SkipTemporarily,
            "Safety limits exceeded",
            confidence,
            score,
        );
        decision.recommendations = inputs.safety.recommendations.clone();
        return decision;
    }

    if risk.level == RiskLevel::Critical {
        return base(
            Verdict::SkipPermanently,
            "Critical risk factors identified",
            confidence,
            score,
        );
    }

    if !risk.proceed {
        return base(
            Verdict::SkipTemporarily,
            "High risk factors present",
            confidence,
            score,
        );
    }

    if score < 60.0 {
        return base(Verdict::SkipPermanently, "Low match score", confidence, score);
    }

    if confidence < 0.6 {
        return base(
            Verdict::ReviewRequired,
            "Low scoring confidence - human review recommended",
            confidence,
            score,
        );
    }

    if timing >= 80.0 && confidence >= 0.8 && score >= 75.0 {
        return base(
            Verdict::ApplyImmediately,
            "Optimal conditions for immediate application",
            confidence,
            score,
        );
    }

    if timing >= 60.0 && confidence >= 0.7 && score >= 70.0 {
        let mut decision = base(
            Verdict::ApplyScheduled,
            "Good conditions for scheduled application",
            confidence,
            score,
        );
        decision.scheduled_for = Some(next_optimal_slot(now));
        return decision;
    }

    base(
        Verdict::ReviewRequired,
        "Mixed signals - human review recommended",
        confidence,
        score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::autopilot::matching::{MatchTier, ScoreProvenance};
    use crate::workflows::autopilot::timing::TimingAnalysis;

    fn match_result(overall: f64, confidence: f64) -> MatchResult {
        MatchResult {
            user_id: UserId("u".to_string()),
            job_id: JobId("j".to_string()),
            overall,
            tier: MatchTier::for_score(overall),
            priority: 7,
            success_probability: 0.7,
            confidence,
            provenance: ScoreProvenance::Algorithmic,
            components: Vec::new(),
            matched_skills: Vec::new(),
            missing_skills: Vec::new(),
            red_flags: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    fn passing_safety() -> SafetyReport {
        SafetyReport {
            passed: true,
            checks: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    fn low_risk() -> RiskAssessment {
        RiskAssessment {
            level: RiskLevel::Low,
            score: 0.1,
            factors: Vec::new(),
            mitigations: Vec::new(),
            proceed: true,
        }
    }

    fn timing(overall: f64) -> TimingAnalysis {
        TimingAnalysis {
            overall,
            posting_freshness: overall,
            day_of_week: overall,
            hour_of_day: overall,
            company_responsiveness: overall,
        }
    }

    fn ids() -> (UserId, JobId) {
        (UserId("u".to_string()), JobId("j".to_string()))
    }

    #[test]
    fn missing_scoring_requires_review() {
        let (user, job) = ids();
        let decision = synthesize(
            &DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: None,
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(90.0),
            },
            Utc::now(),
        );
        assert_eq!(decision.verdict, Verdict::ReviewRequired);
        assert!(decision.reason.contains("Scoring unavailable"));
    }

    #[test]
    fn safety_failure_skips_temporarily_with_recommendations() {
        let (user, job) = ids();
        let safety = SafetyReport {
            passed: false,
            checks: Vec::new(),
            recommendations: vec!["Wait until tomorrow to submit more applications".to_string()],
        };
        let result = match_result(90.0, 0.9);
        let decision = synthesize(
            &DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &safety,
                risk: &low_risk(),
                timing: &timing(90.0),
            },
            Utc::now(),
        );
        assert_eq!(decision.verdict, Verdict::SkipTemporarily);
        assert_eq!(decision.recommendations.len(), 1);
    }

    #[test]
    fn critical_risk_outranks_strong_match() {
        let (user, job) = ids();
        let risk = RiskAssessment {
            level: RiskLevel::Critical,
            score: 0.9,
            factors: Vec::new(),
            mitigations: Vec::new(),
            proceed: false,
        };
        let result = match_result(95.0, 0.95);
        let decision = synthesize(
            &DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &passing_safety(),
                risk: &risk,
                timing: &timing(90.0),
            },
            Utc::now(),
        );
        assert_eq!(decision.verdict, Verdict::SkipPermanently);
        assert!(decision.reason.contains("Critical risk"));
    }

    #[test]
    fn optimal_conditions_apply_immediately() {
        let (user, job) = ids();
        let result = match_result(82.0, 0.85);
        let decision = synthesize(
            &DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(85.0),
            },
            Utc::now(),
        );
        assert_eq!(decision.verdict, Verdict::ApplyImmediately);
        assert!(decision.scheduled_for.is_none());
    }

    #[test]
    fn good_conditions_schedule_with_slot() {
        let (user, job) = ids();
        let result = match_result(72.0, 0.75);
        let decision = synthesize(
            &DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(65.0),
            },
            Utc::now(),
        );
        assert_eq!(decision.verdict, Verdict::ApplyScheduled);
        assert!(decision.scheduled_for.is_some());
    }

    #[test]
    fn low_confidence_requires_review_before_apply_rules() {
        let (user, job) = ids();
        let result = match_result(90.0, 0.5);
        let decision = synthesize(
            &DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(90.0),
            },
            Utc::now(),
        );
        assert_eq!(decision.verdict, Verdict::ReviewRequired);
        assert!(decision.reason.contains("Low scoring confidence"));
    }

    #[test]
    fn engine_serves_cached_decision_within_ttl() {
        let (user, job) = ids();
        let engine = DecisionEngine::new(Arc::new(DecisionCache::default()));
        let now = Utc::now();

        let strong = match_result(82.0, 0.85);
        let first = engine.decide(
            DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&strong),
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(85.0),
            },
            now,
        );
        assert_eq!(first.verdict, Verdict::ApplyImmediately);

        // Same pair with far weaker inputs still serves the cached verdict.
        let weak = match_result(10.0, 0.1);
        let second = engine.decide(
            DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&weak),
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(10.0),
            },
            now,
        );
        assert_eq!(second.verdict, Verdict::ApplyImmediately);
    }

    #[test]
    fn safety_blocked_pairs_are_not_cached() {
        let (user, job) = ids();
        let engine = DecisionEngine::new(Arc::new(DecisionCache::default()));
        let now = Utc::now();
        let result = match_result(82.0, 0.85);

        let blocked = SafetyReport {
            passed: false,
            checks: Vec::new(),
            recommendations: Vec::new(),
        };
        let first = engine.decide(
            DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &blocked,
                risk: &low_risk(),
                timing: &timing(85.0),
            },
            now,
        );
        assert_eq!(first.verdict, Verdict::SkipTemporarily);

        // Once the gate clears, the same pair must get a fresh verdict.
        let second = engine.decide(
            DecisionInputs {
                user_id: &user,
                job_id: &job,
                match_result: Some(&result),
                safety: &passing_safety(),
                risk: &low_risk(),
                timing: &timing(85.0),
            },
            now,
        );
        assert_eq!(second.verdict, Verdict::ApplyImmediately);
    }
}
