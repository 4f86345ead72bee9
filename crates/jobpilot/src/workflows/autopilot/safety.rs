use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard caps applied before any automatic submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    pub max_per_day: u32,
    pub max_per_week: u32,
    pub max_per_month: u32,
    pub max_per_company_per_month: u32,
    pub min_hours_between: i64,
    /// Minimum match quality as a fraction of 100.
    pub quality_threshold: f64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_per_day: 10,
            max_per_week: 50,
            max_per_month: 200,
            max_per_company_per_month: 3,
            min_hours_between: 2,
            quality_threshold: 0.7,
        }
    }
}

/// Terminal outcome of a previously submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationOutcome {
    Submitted,
    Rejected,
    Interview,
    Offer,
}

/// Snapshot of recent submission activity, computed from the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationActivity {
    pub submitted_today: u32,
    pub submitted_this_week: u32,
    pub submitted_this_month: u32,
    pub to_company_this_month: u32,
    pub last_submitted_at: Option<DateTime<Utc>>,
    /// Latest outcomes first.
    pub recent_outcomes: Vec<ApplicationOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyCheckKind {
    DailyLimit,
    WeeklyLimit,
    CompanyLimit,
    QualityThreshold,
    ApplicationSpacing,
}

impl SafetyCheckKind {
    pub const fn label(self) -> &'static str {
        match self {
            SafetyCheckKind::DailyLimit => "daily_limit",
            SafetyCheckKind::WeeklyLimit => "weekly_limit",
            SafetyCheckKind::CompanyLimit => "company_limit",
            SafetyCheckKind::QualityThreshold => "quality_threshold",
            SafetyCheckKind::ApplicationSpacing => "application_spacing",
        }
    }
}

/// One gate result with the observed value against its limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub kind: SafetyCheckKind,
    pub passed: bool,
    pub current: f64,
    pub limit: f64,
    pub note: String,
}

/// Aggregate report; `passed` only when every check passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub passed: bool,
    pub checks: Vec<SafetyCheck>,
    pub recommendations: Vec<String>,
}

/// Stateless evaluator applying the configured limits to an activity snapshot.
pub struct SafetyEvaluator {
    limits: SafetyLimits,
}

impl SafetyEvaluator {
    pub fn new(limits: SafetyLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub fn evaluate(
        &self,
        activity: &ApplicationActivity,
        match_score: f64,
        now: DateTime<Utc>,
    ) -> SafetyReport {
        let mut checks = Vec::with_capacity(5);

        checks.push(SafetyCheck {
            kind: SafetyCheckKind::DailyLimit,
            passed: activity.submitted_today < self.limits.max_per_day,
            current: activity.submitted_today as f64,
            limit: self.limits.max_per_day as f64,
            note: format!(
                "{} of {} daily submissions used",
                activity.submitted_today, self.limits.max_per_day
            ),
        });

        checks.push(SafetyCheck {
            kind: SafetyCheckKind::WeeklyLimit,
            passed: activity.submitted_this_week < self.limits.max_per_week,
            current: activity.submitted_this_week as f64,
            limit: self.limits.max_per_week as f64,
            note: format!(
                "{} of {} weekly submissions used",
                activity.submitted_this_week, self.limits.max_per_week
            ),
        });

        checks.push(SafetyCheck {
            kind: SafetyCheckKind::CompanyLimit,
            passed: activity.to_company_this_month < self.limits.max_per_company_per_month,
            current: activity.to_company_this_month as f64,
            limit: self.limits.max_per_company_per_month as f64,
            note: format!(
                "{} of {} submissions to this company this month",
                activity.to_company_this_month, self.limits.max_per_company_per_month
            ),
        });

        let quality_floor = self.limits.quality_threshold * 100.0;
        checks.push(SafetyCheck {
            kind: SafetyCheckKind::QualityThreshold,
            passed: match_score >= quality_floor,
            current: match_score,
            limit: quality_floor,
            note: format!("match score {match_score:.1} against floor {quality_floor:.0}"),
        });

        let hours_since_last = activity
            .last_submitted_at
            .map(|last| (now - last).num_minutes() as f64 / 60.0);
        let spacing_ok = hours_since_last
            .map(|hours| hours >= self.limits.min_hours_between as f64)
            .unwrap_or(true);
        checks.push(SafetyCheck {
            kind: SafetyCheckKind::ApplicationSpacing,
            passed: spacing_ok,
            current: hours_since_last.unwrap_or(f64::INFINITY),
            limit: self.limits.min_hours_between as f64,
            note: match hours_since_last {
                Some(hours) => format!("{hours:.1}h since the last submission"),
                None => "no prior submission".to_string(),
            },
        });

        let recommendations = checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| remediation(check.kind))
            .collect();

        SafetyReport {
            passed: checks.iter().all(|check| check.passed),
            checks,
            recommendations,
        }
    }
}

fn remediation(kind: SafetyCheckKind) -> String {
    match kind {
        SafetyCheckKind::DailyLimit => {
            "Wait until tomorrow to submit more applications".to_string()
        }
        SafetyCheckKind::WeeklyLimit => {
            "Weekly submission budget exhausted - pause until next week".to_string()
        }
        SafetyCheckKind::CompanyLimit => {
            "Too many recent submissions to this company - diversify targets".to_string()
        }
        SafetyCheckKind::QualityThreshold => {
            "Job match score below threshold - consider improving profile".to_string()
        }
        SafetyCheckKind::ApplicationSpacing => {
            "Space out submissions to avoid burst behavior".to_string()
        }
    }
}
