use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalogued job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Working arrangement advertised by a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkMode {
    OnSite,
    Hybrid,
    Remote,
}

impl WorkMode {
    pub const fn label(self) -> &'static str {
        match self {
            WorkMode::OnSite => "on_site",
            WorkMode::Hybrid => "hybrid",
            WorkMode::Remote => "remote",
        }
    }
}

/// Experience bracket a posting targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceBand {
    Entry,
    Mid,
    Senior,
}

impl ExperienceBand {
    pub const fn label(self) -> &'static str {
        match self {
            ExperienceBand::Entry => "entry",
            ExperienceBand::Mid => "mid",
            ExperienceBand::Senior => "senior",
        }
    }

    /// Inclusive lower bound and exclusive upper bound in years.
    pub const fn range(self) -> (u8, Option<u8>) {
        match self {
            ExperienceBand::Entry => (0, Some(2)),
            ExperienceBand::Mid => (2, Some(5)),
            ExperienceBand::Senior => (5, None),
        }
    }
}

/// Education ladder ordered by rank for shortfall scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EducationLevel {
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    pub const fn rank(self) -> u8 {
        match self {
            EducationLevel::HighSchool => 1,
            EducationLevel::Associate => 2,
            EducationLevel::Bachelor => 3,
            EducationLevel::Master => 4,
            EducationLevel::Doctorate => 5,
        }
    }
}

/// Advertised compensation band; either bound may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl SalaryRange {
    /// Midpoint estimate; a one-sided band is extrapolated.
    pub fn midpoint(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min as f64 + max as f64) / 2.0),
            (Some(min), None) => Some(min as f64 * 1.2),
            (None, Some(max)) => Some(max as f64 * 0.8),
            (None, None) => None,
        }
    }
}

/// Catalogued job posting used across matching and submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: Location,
    pub work_mode: WorkMode,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub experience_band: Option<ExperienceBand>,
    pub education_required: Option<EducationLevel>,
    pub salary: Option<SalaryRange>,
    pub culture_signals: Vec<String>,
    pub posted_at: DateTime<Utc>,
    pub apply_url: String,
    pub apply_email: Option<String>,
    pub is_active: bool,
}

impl JobPosting {
    /// Email submissions are possible with an explicit address or a mailto link.
    pub fn supports_email_application(&self) -> bool {
        self.apply_email.as_deref().is_some_and(|email| !email.is_empty())
            || self.apply_url.starts_with("mailto:")
    }
}

/// City/region pair; either side may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub region: Option<String>,
}

/// Where the user is willing to work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemotePreference {
    RemoteOnly,
    PreferRemote,
    Any,
    OnSiteOnly,
}

impl RemotePreference {
    pub const fn label(self) -> &'static str {
        match self {
            RemotePreference::RemoteOnly => "remote_only",
            RemotePreference::PreferRemote => "prefer_remote",
            RemotePreference::Any => "any",
            RemotePreference::OnSiteOnly => "on_site_only",
        }
    }
}

/// Compensation expectations declared by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalaryExpectation {
    pub target: Option<u32>,
    pub minimum: Option<u32>,
}

/// Pointer to the primary resume on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRef {
    pub resume_id: String,
    pub size_bytes: u64,
}

/// Minimum overall score a match must clear before queueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchThreshold {
    Open,
    GoodFit,
    Top,
}

impl MatchThreshold {
    pub const fn minimum_score(self) -> f64 {
        match self {
            MatchThreshold::Open => 60.0,
            MatchThreshold::GoodFit => 70.0,
            MatchThreshold::Top => 85.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MatchThreshold::Open => "open",
            MatchThreshold::GoodFit => "good_fit",
            MatchThreshold::Top => "top",
        }
    }
}

/// How queued matches become eligible for automatic submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalMode {
    /// Queue directly as approved, eligible immediately.
    Instant,
    /// Queue as pending, eligible after the given number of hours.
    Delayed { hours: u32 },
    /// Queue as pending until the user approves by hand.
    Manual,
}

/// Per-user automation preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPreferences {
    pub search_active: bool,
    pub match_threshold: MatchThreshold,
    pub approval_mode: ApprovalMode,
    pub cover_letters_enabled: bool,
}

impl Default for SearchPreferences {
    fn default() -> Self {
        Self {
            search_active: true,
            match_threshold: MatchThreshold::GoodFit,
            approval_mode: ApprovalMode::Manual,
            cover_letters_enabled: true,
        }
    }
}

/// Collected profile the matcher scores against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub years_of_experience: u8,
    pub education: Option<EducationLevel>,
    pub location: Location,
    pub remote_preference: RemotePreference,
    pub salary_expectation: SalaryExpectation,
    /// Culture keyword weighted by how much the user cares about it.
    pub culture_preferences: BTreeMap<String, f64>,
    pub resume: Option<ResumeRef>,
    pub portfolio_urls: Vec<String>,
    pub preferences: SearchPreferences,
}
