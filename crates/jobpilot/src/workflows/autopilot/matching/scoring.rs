use serde::{Deserialize, Serialize};

use super::super::domain::{JobPosting, RemotePreference, UserProfile, WorkMode};

/// Factors permitted in the matching rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFactor {
    Skills,
    Experience,
    Education,
    Location,
    Salary,
    Culture,
}

impl MatchFactor {
    pub const fn weight(self) -> f64 {
        match self {
            MatchFactor::Skills => 0.40,
            MatchFactor::Experience => 0.25,
            MatchFactor::Education => 0.10,
            MatchFactor::Location => 0.10,
            MatchFactor::Salary => 0.10,
            MatchFactor::Culture => 0.05,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MatchFactor::Skills => "skills",
            MatchFactor::Experience => "experience",
            MatchFactor::Education => "education",
            MatchFactor::Location => "location",
            MatchFactor::Salary => "salary",
            MatchFactor::Culture => "culture",
        }
    }
}

/// Discrete contribution to a match score, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: MatchFactor,
    pub score: f64,
    pub weight: f64,
    pub notes: String,
}

/// Quality bracket derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    Strong,
    Good,
    Possible,
    Weak,
}

impl MatchTier {
    pub fn for_score(overall: f64) -> Self {
        if overall >= 85.0 {
            MatchTier::Strong
        } else if overall >= 70.0 {
            MatchTier::Good
        } else if overall >= 50.0 {
            MatchTier::Possible
        } else {
            MatchTier::Weak
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MatchTier::Strong => "strong",
            MatchTier::Good => "good",
            MatchTier::Possible => "possible",
            MatchTier::Weak => "weak",
        }
    }
}

/// Raw factor scores kept alongside the weighted blend for downstream rules.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorScores {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub location: f64,
    pub salary: f64,
    pub culture: f64,
}

/// Full algorithmic scoring result before any oracle blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmicScore {
    pub overall: f64,
    pub factors: FactorScores,
    pub components: Vec<ScoreComponent>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub red_flags: Vec<String>,
    pub suggestions: Vec<String>,
}

const NEUTRAL_SCORE: f64 = 70.0;

/// Maps common aliases onto one canonical skill token.
pub(crate) fn canonical_skill(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let canonical = match lowered.as_str() {
        "js" | "ecmascript" => "javascript",
        "k8s" => "kubernetes",
        "ml" | "ai" => "machine learning",
        "node" | "nodejs" => "node.js",
        "postgres" => "postgresql",
        "mongo" => "mongodb",
        "reactjs" | "react.js" => "react",
        "amazon web services" => "aws",
        other => other,
    };
    canonical.to_string()
}

fn skill_set(raw: &[String]) -> Vec<String> {
    let mut set: Vec<String> = raw.iter().map(|skill| canonical_skill(skill)).collect();
    set.sort();
    set.dedup();
    set
}

struct SkillsOutcome {
    score: f64,
    matched: Vec<String>,
    missing: Vec<String>,
    notes: String,
}

fn score_skills(profile: &UserProfile, job: &JobPosting) -> SkillsOutcome {
    let user = skill_set(&profile.skills);
    let required = skill_set(&job.required_skills);
    let preferred = skill_set(&job.preferred_skills);

    if required.is_empty() && preferred.is_empty() {
        return SkillsOutcome {
            score: 50.0,
            matched: Vec::new(),
            missing: Vec::new(),
            notes: "posting lists no skills; neutral score".to_string(),
        };
    }

    let mut matched = Vec::new();
    let mut missing = Vec::new();

    let required_hits = required
        .iter()
        .filter(|skill| {
            let hit = user.contains(skill);
            if hit {
                matched.push((*skill).clone());
            } else {
                missing.push((*skill).clone());
            }
            hit
        })
        .count();
    let preferred_hits = preferred
        .iter()
        .filter(|skill| {
            let hit = user.contains(skill);
            if hit && !matched.contains(skill) {
                matched.push((*skill).clone());
            }
            hit
        })
        .count();

    let required_coverage = if required.is_empty() {
        1.0
    } else {
        required_hits as f64 / required.len() as f64
    };
    let preferred_coverage = if preferred.is_empty() {
        0.0
    } else {
        preferred_hits as f64 / preferred.len() as f64
    };

    let score = (required_coverage * 70.0 + preferred_coverage * 30.0).min(100.0);

    SkillsOutcome {
        score,
        matched,
        missing,
        notes: format!(
            "{required_hits}/{} required and {preferred_hits}/{} preferred skills covered",
            required.len(),
            preferred.len()
        ),
    }
}

fn score_experience(profile: &UserProfile, job: &JobPosting) -> (f64, String) {
    let Some(band) = job.experience_band else {
        return (NEUTRAL_SCORE, "posting states no experience band".to_string());
    };

    let years = profile.years_of_experience;
    let (min, max) = band.range();

    if years < min {
        let gap = min - years;
        let score = (50.0 - gap as f64 * 10.0).max(0.0);
        (
            score,
            format!("{gap} year(s) short of the {} band", band.label()),
        )
    } else if max.is_some_and(|upper| years >= upper) {
        let excess = years - max.unwrap_or(years);
        let score = (90.0 - excess as f64 * 5.0).max(60.0);
        (
            score,
            format!("{excess} year(s) above the {} band", band.label()),
        )
    } else {
        (100.0, format!("within the {} band", band.label()))
    }
}

fn score_education(profile: &UserProfile, job: &JobPosting) -> (f64, String) {
    let Some(required) = job.education_required else {
        return (NEUTRAL_SCORE, "posting states no education requirement".to_string());
    };

    match profile.education {
        Some(level) if level.rank() >= required.rank() => {
            (100.0, "education meets the requirement".to_string())
        }
        Some(level) => {
            let gap = required.rank() - level.rank();
            let score = (70.0 - gap as f64 * 15.0).max(0.0);
            (score, format!("{gap} level(s) below the requirement"))
        }
        None => (50.0, "no education recorded on the profile".to_string()),
    }
}

fn score_location(profile: &UserProfile, job: &JobPosting) -> (f64, String) {
    if job.work_mode == WorkMode::Remote {
        return (100.0, "fully remote posting".to_string());
    }

    if profile.remote_preference == RemotePreference::RemoteOnly {
        return (
            10.0,
            "user is remote-only but the posting is not remote".to_string(),
        );
    }

    let user_city = profile.location.city.as_deref();
    let user_region = profile.location.region.as_deref();
    let job_city = job.location.city.as_deref();
    let job_region = job.location.region.as_deref();

    match (user_city, job_city, user_region, job_region) {
        (Some(uc), Some(jc), _, _) if uc.eq_ignore_ascii_case(jc) => {
            (100.0, "same city".to_string())
        }
        (_, _, Some(ur), Some(jr)) if ur.eq_ignore_ascii_case(jr) => {
            (80.0, "same region".to_string())
        }
        (_, _, Some(_), Some(_)) => (30.0, "different region".to_string()),
        _ => (NEUTRAL_SCORE, "incomplete location data".to_string()),
    }
}

fn score_salary(profile: &UserProfile, job: &JobPosting) -> (f64, String) {
    let Some(midpoint) = job.salary.as_ref().and_then(|salary| salary.midpoint()) else {
        return (NEUTRAL_SCORE, "no salary data on the posting".to_string());
    };

    if let Some(target) = profile.salary_expectation.target {
        let target = target as f64;
        let diff = (midpoint - target).abs() / target;
        let (score, label) = if diff <= 0.10 {
            (100.0, "within 10% of target")
        } else if diff <= 0.20 {
            (80.0, "within 20% of target")
        } else if diff <= 0.30 {
            (60.0, "within 30% of target")
        } else {
            (30.0, "far from target")
        };
        return (score, format!("{label} (midpoint {midpoint:.0})"));
    }

    if let Some(minimum) = profile.salary_expectation.minimum {
        return if midpoint >= minimum as f64 {
            (90.0, format!("midpoint {midpoint:.0} clears the minimum"))
        } else {
            (20.0, format!("midpoint {midpoint:.0} below the minimum"))
        };
    }

    (NEUTRAL_SCORE, "no salary expectation on the profile".to_string())
}

fn score_culture(profile: &UserProfile, job: &JobPosting) -> (f64, String) {
    if profile.culture_preferences.is_empty() {
        return (NEUTRAL_SCORE, "no culture preferences declared".to_string());
    }

    let description = job.description.to_ascii_lowercase();
    let mut weight_total = 0.0;
    let mut weight_hit = 0.0;
    let mut hits = 0usize;

    for (keyword, weight) in &profile.culture_preferences {
        weight_total += weight;
        let keyword = keyword.to_ascii_lowercase();
        let signal_hit = job
            .culture_signals
            .iter()
            .any(|signal| signal.eq_ignore_ascii_case(&keyword));
        if signal_hit || description.contains(&keyword) {
            weight_hit += weight;
            hits += 1;
        }
    }

    if weight_total <= 0.0 {
        return (NEUTRAL_SCORE, "culture preferences carry no weight".to_string());
    }

    let score = (weight_hit / weight_total * 100.0).clamp(0.0, 100.0);
    (
        score,
        format!("{hits}/{} culture signals present", profile.culture_preferences.len()),
    )
}

const SCAM_MARKERS: [&str; 5] = [
    "no experience necessary",
    "unlimited earning",
    "pay to start",
    "wire transfer",
    "quick money",
];

fn collect_red_flags(profile: &UserProfile, job: &JobPosting) -> Vec<String> {
    let mut flags = Vec::new();
    let description = job.description.to_ascii_lowercase();

    for marker in SCAM_MARKERS {
        if description.contains(marker) {
            flags.push(format!("description contains suspect wording: '{marker}'"));
        }
    }

    if let (Some(minimum), Some(salary)) = (profile.salary_expectation.minimum, job.salary.as_ref())
    {
        if let Some(max) = salary.max {
            if max < minimum {
                flags.push(format!(
                    "advertised salary tops out at {max}, below the declared minimum {minimum}"
                ));
            }
        }
    }

    flags
}

fn collect_suggestions(missing: &[String], experience_note: &str) -> Vec<String> {
    let mut suggestions = Vec::new();

    for skill in missing.iter().take(3) {
        suggestions.push(format!("Build evidence for required skill '{skill}'"));
    }
    if experience_note.contains("short of") {
        suggestions.push("Highlight transferable experience to close the band gap".to_string());
    }

    suggestions
}

/// Score a profile against a posting using the weighted factor rubric.
pub fn score_profile(profile: &UserProfile, job: &JobPosting) -> AlgorithmicScore {
    let skills = score_skills(profile, job);
    let (experience, experience_notes) = score_experience(profile, job);
    let (education, education_notes) = score_education(profile, job);
    let (location, location_notes) = score_location(profile, job);
    let (salary, salary_notes) = score_salary(profile, job);
    let (culture, culture_notes) = score_culture(profile, job);

    let factors = FactorScores {
        skills: skills.score,
        experience,
        education,
        location,
        salary,
        culture,
    };

    let components = vec![
        ScoreComponent {
            factor: MatchFactor::Skills,
            score: skills.score,
            weight: MatchFactor::Skills.weight(),
            notes: skills.notes,
        },
        ScoreComponent {
            factor: MatchFactor::Experience,
            score: experience,
            weight: MatchFactor::Experience.weight(),
            notes: experience_notes.clone(),
        },
        ScoreComponent {
            factor: MatchFactor::Education,
            score: education,
            weight: MatchFactor::Education.weight(),
            notes: education_notes,
        },
        ScoreComponent {
            factor: MatchFactor::Location,
            score: location,
            weight: MatchFactor::Location.weight(),
            notes: location_notes,
        },
        ScoreComponent {
            factor: MatchFactor::Salary,
            score: salary,
            weight: MatchFactor::Salary.weight(),
            notes: salary_notes,
        },
        ScoreComponent {
            factor: MatchFactor::Culture,
            score: culture,
            weight: MatchFactor::Culture.weight(),
            notes: culture_notes,
        },
    ];

    let overall = components
        .iter()
        .map(|component| component.score * component.weight)
        .sum::<f64>();
    let overall = (overall * 10.0).round() / 10.0;

    let red_flags = collect_red_flags(profile, job);
    let suggestions = collect_suggestions(&skills.missing, &experience_notes);

    AlgorithmicScore {
        overall,
        factors,
        components,
        matched_skills: skills.matched,
        missing_skills: skills.missing,
        red_flags,
        suggestions,
    }
}

/// Submission priority from 1 (low) to 10 (high).
pub fn priority_for(overall: f64) -> u8 {
    ((overall / 10.0).round() as i64).clamp(1, 10) as u8
}

/// Success probability for the match, adjusted by skill/experience strength.
pub fn success_probability(overall: f64, factors: &FactorScores) -> f64 {
    let mut probability = overall / 100.0;

    if factors.skills >= 80.0 && factors.experience >= 80.0 {
        probability += 0.2;
    } else if factors.skills < 60.0 && factors.experience < 60.0 {
        probability -= 0.1;
    } else if factors.skills >= 60.0 && factors.experience >= 60.0 {
        probability += 0.1;
    }

    probability.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::autopilot::domain::{
        EducationLevel, ExperienceBand, JobId, Location, SalaryExpectation, SalaryRange,
        SearchPreferences, UserId,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_profile() -> UserProfile {
        UserProfile {
            user_id: UserId("user-1".to_string()),
            full_name: "Avery Quinn".to_string(),
            email: "avery@example.com".to_string(),
            skills: vec![
                "Python".to_string(),
                "JS".to_string(),
                "k8s".to_string(),
                "PostgreSQL".to_string(),
            ],
            years_of_experience: 4,
            education: Some(EducationLevel::Bachelor),
            location: Location {
                city: Some("Denver".to_string()),
                region: Some("CO".to_string()),
            },
            remote_preference: RemotePreference::Any,
            salary_expectation: SalaryExpectation {
                target: Some(120_000),
                minimum: Some(100_000),
            },
            culture_preferences: BTreeMap::new(),
            resume: None,
            portfolio_urls: Vec::new(),
            preferences: SearchPreferences::default(),
        }
    }

    fn sample_job() -> JobPosting {
        JobPosting {
            id: JobId("job-1".to_string()),
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            description: "We build reliable services with Python and Kubernetes. \
                          Collaboration and ownership are core to how we work."
                .to_string(),
            location: Location {
                city: Some("Denver".to_string()),
                region: Some("CO".to_string()),
            },
            work_mode: WorkMode::Hybrid,
            required_skills: vec!["python".to_string(), "kubernetes".to_string()],
            preferred_skills: vec!["javascript".to_string(), "terraform".to_string()],
            experience_band: Some(ExperienceBand::Mid),
            education_required: Some(EducationLevel::Bachelor),
            salary: Some(SalaryRange {
                min: Some(110_000),
                max: Some(130_000),
            }),
            culture_signals: vec!["collaboration".to_string()],
            posted_at: Utc::now(),
            apply_url: "https://acme.example/jobs/1".to_string(),
            apply_email: None,
            is_active: true,
        }
    }

    #[test]
    fn synonyms_normalize_before_comparison() {
        assert_eq!(canonical_skill("JS"), "javascript");
        assert_eq!(canonical_skill("K8s"), "kubernetes");
        assert_eq!(canonical_skill("ML"), "machine learning");
        assert_eq!(canonical_skill("Rust"), "rust");
    }

    #[test]
    fn full_required_coverage_scores_high() {
        let score = score_profile(&sample_profile(), &sample_job());
        let skills = score
            .components
            .iter()
            .find(|component| component.factor == MatchFactor::Skills)
            .expect("skills component present");
        // 2/2 required (70) + 1/2 preferred (15).
        assert!((skills.score - 85.0).abs() < f64::EPSILON);
        assert!(score.matched_skills.contains(&"kubernetes".to_string()));
        assert!(score.missing_skills.contains(&"terraform".to_string()));
    }

    #[test]
    fn job_without_skills_is_neutral() {
        let mut job = sample_job();
        job.required_skills.clear();
        job.preferred_skills.clear();
        let score = score_profile(&sample_profile(), &job);
        assert!((score.factors.skills - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn under_qualified_experience_penalized_per_year() {
        let mut profile = sample_profile();
        profile.years_of_experience = 3;
        let mut job = sample_job();
        job.experience_band = Some(ExperienceBand::Senior);
        let score = score_profile(&profile, &job);
        // 2 years short of senior: 50 - 20.
        assert!((score.factors.experience - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn over_qualified_experience_floors_at_sixty() {
        let mut profile = sample_profile();
        profile.years_of_experience = 40;
        let mut job = sample_job();
        job.experience_band = Some(ExperienceBand::Entry);
        let score = score_profile(&profile, &job);
        assert!((score.factors.experience - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn remote_only_against_onsite_scores_ten() {
        let mut profile = sample_profile();
        profile.remote_preference = RemotePreference::RemoteOnly;
        let mut job = sample_job();
        job.work_mode = WorkMode::OnSite;
        let score = score_profile(&profile, &job);
        assert!((score.factors.location - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn salary_within_ten_percent_of_target_is_full_marks() {
        let score = score_profile(&sample_profile(), &sample_job());
        assert!((score.factors.salary - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn salary_below_declared_minimum_raises_red_flag() {
        let mut job = sample_job();
        job.salary = Some(SalaryRange {
            min: Some(60_000),
            max: Some(80_000),
        });
        let score = score_profile(&sample_profile(), &job);
        assert!(score
            .red_flags
            .iter()
            .any(|flag| flag.contains("below the declared minimum")));
    }

    #[test]
    fn success_probability_rewards_strong_core_factors() {
        let factors = FactorScores {
            skills: 90.0,
            experience: 85.0,
            ..FactorScores::default()
        };
        assert!((success_probability(80.0, &factors) - 1.0).abs() < f64::EPSILON);

        let weak = FactorScores {
            skills: 40.0,
            experience: 50.0,
            ..FactorScores::default()
        };
        assert!((success_probability(50.0, &weak) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn priority_clamps_into_band() {
        assert_eq!(priority_for(3.0), 1);
        assert_eq!(priority_for(74.0), 7);
        assert_eq!(priority_for(100.0), 10);
    }
}
