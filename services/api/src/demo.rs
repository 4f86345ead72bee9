use crate::infra::{build_infra, Infra};
use chrono::{Duration, Utc};
use clap::Args;
use jobpilot::config::AutomationConfig;
use jobpilot::error::AppError;
use jobpilot::workflows::autopilot::domain::{
    ApprovalMode, EducationLevel, ExperienceBand, JobId, JobPosting, Location, MatchThreshold,
    RemotePreference, ResumeRef, SalaryExpectation, SalaryRange, SearchPreferences, UserId,
    UserProfile, WorkMode,
};
use std::collections::BTreeMap;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Approve queued matches immediately instead of leaving them pending.
    #[arg(long)]
    pub(crate) auto_approve: bool,
    /// Print every queue item after processing.
    #[arg(long)]
    pub(crate) list_queue: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = Utc::now();
    let infra = build_infra(&AutomationConfig {
        match_concurrency: 4,
        queue_batch_size: 10,
        oracle_url: None,
    });
    seed(&infra, now);

    println!("Job application autopilot demo");
    println!("Seeded 2 candidate profiles and 4 active postings\n");

    let match_summary = infra
        .service
        .find_matches_for_active_users(now)
        .await
        .map_err(AppError::from)?;
    println!("Matching pass");
    println!(
        "- {} users scanned | {} pairs evaluated | {} queued | {} filtered | {} duplicates",
        match_summary.users,
        match_summary.evaluated,
        match_summary.queued,
        match_summary.filtered,
        match_summary.duplicates
    );

    if args.auto_approve {
        let approved = infra.queue.approve_all(now);
        println!("- {} pending items approved for auto-apply", approved);
    }

    let queue_summary = infra.service.process_queue(now).await.map_err(AppError::from)?;
    println!("\nQueue pass");
    println!(
        "- {} drained | {} applied | {} rescheduled | {} skipped | {} failed",
        queue_summary.drained,
        queue_summary.applied,
        queue_summary.rescheduled,
        queue_summary.skipped,
        queue_summary.failed
    );

    let emails = infra.email.sent();
    if emails.is_empty() {
        println!("- No email applications dispatched");
    } else {
        println!("- Email applications:");
        for (to, title) in emails {
            println!("    {} <- {}", to, title);
        }
    }

    let refreshed = infra.service.refresh_stats(now).await.map_err(AppError::from)?;
    println!("\nStats refreshed for {} users", refreshed);
    for user in ["ada", "grace"] {
        let user = UserId(user.to_string());
        if let Some(stats) = infra.service.stats_for(&user) {
            println!(
                "- {}: {} total | {} last 7d | {} pending | {} approved",
                user.0, stats.total, stats.last_7_days, stats.queue_pending, stats.queue_approved
            );
        }
    }

    if args.list_queue {
        println!("\nQueue contents");
        for user in ["ada", "grace"] {
            let user = UserId(user.to_string());
            let items = infra.service.queue_items(&user).await.map_err(AppError::from)?;
            for item in items {
                match serde_json::to_string_pretty(&item) {
                    Ok(json) => println!("{json}"),
                    Err(err) => println!("  (unserializable item: {err})"),
                }
            }
        }
    }

    Ok(())
}

fn seed(infra: &Infra, now: chrono::DateTime<Utc>) {
    infra.profiles.insert(UserProfile {
        user_id: UserId("ada".to_string()),
        full_name: "Ada Moreno".to_string(),
        email: "ada@example.com".to_string(),
        skills: vec![
            "rust".to_string(),
            "postgresql".to_string(),
            "kubernetes".to_string(),
            "aws".to_string(),
        ],
        years_of_experience: 6,
        education: Some(EducationLevel::Bachelor),
        location: Location {
            city: Some("Berlin".to_string()),
            region: Some("BE".to_string()),
        },
        remote_preference: RemotePreference::PreferRemote,
        salary_expectation: SalaryExpectation {
            target: Some(95_000),
            minimum: Some(80_000),
        },
        culture_preferences: BTreeMap::new(),
        resume: Some(ResumeRef {
            resume_id: "resume-ada-1".to_string(),
            size_bytes: 180_000,
        }),
        portfolio_urls: vec!["https://ada.dev".to_string()],
        preferences: SearchPreferences {
            search_active: true,
            match_threshold: MatchThreshold::GoodFit,
            approval_mode: ApprovalMode::Instant,
            cover_letters_enabled: true,
        },
    });

    infra.profiles.insert(UserProfile {
        user_id: UserId("grace".to_string()),
        full_name: "Grace Okafor".to_string(),
        email: "grace@example.com".to_string(),
        skills: vec![
            "python".to_string(),
            "machine learning".to_string(),
            "sql".to_string(),
        ],
        years_of_experience: 3,
        education: Some(EducationLevel::Master),
        location: Location {
            city: Some("Amsterdam".to_string()),
            region: Some("NH".to_string()),
        },
        remote_preference: RemotePreference::Any,
        salary_expectation: SalaryExpectation {
            target: Some(70_000),
            minimum: None,
        },
        culture_preferences: BTreeMap::new(),
        resume: Some(ResumeRef {
            resume_id: "resume-grace-1".to_string(),
            size_bytes: 95_000,
        }),
        portfolio_urls: Vec::new(),
        preferences: SearchPreferences {
            search_active: true,
            match_threshold: MatchThreshold::Open,
            approval_mode: ApprovalMode::Instant,
            cover_letters_enabled: true,
        },
    });

    infra.catalog.insert(JobPosting {
        id: JobId("job-platform".to_string()),
        title: "Senior Platform Engineer".to_string(),
        company: "Northwind".to_string(),
        description: "We run a large Rust services fleet on Kubernetes across \
            three regions and are looking for an engineer to own reliability, \
            deployment tooling, and the PostgreSQL-backed control plane. You \
            will work with a small platform group and partner with product \
            teams on capacity planning and incident response."
            .to_string(),
        location: Location {
            city: Some("Berlin".to_string()),
            region: Some("BE".to_string()),
        },
        work_mode: WorkMode::Remote,
        required_skills: vec![
            "rust".to_string(),
            "kubernetes".to_string(),
            "postgresql".to_string(),
        ],
        preferred_skills: vec!["aws".to_string(), "terraform".to_string()],
        experience_band: Some(ExperienceBand::Senior),
        education_required: Some(EducationLevel::Bachelor),
        salary: Some(SalaryRange {
            min: Some(85_000),
            max: Some(110_000),
        }),
        culture_signals: vec!["remote-first".to_string()],
        posted_at: now - Duration::hours(18),
        apply_url: "https://boards.greenhouse.io/northwind/jobs/123".to_string(),
        apply_email: None,
        is_active: true,
    });

    infra.catalog.insert(JobPosting {
        id: JobId("job-ml".to_string()),
        title: "Machine Learning Engineer".to_string(),
        company: "Tulip Analytics".to_string(),
        description: "Tulip Analytics builds forecasting products for retail \
            chains. The ML team owns feature pipelines in Python and SQL, \
            trains gradient boosted and deep models, and ships them behind \
            internal APIs. We are hiring a mid-level engineer to take models \
            from notebook to production."
            .to_string(),
        location: Location {
            city: Some("Amsterdam".to_string()),
            region: Some("NH".to_string()),
        },
        work_mode: WorkMode::Hybrid,
        required_skills: vec!["python".to_string(), "machine learning".to_string()],
        preferred_skills: vec!["sql".to_string()],
        experience_band: Some(ExperienceBand::Mid),
        education_required: Some(EducationLevel::Bachelor),
        salary: Some(SalaryRange {
            min: Some(60_000),
            max: Some(80_000),
        }),
        culture_signals: Vec::new(),
        posted_at: now - Duration::days(2),
        apply_url: "mailto:jobs@tulipanalytics.example".to_string(),
        apply_email: Some("jobs@tulipanalytics.example".to_string()),
        is_active: true,
    });

    infra.catalog.insert(JobPosting {
        id: JobId("job-onsite".to_string()),
        title: "Backend Engineer".to_string(),
        company: "Harbor Freight Systems".to_string(),
        description: "On-site backend role maintaining logistics services."
            .to_string(),
        location: Location {
            city: Some("Oslo".to_string()),
            region: Some("OS".to_string()),
        },
        work_mode: WorkMode::OnSite,
        required_skills: vec!["java".to_string()],
        preferred_skills: Vec::new(),
        experience_band: Some(ExperienceBand::Mid),
        education_required: None,
        salary: None,
        culture_signals: Vec::new(),
        posted_at: now - Duration::days(4),
        apply_url: "https://harbor.example/careers/backend".to_string(),
        apply_email: None,
        is_active: true,
    });

    infra.catalog.insert(JobPosting {
        id: JobId("job-stale".to_string()),
        title: "Data Analyst".to_string(),
        company: "Quiet Corp".to_string(),
        description: "Closed posting kept for history.".to_string(),
        location: Location::default(),
        work_mode: WorkMode::Remote,
        required_skills: vec!["sql".to_string()],
        preferred_skills: Vec::new(),
        experience_band: None,
        education_required: None,
        salary: None,
        culture_signals: Vec::new(),
        posted_at: now - Duration::days(30),
        apply_url: "https://quiet.example/jobs/1".to_string(),
        apply_email: None,
        is_active: false,
    });
}
