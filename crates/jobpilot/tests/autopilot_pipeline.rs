use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jobpilot::workflows::autopilot::decision::{DecisionCache, DecisionEngine};
use jobpilot::workflows::autopilot::domain::{
    ApprovalMode, EducationLevel, ExperienceBand, JobId, JobPosting, Location, MatchThreshold,
    RemotePreference, ResumeRef, SalaryExpectation, SalaryRange, SearchPreferences, UserId,
    UserProfile, WorkMode,
};
use jobpilot::workflows::autopilot::matching::MatchingEngine;
use jobpilot::workflows::autopilot::queue::{
    Application, ApplicationCounts, ApplicationMethod, ApplicationRepository, AutopilotDeps,
    AutopilotService, AutopilotSettings, DispatchError, EmailDispatcher, IntelligenceProvider,
    JobCatalog, ProfileRepository, QueueItem, QueueRepository, QueueStatus, QueueStatusCounts,
    RepositoryError,
};
use jobpilot::scheduler::{JobKind, Scheduler};
use jobpilot::workflows::autopilot::risk::{CompanySnapshot, MarketSnapshot};
use jobpilot::workflows::autopilot::safety::{ApplicationActivity, ApplicationOutcome};
use jobpilot::workflows::autopilot::submission::{
    ApplicationAttempt, AttemptId, AttemptRepository, FormFetchError, FormFetcher,
    ProfileStepExecutor, SubmissionMachine, SubmissionPayload,
};

#[derive(Default, Clone)]
struct FakeQueue {
    items: Arc<Mutex<HashMap<(UserId, JobId), QueueItem>>>,
}

impl FakeQueue {
    fn get(&self, user: &str, job: &str) -> Option<QueueItem> {
        self.items
            .lock()
            .unwrap()
            .get(&(UserId(user.to_string()), JobId(job.to_string())))
            .cloned()
    }

    fn put(&self, item: QueueItem) {
        self.items
            .lock()
            .unwrap()
            .insert((item.user_id.clone(), item.job_id.clone()), item);
    }
}

#[async_trait]
impl QueueRepository for FakeQueue {
    async fn insert_if_absent(&self, item: QueueItem) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().unwrap();
        let key = (item.user_id.clone(), item.job_id.clone());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, item);
        Ok(())
    }

    async fn update(&self, item: QueueItem) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().unwrap();
        let key = (item.user_id.clone(), item.job_id.clone());
        if !guard.contains_key(&key) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(key, item);
        Ok(())
    }

    async fn remove(&self, user: &UserId, job: &JobId) -> Result<(), RepositoryError> {
        self.items.lock().unwrap().remove(&(user.clone(), job.clone()));
        Ok(())
    }

    async fn contains(&self, user: &UserId, job: &JobId) -> Result<bool, RepositoryError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .contains_key(&(user.clone(), job.clone())))
    }

    async fn due_approved(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueItem>, RepositoryError> {
        let guard = self.items.lock().unwrap();
        let mut due: Vec<QueueItem> = guard
            .values()
            .filter(|item| item.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| b.priority.cmp(&a.priority));
        due.truncate(limit);
        Ok(due)
    }

    async fn expire_pending_before(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut guard = self.items.lock().unwrap();
        let mut expired = 0;
        for item in guard.values_mut() {
            if item.status == QueueStatus::Pending && item.expires_at <= now {
                item.status = QueueStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn items_for_user(&self, user: &UserId) -> Result<Vec<QueueItem>, RepositoryError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|item| &item.user_id == user)
            .cloned()
            .collect())
    }

    async fn status_counts(&self, user: &UserId) -> Result<QueueStatusCounts, RepositoryError> {
        let guard = self.items.lock().unwrap();
        let mut counts = QueueStatusCounts::default();
        for item in guard.values().filter(|item| &item.user_id == user) {
            match item.status {
                QueueStatus::Pending => counts.pending += 1,
                QueueStatus::Approved => counts.approved += 1,
                _ => {}
            }
        }
        Ok(counts)
    }
}

#[derive(Default, Clone)]
struct FakeApplications {
    records: Arc<Mutex<Vec<Application>>>,
}

impl FakeApplications {
    fn all(&self) -> Vec<Application> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApplicationRepository for FakeApplications {
    async fn insert_if_absent(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap();
        if guard
            .iter()
            .any(|existing| existing.user_id == application.user_id && existing.job_id == application.job_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(application);
        Ok(())
    }

    async fn exists(&self, user: &UserId, job: &JobId) -> Result<bool, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|existing| &existing.user_id == user && &existing.job_id == job))
    }

    async fn activity(
        &self,
        user: &UserId,
        company: &str,
        now: DateTime<Utc>,
    ) -> Result<ApplicationActivity, RepositoryError> {
        let guard = self.records.lock().unwrap();
        let mut activity = ApplicationActivity::default();
        for record in guard.iter().filter(|record| &record.user_id == user) {
            if record.submitted_at > now - Duration::days(1) {
                activity.submitted_today += 1;
            }
            if record.submitted_at > now - Duration::days(7) {
                activity.submitted_this_week += 1;
            }
            if record.submitted_at > now - Duration::days(30) {
                activity.submitted_this_month += 1;
                if record.company == company {
                    activity.to_company_this_month += 1;
                }
            }
            activity.recent_outcomes.push(ApplicationOutcome::Submitted);
        }
        activity.last_submitted_at = guard
            .iter()
            .filter(|record| &record.user_id == user)
            .map(|record| record.submitted_at)
            .max();
        Ok(activity)
    }

    async fn counts(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ApplicationCounts, RepositoryError> {
        let guard = self.records.lock().unwrap();
        let mut counts = ApplicationCounts::default();
        for record in guard.iter().filter(|record| &record.user_id == user) {
            counts.total += 1;
            if record.submitted_at > now - Duration::days(7) {
                counts.last_7_days += 1;
            }
            if record.submitted_at > now - Duration::days(30) {
                counts.last_30_days += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Default, Clone)]
struct FakeProfiles {
    profiles: Arc<Mutex<Vec<UserProfile>>>,
}

impl FakeProfiles {
    fn add(&self, profile: UserProfile) {
        self.profiles.lock().unwrap().push(profile);
    }
}

#[async_trait]
impl ProfileRepository for FakeProfiles {
    async fn active_users(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|profile| profile.preferences.search_active)
            .cloned()
            .collect())
    }

    async fn fetch(&self, user: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|profile| &profile.user_id == user)
            .cloned())
    }
}

#[derive(Default, Clone)]
struct FakeCatalog {
    postings: Arc<Mutex<Vec<JobPosting>>>,
}

impl FakeCatalog {
    fn add(&self, posting: JobPosting) {
        self.postings.lock().unwrap().push(posting);
    }
}

#[async_trait]
impl JobCatalog for FakeCatalog {
    async fn recent_active(&self, limit: usize) -> Result<Vec<JobPosting>, RepositoryError> {
        let mut postings: Vec<JobPosting> = self
            .postings
            .lock()
            .unwrap()
            .iter()
            .filter(|posting| posting.is_active)
            .cloned()
            .collect();
        postings.truncate(limit);
        Ok(postings)
    }

    async fn fetch(&self, job: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self
            .postings
            .lock()
            .unwrap()
            .iter()
            .find(|posting| &posting.id == job)
            .cloned())
    }
}

struct NeutralIntelligence;

#[async_trait]
impl IntelligenceProvider for NeutralIntelligence {
    async fn company(&self, _name: &str) -> CompanySnapshot {
        CompanySnapshot {
            employee_satisfaction: 4.2,
            avg_response_hours: 96.0,
        }
    }

    async fn market(&self) -> MarketSnapshot {
        MarketSnapshot { hiring_velocity: 1.2 }
    }
}

#[derive(Default, Clone)]
struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl EmailDispatcher for RecordingDispatcher {
    async fn send(&self, _payload: &SubmissionPayload, to: &str) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(to.to_string());
        Ok(())
    }
}

struct CannedFormFetcher;

#[async_trait]
impl FormFetcher for CannedFormFetcher {
    async fn fetch(&self, _apply_url: &str) -> Result<String, FormFetchError> {
        Ok("<html><form id=\"application\"></form></html>".to_string())
    }
}

#[derive(Default, Clone)]
struct FakeAttempts {
    attempts: Arc<Mutex<HashMap<AttemptId, ApplicationAttempt>>>,
}

#[async_trait]
impl AttemptRepository for FakeAttempts {
    async fn upsert(&self, attempt: &ApplicationAttempt) -> Result<(), RepositoryError> {
        self.attempts
            .lock()
            .unwrap()
            .insert(attempt.attempt_id, attempt.clone());
        Ok(())
    }

    async fn fetch(
        &self,
        id: &AttemptId,
    ) -> Result<Option<ApplicationAttempt>, RepositoryError> {
        Ok(self.attempts.lock().unwrap().get(id).cloned())
    }
}

struct Harness {
    service: AutopilotService,
    queue: FakeQueue,
    applications: FakeApplications,
    profiles: FakeProfiles,
    catalog: FakeCatalog,
    dispatcher: RecordingDispatcher,
}

fn harness() -> Harness {
    let queue = FakeQueue::default();
    let applications = FakeApplications::default();
    let profiles = FakeProfiles::default();
    let catalog = FakeCatalog::default();
    let dispatcher = RecordingDispatcher::default();

    let deps = AutopilotDeps {
        queue: Arc::new(queue.clone()),
        applications: Arc::new(applications.clone()),
        profiles: Arc::new(profiles.clone()),
        catalog: Arc::new(catalog.clone()),
        intelligence: Arc::new(NeutralIntelligence),
        cover_letters: None,
        email: Arc::new(dispatcher.clone()),
        form_fetcher: Arc::new(CannedFormFetcher),
    };
    let machine = SubmissionMachine::new(
        Arc::new(ProfileStepExecutor),
        Arc::new(FakeAttempts::default()),
    );
    let service = AutopilotService::new(
        deps,
        MatchingEngine::new(None),
        DecisionEngine::new(Arc::new(DecisionCache::default())),
        machine,
        AutopilotSettings::default(),
    );

    Harness {
        service,
        queue,
        applications,
        profiles,
        catalog,
        dispatcher,
    }
}

// Monday morning keeps day-of-week and hour factors in the optimal window.
fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).single().expect("valid timestamp")
}

fn candidate(id: &str, approval: ApprovalMode) -> UserProfile {
    UserProfile {
        user_id: UserId(id.to_string()),
        full_name: "Ada Moreno".to_string(),
        email: format!("{id}@example.com"),
        skills: vec![
            "rust".to_string(),
            "kubernetes".to_string(),
            "postgresql".to_string(),
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
            resume_id: "resume-1".to_string(),
            size_bytes: 120_000,
        }),
        portfolio_urls: Vec::new(),
        preferences: SearchPreferences {
            search_active: true,
            match_threshold: MatchThreshold::GoodFit,
            approval_mode: approval,
            cover_letters_enabled: false,
        },
    }
}

fn platform_job(now: DateTime<Utc>) -> JobPosting {
    JobPosting {
        id: JobId("job-1".to_string()),
        title: "Senior Platform Engineer".to_string(),
        company: "Northwind".to_string(),
        description: "Own reliability and deployment tooling for a large Rust \
            service fleet running on Kubernetes. The role covers the \
            PostgreSQL-backed control plane, capacity planning with product \
            teams, and the incident response rotation for three regions."
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
        preferred_skills: vec!["aws".to_string()],
        experience_band: Some(ExperienceBand::Senior),
        education_required: Some(EducationLevel::Bachelor),
        salary: Some(SalaryRange {
            min: Some(85_000),
            max: Some(110_000),
        }),
        culture_signals: Vec::new(),
        posted_at: now - Duration::hours(12),
        apply_url: "https://boards.greenhouse.io/northwind/jobs/1".to_string(),
        apply_email: None,
        is_active: true,
    }
}

#[tokio::test]
async fn instant_approval_runs_end_to_end() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    harness.catalog.add(platform_job(now));

    let matches = harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    assert_eq!(matches.queued, 1, "strong match should be queued");

    let queued = harness.queue.get("ada", "job-1").expect("item queued");
    assert_eq!(queued.status, QueueStatus::Approved, "instant approval");

    let processed = harness.service.process_queue(now).await.expect("queue pass succeeds");
    assert_eq!(processed.applied, 1);

    let applications = harness.applications.all();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].method, ApplicationMethod::FormAutomation);

    let item = harness.queue.get("ada", "job-1").expect("item retained");
    assert_eq!(item.status, QueueStatus::AutoApplied);
    assert_eq!(item.application_id.as_deref(), Some(applications[0].id.as_str()));
}

#[tokio::test]
async fn manual_approval_waits_for_a_human() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Manual));
    harness.catalog.add(platform_job(now));

    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    let item = harness.queue.get("ada", "job-1").expect("item queued");
    assert_eq!(item.status, QueueStatus::Pending);
    assert!(item.auto_apply_after.is_none());

    let processed = harness.service.process_queue(now).await.expect("queue pass succeeds");
    assert_eq!(processed.drained, 0, "pending items are not drained");
}

#[tokio::test]
async fn email_postings_go_through_the_dispatcher() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    let mut job = platform_job(now);
    job.apply_url = "mailto:jobs@northwind.example".to_string();
    job.apply_email = Some("jobs@northwind.example".to_string());
    harness.catalog.add(job);

    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    let processed = harness.service.process_queue(now).await.expect("queue pass succeeds");
    assert_eq!(processed.applied, 1);

    let sent = harness.dispatcher.sent.lock().unwrap().clone();
    assert_eq!(sent, vec!["jobs@northwind.example".to_string()]);
    assert_eq!(
        harness.applications.all()[0].method,
        ApplicationMethod::Email
    );
}

#[tokio::test]
async fn repeat_passes_do_not_requeue_the_same_pair() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    harness.catalog.add(platform_job(now));

    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("first pass succeeds");
    let second = harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("second pass succeeds");
    assert_eq!(second.queued, 0);
    assert_eq!(second.duplicates, 1, "existing queue entry is skipped");
}

#[tokio::test]
async fn racing_match_passes_queue_a_pair_once() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    harness.catalog.add(platform_job(now));

    let (first, second) = tokio::join!(
        harness.service.find_matches_for_active_users(now),
        harness.service.find_matches_for_active_users(now)
    );
    let first = first.expect("first pass succeeds");
    let second = second.expect("second pass succeeds");

    assert_eq!(first.queued + second.queued, 1, "only one pass wins the insert");
    assert_eq!(first.duplicates + second.duplicates, 1);
    let items = harness
        .service
        .queue_items(&UserId("ada".to_string()))
        .await
        .expect("queue readable");
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn scheduler_status_advances_next_run_after_a_run() {
    let harness = harness();
    let scheduler = Scheduler::new(Arc::new(harness.service));

    for job in scheduler.status() {
        let expected_gap = Duration::seconds(job.interval_secs as i64);
        assert!(job.next_run > Utc::now());
        assert!(job.next_run <= Utc::now() + expected_gap);
    }

    scheduler
        .run_now(JobKind::CleanupExpired)
        .await
        .expect("cleanup runs on empty state");

    let status = scheduler.status();
    let cleanup = status
        .iter()
        .find(|job| job.id == "cleanup_expired")
        .expect("cleanup job listed");
    let finished = cleanup.last_finished_at.expect("run recorded");
    assert_eq!(cleanup.next_run, finished + Duration::seconds(3600));
}

#[tokio::test]
async fn inactive_and_mismatched_postings_are_not_queued() {
    let harness = harness();
    let now = monday_morning();
    let mut profile = candidate("ada", ApprovalMode::Instant);
    profile.remote_preference = RemotePreference::RemoteOnly;
    harness.profiles.add(profile);

    let mut closed = platform_job(now);
    closed.id = JobId("job-closed".to_string());
    closed.is_active = false;
    harness.catalog.add(closed);

    let mut onsite = platform_job(now);
    onsite.id = JobId("job-onsite".to_string());
    onsite.work_mode = WorkMode::OnSite;
    harness.catalog.add(onsite);

    let matches = harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    assert_eq!(matches.queued, 0);
    assert_eq!(matches.filtered, 1, "on-site posting fails the remote filter");
}

#[tokio::test]
async fn stale_pending_items_expire() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Manual));
    harness.catalog.add(platform_job(now - Duration::days(9)));

    harness
        .service
        .find_matches_for_active_users(now - Duration::days(9))
        .await
        .expect("match pass succeeds");

    let expired = harness.service.cleanup_expired(now).await.expect("cleanup succeeds");
    assert_eq!(expired, 1);
    let item = harness.queue.get("ada", "job-1").expect("item retained");
    assert_eq!(item.status, QueueStatus::Expired);
}

#[tokio::test]
async fn stats_refresh_reflects_submissions_and_queue_state() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    harness.catalog.add(platform_job(now));

    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    harness.service.process_queue(now).await.expect("queue pass succeeds");
    let refreshed = harness.service.refresh_stats(now).await.expect("refresh succeeds");
    assert_eq!(refreshed, 1);

    let stats = harness
        .service
        .stats_for(&UserId("ada".to_string()))
        .expect("stats recorded");
    assert_eq!(stats.total, 1);
    assert_eq!(stats.last_7_days, 1);
    assert_eq!(stats.queue_pending, 0);
}

#[tokio::test]
async fn items_already_applied_elsewhere_are_dropped() {
    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    let job = platform_job(now);
    harness.catalog.add(job.clone());

    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    harness
        .applications
        .insert_if_absent(Application::new(
            UserId("ada".to_string()),
            JobId("job-1".to_string()),
            job.company,
            ApplicationMethod::RecordOnly,
            88.0,
            None,
            now,
        ))
        .await
        .expect("manual record inserted");

    let processed = harness.service.process_queue(now).await.expect("queue pass succeeds");
    assert_eq!(processed.duplicates, 1);
    assert!(
        harness.queue.get("ada", "job-1").is_none(),
        "stale queue entry is removed"
    );
}

#[tokio::test]
async fn rescheduled_items_keep_their_slot() {
    let harness = harness();
    // Early Saturday; synthesis defers to the next Monday morning.
    let now = Utc.with_ymd_and_hms(2026, 3, 7, 7, 0, 0).single().expect("valid timestamp");
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    harness.catalog.add(platform_job(now));

    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    let processed = harness.service.process_queue(now).await.expect("queue pass succeeds");
    assert_eq!(processed.rescheduled, 1);

    let item = harness.queue.get("ada", "job-1").expect("item retained");
    assert_eq!(item.status, QueueStatus::Approved);
    let slot = item.auto_apply_after.expect("slot recorded");
    assert!(slot > now, "deferred past the weekend");
}

#[tokio::test]
async fn evaluation_route_returns_full_audit_trail() {
    use jobpilot::workflows::autopilot::autopilot_router;
    use tower::ServiceExt;

    let harness = harness();
    let now = monday_morning();
    harness.profiles.add(candidate("ada", ApprovalMode::Instant));
    harness.catalog.add(platform_job(now));
    let router = autopilot_router(Arc::new(harness.service));

    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/autopilot/evaluations")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::json!({ "user_id": "ada", "job_id": "job-1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    assert!(payload.get("match_result").is_some());
    assert!(payload.get("safety").is_some());
    assert!(payload.get("risk").is_some());
    assert!(payload.get("timing").is_some());
    assert_eq!(
        payload["decision"]["verdict"],
        serde_json::json!("apply_immediately")
    );
}

#[tokio::test]
async fn evaluation_route_rejects_unknown_identifiers() {
    use jobpilot::workflows::autopilot::autopilot_router;
    use tower::ServiceExt;

    let harness = harness();
    let router = autopilot_router(Arc::new(harness.service));

    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/autopilot/evaluations")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::json!({ "user_id": "nobody", "job_id": "nothing" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queue_items_survive_missing_profiles_as_failures() {
    let harness = harness();
    let now = monday_morning();
    harness.catalog.add(platform_job(now));

    // Queue an item whose profile was since deleted.
    harness.profiles.add(candidate("ghost", ApprovalMode::Instant));
    harness
        .service
        .find_matches_for_active_users(now)
        .await
        .expect("match pass succeeds");
    let mut item = harness.queue.get("ghost", "job-1").expect("item queued");
    item.user_id = UserId("gone".to_string());
    harness.queue.put(item);

    let processed = harness.service.process_queue(now).await.expect("queue pass succeeds");
    assert_eq!(processed.failed, 1);
    let failed = harness.queue.get("gone", "job-1").expect("item retained");
    assert_eq!(failed.status, QueueStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("user profile not found"));
}
