use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jobpilot::config::AutomationConfig;
use jobpilot::workflows::autopilot::decision::{DecisionCache, DecisionEngine};
use jobpilot::workflows::autopilot::domain::{JobId, JobPosting, UserId, UserProfile};
use jobpilot::workflows::autopilot::matching::{HttpMatchOracle, MatchOracle, MatchingEngine};
use jobpilot::workflows::autopilot::queue::{
    Application, ApplicationCounts, ApplicationRepository, AutopilotDeps, AutopilotService,
    AutopilotSettings, CoverLetterError, CoverLetterWriter, DispatchError, EmailDispatcher,
    IntelligenceProvider, JobCatalog, ProfileRepository, QueueItem, QueueRepository, QueueStatus,
    QueueStatusCounts, RepositoryError,
};
use jobpilot::workflows::autopilot::risk::{CompanySnapshot, MarketSnapshot};
use jobpilot::workflows::autopilot::safety::{ApplicationActivity, ApplicationOutcome};
use jobpilot::workflows::autopilot::submission::{
    ApplicationAttempt, AttemptId, AttemptRepository, FormFetchError, FormFetcher,
    ProfileStepExecutor, SubmissionMachine, SubmissionPayload,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryQueueRepository {
    items: Arc<Mutex<HashMap<(UserId, JobId), QueueItem>>>,
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn insert_if_absent(&self, item: QueueItem) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().expect("queue mutex poisoned");
        let key = (item.user_id.clone(), item.job_id.clone());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, item);
        Ok(())
    }

    async fn update(&self, item: QueueItem) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().expect("queue mutex poisoned");
        let key = (item.user_id.clone(), item.job_id.clone());
        if guard.contains_key(&key) {
            guard.insert(key, item);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn remove(&self, user: &UserId, job: &JobId) -> Result<(), RepositoryError> {
        let mut guard = self.items.lock().expect("queue mutex poisoned");
        guard.remove(&(user.clone(), job.clone()));
        Ok(())
    }

    async fn contains(&self, user: &UserId, job: &JobId) -> Result<bool, RepositoryError> {
        let guard = self.items.lock().expect("queue mutex poisoned");
        Ok(guard.contains_key(&(user.clone(), job.clone())))
    }

    async fn due_approved(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueItem>, RepositoryError> {
        let guard = self.items.lock().expect("queue mutex poisoned");
        let mut due: Vec<QueueItem> = guard
            .values()
            .filter(|item| item.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.queued_at.cmp(&b.queued_at)));
        due.truncate(limit);
        Ok(due)
    }

    async fn expire_pending_before(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut guard = self.items.lock().expect("queue mutex poisoned");
        let mut expired = 0u64;
        for item in guard.values_mut() {
            if item.status == QueueStatus::Pending && item.expires_at <= now {
                item.status = QueueStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn items_for_user(&self, user: &UserId) -> Result<Vec<QueueItem>, RepositoryError> {
        let guard = self.items.lock().expect("queue mutex poisoned");
        let mut items: Vec<QueueItem> = guard
            .values()
            .filter(|item| &item.user_id == user)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.queued_at.cmp(&b.queued_at)));
        Ok(items)
    }

    async fn status_counts(&self, user: &UserId) -> Result<QueueStatusCounts, RepositoryError> {
        let guard = self.items.lock().expect("queue mutex poisoned");
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

impl InMemoryQueueRepository {
    pub(crate) fn approve_all(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.items.lock().expect("queue mutex poisoned");
        let mut approved = 0;
        for item in guard.values_mut() {
            if item.status == QueueStatus::Pending {
                item.status = QueueStatus::Approved;
                item.auto_apply_after = Some(now);
                approved += 1;
            }
        }
        approved
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<(UserId, JobId), Application>>>,
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert_if_absent(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let key = (application.user_id.clone(), application.job_id.clone());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, application);
        Ok(())
    }

    async fn exists(&self, user: &UserId, job: &JobId) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard.contains_key(&(user.clone(), job.clone())))
    }

    async fn activity(
        &self,
        user: &UserId,
        company: &str,
        now: DateTime<Utc>,
    ) -> Result<ApplicationActivity, RepositoryError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        let mut submissions: Vec<&Application> = guard
            .values()
            .filter(|application| &application.user_id == user)
            .collect();
        submissions.sort_by_key(|application| std::cmp::Reverse(application.submitted_at));

        let day_ago = now - Duration::days(1);
        let week_ago = now - Duration::days(7);
        let month_ago = now - Duration::days(30);

        let mut activity = ApplicationActivity::default();
        for application in &submissions {
            if application.submitted_at > day_ago {
                activity.submitted_today += 1;
            }
            if application.submitted_at > week_ago {
                activity.submitted_this_week += 1;
            }
            if application.submitted_at > month_ago {
                activity.submitted_this_month += 1;
                if application.company == company {
                    activity.to_company_this_month += 1;
                }
            }
        }
        activity.last_submitted_at = submissions.first().map(|application| application.submitted_at);
        // Outcome feedback is not tracked in memory; every record reads as submitted.
        activity.recent_outcomes = submissions
            .iter()
            .take(10)
            .map(|_| ApplicationOutcome::Submitted)
            .collect();
        Ok(activity)
    }

    async fn counts(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ApplicationCounts, RepositoryError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        let week_ago = now - Duration::days(7);
        let month_ago = now - Duration::days(30);
        let mut counts = ApplicationCounts::default();
        for application in guard.values().filter(|application| &application.user_id == user) {
            counts.total += 1;
            if application.submitted_at > week_ago {
                counts.last_7_days += 1;
            }
            if application.submitted_at > month_ago {
                counts.last_30_days += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileRepository {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

impl InMemoryProfileRepository {
    pub(crate) fn insert(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn active_users(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        let mut users: Vec<UserProfile> = guard
            .values()
            .filter(|profile| profile.preferences.search_active)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    async fn fetch(&self, user: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.get(user).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryJobCatalog {
    postings: Arc<Mutex<HashMap<JobId, JobPosting>>>,
}

impl InMemoryJobCatalog {
    pub(crate) fn insert(&self, posting: JobPosting) {
        self.postings
            .lock()
            .expect("catalog mutex poisoned")
            .insert(posting.id.clone(), posting);
    }
}

#[async_trait]
impl JobCatalog for InMemoryJobCatalog {
    async fn recent_active(&self, limit: usize) -> Result<Vec<JobPosting>, RepositoryError> {
        let guard = self.postings.lock().expect("catalog mutex poisoned");
        let mut postings: Vec<JobPosting> = guard
            .values()
            .filter(|posting| posting.is_active)
            .cloned()
            .collect();
        postings.sort_by_key(|posting| std::cmp::Reverse(posting.posted_at));
        postings.truncate(limit);
        Ok(postings)
    }

    async fn fetch(&self, job: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let guard = self.postings.lock().expect("catalog mutex poisoned");
        Ok(guard.get(job).cloned())
    }
}

/// Neutral intelligence used until a real data feed is wired in.
#[derive(Default, Clone)]
pub(crate) struct StaticIntelligenceProvider;

#[async_trait]
impl IntelligenceProvider for StaticIntelligenceProvider {
    async fn company(&self, _name: &str) -> CompanySnapshot {
        CompanySnapshot {
            employee_satisfaction: 4.2,
            avg_response_hours: 96.0,
        }
    }

    async fn market(&self) -> MarketSnapshot {
        MarketSnapshot {
            hiring_velocity: 1.2,
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct TemplateCoverLetterWriter;

#[async_trait]
impl CoverLetterWriter for TemplateCoverLetterWriter {
    async fn write(
        &self,
        profile: &UserProfile,
        job: &JobPosting,
    ) -> Result<String, CoverLetterError> {
        Ok(format!(
            "Dear {} hiring team,\n\nI am excited to apply for the {} role. \
             With {} years of experience and a background in {}, I believe I \
             would be a strong addition to your team.\n\nBest regards,\n{}",
            job.company,
            job.title,
            profile.years_of_experience,
            profile.skills.join(", "),
            profile.full_name
        ))
    }
}

#[derive(Default, Clone)]
pub(crate) struct RecordingEmailDispatcher {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingEmailDispatcher {
    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("dispatch mutex poisoned").clone()
    }
}

#[async_trait]
impl EmailDispatcher for RecordingEmailDispatcher {
    async fn send(&self, payload: &SubmissionPayload, to: &str) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .expect("dispatch mutex poisoned")
            .push((to.to_string(), payload.job.title.clone()));
        Ok(())
    }
}

/// Serves a canned application page so form detection has content to inspect.
#[derive(Default, Clone)]
pub(crate) struct StaticFormFetcher;

#[async_trait]
impl FormFetcher for StaticFormFetcher {
    async fn fetch(&self, apply_url: &str) -> Result<String, FormFetchError> {
        if apply_url.is_empty() {
            return Err(FormFetchError::Unreachable("empty apply url".to_string()));
        }
        Ok("<html><body><form id=\"application\"><input name=\"full_name\"/>\
            <input name=\"email\"/></form></body></html>"
            .to_string())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAttemptRepository {
    attempts: Arc<Mutex<HashMap<AttemptId, ApplicationAttempt>>>,
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn upsert(&self, attempt: &ApplicationAttempt) -> Result<(), RepositoryError> {
        self.attempts
            .lock()
            .expect("attempt mutex poisoned")
            .insert(attempt.attempt_id, attempt.clone());
        Ok(())
    }

    async fn fetch(
        &self,
        id: &AttemptId,
    ) -> Result<Option<ApplicationAttempt>, RepositoryError> {
        let guard = self.attempts.lock().expect("attempt mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Handles the server and demo share for seeding and inspection.
pub(crate) struct Infra {
    pub(crate) service: Arc<AutopilotService>,
    pub(crate) queue: InMemoryQueueRepository,
    pub(crate) profiles: InMemoryProfileRepository,
    pub(crate) catalog: InMemoryJobCatalog,
    pub(crate) email: RecordingEmailDispatcher,
}

pub(crate) fn build_infra(automation: &AutomationConfig) -> Infra {
    let queue = InMemoryQueueRepository::default();
    let applications = InMemoryApplicationRepository::default();
    let profiles = InMemoryProfileRepository::default();
    let catalog = InMemoryJobCatalog::default();
    let email = RecordingEmailDispatcher::default();

    let oracle: Option<Arc<dyn MatchOracle>> = automation
        .oracle_url
        .as_deref()
        .map(|url| Arc::new(HttpMatchOracle::new(url)) as Arc<dyn MatchOracle>);
    let strategy = match oracle {
        Some(_) => jobpilot::workflows::autopilot::matching::MatchStrategy::Hybrid,
        None => jobpilot::workflows::autopilot::matching::MatchStrategy::Algorithmic,
    };
    let engine = MatchingEngine::new(oracle);

    let decisions = DecisionEngine::new(Arc::new(DecisionCache::default()));
    let machine = SubmissionMachine::new(
        Arc::new(ProfileStepExecutor),
        Arc::new(InMemoryAttemptRepository::default()),
    );

    let settings = AutopilotSettings {
        strategy,
        match_concurrency: automation.match_concurrency,
        queue_batch_size: automation.queue_batch_size,
        ..AutopilotSettings::default()
    };

    let deps = AutopilotDeps {
        queue: Arc::new(queue.clone()),
        applications: Arc::new(applications),
        profiles: Arc::new(profiles.clone()),
        catalog: Arc::new(catalog.clone()),
        intelligence: Arc::new(StaticIntelligenceProvider),
        cover_letters: Some(Arc::new(TemplateCoverLetterWriter)),
        email: Arc::new(email.clone()),
        form_fetcher: Arc::new(StaticFormFetcher),
    };

    let service = Arc::new(AutopilotService::new(
        deps, engine, decisions, machine, settings,
    ));

    Infra {
        service,
        queue,
        profiles,
        catalog,
        email,
    }
}
