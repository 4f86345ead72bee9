use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::super::decision::{Decision, DecisionEngine, DecisionInputs, Verdict};
use super::super::domain::{JobPosting, UserId, UserProfile};
use super::super::matching::{passes_filters, MatchResult, MatchStrategy, MatchingEngine};
use super::super::risk::{assess_risk, RiskAssessment};
use super::super::safety::{SafetyEvaluator, SafetyLimits, SafetyReport};
use super::super::submission::{
    detect_form_type, AttemptStatus, FormType, SubmissionError, SubmissionMachine,
    SubmissionPayload,
};
use super::super::submission::FormFetcher;
use super::super::timing::{analyze_timing, TimingAnalysis};
use super::domain::{
    Application, ApplicationMethod, ApplicationStats, QueueItem, QueueStatus,
};
use super::repository::{
    ApplicationRepository, CoverLetterWriter, EmailDispatcher, IntelligenceProvider, JobCatalog,
    ProfileRepository, QueueRepository, RepositoryError,
};

/// Error raised by the autopilot pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AutopilotError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("posting filtered: {reason}")]
    Filtered { reason: &'static str },
}

impl AutopilotError {
    /// Infrastructure failures abort a batch; everything else is per-item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AutopilotError::Repository(RepositoryError::Unavailable(_))
                | AutopilotError::Submission(SubmissionError::Repository(
                    RepositoryError::Unavailable(_)
                ))
        )
    }
}

/// Ports the service composes.
pub struct AutopilotDeps {
    pub queue: Arc<dyn QueueRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub catalog: Arc<dyn JobCatalog>,
    pub intelligence: Arc<dyn IntelligenceProvider>,
    pub cover_letters: Option<Arc<dyn CoverLetterWriter>>,
    pub email: Arc<dyn EmailDispatcher>,
    pub form_fetcher: Arc<dyn FormFetcher>,
}

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct AutopilotSettings {
    pub strategy: MatchStrategy,
    pub match_concurrency: usize,
    pub queue_batch_size: usize,
    pub catalog_scan_limit: usize,
    pub safety_limits: SafetyLimits,
}

impl Default for AutopilotSettings {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Algorithmic,
            match_concurrency: 10,
            queue_batch_size: 20,
            catalog_scan_limit: 100,
            safety_limits: SafetyLimits::default(),
        }
    }
}

/// Full audit trail for one evaluated pair.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub match_result: MatchResult,
    pub safety: SafetyReport,
    pub risk: RiskAssessment,
    pub timing: TimingAnalysis,
    pub decision: Decision,
}

/// Tallies for one find-matches pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchRunSummary {
    pub users: usize,
    pub evaluated: usize,
    pub queued: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub user_errors: usize,
}

/// Tallies for one queue-processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueRunSummary {
    pub drained: usize,
    pub applied: usize,
    pub rescheduled: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Applied,
    Rescheduled,
    Skipped,
    Duplicate,
    Failed,
}

/// Service composing matching, safety, risk, timing, decision synthesis, and
/// the submission machine over the repository ports.
pub struct AutopilotService {
    queue: Arc<dyn QueueRepository>,
    applications: Arc<dyn ApplicationRepository>,
    profiles: Arc<dyn ProfileRepository>,
    catalog: Arc<dyn JobCatalog>,
    intelligence: Arc<dyn IntelligenceProvider>,
    cover_letters: Option<Arc<dyn CoverLetterWriter>>,
    email: Arc<dyn EmailDispatcher>,
    form_fetcher: Arc<dyn FormFetcher>,
    engine: Arc<MatchingEngine>,
    safety: SafetyEvaluator,
    decisions: DecisionEngine,
    machine: SubmissionMachine,
    settings: AutopilotSettings,
    stats: Mutex<HashMap<UserId, ApplicationStats>>,
}

impl AutopilotService {
    pub fn new(
        deps: AutopilotDeps,
        engine: MatchingEngine,
        decisions: DecisionEngine,
        machine: SubmissionMachine,
        settings: AutopilotSettings,
    ) -> Self {
        let safety = SafetyEvaluator::new(settings.safety_limits.clone());
        Self {
            queue: deps.queue,
            applications: deps.applications,
            profiles: deps.profiles,
            catalog: deps.catalog,
            intelligence: deps.intelligence,
            cover_letters: deps.cover_letters,
            email: deps.email,
            form_fetcher: deps.form_fetcher,
            engine: Arc::new(engine),
            safety,
            decisions,
            machine,
            settings,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Run the full evaluation chain for one pair. The decision goes through
    /// the injected cache, so a repeat within the TTL is served as-is.
    pub async fn evaluate(
        &self,
        profile: &UserProfile,
        job: &JobPosting,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, AutopilotError> {
        passes_filters(profile, job)
            .map_err(|rejection| AutopilotError::Filtered {
                reason: rejection.label(),
            })?;

        let match_result = self.engine.score(profile, job, self.settings.strategy).await;

        let activity = self
            .applications
            .activity(&profile.user_id, &job.company, now)
            .await?;
        let safety = self.safety.evaluate(&activity, match_result.overall, now);

        let company = self.intelligence.company(&job.company).await;
        let market = self.intelligence.market().await;
        let risk = assess_risk(job, &company, &market, &activity);
        let timing = analyze_timing(job, &company, now);

        let decision = self.decisions.decide(
            DecisionInputs {
                user_id: &profile.user_id,
                job_id: &job.id,
                match_result: Some(&match_result),
                safety: &safety,
                risk: &risk,
                timing: &timing,
            },
            now,
        );

        Ok(Evaluation {
            match_result,
            safety,
            risk,
            timing,
            decision,
        })
    }

    /// Scan recent postings for every active user and queue qualifying
    /// matches. Per-user failures are logged and skipped; a repository
    /// outage aborts the pass.
    pub async fn find_matches_for_active_users(
        &self,
        now: DateTime<Utc>,
    ) -> Result<MatchRunSummary, AutopilotError> {
        let users = self.profiles.active_users().await?;
        let jobs = Arc::new(
            self.catalog
                .recent_active(self.settings.catalog_scan_limit)
                .await?,
        );

        let mut summary = MatchRunSummary {
            users: users.len(),
            ..MatchRunSummary::default()
        };

        for user in users {
            match self.match_user(&user, &jobs, now).await {
                Ok(user_summary) => {
                    summary.evaluated += user_summary.evaluated;
                    summary.queued += user_summary.queued;
                    summary.duplicates += user_summary.duplicates;
                    summary.filtered += user_summary.filtered;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(user = %user.user_id.0, error = %err, "match pass failed for user");
                    summary.user_errors += 1;
                }
            }
        }

        info!(
            users = summary.users,
            queued = summary.queued,
            evaluated = summary.evaluated,
            "find-matches pass finished"
        );
        Ok(summary)
    }

    async fn match_user(
        &self,
        user: &UserProfile,
        jobs: &Arc<Vec<JobPosting>>,
        now: DateTime<Utc>,
    ) -> Result<MatchRunSummary, AutopilotError> {
        let mut summary = MatchRunSummary::default();
        let mut candidates = Vec::new();

        for job in jobs.iter() {
            if self.queue.contains(&user.user_id, &job.id).await?
                || self.applications.exists(&user.user_id, &job.id).await?
            {
                summary.duplicates += 1;
                continue;
            }
            if let Err(rejection) = passes_filters(user, job) {
                debug!(job = %job.id.0, reason = rejection.label(), "posting filtered");
                summary.filtered += 1;
                continue;
            }
            candidates.push(job.clone());
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.match_concurrency));
        let mut tasks = JoinSet::new();
        for job in candidates {
            let engine = Arc::clone(&self.engine);
            let profile = user.clone();
            let strategy = self.settings.strategy;
            let permit = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = permit.acquire_owned().await;
                engine.score(&profile, &job, strategy).await
            });
        }

        let threshold = user.preferences.match_threshold.minimum_score();
        let mut results: Vec<MatchResult> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => warn!(error = %err, "match task aborted"),
            }
        }
        summary.evaluated = results.len();
        results.sort_by(|a, b| b.overall.total_cmp(&a.overall));

        for result in results {
            if result.overall < threshold {
                continue;
            }
            let item = QueueItem::from_match(&result, user.preferences.approval_mode, now);
            match self.queue.insert_if_absent(item).await {
                Ok(()) => summary.queued += 1,
                Err(RepositoryError::Conflict) => summary.duplicates += 1,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(summary)
    }

    /// Drain due approved items and submit, reschedule, or reject each one.
    pub async fn process_queue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<QueueRunSummary, AutopilotError> {
        let items = self
            .queue
            .due_approved(now, self.settings.queue_batch_size)
            .await?;

        let mut summary = QueueRunSummary {
            drained: items.len(),
            ..QueueRunSummary::default()
        };

        for item in items {
            let user = item.user_id.clone();
            let job = item.job_id.clone();
            match self.process_item(item, now).await {
                Ok(ItemOutcome::Applied) => summary.applied += 1,
                Ok(ItemOutcome::Rescheduled) => summary.rescheduled += 1,
                Ok(ItemOutcome::Skipped) => summary.skipped += 1,
                Ok(ItemOutcome::Duplicate) => summary.duplicates += 1,
                Ok(ItemOutcome::Failed) => summary.failed += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(user = %user.0, job = %job.0, error = %err, "queue item failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            drained = summary.drained,
            applied = summary.applied,
            "queue pass finished"
        );
        Ok(summary)
    }

    async fn process_item(
        &self,
        mut item: QueueItem,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, AutopilotError> {
        if self.applications.exists(&item.user_id, &item.job_id).await? {
            // Already applied through another path; drop the stale item.
            self.queue.remove(&item.user_id, &item.job_id).await?;
            return Ok(ItemOutcome::Duplicate);
        }

        let Some(profile) = self.profiles.fetch(&item.user_id).await? else {
            return self
                .finish_item(item, QueueStatus::Failed, Some("user profile not found"))
                .await
                .map(|_| ItemOutcome::Failed);
        };
        let Some(job) = self.catalog.fetch(&item.job_id).await? else {
            return self
                .finish_item(item, QueueStatus::Failed, Some("posting no longer catalogued"))
                .await
                .map(|_| ItemOutcome::Failed);
        };

        let evaluation = match self.evaluate(&profile, &job, now).await {
            Ok(evaluation) => evaluation,
            Err(AutopilotError::Filtered { reason }) => {
                return self
                    .finish_item(item, QueueStatus::Rejected, Some(reason))
                    .await
                    .map(|_| ItemOutcome::Skipped);
            }
            Err(err) => return Err(err),
        };

        let decision = &evaluation.decision;
        match decision.verdict {
            Verdict::ApplyScheduled
                if decision.scheduled_for.map(|at| at > now).unwrap_or(false) =>
            {
                item.auto_apply_after = decision.scheduled_for;
                self.queue.update(item).await?;
                Ok(ItemOutcome::Rescheduled)
            }
            Verdict::ApplyImmediately | Verdict::ApplyScheduled => {
                self.submit(item, profile, job, &evaluation, now).await
            }
            Verdict::ReviewRequired | Verdict::SkipTemporarily | Verdict::SkipPermanently => self
                .finish_item(item, QueueStatus::Rejected, Some(&decision.reason))
                .await
                .map(|_| ItemOutcome::Skipped),
        }
    }

    async fn submit(
        &self,
        mut item: QueueItem,
        profile: UserProfile,
        job: JobPosting,
        evaluation: &Evaluation,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, AutopilotError> {
        let cover_letter = self.cover_letter_for(&profile, &job).await;
        let payload = SubmissionPayload {
            profile: profile.clone(),
            job: job.clone(),
            cover_letter: cover_letter.clone(),
        };

        let method = if job.supports_email_application() {
            let address = job
                .apply_email
                .clone()
                .unwrap_or_else(|| job.apply_url.trim_start_matches("mailto:").to_string());
            if let Err(err) = self.email.send(&payload, &address).await {
                let message = err.to_string();
                return self
                    .finish_item(item, QueueStatus::Failed, Some(&message))
                    .await
                    .map(|_| ItemOutcome::Failed);
            }
            ApplicationMethod::Email
        } else {
            let content = match self.form_fetcher.fetch(&job.apply_url).await {
                Ok(content) => content,
                Err(err) => {
                    let message = format!("requires human review: {err}");
                    return self
                        .finish_item(item, QueueStatus::Rejected, Some(&message))
                        .await
                        .map(|_| ItemOutcome::Skipped);
                }
            };
            let form_type = detect_form_type(&job.apply_url, Some(&content));
            match self.run_machine(&item, form_type, &payload).await? {
                MachineVerdict::Completed => ApplicationMethod::FormAutomation,
                MachineVerdict::Failed(message) => {
                    return self
                        .finish_item(item, QueueStatus::Failed, Some(&message))
                        .await
                        .map(|_| ItemOutcome::Failed);
                }
                MachineVerdict::RequiresHuman(message) => {
                    return self
                        .finish_item(item, QueueStatus::Rejected, Some(&message))
                        .await
                        .map(|_| ItemOutcome::Skipped);
                }
            }
        };

        let application = Application::new(
            item.user_id.clone(),
            item.job_id.clone(),
            job.company.clone(),
            method,
            evaluation.match_result.overall,
            cover_letter,
            now,
        );
        let application_id = application.id.clone();

        match self.applications.insert_if_absent(application).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => {
                self.queue.remove(&item.user_id, &item.job_id).await?;
                return Ok(ItemOutcome::Duplicate);
            }
            Err(err) => return Err(err.into()),
        }

        item.status = QueueStatus::AutoApplied;
        item.application_id = Some(application_id);
        item.error = None;
        self.queue.update(item).await?;
        Ok(ItemOutcome::Applied)
    }

    async fn run_machine(
        &self,
        item: &QueueItem,
        form_type: FormType,
        payload: &SubmissionPayload,
    ) -> Result<MachineVerdict, AutopilotError> {
        let attempt = self
            .machine
            .run(
                item.user_id.clone(),
                item.job_id.clone(),
                form_type,
                payload,
            )
            .await?;

        let verdict = match attempt.status {
            AttemptStatus::Completed => MachineVerdict::Completed,
            AttemptStatus::RequiresHuman => MachineVerdict::RequiresHuman(format!(
                "requires human review: {}",
                attempt
                    .error_log
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "manual completion needed".to_string())
            )),
            _ => MachineVerdict::Failed(
                attempt
                    .error_log
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "submission failed".to_string()),
            ),
        };
        Ok(verdict)
    }

    async fn cover_letter_for(&self, profile: &UserProfile, job: &JobPosting) -> Option<String> {
        if !profile.preferences.cover_letters_enabled {
            return None;
        }
        let writer = self.cover_letters.as_ref()?;
        match writer.write(profile, job).await {
            Ok(letter) => Some(letter),
            Err(err) => {
                // Letter generation is best-effort; submit without one.
                warn!(user = %profile.user_id.0, error = %err, "cover letter skipped");
                None
            }
        }
    }

    async fn finish_item(
        &self,
        mut item: QueueItem,
        status: QueueStatus,
        error: Option<&str>,
    ) -> Result<(), AutopilotError> {
        item.status = status;
        item.error = error.map(str::to_string);
        self.queue.update(item).await?;
        Ok(())
    }

    /// Flip pending items past their expiry; returns how many changed.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, AutopilotError> {
        let expired = self.queue.expire_pending_before(now).await?;
        if expired > 0 {
            info!(expired, "expired stale queue items");
        }
        Ok(expired)
    }

    /// Recompute per-user stats into the queryable snapshot map.
    pub async fn refresh_stats(&self, now: DateTime<Utc>) -> Result<usize, AutopilotError> {
        let users = self.profiles.active_users().await?;
        let mut refreshed = 0usize;

        for user in &users {
            let counts = self.applications.counts(&user.user_id, now).await?;
            let queue_counts = self.queue.status_counts(&user.user_id).await?;
            let stats = ApplicationStats {
                total: counts.total,
                last_7_days: counts.last_7_days,
                last_30_days: counts.last_30_days,
                queue_pending: queue_counts.pending,
                queue_approved: queue_counts.approved,
            };
            self.stats
                .lock()
                .expect("stats mutex poisoned")
                .insert(user.user_id.clone(), stats);
            refreshed += 1;
        }

        Ok(refreshed)
    }

    pub fn stats_for(&self, user: &UserId) -> Option<ApplicationStats> {
        self.stats
            .lock()
            .expect("stats mutex poisoned")
            .get(user)
            .copied()
    }

    pub async fn queue_items(&self, user: &UserId) -> Result<Vec<QueueItem>, AutopilotError> {
        Ok(self.queue.items_for_user(user).await?)
    }

    /// Evaluate an identified pair, fetching both records first. Unknown
    /// identifiers surface as `NotFound`.
    pub async fn evaluate_pair(
        &self,
        user: &UserId,
        job: &super::super::domain::JobId,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, AutopilotError> {
        let profile = self
            .profiles
            .fetch(user)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let posting = self
            .catalog
            .fetch(job)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.evaluate(&profile, &posting, now).await
    }
}

enum MachineVerdict {
    Completed,
    Failed(String),
    RequiresHuman(String),
}
