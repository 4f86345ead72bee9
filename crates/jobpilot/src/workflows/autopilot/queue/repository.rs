use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::super::domain::{JobId, JobPosting, UserId, UserProfile};
use super::super::risk::{CompanySnapshot, MarketSnapshot};
use super::super::safety::ApplicationActivity;
use super::super::submission::SubmissionPayload;
use super::domain::{Application, QueueItem};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Raw submission counts used to build per-user stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationCounts {
    pub total: u64,
    pub last_7_days: u64,
    pub last_30_days: u64,
}

/// Pending/approved totals for a user's queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatusCounts {
    pub pending: u64,
    pub approved: u64,
}

/// Storage abstraction for the auto-apply queue.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert unless `(user_id, job_id)` is already queued; duplicates
    /// surface as `Conflict`.
    async fn insert_if_absent(&self, item: QueueItem) -> Result<(), RepositoryError>;
    async fn update(&self, item: QueueItem) -> Result<(), RepositoryError>;
    async fn remove(&self, user: &UserId, job: &JobId) -> Result<(), RepositoryError>;
    async fn contains(&self, user: &UserId, job: &JobId) -> Result<bool, RepositoryError>;
    async fn due_approved(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueItem>, RepositoryError>;
    /// Flip pending items whose `expires_at` has passed; returns how many.
    async fn expire_pending_before(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
    async fn items_for_user(&self, user: &UserId) -> Result<Vec<QueueItem>, RepositoryError>;
    async fn status_counts(&self, user: &UserId) -> Result<QueueStatusCounts, RepositoryError>;
}

/// Storage abstraction for submitted applications.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert unless the user already applied to the job.
    async fn insert_if_absent(&self, application: Application) -> Result<(), RepositoryError>;
    async fn exists(&self, user: &UserId, job: &JobId) -> Result<bool, RepositoryError>;
    /// Activity snapshot the safety evaluator consumes.
    async fn activity(
        &self,
        user: &UserId,
        company: &str,
        now: DateTime<Utc>,
    ) -> Result<ApplicationActivity, RepositoryError>;
    async fn counts(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ApplicationCounts, RepositoryError>;
}

/// Read access to registered users.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn active_users(&self) -> Result<Vec<UserProfile>, RepositoryError>;
    async fn fetch(&self, user: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
}

/// Read access to catalogued postings.
#[async_trait]
pub trait JobCatalog: Send + Sync {
    async fn recent_active(&self, limit: usize) -> Result<Vec<JobPosting>, RepositoryError>;
    async fn fetch(&self, job: &JobId) -> Result<Option<JobPosting>, RepositoryError>;
}

/// Company and market intelligence feeding risk and timing analysis.
/// Providers fall back to neutral values rather than failing.
#[async_trait]
pub trait IntelligenceProvider: Send + Sync {
    async fn company(&self, name: &str) -> CompanySnapshot;
    async fn market(&self) -> MarketSnapshot;
}

#[derive(Debug, thiserror::Error)]
#[error("cover letter generation failed: {0}")]
pub struct CoverLetterError(pub String);

/// Optional cover-letter generation; failures are non-fatal to submission.
#[async_trait]
pub trait CoverLetterWriter: Send + Sync {
    async fn write(&self, profile: &UserProfile, job: &JobPosting)
        -> Result<String, CoverLetterError>;
}

#[derive(Debug, thiserror::Error)]
#[error("email dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Outbound channel for email-based applications.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, payload: &SubmissionPayload, to: &str) -> Result<(), DispatchError>;
}
