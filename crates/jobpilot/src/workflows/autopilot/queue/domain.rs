use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::domain::{ApprovalMode, JobId, UserId};
use super::super::matching::MatchResult;

/// Days a pending queue item stays eligible before expiry.
pub const QUEUE_TTL_DAYS: i64 = 7;

/// Lifecycle of a queued match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Approved,
    AutoApplied,
    Rejected,
    Expired,
    Failed,
}

impl QueueStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Approved => "approved",
            QueueStatus::AutoApplied => "auto_applied",
            QueueStatus::Rejected => "rejected",
            QueueStatus::Expired => "expired",
            QueueStatus::Failed => "failed",
        }
    }
}

/// One matched posting waiting in a user's queue. `(user_id, job_id)` is
/// unique across the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub user_id: UserId,
    pub job_id: JobId,
    pub status: QueueStatus,
    pub match_score: f64,
    pub match_reasons: Vec<String>,
    pub priority: u8,
    pub queued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub auto_apply_after: Option<DateTime<Utc>>,
    pub application_id: Option<String>,
    pub error: Option<String>,
}

impl QueueItem {
    /// Build a fresh item from a match, honoring the user's approval mode.
    pub fn from_match(result: &MatchResult, approval: ApprovalMode, now: DateTime<Utc>) -> Self {
        let (status, auto_apply_after) = match approval {
            ApprovalMode::Instant => (QueueStatus::Approved, Some(now)),
            ApprovalMode::Delayed { hours } => (
                QueueStatus::Pending,
                Some(now + Duration::hours(hours as i64)),
            ),
            ApprovalMode::Manual => (QueueStatus::Pending, None),
        };

        Self {
            user_id: result.user_id.clone(),
            job_id: result.job_id.clone(),
            status,
            match_score: result.overall,
            match_reasons: result.reasons(),
            priority: result.priority,
            queued_at: now,
            expires_at: now + Duration::days(QUEUE_TTL_DAYS),
            auto_apply_after,
            application_id: None,
            error: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueStatus::Approved
            && self
                .auto_apply_after
                .map(|after| after <= now)
                .unwrap_or(true)
    }
}

/// Channel through which an application went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationMethod {
    FormAutomation,
    Email,
    RecordOnly,
}

impl ApplicationMethod {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationMethod::FormAutomation => "form_automation",
            ApplicationMethod::Email => "email",
            ApplicationMethod::RecordOnly => "record_only",
        }
    }
}

/// Persisted record of a submitted application. `(user_id, job_id)` is
/// unique; a conflict on insert means the user already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub user_id: UserId,
    pub job_id: JobId,
    pub company: String,
    pub method: ApplicationMethod,
    pub match_score: f64,
    pub cover_letter: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    pub fn new(
        user_id: UserId,
        job_id: JobId,
        company: String,
        method: ApplicationMethod,
        match_score: f64,
        cover_letter: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            job_id,
            company,
            method,
            match_score,
            cover_letter,
            submitted_at: now,
        }
    }
}

/// Per-user submission totals surfaced by the stats refresh job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationStats {
    pub total: u64,
    pub last_7_days: u64,
    pub last_30_days: u64,
    pub queue_pending: u64,
    pub queue_approved: u64,
}
