use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::domain::{JobId, UserId};
use super::form::{ApplicationStep, FormType};

/// Identifier wrapper for submission attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Lifecycle of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    InProgress,
    StepCompleted,
    Retrying,
    Completed,
    Failed,
    RequiresHuman,
}

impl AttemptStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::StepCompleted => "step_completed",
            AttemptStatus::Retrying => "retrying",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Failed => "failed",
            AttemptStatus::RequiresHuman => "requires_human",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptStatus::Completed | AttemptStatus::Failed | AttemptStatus::RequiresHuman
        )
    }
}

/// Values a step produced, recorded for the audit trail.
pub type StepData = BTreeMap<String, String>;

/// Why a step could not be executed.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("step {step:?} failed: {message}")]
pub struct StepFailure {
    pub step: ApplicationStep,
    pub message: String,
    pub retryable: bool,
}

impl StepFailure {
    pub fn transient(step: ApplicationStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(step: ApplicationStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            retryable: false,
        }
    }
}

/// Full record of one run through a form's step plan. Persisted after every
/// transition so a crash leaves an inspectable trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationAttempt {
    pub attempt_id: AttemptId,
    pub user_id: UserId,
    pub job_id: JobId,
    pub form_type: FormType,
    pub status: AttemptStatus,
    pub completed_steps: Vec<ApplicationStep>,
    pub failed_steps: Vec<ApplicationStep>,
    pub step_data: BTreeMap<String, StepData>,
    pub error_log: Vec<String>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ApplicationAttempt {
    pub fn new(user_id: UserId, job_id: JobId, form_type: FormType, now: DateTime<Utc>) -> Self {
        Self {
            attempt_id: AttemptId::generate(),
            user_id,
            job_id,
            form_type,
            status: AttemptStatus::Pending,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            step_data: BTreeMap::new(),
            error_log: Vec::new(),
            retry_count: 0,
            started_at: now,
            finished_at: None,
        }
    }

    pub fn record_step(&mut self, step: ApplicationStep, data: StepData) {
        self.completed_steps.push(step);
        self.step_data.insert(step.label().to_string(), data);
        self.status = AttemptStatus::StepCompleted;
    }

    pub fn record_failure(&mut self, failure: &StepFailure) {
        if !self.failed_steps.contains(&failure.step) {
            self.failed_steps.push(failure.step);
        }
        self.error_log.push(failure.to_string());
    }

    pub fn finish(&mut self, status: AttemptStatus, now: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(now);
    }

    /// True when every step of the plan is in `completed_steps`.
    pub fn plan_satisfied(&self) -> bool {
        self.form_type
            .steps()
            .iter()
            .all(|step| self.completed_steps.contains(step))
    }
}
