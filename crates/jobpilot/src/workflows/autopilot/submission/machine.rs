use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::super::domain::{JobId, UserId};
use super::attempt::{ApplicationAttempt, AttemptStatus, StepFailure};
use super::form::{ApplicationStep, FormType};
use super::{AttemptRepository, StepExecutor, SubmissionError, SubmissionPayload};

/// Retry cadence for transient step failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delays: Vec<Duration>,
}

impl RetryPolicy {
    fn delay_for(&self, retry: u32) -> Duration {
        self.delays
            .get(retry as usize)
            .copied()
            .or_else(|| self.delays.last().copied())
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays: vec![
                Duration::from_secs(5),
                Duration::from_secs(15),
                Duration::from_secs(60),
            ],
        }
    }
}

/// Drives one attempt through a form's step plan, persisting after every
/// transition so the trail survives a crash mid-run.
pub struct SubmissionMachine {
    executor: Arc<dyn StepExecutor>,
    attempts: Arc<dyn AttemptRepository>,
    retry_policy: RetryPolicy,
}

impl SubmissionMachine {
    pub fn new(executor: Arc<dyn StepExecutor>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self {
            executor,
            attempts,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Run the full plan. The returned attempt carries a terminal status;
    /// `Err` only surfaces persistence failures.
    pub async fn run(
        &self,
        user_id: UserId,
        job_id: JobId,
        form_type: FormType,
        payload: &SubmissionPayload,
    ) -> Result<ApplicationAttempt, SubmissionError> {
        let mut attempt = ApplicationAttempt::new(user_id, job_id, form_type, Utc::now());
        self.attempts.upsert(&attempt).await?;

        attempt.status = AttemptStatus::InProgress;
        self.attempts.upsert(&attempt).await?;

        let plan = form_type.steps();
        for (index, step) in plan.iter().copied().enumerate() {
            if step == ApplicationStep::PreviewSubmit {
                let missing: Vec<&'static str> = plan[..index]
                    .iter()
                    .filter(|prior| !attempt.completed_steps.contains(prior))
                    .map(|prior| prior.label())
                    .collect();
                if !missing.is_empty() {
                    attempt.error_log.push(format!(
                        "preview found incomplete steps: {}",
                        missing.join(", ")
                    ));
                    attempt.finish(AttemptStatus::RequiresHuman, Utc::now());
                    self.attempts.upsert(&attempt).await?;
                    return Ok(attempt);
                }
            }

            match self.run_step(&mut attempt, step, payload).await? {
                StepOutcome::Completed => {}
                StepOutcome::Terminal(status) => {
                    attempt.finish(status, Utc::now());
                    self.attempts.upsert(&attempt).await?;
                    return Ok(attempt);
                }
            }
        }

        let terminal = if attempt.plan_satisfied() {
            AttemptStatus::Completed
        } else {
            AttemptStatus::RequiresHuman
        };
        attempt.finish(terminal, Utc::now());
        self.attempts.upsert(&attempt).await?;

        info!(
            attempt = %attempt.attempt_id.0,
            form = form_type.label(),
            status = attempt.status.label(),
            "submission attempt finished"
        );

        Ok(attempt)
    }

    async fn run_step(
        &self,
        attempt: &mut ApplicationAttempt,
        step: ApplicationStep,
        payload: &SubmissionPayload,
    ) -> Result<StepOutcome, SubmissionError> {
        let mut retries = 0u32;

        loop {
            match self.executor.execute(step, payload).await {
                Ok(data) => {
                    attempt.record_step(step, data);
                    self.attempts.upsert(attempt).await?;
                    return Ok(StepOutcome::Completed);
                }
                Err(failure) if !failure.retryable => {
                    warn!(
                        attempt = %attempt.attempt_id.0,
                        step = step.label(),
                        error = %failure,
                        "non-retryable step failure"
                    );
                    attempt.record_failure(&failure);
                    self.attempts.upsert(attempt).await?;
                    return Ok(StepOutcome::Terminal(AttemptStatus::RequiresHuman));
                }
                Err(failure) => {
                    attempt.record_failure(&failure);
                    if retries >= self.retry_policy.max_retries {
                        self.attempts.upsert(attempt).await?;
                        return Ok(StepOutcome::Terminal(AttemptStatus::Failed));
                    }

                    let delay = self.retry_policy.delay_for(retries);
                    retries += 1;
                    attempt.retry_count += 1;
                    attempt.status = AttemptStatus::Retrying;
                    self.attempts.upsert(attempt).await?;

                    warn!(
                        attempt = %attempt.attempt_id.0,
                        step = step.label(),
                        retry = retries,
                        delay_secs = delay.as_secs(),
                        "step failed; backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

enum StepOutcome {
    Completed,
    Terminal(AttemptStatus),
}
