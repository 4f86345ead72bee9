//! Interval scheduler driving the recurring autopilot jobs. Each job holds
//! a try-lock guard so overlapping ticks skip instead of stacking up.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use crate::workflows::autopilot::queue::{AutopilotError, AutopilotService};

/// Wall-clock budget for a single job run.
const JOB_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// The recurring jobs and their cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FindMatches,
    ProcessQueue,
    CleanupExpired,
    RefreshStats,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::FindMatches,
        JobKind::ProcessQueue,
        JobKind::CleanupExpired,
        JobKind::RefreshStats,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            JobKind::FindMatches => "find_matches",
            JobKind::ProcessQueue => "process_queue",
            JobKind::CleanupExpired => "cleanup_expired",
            JobKind::RefreshStats => "refresh_stats",
        }
    }

    pub const fn interval(self) -> Duration {
        match self {
            JobKind::FindMatches => Duration::from_secs(30 * 60),
            JobKind::ProcessQueue => Duration::from_secs(5 * 60),
            JobKind::CleanupExpired => Duration::from_secs(60 * 60),
            JobKind::RefreshStats => Duration::from_secs(15 * 60),
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("job {0} is already running")]
    Busy(&'static str),
    #[error("job {0} exceeded its time budget")]
    Timeout(&'static str),
    #[error(transparent)]
    Job(#[from] AutopilotError),
}

#[derive(Debug, Clone, Serialize)]
struct RunRecord {
    finished_at: DateTime<Utc>,
    success: bool,
    detail: String,
}

struct JobEntry {
    kind: JobKind,
    guard: AsyncMutex<()>,
    last_run: Mutex<Option<RunRecord>>,
}

/// Point-in-time view of one job, for the status endpoint. `next_run` is one
/// interval past the last finish (or past scheduler construction before the
/// first run).
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: &'static str,
    pub interval_secs: u64,
    pub running: bool,
    pub next_run: DateTime<Utc>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_success: Option<bool>,
    pub last_detail: Option<String>,
}

pub struct Scheduler {
    service: Arc<AutopilotService>,
    jobs: Vec<JobEntry>,
    created_at: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(service: Arc<AutopilotService>) -> Self {
        let jobs = JobKind::ALL
            .into_iter()
            .map(|kind| JobEntry {
                kind,
                guard: AsyncMutex::new(()),
                last_run: Mutex::new(None),
            })
            .collect();
        Self {
            service,
            jobs,
            created_at: Utc::now(),
        }
    }

    fn entry(&self, kind: JobKind) -> &JobEntry {
        self.jobs
            .iter()
            .find(|entry| entry.kind == kind)
            .unwrap_or_else(|| unreachable!("every kind is registered at construction"))
    }

    /// Run one job immediately. A run already in flight yields `Busy`.
    pub async fn run_now(&self, kind: JobKind) -> Result<serde_json::Value, SchedulerError> {
        let entry = self.entry(kind);
        let Ok(_guard) = entry.guard.try_lock() else {
            return Err(SchedulerError::Busy(kind.id()));
        };

        let started = Utc::now();
        let result = tokio::time::timeout(JOB_TIMEOUT, self.execute(kind, started)).await;

        let (outcome, record) = match result {
            Ok(Ok(summary)) => {
                let record = RunRecord {
                    finished_at: Utc::now(),
                    success: true,
                    detail: summary.to_string(),
                };
                (Ok(summary), record)
            }
            Ok(Err(err)) => {
                let record = RunRecord {
                    finished_at: Utc::now(),
                    success: false,
                    detail: err.to_string(),
                };
                (Err(SchedulerError::Job(err)), record)
            }
            Err(_elapsed) => {
                let record = RunRecord {
                    finished_at: Utc::now(),
                    success: false,
                    detail: "time budget exceeded".to_string(),
                };
                (Err(SchedulerError::Timeout(kind.id())), record)
            }
        };

        *entry
            .last_run
            .lock()
            .expect("scheduler mutex poisoned") = Some(record);
        outcome
    }

    async fn execute(
        &self,
        kind: JobKind,
        now: DateTime<Utc>,
    ) -> Result<serde_json::Value, AutopilotError> {
        match kind {
            JobKind::FindMatches => {
                let summary = self.service.find_matches_for_active_users(now).await?;
                Ok(json!(summary))
            }
            JobKind::ProcessQueue => {
                let summary = self.service.process_queue(now).await?;
                Ok(json!(summary))
            }
            JobKind::CleanupExpired => {
                let expired = self.service.cleanup_expired(now).await?;
                Ok(json!({ "expired": expired }))
            }
            JobKind::RefreshStats => {
                let refreshed = self.service.refresh_stats(now).await?;
                Ok(json!({ "refreshed": refreshed }))
            }
        }
    }

    pub fn status(&self) -> Vec<JobStatus> {
        self.jobs
            .iter()
            .map(|entry| {
                let running = entry.guard.try_lock().is_err();
                let last = entry
                    .last_run
                    .lock()
                    .expect("scheduler mutex poisoned")
                    .clone();
                let interval = chrono::Duration::seconds(entry.kind.interval().as_secs() as i64);
                let anchor = last
                    .as_ref()
                    .map(|record| record.finished_at)
                    .unwrap_or(self.created_at);
                JobStatus {
                    id: entry.kind.id(),
                    interval_secs: entry.kind.interval().as_secs(),
                    running,
                    next_run: anchor + interval,
                    last_finished_at: last.as_ref().map(|record| record.finished_at),
                    last_success: last.as_ref().map(|record| record.success),
                    last_detail: last.map(|record| record.detail),
                }
            })
            .collect()
    }

    /// Spawn one ticking task per job. The first tick fires after a full
    /// interval so startup is quiet.
    pub fn spawn_all(self: &Arc<Self>) {
        for kind in JobKind::ALL {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(kind.interval());
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    match scheduler.run_now(kind).await {
                        Ok(summary) => {
                            info!(job = kind.id(), %summary, "scheduled job finished")
                        }
                        Err(SchedulerError::Busy(_)) => {
                            warn!(job = kind.id(), "previous run still in flight, skipping tick")
                        }
                        Err(err) => error!(job = kind.id(), error = %err, "scheduled job failed"),
                    }
                }
            });
        }
    }
}
