use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use jobpilot::scheduler::{JobKind, Scheduler, SchedulerError};
use jobpilot::workflows::autopilot::{autopilot_router, AutopilotService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_autopilot_routes(
    service: Arc<AutopilotService>,
    scheduler: Arc<Scheduler>,
) -> axum::Router {
    autopilot_router(service)
        .merge(scheduler_router(scheduler))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

fn scheduler_router(scheduler: Arc<Scheduler>) -> axum::Router {
    axum::Router::new()
        .route(
            "/api/v1/scheduler/jobs",
            axum::routing::get(scheduler_jobs_endpoint),
        )
        .route(
            "/api/v1/scheduler/jobs/:job_id/run",
            axum::routing::post(scheduler_run_endpoint),
        )
        .with_state(scheduler)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn scheduler_jobs_endpoint(
    State(scheduler): State<Arc<Scheduler>>,
) -> Json<serde_json::Value> {
    Json(json!({ "jobs": scheduler.status() }))
}

pub(crate) async fn scheduler_run_endpoint(
    State(scheduler): State<Arc<Scheduler>>,
    Path(job_id): Path<String>,
) -> Response {
    let Some(kind) = JobKind::parse(&job_id) else {
        let payload = json!({ "error": format!("unknown job '{job_id}'") });
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    };

    match scheduler.run_now(kind).await {
        Ok(summary) => {
            let payload = json!({ "job": kind.id(), "summary": summary });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(SchedulerError::Busy(_)) => {
            let payload = json!({ "error": format!("job '{job_id}' is already running") });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_infra;
    use jobpilot::config::AutomationConfig;

    fn test_scheduler() -> Arc<Scheduler> {
        let infra = build_infra(&AutomationConfig {
            match_concurrency: 2,
            queue_batch_size: 5,
            oracle_url: None,
        });
        Arc::new(Scheduler::new(infra.service))
    }

    #[tokio::test]
    async fn scheduler_jobs_endpoint_lists_every_job() {
        let Json(body) = scheduler_jobs_endpoint(State(test_scheduler())).await;
        let jobs = body["jobs"].as_array().expect("jobs array");
        assert_eq!(jobs.len(), 4);
    }

    #[tokio::test]
    async fn scheduler_run_endpoint_rejects_unknown_job() {
        let response =
            scheduler_run_endpoint(State(test_scheduler()), Path("defrag".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scheduler_run_endpoint_runs_cleanup_on_empty_state() {
        let response = scheduler_run_endpoint(
            State(test_scheduler()),
            Path("cleanup_expired".to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
