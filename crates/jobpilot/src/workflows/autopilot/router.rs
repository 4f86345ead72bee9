use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{JobId, UserId};
use super::queue::{ApplicationStats, AutopilotError, AutopilotService, RepositoryError};

/// Router builder exposing HTTP endpoints for evaluation and queue queries.
pub fn autopilot_router(service: Arc<AutopilotService>) -> Router {
    Router::new()
        .route("/api/v1/autopilot/evaluations", post(evaluate_handler))
        .route("/api/v1/autopilot/queue/:user_id", get(queue_handler))
        .route("/api/v1/autopilot/stats/:user_id", get(stats_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluationRequest {
    pub user_id: String,
    pub job_id: String,
}

pub(crate) async fn evaluate_handler(
    State(service): State<Arc<AutopilotService>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response {
    let user = UserId(request.user_id);
    let job = JobId(request.job_id);
    match service.evaluate_pair(&user, &job, Utc::now()).await {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(AutopilotError::Filtered { reason }) => {
            let payload = json!({
                "error": format!("posting filtered: {reason}"),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(AutopilotError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "error": "user or job not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn queue_handler(
    State(service): State<Arc<AutopilotService>>,
    Path(user_id): Path<String>,
) -> Response {
    let user = UserId(user_id);
    match service.queue_items(&user).await {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn stats_handler(
    State(service): State<Arc<AutopilotService>>,
    Path(user_id): Path<String>,
) -> Response {
    let user = UserId(user_id);
    let stats = service.stats_for(&user).unwrap_or(ApplicationStats::default());
    (StatusCode::OK, axum::Json(stats)).into_response()
}
