//! Worker log HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::worker_log::{CreateWorkerLogInput, UpdateWorkerLogInput, WorkerLogQuery};
use crate::services::WorkerLogService;
use crate::AppState;

fn service(state: &AppState) -> WorkerLogService {
    WorkerLogService::new(state.db.clone(), state.config.ledger.clone())
}

pub async fn list_worker_logs(
    State(state): State<AppState>,
    Query(query): Query<WorkerLogQuery>,
) -> impl IntoResponse {
    match service(&state).list(query).await {
        Ok(logs) => (StatusCode::OK, Json(serde_json::json!({ "worker_logs": logs }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record work, with any rejections or alterations, against the department's card
pub async fn create_worker_log(
    State(state): State<AppState>,
    Json(input): Json<CreateWorkerLogInput>,
) -> impl IntoResponse {
    match service(&state).create(input).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_worker_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).get(log_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_worker_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
    Json(input): Json<UpdateWorkerLogInput>,
) -> impl IntoResponse {
    match service(&state).update(log_id, input).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_worker_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).delete(log_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
