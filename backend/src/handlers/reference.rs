//! Department, worker and batch handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::reference::{CreateBatchInput, CreateDepartmentInput, CreateWorkerInput};
use crate::services::ReferenceService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WorkerFilter {
    pub department_id: Option<Uuid>,
}

pub async fn list_departments(State(state): State<AppState>) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.list_departments().await {
        Ok(departments) => {
            (StatusCode::OK, Json(serde_json::json!({ "departments": departments }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn create_department(
    State(state): State<AppState>,
    Json(input): Json<CreateDepartmentInput>,
) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.create_department(input).await {
        Ok(department) => (StatusCode::CREATED, Json(department)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_workers(
    State(state): State<AppState>,
    Query(filter): Query<WorkerFilter>,
) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.list_workers(filter.department_id).await {
        Ok(workers) => (StatusCode::OK, Json(serde_json::json!({ "workers": workers }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_worker(
    State(state): State<AppState>,
    Json(input): Json<CreateWorkerInput>,
) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.create_worker(input).await {
        Ok(worker) => (StatusCode::CREATED, Json(worker)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_batch(
    State(state): State<AppState>,
    Json(input): Json<CreateBatchInput>,
) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.create_batch(input).await {
        Ok(batch) => (StatusCode::CREATED, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.get_batch(batch_id).await {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}
