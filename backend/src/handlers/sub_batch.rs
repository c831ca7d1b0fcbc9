//! Sub-batch HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::sub_batch::{CreateRouteInput, CreateSubBatchInput, SubBatchQuery};
use crate::services::SubBatchService;
use crate::AppState;

fn service(state: &AppState) -> SubBatchService {
    SubBatchService::new(state.db.clone(), state.config.ledger.clone())
}

pub async fn list_sub_batches(
    State(state): State<AppState>,
    Query(query): Query<SubBatchQuery>,
) -> impl IntoResponse {
    match service(&state).list(query).await {
        Ok(sub_batches) => {
            (StatusCode::OK, Json(serde_json::json!({ "sub_batches": sub_batches }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn create_sub_batch(
    State(state): State<AppState>,
    Json(input): Json<CreateSubBatchInput>,
) -> impl IntoResponse {
    match service(&state).create(input).await {
        Ok(sub_batch) => (StatusCode::CREATED, Json(sub_batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_sub_batch(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).get(sub_batch_id).await {
        Ok(sub_batch) => (StatusCode::OK, Json(sub_batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Only draft sub-batches can be deleted
pub async fn delete_sub_batch(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).delete(sub_batch_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn complete_sub_batch(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).complete(sub_batch_id).await {
        Ok(sub_batch) => (StatusCode::OK, Json(sub_batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_sub_batch(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).cancel(sub_batch_id).await {
        Ok(sub_batch) => (StatusCode::OK, Json(sub_batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Plan the route; starts production in the first department
pub async fn create_route(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
    Json(input): Json<CreateRouteInput>,
) -> impl IntoResponse {
    match service(&state).create_route(sub_batch_id, input).await {
        Ok(plan) => (StatusCode::CREATED, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).get_route(sub_batch_id).await {
        Ok(route) => (StatusCode::OK, Json(route)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_sub_batch_cards(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).cards(sub_batch_id).await {
        Ok(cards) => (StatusCode::OK, Json(serde_json::json!({ "cards": cards }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_conservation_report(
    State(state): State<AppState>,
    Path(sub_batch_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).conservation_report(sub_batch_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}
