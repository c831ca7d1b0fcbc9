//! Production card HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::card::{AdvanceCardInput, MoveStageInput, ScrapInput};
use crate::services::CardService;
use crate::AppState;

fn service(state: &AppState) -> CardService {
    CardService::new(state.db.clone(), state.config.ledger.clone())
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).get(card_id).await {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Send a card's pieces to the next department
pub async fn advance_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<AdvanceCardInput>,
) -> impl IntoResponse {
    match service(&state).advance(card_id, input).await {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn move_card_stage(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<MoveStageInput>,
) -> impl IntoResponse {
    match service(&state).move_stage(card_id, input).await {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn scrap_card_pieces(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<ScrapInput>,
) -> impl IntoResponse {
    match service(&state).scrap(card_id, input).await {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_card_history(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).history(card_id).await {
        Ok(history) => (StatusCode::OK, Json(serde_json::json!({ "history": history }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Current cards of a department grouped by stage
pub async fn get_department_board(
    State(state): State<AppState>,
    Path(department_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).department_board(department_id).await {
        Ok(board) => (StatusCode::OK, Json(board)).into_response(),
        Err(e) => e.into_response(),
    }
}
