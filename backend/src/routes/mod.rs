//! Route definitions for the garment production ledger

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/departments", department_routes())
        .nest("/workers", worker_routes())
        .nest("/batches", batch_routes())
        .nest("/sub-batches", sub_batch_routes())
        .nest("/cards", card_routes())
        .nest("/worker-logs", worker_log_routes())
}

fn department_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_departments).post(handlers::create_department),
        )
        .route("/:department_id/board", get(handlers::get_department_board))
}

fn worker_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::list_workers).post(handlers::create_worker))
}

fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_batch))
        .route("/:batch_id", get(handlers::get_batch))
}

/// Sub-batch lifecycle, planning and accounting
fn sub_batch_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_sub_batches).post(handlers::create_sub_batch),
        )
        .route(
            "/:sub_batch_id",
            get(handlers::get_sub_batch).delete(handlers::delete_sub_batch),
        )
        .route("/:sub_batch_id/complete", post(handlers::complete_sub_batch))
        .route("/:sub_batch_id/cancel", post(handlers::cancel_sub_batch))
        .route(
            "/:sub_batch_id/route",
            get(handlers::get_route).post(handlers::create_route),
        )
        .route("/:sub_batch_id/cards", get(handlers::list_sub_batch_cards))
        .route(
            "/:sub_batch_id/conservation",
            get(handlers::get_conservation_report),
        )
}

fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/:card_id", get(handlers::get_card))
        .route("/:card_id/advance", post(handlers::advance_card))
        .route("/:card_id/stage", post(handlers::move_card_stage))
        .route("/:card_id/scrap", post(handlers::scrap_card_pieces))
        .route("/:card_id/history", get(handlers::get_card_history))
}

fn worker_log_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_worker_logs).post(handlers::create_worker_log),
        )
        .route(
            "/:log_id",
            get(handlers::get_worker_log)
                .patch(handlers::update_worker_log)
                .delete(handlers::delete_worker_log),
        )
}
