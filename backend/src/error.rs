//! Error handling for the garment production ledger
//!
//! Ledger errors keep their machine-readable code; infrastructure errors are
//! reported without leaking internals.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::LedgerError;
use thiserror::Error;

/// Postgres SQLSTATE for a CHECK constraint failure
const CHECK_VIOLATION: &str = "23514";

/// CHECK constraint backing `assigned + remaining + forked <= received`
const CONSERVATION_CONSTRAINT: &str = "production_cards_conservation";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A database constraint refused a write the engine allowed
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Transaction did not {stage} within {limit:?}")]
    TransactionTimeout {
        stage: &'static str,
        limit: Duration,
    },

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some(CHECK_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return AppError::ConstraintViolation(constraint);
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Ledger(err) => match err {
                LedgerError::InsufficientQuantity { .. }
                | LedgerError::ConservationViolation { .. }
                | LedgerError::InvalidStateTransition(_)
                | LedgerError::ForkInUse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::CardNotActive { .. } => StatusCode::CONFLICT,
                LedgerError::EntityNotFound { .. } => StatusCode::NOT_FOUND,
                LedgerError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            },
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ConstraintViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TransactionTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Ledger(err) => err.code(),
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ConstraintViolation(constraint) if constraint == CONSERVATION_CONSTRAINT => {
                "CONSERVATION_VIOLATION"
            }
            AppError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            AppError::TransactionTimeout { .. } => "TRANSACTION_TIMEOUT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (message, field) = match self {
            AppError::Ledger(LedgerError::InvalidInput { field, message }) => {
                (message.clone(), Some(field.to_string()))
            }
            AppError::Validation(errors) => {
                let field = errors.field_errors().keys().next().map(|f| f.to_string());
                (self.to_string(), field)
            }
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
            AppError::InternalError(_) => ("An internal server error occurred".to_string(), None),
            _ => (self.to_string(), None),
        };
        ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = self.code(), "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
