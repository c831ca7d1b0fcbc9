//! Ledger error taxonomy
//!
//! Every variant is deterministic given the current state, so none of them
//! is worth retrying without a change on the caller's side.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        card_id: Option<Uuid>,
        requested: i32,
        available: i32,
    },

    #[error("Card {card_id} is not active")]
    CardNotActive { card_id: Uuid },

    #[error("{entity} {id} not found")]
    EntityNotFound { entity: &'static str, id: Uuid },

    #[error("Quantity conservation violated on card {card_id}: {detail}")]
    ConservationViolation { card_id: Uuid, detail: String },

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Forked card {card_id} has moved on and cannot be removed")]
    ForkInUse { card_id: Uuid },
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        LedgerError::EntityNotFound { entity, id }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientQuantity { .. } => "INSUFFICIENT_QUANTITY",
            LedgerError::CardNotActive { .. } => "CARD_NOT_ACTIVE",
            LedgerError::EntityNotFound { .. } => "NOT_FOUND",
            LedgerError::ConservationViolation { .. } => "CONSERVATION_VIOLATION",
            LedgerError::InvalidInput { .. } => "VALIDATION_ERROR",
            LedgerError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            LedgerError::ForkInUse { .. } => "FORK_IN_USE",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
