//! Batch and sub-batch models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cutting batch that sub-batches draw their pieces from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub total_quantity: i32,
    /// Pieces not yet promised to any sub-batch
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(name: impl Into<String>, total_quantity: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            total_quantity,
            available_quantity: total_quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A production lot moving through the departments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubBatch {
    pub id: Uuid,
    pub batch_id: Option<Uuid>,
    pub name: String,
    /// Planned total; frozen once the first card exists
    pub estimated_pieces: i32,
    pub status: SubBatchStatus,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a sub-batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubBatchStatus {
    Draft,
    InProduction,
    Completed,
    Cancelled,
}

impl SubBatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubBatchStatus::Draft => "DRAFT",
            SubBatchStatus::InProduction => "IN_PRODUCTION",
            SubBatchStatus::Completed => "COMPLETED",
            SubBatchStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(SubBatchStatus::Draft),
            "IN_PRODUCTION" => Some(SubBatchStatus::InProduction),
            "COMPLETED" => Some(SubBatchStatus::Completed),
            "CANCELLED" => Some(SubBatchStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether production can no longer change this sub-batch
    pub fn is_closed(&self) -> bool {
        matches!(self, SubBatchStatus::Completed | SubBatchStatus::Cancelled)
    }
}

impl std::fmt::Display for SubBatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubBatchStatus::Draft => write!(f, "Draft"),
            SubBatchStatus::InProduction => write!(f, "In Production"),
            SubBatchStatus::Completed => write!(f, "Completed"),
            SubBatchStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_db_strings() {
        for status in [
            SubBatchStatus::Draft,
            SubBatchStatus::InProduction,
            SubBatchStatus::Completed,
            SubBatchStatus::Cancelled,
        ] {
            assert_eq!(SubBatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubBatchStatus::parse("draft"), None);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(!SubBatchStatus::Draft.is_closed());
        assert!(!SubBatchStatus::InProduction.is_closed());
        assert!(SubBatchStatus::Completed.is_closed());
        assert!(SubBatchStatus::Cancelled.is_closed());
    }

    #[test]
    fn test_new_batch_is_fully_available() {
        let batch = Batch::new("Denim cut #4", 500);
        assert_eq!(batch.available_quantity, 500);
        assert_eq!(batch.total_quantity, 500);
    }
}
