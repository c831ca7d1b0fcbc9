//! Worker log and fork record models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of work a log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Normal,
    Rejected,
    Altered,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Normal => "NORMAL",
            ActivityType::Rejected => "REJECTED",
            ActivityType::Altered => "ALTERED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(ActivityType::Normal),
            "REJECTED" => Some(ActivityType::Rejected),
            "ALTERED" => Some(ActivityType::Altered),
            _ => None,
        }
    }
}

/// One worker's contribution against one card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerLog {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub sub_batch_id: Uuid,
    pub department_id: Uuid,
    /// Card the worked quantity was drawn from
    pub department_sub_batch_id: Uuid,
    /// Baseline of the card at assignment time; informational only
    pub quantity_received: i32,
    pub quantity_worked: i32,
    pub activity_type: ActivityType,
    pub is_billable: bool,
    pub work_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Worker log with the forks it caused
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerLogDetail {
    #[serde(flatten)]
    pub log: WorkerLog,
    pub rejected: Vec<ForkRecord>,
    pub altered: Vec<ForkRecord>,
}

impl WorkerLogDetail {
    pub fn from_records(log: WorkerLog, records: Vec<ForkRecord>) -> Self {
        let (rejected, altered) = records
            .into_iter()
            .partition(|r| r.kind == ForkKind::Rejected);
        Self {
            log,
            rejected,
            altered,
        }
    }
}

/// Why pieces were split off a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForkKind {
    Rejected,
    Altered,
}

impl ForkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForkKind::Rejected => "REJECTED",
            ForkKind::Altered => "ALTERED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REJECTED" => Some(ForkKind::Rejected),
            "ALTERED" => Some(ForkKind::Altered),
            _ => None,
        }
    }
}

/// Where forked pieces go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "department_id", rename_all = "snake_case")]
pub enum ForkDestination {
    /// Discarded; no card is created
    Scrap,
    Department(Uuid),
}

impl ForkDestination {
    pub fn department(&self) -> Option<Uuid> {
        match self {
            ForkDestination::Scrap => None,
            ForkDestination::Department(id) => Some(*id),
        }
    }
}

/// A rejection or alteration event linking a shrunk card to the card it produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkRecord {
    pub id: Uuid,
    pub kind: ForkKind,
    pub sub_batch_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub source_department_sub_batch_id: Uuid,
    /// None for scrapped pieces
    pub created_department_sub_batch_id: Option<Uuid>,
    pub destination_department_id: Option<Uuid>,
    pub worker_log_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
