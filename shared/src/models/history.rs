//! Append-only card history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::card::{CardStage, ProductionCard};

/// What happened to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryEvent {
    /// First card of a sub-batch
    Created,
    /// Card arrived downstream through advancement
    Arrived,
    /// Card created by a rejection or alteration fork
    Forked,
    StageChanged,
    /// Card's balance was sent to another department
    Advanced,
    /// Pieces were discarded from the card
    Scrapped,
}

impl HistoryEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEvent::Created => "CREATED",
            HistoryEvent::Arrived => "ARRIVED",
            HistoryEvent::Forked => "FORKED",
            HistoryEvent::StageChanged => "STAGE_CHANGED",
            HistoryEvent::Advanced => "ADVANCED",
            HistoryEvent::Scrapped => "SCRAPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(HistoryEvent::Created),
            "ARRIVED" => Some(HistoryEvent::Arrived),
            "FORKED" => Some(HistoryEvent::Forked),
            "STAGE_CHANGED" => Some(HistoryEvent::StageChanged),
            "ADVANCED" => Some(HistoryEvent::Advanced),
            "SCRAPPED" => Some(HistoryEvent::Scrapped),
            _ => None,
        }
    }
}

/// One audit row for a card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardHistory {
    pub id: Uuid,
    pub department_sub_batch_id: Uuid,
    pub sub_batch_id: Uuid,
    pub event: HistoryEvent,
    pub from_stage: Option<CardStage>,
    pub to_stage: CardStage,
    pub to_department_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CardHistory {
    pub fn record(card: &ProductionCard, event: HistoryEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            department_sub_batch_id: card.id,
            sub_batch_id: card.sub_batch_id,
            event,
            from_stage: None,
            to_stage: card.stage,
            to_department_id: None,
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn from_stage(mut self, stage: CardStage) -> Self {
        self.from_stage = Some(stage);
        self
    }

    pub fn to_department(mut self, department_id: Uuid) -> Self {
        self.to_department_id = Some(department_id);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
