//! Production card models
//!
//! A card is the quantity of one sub-batch sitting in one department. Cards
//! are created by route planning, by advancement and by forks; all quantity
//! changes go through `ledger::accountant`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kanban stage of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStage {
    NewArrival,
    InProgress,
    Completed,
}

impl CardStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStage::NewArrival => "NEW_ARRIVAL",
            CardStage::InProgress => "IN_PROGRESS",
            CardStage::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW_ARRIVAL" => Some(CardStage::NewArrival),
            "IN_PROGRESS" => Some(CardStage::InProgress),
            "COMPLETED" => Some(CardStage::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CardStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardStage::NewArrival => write!(f, "New Arrival"),
            CardStage::InProgress => write!(f, "In Progress"),
            CardStage::Completed => write!(f, "Completed"),
        }
    }
}

/// What a card is in its department
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardTag {
    /// Main flow of the sub-batch, nobody assigned yet
    Main,
    /// Main flow with at least one worker on it
    Assigned,
    /// Pieces sent back for rework after rejection
    Rejected { reason: String },
    /// Pieces sent for alteration
    Altered { reason: String },
}

impl CardTag {
    /// Tag name stored in the `remarks` column
    pub fn as_str(&self) -> &'static str {
        match self {
            CardTag::Main => "main",
            CardTag::Assigned => "assigned",
            CardTag::Rejected { .. } => "rejected",
            CardTag::Altered { .. } => "altered",
        }
    }

    /// Rebuild a tag from its stored columns
    pub fn from_columns(
        remarks: &str,
        reject_reason: Option<&str>,
        alter_reason: Option<&str>,
    ) -> Option<Self> {
        match remarks {
            "main" => Some(CardTag::Main),
            "assigned" => Some(CardTag::Assigned),
            "rejected" => Some(CardTag::Rejected {
                reason: reject_reason.unwrap_or_default().to_string(),
            }),
            "altered" => Some(CardTag::Altered {
                reason: alter_reason.unwrap_or_default().to_string(),
            }),
            _ => None,
        }
    }

    /// Label shown on the department board
    pub fn label(&self) -> &'static str {
        match self {
            CardTag::Main => "Main in this Department",
            CardTag::Assigned => "Assigned",
            CardTag::Rejected { .. } => "Rejected",
            CardTag::Altered { .. } => "Altered",
        }
    }

    pub fn reject_reason(&self) -> Option<&str> {
        match self {
            CardTag::Rejected { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn alter_reason(&self) -> Option<&str> {
        match self {
            CardTag::Altered { reason } => Some(reason),
            _ => None,
        }
    }

    /// Rework cards keep their tag for their whole lifetime
    pub fn is_rework(&self) -> bool {
        matches!(self, CardTag::Rejected { .. } | CardTag::Altered { .. })
    }

    /// Tag after a worker is put on the card
    pub fn on_assignment(&self) -> CardTag {
        match self {
            CardTag::Main => CardTag::Assigned,
            other => other.clone(),
        }
    }

    /// Tag carried by the card created downstream on advancement
    pub fn carried_forward(&self) -> CardTag {
        match self {
            CardTag::Main | CardTag::Assigned => CardTag::Main,
            other => other.clone(),
        }
    }
}

/// A quantity of a sub-batch located in one department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionCard {
    pub id: Uuid,
    pub sub_batch_id: Uuid,
    pub department_id: Uuid,
    /// Root card of the chain this card was advanced along
    pub lineage_id: Uuid,
    pub stage: CardStage,
    /// Baseline scale of the whole lot, copied forward unchanged
    pub total_quantity: i32,
    pub quantity_received: i32,
    pub quantity_assigned: i32,
    pub quantity_remaining: i32,
    /// Pieces forked out to other departments or scrap
    pub quantity_forked: i32,
    pub is_current: bool,
    pub sent_from_department: Option<Uuid>,
    pub sent_to_department_id: Option<Uuid>,
    pub parent_department_sub_batch_id: Option<Uuid>,
    pub tag: CardTag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionCard {
    /// First card of a sub-batch, starting its main lineage
    pub fn new_root(sub_batch_id: Uuid, department_id: Uuid, quantity: i32) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            sub_batch_id,
            department_id,
            lineage_id: id,
            stage: CardStage::NewArrival,
            total_quantity: quantity,
            quantity_received: quantity,
            quantity_assigned: 0,
            quantity_remaining: quantity,
            quantity_forked: 0,
            is_current: true,
            sent_from_department: None,
            sent_to_department_id: None,
            parent_department_sub_batch_id: None,
            tag: CardTag::Main,
            created_at: now,
            updated_at: now,
        }
    }

    /// Card created in `department_id` by splitting `quantity` off `source`.
    ///
    /// Starts its own lineage and inherits the source's baseline total.
    pub fn forked_from(
        source: &ProductionCard,
        department_id: Uuid,
        quantity: i32,
        tag: CardTag,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            sub_batch_id: source.sub_batch_id,
            department_id,
            lineage_id: id,
            stage: CardStage::NewArrival,
            total_quantity: source.total_quantity,
            quantity_received: quantity,
            quantity_assigned: 0,
            quantity_remaining: quantity,
            quantity_forked: 0,
            is_current: true,
            sent_from_department: Some(source.department_id),
            sent_to_department_id: None,
            parent_department_sub_batch_id: None,
            tag,
            created_at: now,
            updated_at: now,
        }
    }

    /// Card continuing `source`'s lineage in `department_id`
    pub fn advanced_from(source: &ProductionCard, department_id: Uuid, quantity: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sub_batch_id: source.sub_batch_id,
            department_id,
            lineage_id: source.lineage_id,
            stage: CardStage::NewArrival,
            total_quantity: source.total_quantity,
            quantity_received: quantity,
            quantity_assigned: 0,
            quantity_remaining: quantity,
            quantity_forked: 0,
            is_current: true,
            sent_from_department: Some(source.department_id),
            sent_to_department_id: None,
            parent_department_sub_batch_id: None,
            tag: source.tag.carried_forward(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Pieces still physically on this card: worked plus unworked
    pub fn sendable_quantity(&self) -> i32 {
        self.quantity_received - self.quantity_forked
    }

    /// Sum of every place the received pieces went
    pub fn accounted_quantity(&self) -> i32 {
        self.quantity_assigned + self.quantity_remaining + self.quantity_forked
    }

    pub fn reject_reason(&self) -> Option<&str> {
        self.tag.reject_reason()
    }

    pub fn alter_reason(&self) -> Option<&str> {
        self.tag.alter_reason()
    }
}
