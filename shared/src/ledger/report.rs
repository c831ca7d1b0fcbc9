//! Read models over the ledger

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accountant;
use super::store::{require_card, require_department, require_sub_batch, LedgerStore};
use crate::models::{CardHistory, CardStage, ProductionCard};

/// Current cards of one department, grouped by stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepartmentBoard {
    pub department_id: Uuid,
    pub new_arrival: Vec<ProductionCard>,
    pub in_progress: Vec<ProductionCard>,
    pub completed: Vec<ProductionCard>,
}

impl DepartmentBoard {
    pub fn total_cards(&self) -> usize {
        self.new_arrival.len() + self.in_progress.len() + self.completed.len()
    }
}

/// Accounting of a single card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConservationLine {
    pub card_id: Uuid,
    pub department_id: Uuid,
    pub stage: CardStage,
    pub is_current: bool,
    pub quantity_received: i32,
    pub quantity_assigned: i32,
    pub quantity_remaining: i32,
    pub quantity_forked: i32,
    /// Pieces carried to the next card of the lineage, for advanced cards
    pub quantity_sent: Option<i32>,
    pub balanced: bool,
}

impl ConservationLine {
    /// A current card must account for every received piece. An advanced
    /// card may not have sent on more than it still held.
    pub fn from_card(card: &ProductionCard, quantity_sent: Option<i32>) -> Self {
        let balanced = accountant::check_conservation(card).is_ok()
            && match quantity_sent {
                Some(sent) => sent <= card.sendable_quantity(),
                None => accountant::is_balanced(card),
            };
        Self {
            card_id: card.id,
            department_id: card.department_id,
            stage: card.stage,
            is_current: card.is_current,
            quantity_received: card.quantity_received,
            quantity_assigned: card.quantity_assigned,
            quantity_remaining: card.quantity_remaining,
            quantity_forked: card.quantity_forked,
            quantity_sent,
            balanced,
        }
    }
}

/// Piece accounting for a whole sub-batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubBatchAccounting {
    pub sub_batch_id: Uuid,
    pub estimated_pieces: i32,
    /// Pieces on current cards, worked or not
    pub pieces_in_production: i32,
    pub pieces_scrapped: i32,
    /// Pieces left behind when a card was advanced with less than it held
    pub pieces_unaccounted: i32,
    pub lines: Vec<ConservationLine>,
    pub balanced: bool,
}

pub async fn department_board<S: LedgerStore>(
    store: &mut S,
    department_id: Uuid,
) -> Result<DepartmentBoard, S::Error> {
    require_department(store, department_id).await?;
    let cards = store.list_current_cards_in_department(department_id).await?;

    let mut board = DepartmentBoard {
        department_id,
        ..Default::default()
    };
    for card in cards {
        match card.stage {
            CardStage::NewArrival => board.new_arrival.push(card),
            CardStage::InProgress => board.in_progress.push(card),
            CardStage::Completed => board.completed.push(card),
        }
    }
    Ok(board)
}

/// Every card of a sub-batch in creation order
pub async fn sub_batch_cards<S: LedgerStore>(
    store: &mut S,
    sub_batch_id: Uuid,
) -> Result<Vec<ProductionCard>, S::Error> {
    require_sub_batch(store, sub_batch_id).await?;
    store.list_cards(sub_batch_id).await
}

pub async fn card_history<S: LedgerStore>(
    store: &mut S,
    card_id: Uuid,
) -> Result<Vec<CardHistory>, S::Error> {
    require_card(store, card_id).await?;
    store.history_for_card(card_id).await
}

pub async fn conservation_report<S: LedgerStore>(
    store: &mut S,
    sub_batch_id: Uuid,
) -> Result<SubBatchAccounting, S::Error> {
    let sub_batch = require_sub_batch(store, sub_batch_id).await?;
    let cards = store.list_cards(sub_batch_id).await?;

    let mut pieces_scrapped = 0;
    for card in &cards {
        pieces_scrapped += store
            .fork_records_for_card(card.id)
            .await?
            .iter()
            .filter(|r| r.created_department_sub_batch_id.is_none())
            .map(|r| r.quantity)
            .sum::<i32>();
    }

    let lines: Vec<ConservationLine> = cards
        .iter()
        .enumerate()
        .map(|(position, card)| {
            let sent = (!card.is_current)
                .then(|| successor(&cards[position + 1..], card))
                .flatten()
                .map(|next| next.quantity_received);
            ConservationLine::from_card(card, sent)
        })
        .collect();

    let pieces_in_production: i32 = cards
        .iter()
        .filter(|c| c.is_current)
        .map(ProductionCard::sendable_quantity)
        .sum();

    // Nothing is planned until the route exists
    let planned = if cards.is_empty() {
        0
    } else {
        sub_batch.estimated_pieces
    };
    let pieces_unaccounted = planned - pieces_in_production - pieces_scrapped;
    let balanced = pieces_unaccounted >= 0 && lines.iter().all(|l| l.balanced);

    if pieces_unaccounted < 0 {
        tracing::error!(
            sub_batch_id = %sub_batch_id,
            pieces_unaccounted,
            "More pieces in production than were planned"
        );
    }

    Ok(SubBatchAccounting {
        sub_batch_id,
        estimated_pieces: sub_batch.estimated_pieces,
        pieces_in_production,
        pieces_scrapped,
        pieces_unaccounted,
        lines,
        balanced,
    })
}

/// Next card of the same lineage created after `card`
fn successor<'a>(later: &'a [ProductionCard], card: &ProductionCard) -> Option<&'a ProductionCard> {
    later
        .iter()
        .find(|c| c.lineage_id == card.lineage_id && c.sent_from_department == Some(card.department_id))
}
