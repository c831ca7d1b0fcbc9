//! Stage tracker
//!
//! Cards move NEW_ARRIVAL -> IN_PROGRESS -> COMPLETED. The only automatic
//! transition is the first one, taken when work is first assigned; manual
//! moves may jump anywhere so operators can correct mistakes. Every
//! transition leaves one history row.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::{require_card, LedgerStore};
use crate::models::{CardHistory, CardStage, HistoryEvent, ProductionCard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: CardStage,
    pub to: CardStage,
}

impl StageTransition {
    pub fn history(&self, card: &ProductionCard) -> CardHistory {
        CardHistory::record(card, HistoryEvent::StageChanged).from_stage(self.from)
    }
}

/// Move a card that has work on it out of NEW_ARRIVAL
pub fn auto_advance(card: &mut ProductionCard) -> Option<StageTransition> {
    if card.stage == CardStage::NewArrival && card.quantity_assigned > 0 {
        return set_stage(card, CardStage::InProgress);
    }
    None
}

/// Put a card into `to`; no-op when it is already there
pub fn set_stage(card: &mut ProductionCard, to: CardStage) -> Option<StageTransition> {
    if card.stage == to {
        return None;
    }
    let transition = StageTransition {
        from: card.stage,
        to,
    };
    card.stage = to;
    card.updated_at = Utc::now();
    Some(transition)
}

/// Operator move of a card to any stage
pub async fn move_stage<S: LedgerStore>(
    store: &mut S,
    card_id: Uuid,
    to: CardStage,
) -> Result<ProductionCard, S::Error> {
    let mut card = require_card(store, card_id).await?;

    if let Some(transition) = set_stage(&mut card, to) {
        store.save_card(&card).await?;
        store.insert_history(&transition.history(&card)).await?;
        tracing::info!(
            card_id = %card.id,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            "Card stage moved"
        );
    }

    Ok(card)
}

/// Persist the automatic transition if reserving work caused one
pub(crate) async fn record_auto_advance<S: LedgerStore>(
    store: &mut S,
    card: &mut ProductionCard,
) -> Result<(), S::Error> {
    if let Some(transition) = auto_advance(card) {
        store.insert_history(&transition.history(card)).await?;
        tracing::debug!(card_id = %card.id, "Card moved to IN_PROGRESS on first assignment");
    }
    Ok(())
}
