//! Advancement service
//!
//! Sends a card's whole working balance to the next department. Unlike a
//! fork, the source card stops being current and its lineage continues on
//! the new card.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accountant;
use super::error::LedgerError;
use super::store::{require_active_card, require_department, LedgerStore};
use crate::models::{CardHistory, HistoryEvent, ProductionCard};
use crate::validation::validate_positive_quantity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub card_id: Uuid,
    /// Defaults to the next department of the planned route
    pub target_department_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub source: ProductionCard,
    pub card: ProductionCard,
}

/// Move a card's balance to the target department.
///
/// The bound is `quantity <= quantity_received - quantity_forked`
/// ([`ProductionCard::sendable_quantity`]), not `quantity_remaining`: worked
/// pieces travel with the card, while forked pieces already left it and
/// cannot be sent twice. Exceeding it fails with `InsufficientQuantity`.
pub async fn advance<S: LedgerStore>(
    store: &mut S,
    request: AdvanceRequest,
) -> Result<AdvanceOutcome, S::Error> {
    validate_positive_quantity(request.quantity)
        .map_err(|m| LedgerError::invalid("quantity", m))?;

    let mut source = require_active_card(store, request.card_id).await?;

    let target = match request.target_department_id {
        Some(target) => target,
        None => {
            let route = store
                .load_route(source.sub_batch_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Workflow route", source.sub_batch_id))?;
            route.next_department(source.department_id).ok_or_else(|| {
                LedgerError::invalid(
                    "target_department_id",
                    "card is in the last department of its route",
                )
            })?
        }
    };

    if target == source.department_id {
        return Err(LedgerError::invalid(
            "target_department_id",
            "card is already in this department",
        )
        .into());
    }
    require_department(store, target).await?;

    let sendable = source.sendable_quantity();
    if request.quantity > sendable {
        return Err(LedgerError::InsufficientQuantity {
            card_id: Some(source.id),
            requested: request.quantity,
            available: sendable,
        }
        .into());
    }
    if request.quantity < sendable {
        tracing::warn!(
            card_id = %source.id,
            sent = request.quantity,
            sendable,
            "Advancing fewer pieces than the card holds"
        );
    }

    accountant::drain(&mut source)?;
    source.is_current = false;
    source.sent_to_department_id = Some(target);
    store.save_card(&source).await?;
    store
        .insert_history(
            &CardHistory::record(&source, HistoryEvent::Advanced)
                .from_stage(source.stage)
                .to_department(target),
        )
        .await?;

    let card = ProductionCard::advanced_from(&source, target, request.quantity);
    store.insert_card(&card).await?;
    store.set_active_card(card.lineage_id, card.id).await?;
    let mut arrival = CardHistory::record(&card, HistoryEvent::Arrived).to_department(target);
    if let Some(reason) = card.reject_reason().or(card.alter_reason()) {
        arrival = arrival.reason(reason);
    }
    store.insert_history(&arrival).await?;

    tracing::info!(
        source_card_id = %source.id,
        card_id = %card.id,
        from_department = %source.department_id,
        to_department = %target,
        quantity = request.quantity,
        "Card advanced"
    );

    Ok(AdvanceOutcome { source, card })
}
