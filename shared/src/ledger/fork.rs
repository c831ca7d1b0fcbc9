//! Fork engine
//!
//! Splits pieces off a current card because they were rejected or need
//! alteration. Pieces either land on a brand-new card in another department
//! or, for rejections, are scrapped. Either way a fork record links the
//! shrunk card to what it produced; lineage is answered by that record, not
//! by parent pointers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accountant;
use super::error::LedgerError;
use super::store::{require_active_card, require_department, LedgerStore};
use crate::models::{
    CardHistory, CardTag, ForkDestination, ForkKind, ForkRecord, HistoryEvent, ProductionCard,
};
use crate::validation::{validate_positive_quantity, validate_reason};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkRequest {
    pub source_card_id: Uuid,
    pub quantity: i32,
    pub kind: ForkKind,
    pub destination: ForkDestination,
    pub reason: String,
    pub worker_log_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkOutcome {
    pub record: ForkRecord,
    pub source: ProductionCard,
    pub created_card: Option<ProductionCard>,
}

/// Split `quantity` off the source card
pub async fn fork<S: LedgerStore>(
    store: &mut S,
    request: ForkRequest,
) -> Result<ForkOutcome, S::Error> {
    validate_positive_quantity(request.quantity)
        .map_err(|m| LedgerError::invalid("quantity", m))?;
    validate_reason(&request.reason).map_err(|m| LedgerError::invalid("reason", m))?;

    if request.kind == ForkKind::Altered && request.destination == ForkDestination::Scrap {
        return Err(LedgerError::invalid(
            "destination",
            "altered pieces must be sent to a department",
        )
        .into());
    }

    let mut source = require_active_card(store, request.source_card_id).await?;

    if let Some(department_id) = request.destination.department() {
        require_department(store, department_id).await?;
    }

    accountant::decrement_remaining(&mut source, request.quantity)?;
    store.save_card(&source).await?;

    let created_card = match request.destination {
        ForkDestination::Department(department_id) => {
            let tag = match request.kind {
                ForkKind::Rejected => CardTag::Rejected {
                    reason: request.reason.clone(),
                },
                ForkKind::Altered => CardTag::Altered {
                    reason: request.reason.clone(),
                },
            };
            let card = ProductionCard::forked_from(&source, department_id, request.quantity, tag);
            store.insert_card(&card).await?;
            store.set_active_card(card.lineage_id, card.id).await?;
            store
                .insert_history(
                    &CardHistory::record(&card, HistoryEvent::Forked)
                        .to_department(department_id)
                        .reason(request.reason.clone()),
                )
                .await?;
            Some(card)
        }
        ForkDestination::Scrap => {
            store
                .insert_history(
                    &CardHistory::record(&source, HistoryEvent::Scrapped)
                        .from_stage(source.stage)
                        .reason(request.reason.clone()),
                )
                .await?;
            None
        }
    };

    let record = ForkRecord {
        id: Uuid::new_v4(),
        kind: request.kind,
        sub_batch_id: source.sub_batch_id,
        quantity: request.quantity,
        reason: request.reason,
        source_department_sub_batch_id: source.id,
        created_department_sub_batch_id: created_card.as_ref().map(|c| c.id),
        destination_department_id: request.destination.department(),
        worker_log_id: request.worker_log_id,
        created_at: Utc::now(),
    };
    store.insert_fork_record(&record).await?;

    tracing::info!(
        kind = record.kind.as_str(),
        source_card_id = %source.id,
        created_card_id = ?record.created_department_sub_batch_id,
        quantity = record.quantity,
        "Pieces forked"
    );

    Ok(ForkOutcome {
        record,
        source,
        created_card,
    })
}

/// Discard rejected pieces from a card outside of any worker log
pub async fn scrap_rejection<S: LedgerStore>(
    store: &mut S,
    card_id: Uuid,
    quantity: i32,
    reason: String,
) -> Result<ForkOutcome, S::Error> {
    fork(
        store,
        ForkRequest {
            source_card_id: card_id,
            quantity,
            kind: ForkKind::Rejected,
            destination: ForkDestination::Scrap,
            reason,
            worker_log_id: None,
        },
    )
    .await
}
