//! Workflow planner: route creation and the sub-batch's first card

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;
use super::store::{require_department, require_sub_batch, LedgerStore};
use crate::models::{
    CardHistory, HistoryEvent, ProductionCard, SubBatchStatus, WorkflowRoute,
};
use crate::validation::{validate_department_route, validate_positive_quantity};

/// Result of planning a sub-batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutePlan {
    pub route: WorkflowRoute,
    pub first_card: ProductionCard,
}

/// Create the route of a DRAFT sub-batch and put its pieces in the first department.
///
/// The route is written once; a second call fails. The sub-batch moves to
/// IN_PRODUCTION, which also freezes `estimated_pieces`.
pub async fn create_route<S: LedgerStore>(
    store: &mut S,
    sub_batch_id: Uuid,
    department_ids: &[Uuid],
) -> Result<RoutePlan, S::Error> {
    validate_department_route(department_ids)
        .map_err(|m| LedgerError::invalid("department_ids", m))?;

    let mut sub_batch = require_sub_batch(store, sub_batch_id).await?;

    if store.load_route(sub_batch_id).await?.is_some() {
        return Err(LedgerError::InvalidStateTransition(format!(
            "sub-batch {} already has a route",
            sub_batch_id
        ))
        .into());
    }

    if sub_batch.status != SubBatchStatus::Draft {
        return Err(LedgerError::InvalidStateTransition(format!(
            "cannot plan a sub-batch in status {}",
            sub_batch.status.as_str()
        ))
        .into());
    }

    validate_positive_quantity(sub_batch.estimated_pieces)
        .map_err(|m| LedgerError::invalid("estimated_pieces", m))?;

    for department_id in department_ids {
        require_department(store, *department_id).await?;
    }

    let route = WorkflowRoute::new(sub_batch_id, department_ids);
    store.insert_route(&route).await?;

    let first_department = department_ids[0];
    let card = ProductionCard::new_root(sub_batch_id, first_department, sub_batch.estimated_pieces);
    store.insert_card(&card).await?;
    store.set_active_card(card.lineage_id, card.id).await?;
    store
        .insert_history(
            &CardHistory::record(&card, HistoryEvent::Created).to_department(first_department),
        )
        .await?;

    let now = Utc::now();
    sub_batch.status = SubBatchStatus::InProduction;
    sub_batch.start_date.get_or_insert(now.date_naive());
    sub_batch.updated_at = now;
    store.save_sub_batch(&sub_batch).await?;

    tracing::info!(
        sub_batch_id = %sub_batch_id,
        card_id = %card.id,
        steps = route.steps.len(),
        pieces = card.quantity_received,
        "Workflow route created"
    );

    Ok(RoutePlan {
        route,
        first_card: card,
    })
}

/// Next planned department after `department_id`, if any
pub async fn next_department<S: LedgerStore>(
    store: &mut S,
    sub_batch_id: Uuid,
    department_id: Uuid,
) -> Result<Option<Uuid>, S::Error> {
    let route = store
        .load_route(sub_batch_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Workflow route", sub_batch_id))?;
    Ok(route.next_department(department_id))
}
