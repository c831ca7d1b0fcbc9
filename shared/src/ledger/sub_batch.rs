//! Sub-batch lifecycle

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;
use super::store::{require_sub_batch, LedgerStore};
use crate::models::{SubBatch, SubBatchStatus};
use crate::validation::{validate_name, validate_positive_quantity, validate_schedule};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSubBatch {
    pub batch_id: Option<Uuid>,
    pub name: String,
    pub estimated_pieces: i32,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// Create a DRAFT sub-batch, reserving its pieces from the parent batch
pub async fn create_sub_batch<S: LedgerStore>(
    store: &mut S,
    input: NewSubBatch,
) -> Result<SubBatch, S::Error> {
    validate_name(&input.name).map_err(|m| LedgerError::invalid("name", m))?;
    validate_positive_quantity(input.estimated_pieces)
        .map_err(|m| LedgerError::invalid("estimated_pieces", m))?;
    validate_schedule(input.start_date, input.due_date)
        .map_err(|m| LedgerError::invalid("due_date", m))?;

    if let Some(batch_id) = input.batch_id {
        let mut batch = store
            .load_batch(batch_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Batch", batch_id))?;
        if input.estimated_pieces > batch.available_quantity {
            return Err(LedgerError::InsufficientQuantity {
                card_id: None,
                requested: input.estimated_pieces,
                available: batch.available_quantity,
            }
            .into());
        }
        batch.available_quantity -= input.estimated_pieces;
        batch.updated_at = Utc::now();
        store.save_batch(&batch).await?;
    }

    let now = Utc::now();
    let sub_batch = SubBatch {
        id: Uuid::new_v4(),
        batch_id: input.batch_id,
        name: input.name.trim().to_string(),
        estimated_pieces: input.estimated_pieces,
        status: SubBatchStatus::Draft,
        start_date: input.start_date,
        due_date: input.due_date,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_sub_batch(&sub_batch).await?;

    tracing::info!(
        sub_batch_id = %sub_batch.id,
        estimated_pieces = sub_batch.estimated_pieces,
        "Sub-batch created"
    );

    Ok(sub_batch)
}

/// Delete a DRAFT sub-batch and give its pieces back to the parent batch
pub async fn delete_sub_batch<S: LedgerStore>(store: &mut S, id: Uuid) -> Result<(), S::Error> {
    let sub_batch = require_sub_batch(store, id).await?;
    if sub_batch.status != SubBatchStatus::Draft {
        return Err(LedgerError::InvalidStateTransition(format!(
            "only draft sub-batches can be deleted, this one is {}",
            sub_batch.status.as_str()
        ))
        .into());
    }

    if let Some(batch_id) = sub_batch.batch_id {
        match store.load_batch(batch_id).await? {
            Some(mut batch) => {
                batch.available_quantity += sub_batch.estimated_pieces;
                batch.updated_at = Utc::now();
                store.save_batch(&batch).await?;
            }
            None => tracing::warn!(
                sub_batch_id = %id,
                batch_id = %batch_id,
                "Parent batch missing; estimated pieces not restored"
            ),
        }
    }

    store.delete_sub_batch(id).await?;
    tracing::info!(sub_batch_id = %id, "Sub-batch deleted");
    Ok(())
}

/// Mark an in-production sub-batch as completed
pub async fn complete_sub_batch<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<SubBatch, S::Error> {
    transition(store, id, SubBatchStatus::Completed).await
}

/// Cancel a sub-batch that has not been completed
pub async fn cancel_sub_batch<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<SubBatch, S::Error> {
    transition(store, id, SubBatchStatus::Cancelled).await
}

/// Whether a sub-batch may move from `from` to `to` by explicit action
pub fn can_transition(from: SubBatchStatus, to: SubBatchStatus) -> bool {
    matches!(
        (from, to),
        (SubBatchStatus::InProduction, SubBatchStatus::Completed)
            | (SubBatchStatus::Draft, SubBatchStatus::Cancelled)
            | (SubBatchStatus::InProduction, SubBatchStatus::Cancelled)
    )
}

async fn transition<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
    to: SubBatchStatus,
) -> Result<SubBatch, S::Error> {
    let mut sub_batch = require_sub_batch(store, id).await?;
    if !can_transition(sub_batch.status, to) {
        return Err(LedgerError::InvalidStateTransition(format!(
            "sub-batch cannot move from {} to {}",
            sub_batch.status.as_str(),
            to.as_str()
        ))
        .into());
    }

    let now = Utc::now();
    sub_batch.status = to;
    if to == SubBatchStatus::Completed {
        sub_batch.completed_at = Some(now);
    }
    sub_batch.updated_at = now;
    store.save_sub_batch(&sub_batch).await?;

    tracing::info!(sub_batch_id = %id, status = to.as_str(), "Sub-batch status changed");
    Ok(sub_batch)
}
