//! Worker assignment tracker
//!
//! Creates, edits and deletes worker logs. Quantity changes go through the
//! accountant and splits through the fork engine; deleting a log undoes both.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accountant;
use super::error::LedgerError;
use super::fork::{fork, ForkRequest};
use super::stage::record_auto_advance;
use super::store::{require_card, require_department, require_sub_batch, LedgerStore};
use crate::models::{
    ActivityType, ForkDestination, ForkKind, ForkRecord, ProductionCard, SubBatchStatus,
    WorkerLog, WorkerLogDetail,
};
use crate::validation::validate_non_negative_quantity;

/// One rejected or altered portion reported with a worker log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkItem {
    /// Card the pieces are taken from; need not be the log's own card
    pub source_department_sub_batch_id: Uuid,
    pub quantity: i32,
    pub destination: ForkDestination,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWorkerLog {
    pub worker_id: Uuid,
    pub sub_batch_id: Uuid,
    pub department_id: Uuid,
    pub quantity_worked: i32,
    pub activity_type: Option<ActivityType>,
    pub is_billable: bool,
    pub work_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub rejected: Vec<ForkItem>,
    #[serde(default)]
    pub altered: Vec<ForkItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerLogChanges {
    pub quantity_worked: Option<i32>,
    pub is_billable: Option<bool>,
    pub remarks: Option<String>,
}

/// Assign a worker's pieces against the department's current card and
/// record any rejections or alterations they reported.
pub async fn create_worker_log<S: LedgerStore>(
    store: &mut S,
    input: NewWorkerLog,
) -> Result<WorkerLogDetail, S::Error> {
    validate_non_negative_quantity(input.quantity_worked)
        .map_err(|m| LedgerError::invalid("quantity_worked", m))?;
    if input.quantity_worked == 0 && input.rejected.is_empty() && input.altered.is_empty() {
        return Err(LedgerError::invalid(
            "quantity_worked",
            "a worker log must record work, rejections or alterations",
        )
        .into());
    }

    if !store.worker_exists(input.worker_id).await? {
        return Err(LedgerError::not_found("Worker", input.worker_id).into());
    }
    require_department(store, input.department_id).await?;

    let sub_batch = require_sub_batch(store, input.sub_batch_id).await?;
    if sub_batch.status != SubBatchStatus::InProduction {
        return Err(LedgerError::InvalidStateTransition(format!(
            "cannot log work on a sub-batch in status {}",
            sub_batch.status.as_str()
        ))
        .into());
    }

    let mut card = match store
        .find_current_card(input.sub_batch_id, input.department_id, input.quantity_worked)
        .await?
    {
        Some(card) => card,
        None => {
            let available = largest_remaining(store, input.sub_batch_id, input.department_id).await?;
            return Err(LedgerError::InsufficientQuantity {
                card_id: None,
                requested: input.quantity_worked,
                available,
            }
            .into());
        }
    };

    accountant::reserve(&mut card, input.quantity_worked)?;
    if input.quantity_worked > 0 {
        card.tag = card.tag.on_assignment();
    }
    record_auto_advance(store, &mut card).await?;
    store.save_card(&card).await?;

    let activity_type = input.activity_type.unwrap_or(if !input.altered.is_empty() {
        ActivityType::Altered
    } else if !input.rejected.is_empty() {
        ActivityType::Rejected
    } else {
        ActivityType::Normal
    });

    let now = Utc::now();
    let log = WorkerLog {
        id: Uuid::new_v4(),
        worker_id: input.worker_id,
        sub_batch_id: input.sub_batch_id,
        department_id: input.department_id,
        department_sub_batch_id: card.id,
        quantity_received: card.quantity_received,
        quantity_worked: input.quantity_worked,
        activity_type,
        is_billable: input.is_billable,
        work_date: input.work_date.unwrap_or_else(|| now.date_naive()),
        remarks: input.remarks,
        created_at: now,
        updated_at: now,
    };
    store.insert_worker_log(&log).await?;

    let items = input
        .rejected
        .into_iter()
        .map(|item| (ForkKind::Rejected, item))
        .chain(input.altered.into_iter().map(|item| (ForkKind::Altered, item)));

    let mut records: Vec<ForkRecord> = Vec::new();
    for (kind, item) in items {
        // Forks may draw on any card of the log's own sub-batch, never another lot
        let source = require_card(store, item.source_department_sub_batch_id).await?;
        if source.sub_batch_id != log.sub_batch_id {
            return Err(LedgerError::invalid(
                "source_department_sub_batch_id",
                format!(
                    "card {} belongs to sub-batch {}, not {}",
                    source.id, source.sub_batch_id, log.sub_batch_id
                ),
            )
            .into());
        }

        let outcome = fork(
            store,
            ForkRequest {
                source_card_id: item.source_department_sub_batch_id,
                quantity: item.quantity,
                kind,
                destination: item.destination,
                reason: item.reason,
                worker_log_id: Some(log.id),
            },
        )
        .await?;
        records.push(outcome.record);
    }

    tracing::info!(
        worker_log_id = %log.id,
        worker_id = %log.worker_id,
        card_id = %card.id,
        quantity_worked = log.quantity_worked,
        forks = records.len(),
        "Worker log created"
    );

    Ok(WorkerLogDetail::from_records(log, records))
}

/// Load a worker log with its forks
pub async fn get_worker_log<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<WorkerLogDetail, S::Error> {
    let log = require_worker_log(store, id).await?;
    let records = store.fork_records_for_log(id).await?;
    Ok(WorkerLogDetail::from_records(log, records))
}

/// Edit a worker log. A new `quantity_worked` is applied to the log's card
/// as a delta; forks cannot be edited.
pub async fn update_worker_log<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
    changes: WorkerLogChanges,
) -> Result<WorkerLogDetail, S::Error> {
    let mut log = require_worker_log(store, id).await?;

    if let Some(quantity_worked) = changes.quantity_worked {
        validate_non_negative_quantity(quantity_worked)
            .map_err(|m| LedgerError::invalid("quantity_worked", m))?;

        let delta = quantity_worked - log.quantity_worked;
        if delta != 0 {
            let mut card = require_card(store, log.department_sub_batch_id).await?;
            if delta > 0 {
                accountant::reserve(&mut card, delta)?;
                card.tag = card.tag.on_assignment();
                record_auto_advance(store, &mut card).await?;
            } else {
                accountant::release(&mut card, -delta)?;
            }
            store.save_card(&card).await?;
            log.quantity_worked = quantity_worked;
        }
    }

    if let Some(is_billable) = changes.is_billable {
        log.is_billable = is_billable;
    }
    if let Some(remarks) = changes.remarks {
        log.remarks = Some(remarks);
    }

    log.updated_at = Utc::now();
    store.save_worker_log(&log).await?;

    let records = store.fork_records_for_log(id).await?;
    Ok(WorkerLogDetail::from_records(log, records))
}

/// Undo a worker log completely.
///
/// Releases the worked quantity back to the log's card, hard-deletes every
/// card its forks created and returns the forked pieces to the exact card
/// they came from. The card stage is left as it is.
pub async fn delete_worker_log<S: LedgerStore>(store: &mut S, id: Uuid) -> Result<(), S::Error> {
    let log = require_worker_log(store, id).await?;
    let records = store.fork_records_for_log(id).await?;

    // Refuse before touching anything if a forked card has a life of its own
    let mut created_cards: Vec<ProductionCard> = Vec::new();
    for record in &records {
        let Some(created_id) = record.created_department_sub_batch_id else {
            continue;
        };
        match store.load_card(created_id).await? {
            Some(created) => {
                ensure_untouched(store, &created).await?;
                created_cards.push(created);
            }
            None => tracing::warn!(
                worker_log_id = %id,
                card_id = %created_id,
                "Forked card already gone during undo"
            ),
        }
    }

    let mut card = require_card(store, log.department_sub_batch_id).await?;
    accountant::release(&mut card, log.quantity_worked)?;
    store.save_card(&card).await?;

    for created in &created_cards {
        store.delete_card(created.id).await?;
        if store.active_card(created.lineage_id).await? == Some(created.id) {
            store.clear_active_card(created.lineage_id).await?;
        }
    }

    for record in &records {
        match store.load_card(record.source_department_sub_batch_id).await? {
            Some(mut source) => {
                accountant::restore_forked(&mut source, record.quantity)?;
                store.save_card(&source).await?;
            }
            None => tracing::error!(
                worker_log_id = %id,
                fork_record_id = %record.id,
                source_card_id = %record.source_department_sub_batch_id,
                quantity = record.quantity,
                "Fork source card missing; forked pieces not restored"
            ),
        }
    }

    store.delete_fork_records_for_log(id).await?;
    store.delete_worker_log(id).await?;

    tracing::info!(
        worker_log_id = %id,
        card_id = %card.id,
        released = log.quantity_worked,
        forks_reversed = records.len(),
        "Worker log deleted"
    );

    Ok(())
}

async fn require_worker_log<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<WorkerLog, S::Error> {
    store
        .load_worker_log(id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Worker log", id).into())
}

/// A forked card can only be removed while it is exactly as the fork left it
async fn ensure_untouched<S: LedgerStore>(
    store: &mut S,
    card: &ProductionCard,
) -> Result<(), S::Error> {
    let worked_on = card.quantity_assigned > 0
        || card.quantity_forked > 0
        || card.quantity_remaining != card.quantity_received;
    if !card.is_current || worked_on || store.count_worker_logs_for_card(card.id).await? > 0 {
        return Err(LedgerError::ForkInUse { card_id: card.id }.into());
    }
    Ok(())
}

async fn largest_remaining<S: LedgerStore>(
    store: &mut S,
    sub_batch_id: Uuid,
    department_id: Uuid,
) -> Result<i32, S::Error> {
    let cards = store.list_cards(sub_batch_id).await?;
    Ok(cards
        .iter()
        .filter(|c| c.department_id == department_id && c.is_current)
        .map(|c| c.quantity_remaining)
        .max()
        .unwrap_or(0))
}
