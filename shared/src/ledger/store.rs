//! Persistence seam for the ledger
//!
//! A `LedgerStore` is one open transaction. The engine reads and writes
//! through it and never commits; the owner of the transaction commits when
//! the whole protocol succeeded and drops it otherwise.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::LedgerError;
use crate::models::{
    Batch, CardHistory, ForkRecord, ProductionCard, SubBatch, WorkerLog, WorkflowRoute,
};

#[async_trait]
pub trait LedgerStore: Send {
    type Error: From<LedgerError> + Send;

    // Batches and sub-batches

    async fn load_batch(&mut self, id: Uuid) -> Result<Option<Batch>, Self::Error>;
    async fn save_batch(&mut self, batch: &Batch) -> Result<(), Self::Error>;

    async fn load_sub_batch(&mut self, id: Uuid) -> Result<Option<SubBatch>, Self::Error>;
    async fn insert_sub_batch(&mut self, sub_batch: &SubBatch) -> Result<(), Self::Error>;
    async fn save_sub_batch(&mut self, sub_batch: &SubBatch) -> Result<(), Self::Error>;
    async fn delete_sub_batch(&mut self, id: Uuid) -> Result<(), Self::Error>;

    async fn load_route(&mut self, sub_batch_id: Uuid)
        -> Result<Option<WorkflowRoute>, Self::Error>;
    async fn insert_route(&mut self, route: &WorkflowRoute) -> Result<(), Self::Error>;

    // External referents

    async fn department_exists(&mut self, id: Uuid) -> Result<bool, Self::Error>;
    async fn worker_exists(&mut self, id: Uuid) -> Result<bool, Self::Error>;

    // Cards

    /// Load a card, locking it for the rest of the transaction where the
    /// backing store supports row locks.
    async fn load_card(&mut self, id: Uuid) -> Result<Option<ProductionCard>, Self::Error>;

    /// Most recently created current card of the sub-batch in the department
    /// with at least `min_remaining` pieces unassigned.
    async fn find_current_card(
        &mut self,
        sub_batch_id: Uuid,
        department_id: Uuid,
        min_remaining: i32,
    ) -> Result<Option<ProductionCard>, Self::Error>;

    async fn list_cards(&mut self, sub_batch_id: Uuid)
        -> Result<Vec<ProductionCard>, Self::Error>;
    async fn list_current_cards_in_department(
        &mut self,
        department_id: Uuid,
    ) -> Result<Vec<ProductionCard>, Self::Error>;

    async fn insert_card(&mut self, card: &ProductionCard) -> Result<(), Self::Error>;
    async fn save_card(&mut self, card: &ProductionCard) -> Result<(), Self::Error>;
    /// Hard delete; the card's history goes with it
    async fn delete_card(&mut self, id: Uuid) -> Result<(), Self::Error>;

    // Active card index

    async fn active_card(&mut self, lineage_id: Uuid) -> Result<Option<Uuid>, Self::Error>;
    async fn set_active_card(&mut self, lineage_id: Uuid, card_id: Uuid)
        -> Result<(), Self::Error>;
    async fn clear_active_card(&mut self, lineage_id: Uuid) -> Result<(), Self::Error>;

    // Worker logs

    async fn insert_worker_log(&mut self, log: &WorkerLog) -> Result<(), Self::Error>;
    async fn load_worker_log(&mut self, id: Uuid) -> Result<Option<WorkerLog>, Self::Error>;
    async fn save_worker_log(&mut self, log: &WorkerLog) -> Result<(), Self::Error>;
    async fn delete_worker_log(&mut self, id: Uuid) -> Result<(), Self::Error>;
    async fn count_worker_logs_for_card(&mut self, card_id: Uuid) -> Result<i64, Self::Error>;

    // Fork records

    async fn insert_fork_record(&mut self, record: &ForkRecord) -> Result<(), Self::Error>;
    async fn fork_records_for_log(
        &mut self,
        worker_log_id: Uuid,
    ) -> Result<Vec<ForkRecord>, Self::Error>;
    async fn delete_fork_records_for_log(&mut self, worker_log_id: Uuid)
        -> Result<(), Self::Error>;
    /// Fork records taken out of `card_id`, oldest first
    async fn fork_records_for_card(&mut self, card_id: Uuid)
        -> Result<Vec<ForkRecord>, Self::Error>;

    // History

    async fn insert_history(&mut self, entry: &CardHistory) -> Result<(), Self::Error>;
    async fn history_for_card(&mut self, card_id: Uuid)
        -> Result<Vec<CardHistory>, Self::Error>;
}

/// Load a card or fail with `EntityNotFound`
pub async fn require_card<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<ProductionCard, S::Error> {
    store
        .load_card(id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Card", id).into())
}

/// Load a card that the active index says is current.
///
/// The index is the authority; a card whose flag and index entry disagree is
/// treated as inactive.
pub async fn require_active_card<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<ProductionCard, S::Error> {
    let card = require_card(store, id).await?;
    let indexed = store.active_card(card.lineage_id).await?;
    if !card.is_current || indexed != Some(card.id) {
        return Err(LedgerError::CardNotActive { card_id: card.id }.into());
    }
    Ok(card)
}

pub async fn require_sub_batch<S: LedgerStore>(
    store: &mut S,
    id: Uuid,
) -> Result<SubBatch, S::Error> {
    store
        .load_sub_batch(id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Sub-batch", id).into())
}

pub async fn require_department<S: LedgerStore>(store: &mut S, id: Uuid) -> Result<(), S::Error> {
    if !store.department_exists(id).await? {
        return Err(LedgerError::not_found("Department", id).into());
    }
    Ok(())
}
