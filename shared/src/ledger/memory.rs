//! In-memory ledger store
//!
//! `MemoryStore::begin` hands out a `MemoryTx` working on a private copy of
//! the state. `commit` publishes the copy; dropping the transaction discards
//! it, which gives the same all-or-nothing behaviour as a database
//! transaction. Used by tests and by the browser previews.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use super::error::LedgerError;
use super::index::ActiveCardIndex;
use super::store::LedgerStore;
use crate::models::{
    Batch, CardHistory, ForkRecord, ProductionCard, SubBatch, WorkerLog, WorkflowRoute,
};

/// Full ledger state held in memory
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    batches: HashMap<Uuid, Batch>,
    sub_batches: HashMap<Uuid, SubBatch>,
    routes: HashMap<Uuid, WorkflowRoute>,
    departments: HashSet<Uuid>,
    workers: HashSet<Uuid>,
    cards: HashMap<Uuid, ProductionCard>,
    card_order: HashMap<Uuid, u64>,
    next_card_seq: u64,
    index: ActiveCardIndex,
    worker_logs: HashMap<Uuid, WorkerLog>,
    fork_records: Vec<ForkRecord>,
    history: Vec<CardHistory>,
}

impl LedgerSnapshot {
    pub fn batch(&self, id: Uuid) -> Option<&Batch> {
        self.batches.get(&id)
    }

    pub fn sub_batch(&self, id: Uuid) -> Option<&SubBatch> {
        self.sub_batches.get(&id)
    }

    pub fn route(&self, sub_batch_id: Uuid) -> Option<&WorkflowRoute> {
        self.routes.get(&sub_batch_id)
    }

    pub fn card(&self, id: Uuid) -> Option<&ProductionCard> {
        self.cards.get(&id)
    }

    /// Cards of a sub-batch in creation order
    pub fn cards_of(&self, sub_batch_id: Uuid) -> Vec<&ProductionCard> {
        let mut cards: Vec<&ProductionCard> = self
            .cards
            .values()
            .filter(|c| c.sub_batch_id == sub_batch_id)
            .collect();
        cards.sort_by_key(|c| self.card_order.get(&c.id).copied().unwrap_or_default());
        cards
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn worker_log(&self, id: Uuid) -> Option<&WorkerLog> {
        self.worker_logs.get(&id)
    }

    pub fn fork_records(&self) -> &[ForkRecord] {
        &self.fork_records
    }

    pub fn history_of(&self, card_id: Uuid) -> Vec<&CardHistory> {
        self.history
            .iter()
            .filter(|h| h.department_sub_batch_id == card_id)
            .collect()
    }

    pub fn index(&self) -> &ActiveCardIndex {
        &self.index
    }
}

/// Shared in-memory ledger
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: LedgerSnapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_department(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.departments.insert(id);
        id
    }

    pub fn add_worker(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.workers.insert(id);
        id
    }

    pub fn add_batch(&mut self, batch: Batch) -> Uuid {
        let id = batch.id;
        self.state.batches.insert(id, batch);
        id
    }

    /// Seed a card directly, bypassing route planning
    pub fn add_card(&mut self, card: ProductionCard) -> Uuid {
        let id = card.id;
        if card.is_current {
            self.state.index.activate(card.lineage_id, id);
        }
        self.state.card_order.insert(id, self.state.next_card_seq);
        self.state.next_card_seq += 1;
        self.state.cards.insert(id, card);
        id
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.state
    }

    pub fn begin(&mut self) -> MemoryTx<'_> {
        let work = self.state.clone();
        MemoryTx {
            base: &mut self.state,
            work,
        }
    }
}

/// Open transaction over a `MemoryStore`
#[derive(Debug)]
pub struct MemoryTx<'a> {
    base: &'a mut LedgerSnapshot,
    work: LedgerSnapshot,
}

impl MemoryTx<'_> {
    pub fn commit(self) {
        *self.base = self.work;
    }

    pub fn rollback(self) {}

    /// State as seen inside this transaction
    pub fn state(&self) -> &LedgerSnapshot {
        &self.work
    }
}

#[async_trait]
impl LedgerStore for MemoryTx<'_> {
    type Error = LedgerError;

    async fn load_batch(&mut self, id: Uuid) -> Result<Option<Batch>, LedgerError> {
        Ok(self.work.batches.get(&id).cloned())
    }

    async fn save_batch(&mut self, batch: &Batch) -> Result<(), LedgerError> {
        let slot = self
            .work
            .batches
            .get_mut(&batch.id)
            .ok_or_else(|| LedgerError::not_found("Batch", batch.id))?;
        *slot = batch.clone();
        Ok(())
    }

    async fn load_sub_batch(&mut self, id: Uuid) -> Result<Option<SubBatch>, LedgerError> {
        Ok(self.work.sub_batches.get(&id).cloned())
    }

    async fn insert_sub_batch(&mut self, sub_batch: &SubBatch) -> Result<(), LedgerError> {
        self.work.sub_batches.insert(sub_batch.id, sub_batch.clone());
        Ok(())
    }

    async fn save_sub_batch(&mut self, sub_batch: &SubBatch) -> Result<(), LedgerError> {
        let slot = self
            .work
            .sub_batches
            .get_mut(&sub_batch.id)
            .ok_or_else(|| LedgerError::not_found("Sub-batch", sub_batch.id))?;
        *slot = sub_batch.clone();
        Ok(())
    }

    async fn delete_sub_batch(&mut self, id: Uuid) -> Result<(), LedgerError> {
        self.work.sub_batches.remove(&id);
        self.work.routes.remove(&id);
        Ok(())
    }

    async fn load_route(&mut self, sub_batch_id: Uuid) -> Result<Option<WorkflowRoute>, LedgerError> {
        Ok(self.work.routes.get(&sub_batch_id).cloned())
    }

    async fn insert_route(&mut self, route: &WorkflowRoute) -> Result<(), LedgerError> {
        self.work.routes.insert(route.sub_batch_id, route.clone());
        Ok(())
    }

    async fn department_exists(&mut self, id: Uuid) -> Result<bool, LedgerError> {
        Ok(self.work.departments.contains(&id))
    }

    async fn worker_exists(&mut self, id: Uuid) -> Result<bool, LedgerError> {
        Ok(self.work.workers.contains(&id))
    }

    async fn load_card(&mut self, id: Uuid) -> Result<Option<ProductionCard>, LedgerError> {
        Ok(self.work.cards.get(&id).cloned())
    }

    async fn find_current_card(
        &mut self,
        sub_batch_id: Uuid,
        department_id: Uuid,
        min_remaining: i32,
    ) -> Result<Option<ProductionCard>, LedgerError> {
        let work = &self.work;
        let found = work
            .cards
            .values()
            .filter(|c| {
                c.sub_batch_id == sub_batch_id
                    && c.department_id == department_id
                    && c.is_current
                    && work.index.current(c.lineage_id) == Some(c.id)
                    && c.quantity_remaining >= min_remaining
            })
            .max_by_key(|c| work.card_order.get(&c.id).copied().unwrap_or_default())
            .cloned();
        Ok(found)
    }

    async fn list_cards(&mut self, sub_batch_id: Uuid) -> Result<Vec<ProductionCard>, LedgerError> {
        Ok(self
            .work
            .cards_of(sub_batch_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn list_current_cards_in_department(
        &mut self,
        department_id: Uuid,
    ) -> Result<Vec<ProductionCard>, LedgerError> {
        let work = &self.work;
        let mut cards: Vec<ProductionCard> = work
            .cards
            .values()
            .filter(|c| c.department_id == department_id && c.is_current)
            .cloned()
            .collect();
        cards.sort_by_key(|c| work.card_order.get(&c.id).copied().unwrap_or_default());
        Ok(cards)
    }

    async fn insert_card(&mut self, card: &ProductionCard) -> Result<(), LedgerError> {
        if self.work.cards.contains_key(&card.id) {
            return Err(LedgerError::invalid("id", "card already exists"));
        }
        let seq = self.work.next_card_seq;
        self.work.next_card_seq += 1;
        self.work.card_order.insert(card.id, seq);
        self.work.cards.insert(card.id, card.clone());
        Ok(())
    }

    async fn save_card(&mut self, card: &ProductionCard) -> Result<(), LedgerError> {
        let slot = self
            .work
            .cards
            .get_mut(&card.id)
            .ok_or_else(|| LedgerError::not_found("Card", card.id))?;
        *slot = card.clone();
        Ok(())
    }

    async fn delete_card(&mut self, id: Uuid) -> Result<(), LedgerError> {
        self.work.cards.remove(&id);
        self.work.card_order.remove(&id);
        self.work.history.retain(|h| h.department_sub_batch_id != id);
        Ok(())
    }

    async fn active_card(&mut self, lineage_id: Uuid) -> Result<Option<Uuid>, LedgerError> {
        Ok(self.work.index.current(lineage_id))
    }

    async fn set_active_card(&mut self, lineage_id: Uuid, card_id: Uuid) -> Result<(), LedgerError> {
        self.work.index.activate(lineage_id, card_id);
        Ok(())
    }

    async fn clear_active_card(&mut self, lineage_id: Uuid) -> Result<(), LedgerError> {
        self.work.index.deactivate(lineage_id);
        Ok(())
    }

    async fn insert_worker_log(&mut self, log: &WorkerLog) -> Result<(), LedgerError> {
        self.work.worker_logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn load_worker_log(&mut self, id: Uuid) -> Result<Option<WorkerLog>, LedgerError> {
        Ok(self.work.worker_logs.get(&id).cloned())
    }

    async fn save_worker_log(&mut self, log: &WorkerLog) -> Result<(), LedgerError> {
        let slot = self
            .work
            .worker_logs
            .get_mut(&log.id)
            .ok_or_else(|| LedgerError::not_found("Worker log", log.id))?;
        *slot = log.clone();
        Ok(())
    }

    async fn delete_worker_log(&mut self, id: Uuid) -> Result<(), LedgerError> {
        self.work.worker_logs.remove(&id);
        Ok(())
    }

    async fn count_worker_logs_for_card(&mut self, card_id: Uuid) -> Result<i64, LedgerError> {
        Ok(self
            .work
            .worker_logs
            .values()
            .filter(|l| l.department_sub_batch_id == card_id)
            .count() as i64)
    }

    async fn insert_fork_record(&mut self, record: &ForkRecord) -> Result<(), LedgerError> {
        self.work.fork_records.push(record.clone());
        Ok(())
    }

    async fn fork_records_for_log(&mut self, worker_log_id: Uuid) -> Result<Vec<ForkRecord>, LedgerError> {
        Ok(self
            .work
            .fork_records
            .iter()
            .filter(|r| r.worker_log_id == Some(worker_log_id))
            .cloned()
            .collect())
    }

    async fn delete_fork_records_for_log(&mut self, worker_log_id: Uuid) -> Result<(), LedgerError> {
        self.work
            .fork_records
            .retain(|r| r.worker_log_id != Some(worker_log_id));
        Ok(())
    }

    async fn fork_records_for_card(&mut self, card_id: Uuid) -> Result<Vec<ForkRecord>, LedgerError> {
        Ok(self
            .work
            .fork_records
            .iter()
            .filter(|r| r.source_department_sub_batch_id == card_id)
            .cloned()
            .collect())
    }

    async fn insert_history(&mut self, entry: &CardHistory) -> Result<(), LedgerError> {
        self.work.history.push(entry.clone());
        Ok(())
    }

    async fn history_for_card(&mut self, card_id: Uuid) -> Result<Vec<CardHistory>, LedgerError> {
        Ok(self
            .work
            .history_of(card_id)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let mut store = MemoryStore::new();
        let card = ProductionCard::new_root(Uuid::new_v4(), store.add_department(), 10);

        {
            let mut tx = store.begin();
            tx.insert_card(&card).await.unwrap();
            assert!(tx.state().card(card.id).is_some());
        }
        assert!(store.snapshot().card(card.id).is_none());

        let mut tx = store.begin();
        tx.insert_card(&card).await.unwrap();
        tx.commit();
        assert!(store.snapshot().card(card.id).is_some());
    }

    #[tokio::test]
    async fn test_find_current_card_prefers_newest_with_capacity() {
        let mut store = MemoryStore::new();
        let dept = store.add_department();
        let sub_batch = Uuid::new_v4();
        let older = ProductionCard::new_root(sub_batch, dept, 50);
        let newer = ProductionCard::new_root(sub_batch, dept, 20);
        store.add_card(older.clone());
        store.add_card(newer.clone());

        let mut tx = store.begin();
        let found = tx.find_current_card(sub_batch, dept, 10).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(newer.id));

        let found = tx.find_current_card(sub_batch, dept, 30).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(older.id));

        assert!(tx.find_current_card(sub_batch, dept, 60).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unindexed_card_is_not_current() {
        let mut store = MemoryStore::new();
        let dept = store.add_department();
        let sub_batch = Uuid::new_v4();
        let card = ProductionCard::new_root(sub_batch, dept, 50);
        store.add_card(card.clone());

        let mut tx = store.begin();
        tx.clear_active_card(card.lineage_id).await.unwrap();
        assert!(tx.find_current_card(sub_batch, dept, 1).await.unwrap().is_none());
    }
}
