//! Shared fixtures for ledger tests
//!
//! Builds an in-memory ledger with three departments, one worker and a
//! sub-batch already planned through cutting -> stitching -> finishing.

#![allow(dead_code)]

use shared::ledger::{
    create_route, create_sub_batch, ForkItem, MemoryStore, NewSubBatch, NewWorkerLog,
};
use shared::{Batch, ForkDestination, ProductionCard, SubBatch};
use uuid::Uuid;

pub const BATCH_PIECES: i32 = 10_000;

pub struct Fixture {
    pub store: MemoryStore,
    pub batch_id: Uuid,
    pub cutting: Uuid,
    pub stitching: Uuid,
    pub finishing: Uuid,
    pub worker: Uuid,
    pub sub_batch_id: Uuid,
    pub root_card: Uuid,
}

impl Fixture {
    /// Ledger with a sub-batch of `pieces` in production in cutting
    pub async fn planned(pieces: i32) -> Self {
        let mut store = MemoryStore::new();
        let cutting = store.add_department();
        let stitching = store.add_department();
        let finishing = store.add_department();
        let worker = store.add_worker();
        let batch_id = store.add_batch(Batch::new("Spring cut", BATCH_PIECES));

        let mut tx = store.begin();
        let sub_batch = create_sub_batch(&mut tx, new_sub_batch(Some(batch_id), pieces))
            .await
            .expect("create sub-batch");
        let plan = create_route(&mut tx, sub_batch.id, &[cutting, stitching, finishing])
            .await
            .expect("create route");
        tx.commit();

        Self {
            store,
            batch_id,
            cutting,
            stitching,
            finishing,
            worker,
            sub_batch_id: sub_batch.id,
            root_card: plan.first_card.id,
        }
    }

    pub fn card(&self, id: Uuid) -> ProductionCard {
        self.store
            .snapshot()
            .card(id)
            .cloned()
            .expect("card exists")
    }

    pub fn sub_batch(&self) -> SubBatch {
        self.store
            .snapshot()
            .sub_batch(self.sub_batch_id)
            .cloned()
            .expect("sub-batch exists")
    }

    /// A log of `worked` pieces in cutting with no forks
    pub fn log(&self, worked: i32) -> NewWorkerLog {
        self.log_in(self.cutting, worked)
    }

    pub fn log_in(&self, department_id: Uuid, worked: i32) -> NewWorkerLog {
        NewWorkerLog {
            worker_id: self.worker,
            sub_batch_id: self.sub_batch_id,
            department_id,
            quantity_worked: worked,
            activity_type: None,
            is_billable: true,
            work_date: None,
            remarks: None,
            rejected: Vec::new(),
            altered: Vec::new(),
        }
    }
}

pub fn new_sub_batch(batch_id: Option<Uuid>, pieces: i32) -> NewSubBatch {
    NewSubBatch {
        batch_id,
        name: "Oxford shirt, size M".to_string(),
        estimated_pieces: pieces,
        start_date: None,
        due_date: None,
    }
}

pub fn fork_item(source: Uuid, quantity: i32, destination: ForkDestination) -> ForkItem {
    ForkItem {
        source_department_sub_batch_id: source,
        quantity,
        destination,
        reason: "Uneven seam".to_string(),
    }
}
