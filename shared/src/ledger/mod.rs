//! Quantity-conserving production ledger
//!
//! Every operation here takes a `LedgerStore`, which is one open
//! transaction. Operations either complete every write they make or return
//! an error; the caller drops the transaction on error.

pub mod accountant;
mod advance;
mod error;
mod fork;
mod index;
mod memory;
mod planner;
mod report;
pub mod stage;
mod store;
mod sub_batch;
mod worker_log;

pub use advance::{advance, AdvanceOutcome, AdvanceRequest};
pub use error::{LedgerError, LedgerResult};
pub use fork::{fork, scrap_rejection, ForkOutcome, ForkRequest};
pub use index::ActiveCardIndex;
pub use memory::{LedgerSnapshot, MemoryStore, MemoryTx};
pub use planner::{create_route, next_department, RoutePlan};
pub use report::{
    card_history, conservation_report, department_board, sub_batch_cards, ConservationLine,
    DepartmentBoard, SubBatchAccounting,
};
pub use stage::{move_stage, StageTransition};
pub use store::{
    require_active_card, require_card, require_department, require_sub_batch, LedgerStore,
};
pub use sub_batch::{
    cancel_sub_batch, can_transition, complete_sub_batch, create_sub_batch, delete_sub_batch,
    NewSubBatch,
};
pub use worker_log::{
    create_worker_log, delete_worker_log, get_worker_log, update_worker_log, ForkItem,
    NewWorkerLog, WorkerLogChanges,
};
