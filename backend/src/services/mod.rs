//! Business logic services for the garment production ledger

pub mod card;
pub mod reference;
pub mod sub_batch;
pub mod worker_log;

pub use card::CardService;
pub use reference::ReferenceService;
pub use sub_batch::SubBatchService;
pub use worker_log::WorkerLogService;
