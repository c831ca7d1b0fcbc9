//! Domain models for the garment production ledger

mod batch;
mod card;
mod history;
mod route;
mod worker_log;

pub use batch::*;
pub use card::*;
pub use history::*;
pub use route::*;
pub use worker_log::*;
