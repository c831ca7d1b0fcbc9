//! Postgres persistence for the ledger

pub mod ledger_store;
pub mod transaction;

pub use transaction::{run_in_transaction, run_read_only};
