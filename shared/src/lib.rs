//! Shared types and ledger logic for the garment production ledger
//!
//! This crate contains the entity model and the quantity-conserving ledger
//! engine, shared between the backend, the browser (via WASM), and tests.

pub mod ledger;
pub mod models;
pub mod validation;

pub use ledger::{LedgerError, LedgerResult, LedgerStore};
pub use models::*;
pub use validation::*;
