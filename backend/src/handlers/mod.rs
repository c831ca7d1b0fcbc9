//! HTTP request handlers

pub mod card;
pub mod health;
pub mod reference;
pub mod sub_batch;
pub mod worker_log;

pub use card::*;
pub use health::*;
pub use reference::*;
pub use sub_batch::*;
pub use worker_log::*;
