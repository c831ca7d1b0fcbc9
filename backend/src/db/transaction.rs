//! Transaction runner for ledger operations
//!
//! Every ledger operation runs inside exactly one Postgres transaction.
//! Opening the transaction may wait at most `max_wait`; the operation and
//! its commit together must finish within `timeout`. When either limit
//! expires the transaction is dropped, which rolls it back.
//!
//! Reads go through [`run_read_only`], which opens a `READ ONLY` transaction
//! whose loads take no row locks, so a GET never blocks a writer.

use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;
use tokio::time::timeout;

use super::ledger_store::PgLedgerTx;
use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};

/// Type alias for the boxed future a transactional closure returns
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute `f` against a fresh ledger transaction and commit it.
///
/// ```rust,ignore
/// let detail = run_in_transaction(&pool, &limits, |store| {
///     Box::pin(async move { create_worker_log(store, input).await })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<F, T>(pool: &PgPool, limits: &LedgerConfig, f: F) -> AppResult<T>
where
    F: for<'a> FnOnce(&'a mut PgLedgerTx) -> BoxFuture<'a, AppResult<T>> + Send,
    T: Send,
{
    run(pool, limits, false, f).await
}

/// Execute a read against a `READ ONLY` transaction that locks no rows
pub async fn run_read_only<F, T>(pool: &PgPool, limits: &LedgerConfig, f: F) -> AppResult<T>
where
    F: for<'a> FnOnce(&'a mut PgLedgerTx) -> BoxFuture<'a, AppResult<T>> + Send,
    T: Send,
{
    run(pool, limits, true, f).await
}

async fn run<F, T>(pool: &PgPool, limits: &LedgerConfig, read_only: bool, f: F) -> AppResult<T>
where
    F: for<'a> FnOnce(&'a mut PgLedgerTx) -> BoxFuture<'a, AppResult<T>> + Send,
    T: Send,
{
    let max_wait = limits.max_wait();
    let deadline = limits.timeout();

    let tx = timeout(max_wait, pool.begin())
        .await
        .map_err(|_| AppError::TransactionTimeout {
            stage: "begin",
            limit: max_wait,
        })??;

    let mut store = if read_only {
        PgLedgerTx::read_only(tx)
    } else {
        PgLedgerTx::new(tx)
    };

    let work = async move {
        if read_only {
            store.set_read_only().await?;
        }
        store.set_statement_timeout(deadline).await?;
        let value = f(&mut store).await?;
        store.commit().await?;
        Ok::<T, AppError>(value)
    };

    match timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(limit_ms = deadline.as_millis() as u64, "Ledger transaction timed out");
            Err(AppError::TransactionTimeout {
                stage: "complete",
                limit: deadline,
            })
        }
    }
}
