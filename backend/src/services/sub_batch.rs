//! Sub-batch lifecycle and route planning service

use chrono::NaiveDate;
use serde::Deserialize;
use shared::ledger::{self, NewSubBatch, RoutePlan, SubBatchAccounting};
use shared::{LedgerError, LedgerStore, ProductionCard, SubBatch, SubBatchStatus, WorkflowRoute};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::LedgerConfig;
use crate::db::ledger_store::{SubBatchRow, SUB_BATCH_COLUMNS};
use crate::db::{run_in_transaction, run_read_only};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SubBatchService {
    db: PgPool,
    limits: LedgerConfig,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubBatchInput {
    pub batch_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1))]
    pub estimated_pieces: i32,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteInput {
    #[validate(length(min = 1))]
    pub department_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SubBatchQuery {
    pub status: Option<String>,
}

impl SubBatchService {
    pub fn new(db: PgPool, limits: LedgerConfig) -> Self {
        Self { db, limits }
    }

    pub async fn list(&self, query: SubBatchQuery) -> AppResult<Vec<SubBatch>> {
        let status = match query.status.as_deref() {
            Some(raw) => Some(
                SubBatchStatus::parse(raw)
                    .ok_or_else(|| LedgerError::invalid("status", format!("unknown status {}", raw)))?,
            ),
            None => None,
        };

        let sql = format!(
            "SELECT {} FROM sub_batches
             WHERE $1::varchar IS NULL OR status = $1
             ORDER BY created_at DESC",
            SUB_BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, SubBatchRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(SubBatch::try_from).collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<SubBatch> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::require_sub_batch(store, id).await })
        })
        .await
    }

    pub async fn create(&self, input: CreateSubBatchInput) -> AppResult<SubBatch> {
        input.validate()?;
        let new_sub_batch = NewSubBatch {
            batch_id: input.batch_id,
            name: input.name,
            estimated_pieces: input.estimated_pieces,
            start_date: input.start_date,
            due_date: input.due_date,
        };

        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::create_sub_batch(store, new_sub_batch).await })
        })
        .await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::delete_sub_batch(store, id).await })
        })
        .await
    }

    pub async fn complete(&self, id: Uuid) -> AppResult<SubBatch> {
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::complete_sub_batch(store, id).await })
        })
        .await
    }

    pub async fn cancel(&self, id: Uuid) -> AppResult<SubBatch> {
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::cancel_sub_batch(store, id).await })
        })
        .await
    }

    /// Plan the route and put the sub-batch into production
    pub async fn create_route(&self, id: Uuid, input: CreateRouteInput) -> AppResult<RoutePlan> {
        input.validate()?;
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::create_route(store, id, &input.department_ids).await })
        })
        .await
    }

    pub async fn get_route(&self, id: Uuid) -> AppResult<WorkflowRoute> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move {
                store
                    .load_route(id)
                    .await?
                    .ok_or_else(|| AppError::from(LedgerError::not_found("Workflow route", id)))
            })
        })
        .await
    }

    pub async fn cards(&self, id: Uuid) -> AppResult<Vec<ProductionCard>> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::sub_batch_cards(store, id).await })
        })
        .await
    }

    pub async fn conservation_report(&self, id: Uuid) -> AppResult<SubBatchAccounting> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::conservation_report(store, id).await })
        })
        .await
    }
}
