//! Worker log service
//!
//! Each call is one ledger transaction: a log is created together with its
//! forks, and deleted together with everything it caused, or not at all.

use chrono::NaiveDate;
use serde::Deserialize;
use shared::ledger::{self, ForkItem, NewWorkerLog, WorkerLogChanges};
use shared::{ActivityType, WorkerLog, WorkerLogDetail};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::LedgerConfig;
use crate::db::ledger_store::{WorkerLogRow, WORKER_LOG_COLUMNS};
use crate::db::{run_in_transaction, run_read_only};
use crate::error::AppResult;

#[derive(Clone)]
pub struct WorkerLogService {
    db: PgPool,
    limits: LedgerConfig,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkerLogInput {
    pub worker_id: Uuid,
    pub sub_batch_id: Uuid,
    pub department_id: Uuid,
    #[validate(range(min = 0))]
    pub quantity_worked: i32,
    pub activity_type: Option<ActivityType>,
    #[serde(default = "default_billable")]
    pub is_billable: bool,
    pub work_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    #[serde(default)]
    pub rejected: Vec<ForkItem>,
    #[serde(default)]
    pub altered: Vec<ForkItem>,
}

fn default_billable() -> bool {
    true
}

impl From<CreateWorkerLogInput> for NewWorkerLog {
    fn from(input: CreateWorkerLogInput) -> Self {
        NewWorkerLog {
            worker_id: input.worker_id,
            sub_batch_id: input.sub_batch_id,
            department_id: input.department_id,
            quantity_worked: input.quantity_worked,
            activity_type: input.activity_type,
            is_billable: input.is_billable,
            work_date: input.work_date,
            remarks: input.remarks,
            rejected: input.rejected,
            altered: input.altered,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkerLogInput {
    #[validate(range(min = 0))]
    pub quantity_worked: Option<i32>,
    pub is_billable: Option<bool>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerLogQuery {
    pub worker_id: Option<Uuid>,
    pub card_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl WorkerLogService {
    pub fn new(db: PgPool, limits: LedgerConfig) -> Self {
        Self { db, limits }
    }

    pub async fn create(&self, input: CreateWorkerLogInput) -> AppResult<WorkerLogDetail> {
        input.validate()?;
        let new_log = NewWorkerLog::from(input);

        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::create_worker_log(store, new_log).await })
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<WorkerLogDetail> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::get_worker_log(store, id).await })
        })
        .await
    }

    pub async fn list(&self, query: WorkerLogQuery) -> AppResult<Vec<WorkerLog>> {
        let sql = format!(
            "SELECT {} FROM worker_logs
             WHERE ($1::uuid IS NULL OR worker_id = $1)
               AND ($2::uuid IS NULL OR department_sub_batch_id = $2)
               AND ($3::date IS NULL OR work_date >= $3)
               AND ($4::date IS NULL OR work_date <= $4)
             ORDER BY work_date DESC, created_at DESC",
            WORKER_LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkerLogRow>(&sql)
            .bind(query.worker_id)
            .bind(query.card_id)
            .bind(query.from)
            .bind(query.to)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(WorkerLog::try_from).collect()
    }

    pub async fn update(&self, id: Uuid, input: UpdateWorkerLogInput) -> AppResult<WorkerLogDetail> {
        input.validate()?;
        let changes = WorkerLogChanges {
            quantity_worked: input.quantity_worked,
            is_billable: input.is_billable,
            remarks: input.remarks,
        };

        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::update_worker_log(store, id, changes).await })
        })
        .await
    }

    /// Undo a log: release its work and reverse its forks
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::delete_worker_log(store, id).await })
        })
        .await
    }
}
