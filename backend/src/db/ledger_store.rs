//! Postgres implementation of the ledger store
//!
//! In a writing transaction, card reads lock their rows with `FOR UPDATE`, so
//! a quantity check and the write that follows it cannot interleave with
//! another transaction touching the same card. Read-only transactions load
//! the same rows without locking.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    ActivityType, Batch, CardHistory, CardStage, CardTag, ForkKind, ForkRecord, HistoryEvent,
    LedgerError, LedgerStore, ProductionCard, SubBatch, SubBatchStatus, WorkerLog, WorkflowRoute,
    WorkflowStep,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const CARD_COLUMNS: &str = "id, sub_batch_id, department_id, lineage_id, stage, total_quantity, \
     quantity_received, quantity_assigned, quantity_remaining, quantity_forked, is_current, \
     sent_from_department, sent_to_department_id, parent_department_sub_batch_id, remarks, \
     reject_reason, alter_reason, created_at, updated_at";

pub(crate) const WORKER_LOG_COLUMNS: &str = "id, worker_id, sub_batch_id, department_id, \
     department_sub_batch_id, quantity_received, quantity_worked, activity_type, is_billable, \
     work_date, remarks, created_at, updated_at";

pub(crate) const SUB_BATCH_COLUMNS: &str = "id, batch_id, name, estimated_pieces, status, \
     start_date, due_date, completed_at, created_at, updated_at";

const FORK_RECORD_COLUMNS: &str = "id, kind, sub_batch_id, quantity, reason, \
     source_department_sub_batch_id, created_department_sub_batch_id, destination_department_id, \
     worker_log_id, created_at";

/// How loads inside a transaction treat the rows they read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    ForUpdate,
    Unlocked,
}

impl RowLock {
    fn clause(self) -> &'static str {
        match self {
            RowLock::ForUpdate => " FOR UPDATE",
            RowLock::Unlocked => "",
        }
    }

    fn apply(self, select: &str) -> String {
        format!("{}{}", select, self.clause())
    }
}

/// One open ledger transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
    lock: RowLock,
}

impl PgLedgerTx {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx,
            lock: RowLock::ForUpdate,
        }
    }

    /// Transaction for GET endpoints: rows are read without row locks
    pub fn read_only(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx,
            lock: RowLock::Unlocked,
        }
    }

    pub async fn set_read_only(&mut self) -> Result<(), sqlx::Error> {
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    /// Bound every statement of this transaction
    pub async fn set_statement_timeout(&mut self, limit: Duration) -> Result<(), sqlx::Error> {
        // SET does not accept bind parameters
        let sql = format!("SET LOCAL statement_timeout = {}", limit.as_millis());
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn decode<T>(parsed: Option<T>, what: &str, raw: &str) -> AppResult<T> {
    parsed.ok_or_else(|| AppError::InternalError(anyhow!("unknown {} '{}' in database", what, raw)))
}

#[derive(sqlx::FromRow)]
pub(crate) struct BatchRow {
    id: Uuid,
    name: String,
    total_quantity: i32,
    available_quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            name: row.name,
            total_quantity: row.total_quantity,
            available_quantity: row.available_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SubBatchRow {
    id: Uuid,
    batch_id: Option<Uuid>,
    name: String,
    estimated_pieces: i32,
    status: String,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubBatchRow> for SubBatch {
    type Error = AppError;

    fn try_from(row: SubBatchRow) -> AppResult<Self> {
        Ok(SubBatch {
            id: row.id,
            batch_id: row.batch_id,
            name: row.name,
            estimated_pieces: row.estimated_pieces,
            status: decode(SubBatchStatus::parse(&row.status), "sub-batch status", &row.status)?,
            start_date: row.start_date,
            due_date: row.due_date,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CardRow {
    id: Uuid,
    sub_batch_id: Uuid,
    department_id: Uuid,
    lineage_id: Uuid,
    stage: String,
    total_quantity: i32,
    quantity_received: i32,
    quantity_assigned: i32,
    quantity_remaining: i32,
    quantity_forked: i32,
    is_current: bool,
    sent_from_department: Option<Uuid>,
    sent_to_department_id: Option<Uuid>,
    parent_department_sub_batch_id: Option<Uuid>,
    remarks: String,
    reject_reason: Option<String>,
    alter_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CardRow> for ProductionCard {
    type Error = AppError;

    fn try_from(row: CardRow) -> AppResult<Self> {
        let tag = CardTag::from_columns(
            &row.remarks,
            row.reject_reason.as_deref(),
            row.alter_reason.as_deref(),
        );
        Ok(ProductionCard {
            id: row.id,
            sub_batch_id: row.sub_batch_id,
            department_id: row.department_id,
            lineage_id: row.lineage_id,
            stage: decode(CardStage::parse(&row.stage), "card stage", &row.stage)?,
            total_quantity: row.total_quantity,
            quantity_received: row.quantity_received,
            quantity_assigned: row.quantity_assigned,
            quantity_remaining: row.quantity_remaining,
            quantity_forked: row.quantity_forked,
            is_current: row.is_current,
            sent_from_department: row.sent_from_department,
            sent_to_department_id: row.sent_to_department_id,
            parent_department_sub_batch_id: row.parent_department_sub_batch_id,
            tag: decode(tag, "card tag", &row.remarks)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn cards(rows: Vec<CardRow>) -> AppResult<Vec<ProductionCard>> {
    rows.into_iter().map(ProductionCard::try_from).collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct WorkerLogRow {
    id: Uuid,
    worker_id: Uuid,
    sub_batch_id: Uuid,
    department_id: Uuid,
    department_sub_batch_id: Uuid,
    quantity_received: i32,
    quantity_worked: i32,
    activity_type: String,
    is_billable: bool,
    work_date: NaiveDate,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkerLogRow> for WorkerLog {
    type Error = AppError;

    fn try_from(row: WorkerLogRow) -> AppResult<Self> {
        Ok(WorkerLog {
            id: row.id,
            worker_id: row.worker_id,
            sub_batch_id: row.sub_batch_id,
            department_id: row.department_id,
            department_sub_batch_id: row.department_sub_batch_id,
            quantity_received: row.quantity_received,
            quantity_worked: row.quantity_worked,
            activity_type: decode(
                ActivityType::parse(&row.activity_type),
                "activity type",
                &row.activity_type,
            )?,
            is_billable: row.is_billable,
            work_date: row.work_date,
            remarks: row.remarks,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ForkRecordRow {
    id: Uuid,
    kind: String,
    sub_batch_id: Uuid,
    quantity: i32,
    reason: String,
    source_department_sub_batch_id: Uuid,
    created_department_sub_batch_id: Option<Uuid>,
    destination_department_id: Option<Uuid>,
    worker_log_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ForkRecordRow> for ForkRecord {
    type Error = AppError;

    fn try_from(row: ForkRecordRow) -> AppResult<Self> {
        Ok(ForkRecord {
            id: row.id,
            kind: decode(ForkKind::parse(&row.kind), "fork kind", &row.kind)?,
            sub_batch_id: row.sub_batch_id,
            quantity: row.quantity,
            reason: row.reason,
            source_department_sub_batch_id: row.source_department_sub_batch_id,
            created_department_sub_batch_id: row.created_department_sub_batch_id,
            destination_department_id: row.destination_department_id,
            worker_log_id: row.worker_log_id,
            created_at: row.created_at,
        })
    }
}

fn fork_records(rows: Vec<ForkRecordRow>) -> AppResult<Vec<ForkRecord>> {
    rows.into_iter().map(ForkRecord::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    department_sub_batch_id: Uuid,
    sub_batch_id: Uuid,
    event: String,
    from_stage: Option<String>,
    to_stage: String,
    to_department_id: Option<Uuid>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for CardHistory {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> AppResult<Self> {
        let from_stage = match row.from_stage.as_deref() {
            Some(raw) => Some(decode(CardStage::parse(raw), "card stage", raw)?),
            None => None,
        };
        Ok(CardHistory {
            id: row.id,
            department_sub_batch_id: row.department_sub_batch_id,
            sub_batch_id: row.sub_batch_id,
            event: decode(HistoryEvent::parse(&row.event), "history event", &row.event)?,
            from_stage,
            to_stage: decode(CardStage::parse(&row.to_stage), "card stage", &row.to_stage)?,
            to_department_id: row.to_department_id,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

fn ensure_updated(rows_affected: u64, entity: &'static str, id: Uuid) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(LedgerError::not_found(entity, id).into());
    }
    Ok(())
}

// ============================================================================
// LedgerStore
// ============================================================================

#[async_trait]
impl LedgerStore for PgLedgerTx {
    type Error = AppError;

    async fn load_batch(&mut self, id: Uuid) -> AppResult<Option<Batch>> {
        let sql = self.lock.apply(
            "SELECT id, name, total_quantity, available_quantity, created_at, updated_at
             FROM batches WHERE id = $1",
        );
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Batch::from))
    }

    async fn save_batch(&mut self, batch: &Batch) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE batches SET available_quantity = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(batch.id)
        .bind(batch.available_quantity)
        .bind(batch.updated_at)
        .execute(&mut *self.tx)
        .await?;
        ensure_updated(result.rows_affected(), "Batch", batch.id)
    }

    async fn load_sub_batch(&mut self, id: Uuid) -> AppResult<Option<SubBatch>> {
        let sql = self
            .lock
            .apply(&format!("SELECT {} FROM sub_batches WHERE id = $1", SUB_BATCH_COLUMNS));
        let row = sqlx::query_as::<_, SubBatchRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(SubBatch::try_from).transpose()
    }

    async fn insert_sub_batch(&mut self, sub_batch: &SubBatch) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sub_batches (id, batch_id, name, estimated_pieces, status, start_date,
                                      due_date, completed_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(sub_batch.id)
        .bind(sub_batch.batch_id)
        .bind(&sub_batch.name)
        .bind(sub_batch.estimated_pieces)
        .bind(sub_batch.status.as_str())
        .bind(sub_batch.start_date)
        .bind(sub_batch.due_date)
        .bind(sub_batch.completed_at)
        .bind(sub_batch.created_at)
        .bind(sub_batch.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_sub_batch(&mut self, sub_batch: &SubBatch) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE sub_batches
             SET name = $2, estimated_pieces = $3, status = $4, start_date = $5, due_date = $6,
                 completed_at = $7, updated_at = $8
             WHERE id = $1",
        )
        .bind(sub_batch.id)
        .bind(&sub_batch.name)
        .bind(sub_batch.estimated_pieces)
        .bind(sub_batch.status.as_str())
        .bind(sub_batch.start_date)
        .bind(sub_batch.due_date)
        .bind(sub_batch.completed_at)
        .bind(sub_batch.updated_at)
        .execute(&mut *self.tx)
        .await?;
        ensure_updated(result.rows_affected(), "Sub-batch", sub_batch.id)
    }

    async fn delete_sub_batch(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM sub_batches WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn load_route(&mut self, sub_batch_id: Uuid) -> AppResult<Option<WorkflowRoute>> {
        let route = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT id, created_at FROM workflow_routes WHERE sub_batch_id = $1",
        )
        .bind(sub_batch_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some((id, created_at)) = route else {
            return Ok(None);
        };

        let steps = sqlx::query_as::<_, (i32, Uuid)>(
            "SELECT step_index, department_id FROM workflow_steps
             WHERE route_id = $1 ORDER BY step_index",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?
        .into_iter()
        .map(|(step_index, department_id)| WorkflowStep {
            step_index,
            department_id,
        })
        .collect();

        Ok(Some(WorkflowRoute {
            id,
            sub_batch_id,
            steps,
            created_at,
        }))
    }

    async fn insert_route(&mut self, route: &WorkflowRoute) -> AppResult<()> {
        sqlx::query("INSERT INTO workflow_routes (id, sub_batch_id, created_at) VALUES ($1, $2, $3)")
            .bind(route.id)
            .bind(route.sub_batch_id)
            .bind(route.created_at)
            .execute(&mut *self.tx)
            .await?;

        for step in &route.steps {
            sqlx::query(
                "INSERT INTO workflow_steps (route_id, step_index, department_id)
                 VALUES ($1, $2, $3)",
            )
            .bind(route.id)
            .bind(step.step_index)
            .bind(step.department_id)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn department_exists(&mut self, id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM departments WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn worker_exists(&mut self, id: Uuid) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM workers WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn load_card(&mut self, id: Uuid) -> AppResult<Option<ProductionCard>> {
        let sql = self
            .lock
            .apply(&format!("SELECT {} FROM production_cards WHERE id = $1", CARD_COLUMNS));
        let row = sqlx::query_as::<_, CardRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ProductionCard::try_from).transpose()
    }

    async fn find_current_card(
        &mut self,
        sub_batch_id: Uuid,
        department_id: Uuid,
        min_remaining: i32,
    ) -> AppResult<Option<ProductionCard>> {
        let sql = self.lock.apply(&format!(
            "SELECT {} FROM production_cards c
             WHERE c.sub_batch_id = $1 AND c.department_id = $2 AND c.is_current
               AND c.quantity_remaining >= $3
               AND EXISTS (SELECT 1 FROM active_cards a WHERE a.card_id = c.id)
             ORDER BY c.seq DESC
             LIMIT 1",
            CARD_COLUMNS
        ));
        let row = sqlx::query_as::<_, CardRow>(&sql)
            .bind(sub_batch_id)
            .bind(department_id)
            .bind(min_remaining)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ProductionCard::try_from).transpose()
    }

    async fn list_cards(&mut self, sub_batch_id: Uuid) -> AppResult<Vec<ProductionCard>> {
        let sql = format!(
            "SELECT {} FROM production_cards WHERE sub_batch_id = $1 ORDER BY seq",
            CARD_COLUMNS
        );
        let rows = sqlx::query_as::<_, CardRow>(&sql)
            .bind(sub_batch_id)
            .fetch_all(&mut *self.tx)
            .await?;
        cards(rows)
    }

    async fn list_current_cards_in_department(
        &mut self,
        department_id: Uuid,
    ) -> AppResult<Vec<ProductionCard>> {
        let sql = format!(
            "SELECT {} FROM production_cards
             WHERE department_id = $1 AND is_current
             ORDER BY seq",
            CARD_COLUMNS
        );
        let rows = sqlx::query_as::<_, CardRow>(&sql)
            .bind(department_id)
            .fetch_all(&mut *self.tx)
            .await?;
        cards(rows)
    }

    async fn insert_card(&mut self, card: &ProductionCard) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO production_cards ({})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                     $18, $19)",
            CARD_COLUMNS
        );
        sqlx::query(&sql)
            .bind(card.id)
            .bind(card.sub_batch_id)
            .bind(card.department_id)
            .bind(card.lineage_id)
            .bind(card.stage.as_str())
            .bind(card.total_quantity)
            .bind(card.quantity_received)
            .bind(card.quantity_assigned)
            .bind(card.quantity_remaining)
            .bind(card.quantity_forked)
            .bind(card.is_current)
            .bind(card.sent_from_department)
            .bind(card.sent_to_department_id)
            .bind(card.parent_department_sub_batch_id)
            .bind(card.tag.as_str())
            .bind(card.reject_reason())
            .bind(card.alter_reason())
            .bind(card.created_at)
            .bind(card.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn save_card(&mut self, card: &ProductionCard) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE production_cards
             SET stage = $2, quantity_assigned = $3, quantity_remaining = $4,
                 quantity_forked = $5, is_current = $6, sent_to_department_id = $7,
                 remarks = $8, reject_reason = $9, alter_reason = $10, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(card.id)
        .bind(card.stage.as_str())
        .bind(card.quantity_assigned)
        .bind(card.quantity_remaining)
        .bind(card.quantity_forked)
        .bind(card.is_current)
        .bind(card.sent_to_department_id)
        .bind(card.tag.as_str())
        .bind(card.reject_reason())
        .bind(card.alter_reason())
        .execute(&mut *self.tx)
        .await?;
        ensure_updated(result.rows_affected(), "Card", card.id)
    }

    async fn delete_card(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM production_cards WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn active_card(&mut self, lineage_id: Uuid) -> AppResult<Option<Uuid>> {
        let card_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT card_id FROM active_cards WHERE lineage_id = $1",
        )
        .bind(lineage_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(card_id)
    }

    async fn set_active_card(&mut self, lineage_id: Uuid, card_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO active_cards (lineage_id, card_id) VALUES ($1, $2)
             ON CONFLICT (lineage_id) DO UPDATE SET card_id = EXCLUDED.card_id",
        )
        .bind(lineage_id)
        .bind(card_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn clear_active_card(&mut self, lineage_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM active_cards WHERE lineage_id = $1")
            .bind(lineage_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_worker_log(&mut self, log: &WorkerLog) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO worker_logs ({})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            WORKER_LOG_COLUMNS
        );
        sqlx::query(&sql)
            .bind(log.id)
            .bind(log.worker_id)
            .bind(log.sub_batch_id)
            .bind(log.department_id)
            .bind(log.department_sub_batch_id)
            .bind(log.quantity_received)
            .bind(log.quantity_worked)
            .bind(log.activity_type.as_str())
            .bind(log.is_billable)
            .bind(log.work_date)
            .bind(&log.remarks)
            .bind(log.created_at)
            .bind(log.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn load_worker_log(&mut self, id: Uuid) -> AppResult<Option<WorkerLog>> {
        let sql = self
            .lock
            .apply(&format!("SELECT {} FROM worker_logs WHERE id = $1", WORKER_LOG_COLUMNS));
        let row = sqlx::query_as::<_, WorkerLogRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(WorkerLog::try_from).transpose()
    }

    async fn save_worker_log(&mut self, log: &WorkerLog) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE worker_logs
             SET quantity_worked = $2, is_billable = $3, remarks = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(log.id)
        .bind(log.quantity_worked)
        .bind(log.is_billable)
        .bind(&log.remarks)
        .bind(log.updated_at)
        .execute(&mut *self.tx)
        .await?;
        ensure_updated(result.rows_affected(), "Worker log", log.id)
    }

    async fn delete_worker_log(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM worker_logs WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn count_worker_logs_for_card(&mut self, card_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM worker_logs WHERE department_sub_batch_id = $1",
        )
        .bind(card_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert_fork_record(&mut self, record: &ForkRecord) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO fork_records ({})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            FORK_RECORD_COLUMNS
        );
        sqlx::query(&sql)
            .bind(record.id)
            .bind(record.kind.as_str())
            .bind(record.sub_batch_id)
            .bind(record.quantity)
            .bind(&record.reason)
            .bind(record.source_department_sub_batch_id)
            .bind(record.created_department_sub_batch_id)
            .bind(record.destination_department_id)
            .bind(record.worker_log_id)
            .bind(record.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn fork_records_for_log(&mut self, worker_log_id: Uuid) -> AppResult<Vec<ForkRecord>> {
        let sql = format!(
            "SELECT {} FROM fork_records WHERE worker_log_id = $1 ORDER BY created_at",
            FORK_RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, ForkRecordRow>(&sql)
            .bind(worker_log_id)
            .fetch_all(&mut *self.tx)
            .await?;
        fork_records(rows)
    }

    async fn delete_fork_records_for_log(&mut self, worker_log_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM fork_records WHERE worker_log_id = $1")
            .bind(worker_log_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn fork_records_for_card(&mut self, card_id: Uuid) -> AppResult<Vec<ForkRecord>> {
        let sql = format!(
            "SELECT {} FROM fork_records
             WHERE source_department_sub_batch_id = $1 ORDER BY created_at",
            FORK_RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, ForkRecordRow>(&sql)
            .bind(card_id)
            .fetch_all(&mut *self.tx)
            .await?;
        fork_records(rows)
    }

    async fn insert_history(&mut self, entry: &CardHistory) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO department_sub_batch_history
                (id, department_sub_batch_id, sub_batch_id, event, from_stage, to_stage,
                 to_department_id, reason, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.department_sub_batch_id)
        .bind(entry.sub_batch_id)
        .bind(entry.event.as_str())
        .bind(entry.from_stage.map(|s| s.as_str()))
        .bind(entry.to_stage.as_str())
        .bind(entry.to_department_id)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn history_for_card(&mut self, card_id: Uuid) -> AppResult<Vec<CardHistory>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, department_sub_batch_id, sub_batch_id, event, from_stage, to_stage,
                    to_department_id, reason, created_at
             FROM department_sub_batch_history
             WHERE department_sub_batch_id = $1
             ORDER BY created_at",
        )
        .bind(card_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(CardHistory::try_from).collect()
    }
}
