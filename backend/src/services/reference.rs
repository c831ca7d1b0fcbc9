//! Departments, workers and batches
//!
//! Plain reference data the ledger points at. None of it moves pieces, so it
//! is read and written directly against the pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Batch, LedgerError};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db::ledger_store::BatchRow;
use crate::error::AppResult;

#[derive(Clone)]
pub struct ReferenceService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartmentInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkerInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 0))]
    pub total_quantity: i32,
}

impl ReferenceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_departments(&self) -> AppResult<Vec<Department>> {
        let departments = sqlx::query_as::<_, Department>(
            "SELECT id, name, created_at FROM departments ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(departments)
    }

    pub async fn create_department(&self, input: CreateDepartmentInput) -> AppResult<Department> {
        input.validate()?;

        let department = sqlx::query_as::<_, Department>(
            "INSERT INTO departments (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(department_id = %department.id, name = %department.name, "Department created");
        Ok(department)
    }

    pub async fn list_workers(&self, department_id: Option<Uuid>) -> AppResult<Vec<Worker>> {
        let workers = sqlx::query_as::<_, Worker>(
            r#"
            SELECT id, name, department_id, created_at
            FROM workers
            WHERE $1::uuid IS NULL OR department_id = $1
            ORDER BY name
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.db)
        .await?;
        Ok(workers)
    }

    pub async fn create_worker(&self, input: CreateWorkerInput) -> AppResult<Worker> {
        input.validate()?;

        let worker = sqlx::query_as::<_, Worker>(
            r#"
            INSERT INTO workers (name, department_id)
            VALUES ($1, $2)
            RETURNING id, name, department_id, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.department_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(worker_id = %worker.id, "Worker created");
        Ok(worker)
    }

    pub async fn create_batch(&self, input: CreateBatchInput) -> AppResult<Batch> {
        input.validate()?;

        let batch = Batch::new(input.name.trim(), input.total_quantity);
        sqlx::query(
            r#"
            INSERT INTO batches (id, name, total_quantity, available_quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(batch.id)
        .bind(&batch.name)
        .bind(batch.total_quantity)
        .bind(batch.available_quantity)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&self.db)
        .await?;

        tracing::info!(batch_id = %batch.id, total_quantity = batch.total_quantity, "Batch created");
        Ok(batch)
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, name, total_quantity, available_quantity, created_at, updated_at
            FROM batches
            WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::not_found("Batch", batch_id))?;

        Ok(Batch::from(row))
    }
}
