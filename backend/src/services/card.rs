//! Production card service: advancement, stage moves, scrapping and boards

use serde::Deserialize;
use shared::ledger::{self, AdvanceOutcome, AdvanceRequest, DepartmentBoard, ForkOutcome};
use shared::{CardHistory, CardStage, ProductionCard};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::LedgerConfig;
use crate::db::{run_in_transaction, run_read_only};
use crate::error::AppResult;

#[derive(Clone)]
pub struct CardService {
    db: PgPool,
    limits: LedgerConfig,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdvanceCardInput {
    /// Next department of the route when omitted
    pub target_department_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct MoveStageInput {
    pub stage: CardStage,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScrapInput {
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

impl CardService {
    pub fn new(db: PgPool, limits: LedgerConfig) -> Self {
        Self { db, limits }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ProductionCard> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::require_card(store, id).await })
        })
        .await
    }

    pub async fn advance(&self, id: Uuid, input: AdvanceCardInput) -> AppResult<AdvanceOutcome> {
        input.validate()?;
        let request = AdvanceRequest {
            card_id: id,
            target_department_id: input.target_department_id,
            quantity: input.quantity,
        };

        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::advance(store, request).await })
        })
        .await
    }

    pub async fn move_stage(&self, id: Uuid, input: MoveStageInput) -> AppResult<ProductionCard> {
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::move_stage(store, id, input.stage).await })
        })
        .await
    }

    /// Discard rejected pieces from a card without a worker log
    pub async fn scrap(&self, id: Uuid, input: ScrapInput) -> AppResult<ForkOutcome> {
        input.validate()?;
        run_in_transaction(&self.db, &self.limits, |store| {
            Box::pin(async move {
                ledger::scrap_rejection(store, id, input.quantity, input.reason).await
            })
        })
        .await
    }

    pub async fn history(&self, id: Uuid) -> AppResult<Vec<CardHistory>> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::card_history(store, id).await })
        })
        .await
    }

    pub async fn department_board(&self, department_id: Uuid) -> AppResult<DepartmentBoard> {
        run_read_only(&self.db, &self.limits, |store| {
            Box::pin(async move { ledger::department_board(store, department_id).await })
        })
        .await
    }
}
