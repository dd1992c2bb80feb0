//! Batch operation processor for moving physical stock in and out of cabinets
//!
//! Rows are processed without an outer transaction. Each row is checked and
//! flipped by one conditional UPDATE, so overlapping batches cannot both move
//! the same unit and a stale row never rolls back the others.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use shared::{
    classify_unapplied, validate_batch_size, BatchReport, DomainError, RowFailureReason,
    StockMovement, StockState, StockUnit,
};

/// Batch service for stock row movements
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Database row for a stock unit
#[derive(Debug, sqlx::FromRow)]
struct StockUnitRow {
    id: i64,
    stock_id: i64,
    item_code: String,
    item_description: Option<String>,
    state: String,
    last_moved_by: Option<Uuid>,
    last_moved_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<StockUnitRow> for StockUnit {
    type Error = DomainError;

    fn try_from(row: StockUnitRow) -> Result<Self, Self::Error> {
        Ok(StockUnit {
            id: row.id,
            stock_id: row.stock_id,
            item_code: row.item_code,
            item_description: row.item_description,
            state: StockState::parse(&row.state)?,
            last_moved_by: row.last_moved_by,
            last_moved_at: row.last_moved_at,
            version: row.version,
        })
    }
}

/// Per-row report of a batch movement
pub type MovementReport = BatchReport<i64, StockUnit>;

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Put dispensed units back into their cabinet
    pub async fn return_items_to_cabinet(
        &self,
        row_ids: Vec<i64>,
        user_id: Uuid,
    ) -> AppResult<MovementReport> {
        self.apply(StockMovement::ReturnToCabinet, row_ids, user_id).await
    }

    /// Take units out of their cabinet
    pub async fn dispense_items_from_cabinet(
        &self,
        row_ids: Vec<i64>,
        user_id: Uuid,
    ) -> AppResult<MovementReport> {
        self.apply(StockMovement::DispenseFromCabinet, row_ids, user_id).await
    }

    async fn apply(
        &self,
        movement: StockMovement,
        row_ids: Vec<i64>,
        user_id: Uuid,
    ) -> AppResult<MovementReport> {
        validate_batch_size("row_ids", row_ids.len())?;

        let mut report = MovementReport::new();
        for row_id in row_ids {
            let outcome = self.move_row(movement, row_id, user_id).await?;
            if let Err(reason) = &outcome {
                tracing::warn!(
                    row_id,
                    movement = movement.as_str(),
                    reason = reason.message(),
                    "Stock row skipped"
                );
            }
            report.record(row_id, outcome);
        }

        tracing::info!(
            movement = movement.as_str(),
            user_id = %user_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Batch movement processed"
        );

        Ok(report)
    }

    /// Check and flip one row atomically
    async fn move_row(
        &self,
        movement: StockMovement,
        row_id: i64,
        user_id: Uuid,
    ) -> AppResult<Result<StockUnit, RowFailureReason>> {
        let moved = sqlx::query_as::<_, StockUnitRow>(
            r#"
            UPDATE stock_units
            SET state = $1, last_moved_by = $2, last_moved_at = NOW(), version = version + 1
            WHERE id = $3 AND state = $4
            RETURNING id, stock_id, item_code, item_description, state,
                      last_moved_by, last_moved_at, version
            "#,
        )
        .bind(movement.target_state().as_str())
        .bind(user_id)
        .bind(row_id)
        .bind(movement.required_state().as_str())
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = moved {
            return Ok(Ok(row.try_into()?));
        }

        let current = sqlx::query_scalar::<_, String>("SELECT state FROM stock_units WHERE id = $1")
            .bind(row_id)
            .fetch_optional(&self.db)
            .await?
            .map(|state| StockState::parse(&state))
            .transpose()?;

        Ok(Err(classify_unapplied(movement, current)))
    }
}
