//! Cross-day reconciler: bill cancellation and rebilling
//!
//! Cancelled lines are discontinued with their counters frozen so the old
//! print date's reports keep them; replacement lines are created on the new
//! print date. Both happen in one transaction.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{insert_supply_line, SupplyRow};
use shared::{
    CancelBillOutcome, CancelBillPlan, CancelBillRequest, DomainError, SupplyStatus,
    SupplyUsageItem,
};

/// Reconciler service for bill corrections
#[derive(Clone)]
pub struct ReconcilerService {
    db: PgPool,
}

impl ReconcilerService {
    /// Create a new ReconcilerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Discontinue lines of a bill and create their replacements
    pub async fn handle_cancel_bill(
        &self,
        usage_id: Uuid,
        user_id: Uuid,
        request: CancelBillRequest,
    ) -> AppResult<CancelBillOutcome> {
        let plan = CancelBillPlan::from_request(request)?;

        let mut tx = self.db.begin().await?;

        let locked = sqlx::query_as::<_, SupplyRow>(
            r#"
            SELECT id, usage_id, patient_id, episode_id, department_code, encounter_at,
                   item_code, item_description, requested_accession, qty,
                   qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
                   discontinued_at, created_at, updated_at
            FROM supply_usage_items
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&plan.discontinue)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| SupplyUsageItem::try_from(row).map_err(AppError::from))
        .collect::<AppResult<Vec<_>>>()?;

        plan.check_lines(usage_id, &locked)?;

        let encounter = locked
            .first()
            .map(|line| line.encounter.clone())
            .ok_or_else(|| DomainError::not_found("Supply item"))?;

        let discontinued = sqlx::query_as::<_, SupplyRow>(
            r#"
            UPDATE supply_usage_items
            SET status = $1, discontinued_at = NOW(), discontinued_by = $2, updated_at = NOW()
            WHERE id = ANY($3)
            RETURNING id, usage_id, patient_id, episode_id, department_code, encounter_at,
                      item_code, item_description, requested_accession, qty,
                      qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
                      discontinued_at, created_at, updated_at
            "#,
        )
        .bind(SupplyStatus::Discontinued.as_str())
        .bind(user_id)
        .bind(&plan.discontinue)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| SupplyUsageItem::try_from(row).map_err(AppError::from))
        .collect::<AppResult<Vec<_>>>()?;

        let mut replacements = Vec::with_capacity(plan.replacements.len());
        for line in &plan.replacements {
            replacements.push(
                insert_supply_line(&mut *tx, usage_id, &encounter, plan.new_print_date, line).await?,
            );
        }

        tx.commit().await?;

        tracing::info!(
            usage_id = %usage_id,
            user_id = %user_id,
            discontinued = discontinued.len(),
            replacements = replacements.len(),
            old_print_date = %plan.old_print_date,
            new_print_date = %plan.new_print_date,
            "Bill cancelled"
        );

        Ok(CancelBillOutcome {
            usage_id,
            same_day: plan.is_same_day(),
            discontinued,
            replacements,
        })
    }
}
