//! Supply ledger: dispensed, used and returned quantities per supply line

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    normalize_optional, validate_batch_size, validate_not_blank, validate_note,
    BatchReport, DomainError, Encounter, NewSupplyLine, ReturnReason, ReturnRecord, ReturnSource,
    RowFailureReason, StockReturnRow, StockState, SupplyItemFilter, SupplyStatus, SupplyUsageItem,
};

/// Ledger service for supply usage lines and returns
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Database row for a supply line
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SupplyRow {
    id: Uuid,
    usage_id: Uuid,
    patient_id: String,
    episode_id: String,
    department_code: String,
    encounter_at: DateTime<Utc>,
    item_code: String,
    item_description: Option<String>,
    requested_accession: Option<String>,
    qty: i32,
    qty_used_with_patient: i32,
    qty_returned_to_cabinet: i32,
    status: String,
    print_date: NaiveDate,
    discontinued_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SupplyRow> for SupplyUsageItem {
    type Error = DomainError;

    fn try_from(row: SupplyRow) -> Result<Self, Self::Error> {
        let quantities = shared::SupplyQuantities::from_parts(
            row.qty,
            row.qty_used_with_patient,
            row.qty_returned_to_cabinet,
        )?;

        Ok(SupplyUsageItem {
            id: row.id,
            usage_id: row.usage_id,
            encounter: Encounter {
                patient_id: row.patient_id,
                episode_id: row.episode_id,
                department_code: row.department_code,
                encounter_at: row.encounter_at,
            },
            item_code: row.item_code,
            item_description: row.item_description,
            requested_accession: row.requested_accession,
            qty: quantities.qty(),
            qty_used_with_patient: quantities.used_with_patient(),
            qty_returned_to_cabinet: quantities.returned_to_cabinet(),
            qty_pending: quantities.pending(),
            status: SupplyStatus::parse(&row.status)?,
            print_date: row.print_date,
            discontinued_at: row.discontinued_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a return record
#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    id: Uuid,
    supply_item_id: Option<Uuid>,
    stock_unit_id: Option<i64>,
    qty: i32,
    reason: String,
    note: Option<String>,
    returned_by: Uuid,
    returned_at: DateTime<Utc>,
}

impl TryFrom<ReturnRow> for ReturnRecord {
    type Error = DomainError;

    fn try_from(row: ReturnRow) -> Result<Self, Self::Error> {
        Ok(ReturnRecord {
            id: row.id,
            source: ReturnSource::from_columns(row.supply_item_id, row.stock_unit_id)?,
            qty: row.qty,
            reason: ReturnReason::parse(&row.reason)?,
            note: row.note,
            returned_by: row.returned_by,
            returned_at: row.returned_at,
        })
    }
}

/// Input for recording lines dispensed to an encounter
#[derive(Debug, Deserialize)]
pub struct RecordDispensedInput {
    /// Existing usage to add lines to; a new usage id is issued when absent
    pub usage_id: Option<Uuid>,
    pub encounter: Encounter,
    pub print_date: NaiveDate,
    pub items: Vec<NewSupplyLine>,
}

/// Input for recording consumption with the patient
#[derive(Debug, Deserialize)]
pub struct RecordUsedInput {
    pub qty: i32,
}

/// Input for returning part of a line to the cabinet
#[derive(Debug, Deserialize)]
pub struct RecordReturnInput {
    pub qty: i32,
    pub reason: ReturnReason,
    pub note: Option<String>,
}

/// A line after a return, with the appended audit record
#[derive(Debug, Serialize)]
pub struct ItemReturnOutcome {
    pub item: SupplyUsageItem,
    pub record: ReturnRecord,
}

/// Filters for listing return records
#[derive(Debug, Default, Deserialize)]
pub struct ReturnFilter {
    pub supply_item_id: Option<Uuid>,
    pub stock_unit_id: Option<i64>,
}

/// Insert a verified supply line with zeroed counters
pub(crate) async fn insert_supply_line(
    conn: &mut PgConnection,
    usage_id: Uuid,
    encounter: &Encounter,
    print_date: NaiveDate,
    line: &NewSupplyLine,
) -> AppResult<SupplyUsageItem> {
    line.validate()?;

    let row = sqlx::query_as::<_, SupplyRow>(
        r#"
        INSERT INTO supply_usage_items (
            usage_id, patient_id, episode_id, department_code, encounter_at,
            item_code, item_description, requested_accession, qty, status, print_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, usage_id, patient_id, episode_id, department_code, encounter_at,
                  item_code, item_description, requested_accession, qty,
                  qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
                  discontinued_at, created_at, updated_at
        "#,
    )
    .bind(usage_id)
    .bind(&encounter.patient_id)
    .bind(&encounter.episode_id)
    .bind(&encounter.department_code)
    .bind(encounter.encounter_at)
    .bind(line.item_code.trim())
    .bind(&line.item_description)
    .bind(&line.requested_accession)
    .bind(line.qty)
    .bind(SupplyStatus::Verified.as_str())
    .bind(print_date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.try_into()?)
}

/// Lock a supply line for the rest of the transaction
async fn lock_supply_item(conn: &mut PgConnection, supply_item_id: Uuid) -> AppResult<SupplyUsageItem> {
    let row = sqlx::query_as::<_, SupplyRow>(
        r#"
        SELECT id, usage_id, patient_id, episode_id, department_code, encounter_at,
               item_code, item_description, requested_accession, qty,
               qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
               discontinued_at, created_at, updated_at
        FROM supply_usage_items
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(supply_item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DomainError::not_found("Supply item"))?;

    Ok(row.try_into()?)
}

/// Store new counter values on a locked line
async fn store_counters(
    conn: &mut PgConnection,
    supply_item_id: Uuid,
    quantities: &shared::SupplyQuantities,
) -> AppResult<SupplyUsageItem> {
    let row = sqlx::query_as::<_, SupplyRow>(
        r#"
        UPDATE supply_usage_items
        SET qty_used_with_patient = $1, qty_returned_to_cabinet = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING id, usage_id, patient_id, episode_id, department_code, encounter_at,
                  item_code, item_description, requested_accession, qty,
                  qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
                  discontinued_at, created_at, updated_at
        "#,
    )
    .bind(quantities.used_with_patient())
    .bind(quantities.returned_to_cabinet())
    .bind(supply_item_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.try_into()?)
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record supply lines dispensed to a patient encounter
    pub async fn record_dispensed_items(
        &self,
        input: RecordDispensedInput,
    ) -> AppResult<Vec<SupplyUsageItem>> {
        validate_batch_size("items", input.items.len())?;
        validate_not_blank("patient_id", &input.encounter.patient_id)?;
        validate_not_blank("episode_id", &input.encounter.episode_id)?;
        validate_not_blank("department_code", &input.encounter.department_code)?;
        for line in &input.items {
            line.validate()?;
        }

        let usage_id = input.usage_id.unwrap_or_else(Uuid::new_v4);

        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(input.items.len());
        for line in &input.items {
            created.push(
                insert_supply_line(&mut *tx, usage_id, &input.encounter, input.print_date, line)
                    .await?,
            );
        }
        tx.commit().await?;

        tracing::info!(
            usage_id = %usage_id,
            lines = created.len(),
            print_date = %input.print_date,
            "Supply lines dispensed"
        );

        Ok(created)
    }

    /// Account for units consumed with the patient. Not idempotent.
    pub async fn record_item_used_with_patient(
        &self,
        supply_item_id: Uuid,
        qty: i32,
    ) -> AppResult<SupplyUsageItem> {
        let mut tx = self.db.begin().await?;

        let item = lock_supply_item(&mut *tx, supply_item_id).await?;
        item.status.ensure_open()?;

        let mut quantities = item.quantities()?;
        quantities.record_used(qty)?;

        let updated = store_counters(&mut *tx, supply_item_id, &quantities).await?;
        tx.commit().await?;

        tracing::info!(
            supply_item_id = %supply_item_id,
            qty,
            pending = updated.qty_pending,
            "Supply used with patient"
        );

        Ok(updated)
    }

    /// Return unused units of a line to the cabinet and append an audit record
    pub async fn record_item_return(
        &self,
        supply_item_id: Uuid,
        user_id: Uuid,
        input: RecordReturnInput,
    ) -> AppResult<ItemReturnOutcome> {
        validate_note(input.note.as_deref())?;

        let mut tx = self.db.begin().await?;

        let item = lock_supply_item(&mut *tx, supply_item_id).await?;
        item.status.ensure_open()?;

        let mut quantities = item.quantities()?;
        quantities.record_returned(input.qty)?;

        let updated = store_counters(&mut *tx, supply_item_id, &quantities).await?;
        let record = insert_return_record(
            &mut *tx,
            ReturnSource::SupplyItem(supply_item_id),
            input.qty,
            input.reason,
            normalize_optional(input.note),
            user_id,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            supply_item_id = %supply_item_id,
            qty = input.qty,
            reason = input.reason.as_str(),
            pending = updated.qty_pending,
            "Supply returned to cabinet"
        );

        Ok(ItemReturnOutcome {
            item: updated,
            record,
        })
    }

    /// Return physical units straight from a cabinet scan.
    ///
    /// Each row is validated and applied in its own transaction; rejected rows
    /// are reported and do not stop the others.
    pub async fn record_stock_returns(
        &self,
        rows: Vec<StockReturnRow>,
        user_id: Uuid,
    ) -> AppResult<BatchReport<i64, ReturnRecord>> {
        validate_batch_size("rows", rows.len())?;

        let mut report = BatchReport::new();
        for row in rows {
            let unit_id = row.stock_unit_id;
            if let Err(err) = row.validate() {
                tracing::warn!(stock_unit_id = unit_id, "Stock return rejected: {}", err);
                report.reject(unit_id, RowFailureReason::Invalid, err.to_string());
                continue;
            }
            let outcome = self.return_stock_unit(row, user_id).await.map_err(|err| {
                tracing::error!(
                    stock_unit_id = unit_id,
                    applied = report.succeeded.len(),
                    "Stock return aborted: {}",
                    err
                );
                err
            })?;
            if let Err(reason) = &outcome {
                tracing::warn!(stock_unit_id = unit_id, reason = reason.message(), "Stock return rejected");
            }
            report.record(unit_id, outcome);
        }

        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Stock returns processed"
        );

        Ok(report)
    }

    async fn return_stock_unit(
        &self,
        row: StockReturnRow,
        user_id: Uuid,
    ) -> AppResult<Result<ReturnRecord, RowFailureReason>> {
        let mut tx = self.db.begin().await?;

        let unit = sqlx::query_as::<_, (i64, String)>(
            "SELECT stock_id, state FROM stock_units WHERE id = $1 FOR UPDATE",
        )
        .bind(row.stock_unit_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|(stock_id, state)| StockState::parse(&state).map(|state| (stock_id, state)))
        .transpose()?;

        if let Err(reason) = row.check_unit(unit) {
            return Ok(Err(reason));
        }

        sqlx::query(
            r#"
            UPDATE stock_units
            SET state = $1, last_moved_by = $2, last_moved_at = NOW(), version = version + 1
            WHERE id = $3
            "#,
        )
        .bind(StockState::Returned.as_str())
        .bind(user_id)
        .bind(row.stock_unit_id)
        .execute(&mut *tx)
        .await?;

        let record = insert_return_record(
            &mut *tx,
            ReturnSource::StockUnit(row.stock_unit_id),
            1,
            row.reason,
            normalize_optional(row.note),
            user_id,
        )
        .await?;

        tx.commit().await?;

        Ok(Ok(record))
    }

    /// Get a supply line with its pending quantity
    pub async fn get_supply_item(&self, supply_item_id: Uuid) -> AppResult<SupplyUsageItem> {
        let row = sqlx::query_as::<_, SupplyRow>(
            r#"
            SELECT id, usage_id, patient_id, episode_id, department_code, encounter_at,
                   item_code, item_description, requested_accession, qty,
                   qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
                   discontinued_at, created_at, updated_at
            FROM supply_usage_items
            WHERE id = $1
            "#,
        )
        .bind(supply_item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| DomainError::not_found("Supply item"))?;

        Ok(row.try_into()?)
    }

    /// List supply lines
    pub async fn list_supply_items(&self, filter: SupplyItemFilter) -> AppResult<Vec<SupplyUsageItem>> {
        let rows = sqlx::query_as::<_, SupplyRow>(
            r#"
            SELECT id, usage_id, patient_id, episode_id, department_code, encounter_at,
                   item_code, item_description, requested_accession, qty,
                   qty_used_with_patient, qty_returned_to_cabinet, status, print_date,
                   discontinued_at, created_at, updated_at
            FROM supply_usage_items
            WHERE ($1::uuid IS NULL OR usage_id = $1)
              AND ($2::text IS NULL OR patient_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::date IS NULL OR print_date = $4)
            ORDER BY print_date DESC, created_at, id
            "#,
        )
        .bind(filter.usage_id)
        .bind(filter.patient_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.print_date)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| SupplyUsageItem::try_from(row).map_err(AppError::from))
            .collect()
    }

    /// List return records, newest first
    pub async fn list_return_records(&self, filter: ReturnFilter) -> AppResult<Vec<ReturnRecord>> {
        let rows = sqlx::query_as::<_, ReturnRow>(
            r#"
            SELECT id, supply_item_id, stock_unit_id, qty, reason, note, returned_by, returned_at
            FROM return_records
            WHERE ($1::uuid IS NULL OR supply_item_id = $1)
              AND ($2::bigint IS NULL OR stock_unit_id = $2)
            ORDER BY returned_at DESC, id
            "#,
        )
        .bind(filter.supply_item_id)
        .bind(filter.stock_unit_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| ReturnRecord::try_from(row).map_err(AppError::from))
            .collect()
    }
}

/// Append an immutable return record
async fn insert_return_record(
    conn: &mut PgConnection,
    source: ReturnSource,
    qty: i32,
    reason: ReturnReason,
    note: Option<String>,
    user_id: Uuid,
) -> AppResult<ReturnRecord> {
    let row = sqlx::query_as::<_, ReturnRow>(
        r#"
        INSERT INTO return_records (supply_item_id, stock_unit_id, qty, reason, note, returned_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, supply_item_id, stock_unit_id, qty, reason, note, returned_by, returned_at
        "#,
    )
    .bind(source.supply_item_id())
    .bind(source.stock_unit_id())
    .bind(qty)
    .bind(reason.as_str())
    .bind(note)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.try_into()?)
}
