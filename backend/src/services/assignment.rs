//! Assignment manager: cabinet-to-department mappings
//!
//! A cabinet is held by at most one mapping. After every mapping change the
//! affected cabinets' status is re-derived from their mapping count inside the
//! same transaction, with the cabinet rows locked.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::cabinet::lock_cabinet;
use crate::services::department::find_department;
use shared::{
    cabinet_lock_order, ensure_cabinet_free, normalize_optional, validate_note,
    CabinetDepartmentMapping, CabinetStatus, DomainError, MappingFilter, MappingOverview,
    MappingStatus, MappingUpdatePlan,
};

/// Assignment service for cabinet-department mappings
#[derive(Clone)]
pub struct AssignmentService {
    db: PgPool,
}

/// Database row for a mapping
#[derive(Debug, sqlx::FromRow)]
struct MappingRow {
    id: Uuid,
    cabinet_id: Uuid,
    department_id: i64,
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MappingRow> for CabinetDepartmentMapping {
    type Error = DomainError;

    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        Ok(CabinetDepartmentMapping {
            id: row.id,
            cabinet_id: row.cabinet_id,
            department_id: row.department_id,
            status: MappingStatus::parse(&row.status)?,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row for the mapping listing with stock counts
#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    id: Uuid,
    cabinet_id: Uuid,
    department_id: i64,
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cabinet_code: String,
    cabinet_name: Option<String>,
    department_name: String,
    in_cabinet_count: i64,
    dispensed_count: i64,
}

impl TryFrom<OverviewRow> for MappingOverview {
    type Error = DomainError;

    fn try_from(row: OverviewRow) -> Result<Self, Self::Error> {
        Ok(MappingOverview {
            mapping: CabinetDepartmentMapping {
                id: row.id,
                cabinet_id: row.cabinet_id,
                department_id: row.department_id,
                status: MappingStatus::parse(&row.status)?,
                note: row.note,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            cabinet_code: row.cabinet_code,
            cabinet_name: row.cabinet_name,
            department_name: row.department_name,
            in_cabinet_count: row.in_cabinet_count,
            dispensed_count: row.dispensed_count,
        })
    }
}

/// Input for creating a mapping
#[derive(Debug, Deserialize)]
pub struct CreateMappingInput {
    pub cabinet_id: Uuid,
    pub department_id: i64,
    pub status: Option<MappingStatus>,
    pub note: Option<String>,
}

/// Input for updating a mapping; absent status/note keep their current value
#[derive(Debug, Deserialize)]
pub struct UpdateMappingInput {
    pub cabinet_id: Uuid,
    pub department_id: i64,
    pub status: Option<MappingStatus>,
    pub note: Option<String>,
}

/// Count mappings referencing a cabinet, optionally ignoring one mapping
async fn count_mappings(
    conn: &mut PgConnection,
    cabinet_id: Uuid,
    excluding: Option<Uuid>,
) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM cabinet_department_mappings
        WHERE cabinet_id = $1 AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(cabinet_id)
    .bind(excluding)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Re-derive and store a cabinet's status from its current mapping count.
///
/// The caller must hold the cabinet row lock.
pub(crate) async fn sync_cabinet_status(
    conn: &mut PgConnection,
    cabinet_id: Uuid,
) -> AppResult<CabinetStatus> {
    let status = CabinetStatus::derive(count_mappings(conn, cabinet_id, None).await?);

    sqlx::query(
        "UPDATE cabinets SET status = $1, updated_at = NOW() WHERE id = $2 AND status <> $1",
    )
    .bind(status.as_str())
    .bind(cabinet_id)
    .execute(&mut *conn)
    .await?;

    Ok(status)
}

impl AssignmentService {
    /// Create a new AssignmentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Assign a free cabinet to a department
    pub async fn create_mapping(&self, input: CreateMappingInput) -> AppResult<CabinetDepartmentMapping> {
        validate_note(input.note.as_deref())?;

        let mut tx = self.db.begin().await?;

        lock_cabinet(&mut *tx, input.cabinet_id).await?;
        find_department(&mut *tx, input.department_id).await?;

        ensure_cabinet_free(count_mappings(&mut *tx, input.cabinet_id, None).await?)?;

        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            INSERT INTO cabinet_department_mappings (cabinet_id, department_id, status, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, cabinet_id, department_id, status, note, created_at, updated_at
            "#,
        )
        .bind(input.cabinet_id)
        .bind(input.department_id)
        .bind(input.status.unwrap_or_default().as_str())
        .bind(normalize_optional(input.note))
        .fetch_one(&mut *tx)
        .await?;

        let status = sync_cabinet_status(&mut *tx, input.cabinet_id).await?;

        tx.commit().await?;

        tracing::info!(
            mapping_id = %row.id,
            cabinet_id = %input.cabinet_id,
            department_id = input.department_id,
            cabinet_status = %status,
            "Cabinet assigned"
        );

        Ok(row.try_into()?)
    }

    /// Update a mapping, swapping cabinets when the target differs
    pub async fn update_mapping(
        &self,
        mapping_id: Uuid,
        input: UpdateMappingInput,
    ) -> AppResult<CabinetDepartmentMapping> {
        validate_note(input.note.as_deref())?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT id, cabinet_id, department_id, status, note, created_at, updated_at
            FROM cabinet_department_mappings
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(mapping_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("Mapping"))?;

        find_department(&mut *tx, input.department_id).await?;

        // Lock both cabinets in a fixed order so concurrent swaps cannot deadlock
        for cabinet_id in cabinet_lock_order(current.cabinet_id, input.cabinet_id) {
            lock_cabinet(&mut *tx, cabinet_id).await?;
        }

        let others = count_mappings(&mut *tx, input.cabinet_id, Some(mapping_id)).await?;
        let plan = MappingUpdatePlan::decide(current.cabinet_id, input.cabinet_id, others)?;

        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            UPDATE cabinet_department_mappings
            SET cabinet_id = $1, department_id = $2,
                status = COALESCE($3, status), note = COALESCE($4, note), updated_at = NOW()
            WHERE id = $5
            RETURNING id, cabinet_id, department_id, status, note, created_at, updated_at
            "#,
        )
        .bind(input.cabinet_id)
        .bind(input.department_id)
        .bind(input.status.map(|s| s.as_str()))
        .bind(normalize_optional(input.note))
        .bind(mapping_id)
        .fetch_one(&mut *tx)
        .await?;

        match plan {
            MappingUpdatePlan::SameCabinet { cabinet_id } => {
                sync_cabinet_status(&mut *tx, cabinet_id).await?;
            }
            MappingUpdatePlan::Swap { from, to } => {
                let to_status = sync_cabinet_status(&mut *tx, to).await?;
                let from_status = sync_cabinet_status(&mut *tx, from).await?;
                tracing::info!(
                    mapping_id = %mapping_id,
                    from = %from,
                    from_status = %from_status,
                    to = %to,
                    to_status = %to_status,
                    "Mapping moved to another cabinet"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(mapping_id = %mapping_id, swap = plan.is_swap(), "Mapping updated");

        Ok(row.try_into()?)
    }

    /// Delete a mapping and free its cabinet when nothing else holds it
    pub async fn delete_mapping(&self, mapping_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let cabinet_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT cabinet_id FROM cabinet_department_mappings WHERE id = $1 FOR UPDATE",
        )
        .bind(mapping_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("Mapping"))?;

        lock_cabinet(&mut *tx, cabinet_id).await?;

        sqlx::query("DELETE FROM cabinet_department_mappings WHERE id = $1")
            .bind(mapping_id)
            .execute(&mut *tx)
            .await?;

        let status = sync_cabinet_status(&mut *tx, cabinet_id).await?;

        tx.commit().await?;

        tracing::info!(
            mapping_id = %mapping_id,
            cabinet_id = %cabinet_id,
            cabinet_status = %status,
            "Mapping deleted"
        );

        Ok(())
    }

    /// Get one mapping with its stock counts
    pub async fn get_mapping(&self, mapping_id: Uuid) -> AppResult<MappingOverview> {
        let filter = MappingFilter::default();
        self.query_overview(&filter, Some(mapping_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found("Mapping").into())
    }

    /// List mappings with per-cabinet stock counts. Read-only.
    pub async fn list_mappings(&self, filter: MappingFilter) -> AppResult<Vec<MappingOverview>> {
        self.query_overview(&filter, None).await
    }

    async fn query_overview(
        &self,
        filter: &MappingFilter,
        mapping_id: Option<Uuid>,
    ) -> AppResult<Vec<MappingOverview>> {
        let rows = sqlx::query_as::<_, OverviewRow>(
            r#"
            SELECT m.id, m.cabinet_id, m.department_id, m.status, m.note, m.created_at, m.updated_at,
                   c.code AS cabinet_code, c.name AS cabinet_name, d.name AS department_name,
                   COUNT(s.id) FILTER (WHERE s.state = 'in_cabinet') AS in_cabinet_count,
                   COUNT(s.id) FILTER (WHERE s.state = 'dispensed') AS dispensed_count
            FROM cabinet_department_mappings m
            JOIN cabinets c ON c.id = m.cabinet_id
            JOIN departments d ON d.id = m.department_id
            LEFT JOIN stock_units s ON s.stock_id = c.stock_id
            WHERE ($1::uuid IS NULL OR m.id = $1)
              AND ($2::uuid IS NULL OR m.cabinet_id = $2)
              AND ($3::bigint IS NULL OR m.department_id = $3)
              AND ($4::text IS NULL OR m.status = $4)
              AND ($5::text IS NULL OR c.code ILIKE $5 OR c.name ILIKE $5
                   OR d.name ILIKE $5 OR m.note ILIKE $5)
            GROUP BY m.id, c.id, d.id
            ORDER BY m.created_at, m.id
            "#,
        )
        .bind(mapping_id)
        .bind(filter.cabinet_id)
        .bind(filter.department_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.keyword_pattern())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| MappingOverview::try_from(row).map_err(AppError::from))
            .collect()
    }
}
