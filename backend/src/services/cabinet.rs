//! Cabinet registry: identity, code generation and retirement

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::CabinetConfig;
use crate::error::{AppError, AppResult};
use crate::services::department::find_department;
use shared::{
    contains_pattern, escape_like, generate_cabinet_code, next_free_cabinet_code,
    next_stock_sequence, normalize_optional, validate_stock_id, Cabinet, CabinetStatus,
    DomainError, MappingStatus,
};

/// Advisory lock key serializing stock id allocation
const STOCK_SEQUENCE_LOCK: i64 = 0x4d53_4943_4142;

/// Cabinet registry service
#[derive(Clone)]
pub struct CabinetService {
    db: PgPool,
    settings: CabinetConfig,
}

/// Database row for a cabinet
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CabinetRow {
    id: Uuid,
    code: String,
    name: Option<String>,
    cabinet_type: Option<String>,
    stock_id: i64,
    status: String,
    retired_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CabinetRow> for Cabinet {
    type Error = DomainError;

    fn try_from(row: CabinetRow) -> Result<Self, Self::Error> {
        Ok(Cabinet {
            id: row.id,
            code: row.code,
            name: row.name,
            cabinet_type: row.cabinet_type,
            stock_id: row.stock_id,
            status: CabinetStatus::parse(&row.status)?,
            retired_at: row.retired_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a cabinet
#[derive(Debug, Default, Deserialize)]
pub struct CreateCabinetInput {
    pub name: Option<String>,
    pub cabinet_type: Option<String>,
    /// Explicit human code; generated when absent
    pub code: Option<String>,
    /// Explicit legacy stock id; allocated when absent
    pub stock_id: Option<i64>,
    /// Department to assign the new cabinet to
    pub department_id: Option<i64>,
    pub note: Option<String>,
}

/// Filters for listing cabinets
#[derive(Debug, Default, Deserialize)]
pub struct CabinetFilter {
    pub status: Option<CabinetStatus>,
    pub keyword: Option<String>,
    #[serde(default)]
    pub include_retired: bool,
}

/// Lock a live cabinet row for the rest of the transaction
pub(crate) async fn lock_cabinet(conn: &mut PgConnection, cabinet_id: Uuid) -> AppResult<Cabinet> {
    let row = sqlx::query_as::<_, CabinetRow>(
        r#"
        SELECT id, code, name, cabinet_type, stock_id, status, retired_at, created_at, updated_at
        FROM cabinets
        WHERE id = $1 AND retired_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(cabinet_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DomainError::not_found("Cabinet"))?;

    Ok(row.try_into()?)
}

impl CabinetService {
    /// Create a new CabinetService instance
    pub fn new(db: PgPool, settings: CabinetConfig) -> Self {
        Self { db, settings }
    }

    /// Create a cabinet, optionally assigning it to a department in the same transaction
    pub async fn create_cabinet(&self, input: CreateCabinetInput) -> AppResult<Cabinet> {
        if let Some(stock_id) = input.stock_id {
            validate_stock_id(stock_id)?;
        }
        shared::validate_note(input.note.as_deref())?;

        let mut tx = self.db.begin().await?;

        // Serialize stock id allocation across concurrent creates
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(STOCK_SEQUENCE_LOCK)
            .execute(&mut *tx)
            .await?;

        let department = match input.department_id {
            Some(department_id) => Some(find_department(&mut *tx, department_id).await?),
            None => None,
        };

        let segment = department.as_ref().and_then(|d| d.code_segment());
        let explicit_code = normalize_optional(input.code);

        let (stock_id, code) = match input.stock_id {
            Some(stock_id) => {
                let taken = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM cabinets WHERE stock_id = $1)",
                )
                .bind(stock_id)
                .fetch_one(&mut *tx)
                .await?;

                if taken {
                    return Err(DomainError::validation(
                        "stock_id",
                        "Stock id already assigned to another cabinet",
                    )
                    .into());
                }

                let code = match explicit_code {
                    Some(code) => code,
                    None => {
                        let code = generate_cabinet_code(
                            &self.settings.hospital_prefix,
                            segment.as_deref(),
                            stock_id,
                            self.settings.sequence_width,
                        );
                        if self.taken_codes(&mut *tx).await?.contains(&code) {
                            return Err(DomainError::validation(
                                "code",
                                format!("Cabinet code {} already exists; supply a code", code),
                            )
                            .into());
                        }
                        code
                    }
                };
                (stock_id, code)
            }
            None => {
                let current_max =
                    sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(stock_id) FROM cabinets")
                        .fetch_one(&mut *tx)
                        .await?;
                let start = next_stock_sequence(current_max)?;

                match explicit_code {
                    Some(code) => (start, code),
                    None => next_free_cabinet_code(
                        &self.settings.hospital_prefix,
                        segment.as_deref(),
                        start,
                        self.settings.sequence_width,
                        &self.taken_codes(&mut *tx).await?,
                    )?,
                }
            }
        };

        let status = CabinetStatus::derive(i64::from(department.is_some()));

        let row = sqlx::query_as::<_, CabinetRow>(
            r#"
            INSERT INTO cabinets (code, name, cabinet_type, stock_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, code, name, cabinet_type, stock_id, status, retired_at, created_at, updated_at
            "#,
        )
        .bind(&code)
        .bind(normalize_optional(input.name))
        .bind(normalize_optional(input.cabinet_type))
        .bind(stock_id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(department) = &department {
            sqlx::query(
                r#"
                INSERT INTO cabinet_department_mappings (cabinet_id, department_id, status, note)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(row.id)
            .bind(department.id)
            .bind(MappingStatus::Active.as_str())
            .bind(normalize_optional(input.note))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            cabinet_id = %row.id,
            code = %code,
            stock_id,
            department_id = ?department.as_ref().map(|d| d.id),
            "Cabinet created"
        );

        Ok(row.try_into()?)
    }

    /// Codes already in use under the configured prefix
    async fn taken_codes(&self, conn: &mut PgConnection) -> AppResult<HashSet<String>> {
        let pattern = format!("{}-%", escape_like(&self.settings.hospital_prefix));
        let codes = sqlx::query_scalar::<_, String>("SELECT code FROM cabinets WHERE code LIKE $1")
            .bind(pattern)
            .fetch_all(&mut *conn)
            .await?;

        Ok(codes.into_iter().collect())
    }

    /// Get a cabinet by ID, retired or not
    pub async fn get_cabinet(&self, cabinet_id: Uuid) -> AppResult<Cabinet> {
        let row = sqlx::query_as::<_, CabinetRow>(
            r#"
            SELECT id, code, name, cabinet_type, stock_id, status, retired_at, created_at, updated_at
            FROM cabinets
            WHERE id = $1
            "#,
        )
        .bind(cabinet_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| DomainError::not_found("Cabinet"))?;

        Ok(row.try_into()?)
    }

    /// List cabinets
    pub async fn list_cabinets(&self, filter: CabinetFilter) -> AppResult<Vec<Cabinet>> {
        let keyword = contains_pattern(filter.keyword.as_deref());

        let rows = sqlx::query_as::<_, CabinetRow>(
            r#"
            SELECT id, code, name, cabinet_type, stock_id, status, retired_at, created_at, updated_at
            FROM cabinets
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR code ILIKE $2 OR name ILIKE $2 OR cabinet_type ILIKE $2)
              AND ($3 OR retired_at IS NULL)
            ORDER BY code, id
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(keyword)
        .bind(filter.include_retired)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| Cabinet::try_from(row).map_err(AppError::from))
            .collect()
    }

    /// Soft-retire a cabinet; rejected while any mapping still references it
    pub async fn retire_cabinet(&self, cabinet_id: Uuid) -> AppResult<Cabinet> {
        let mut tx = self.db.begin().await?;

        lock_cabinet(&mut *tx, cabinet_id).await?;

        let mappings = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cabinet_department_mappings WHERE cabinet_id = $1",
        )
        .bind(cabinet_id)
        .fetch_one(&mut *tx)
        .await?;

        if mappings > 0 {
            return Err(DomainError::CabinetInUse.into());
        }

        let row = sqlx::query_as::<_, CabinetRow>(
            r#"
            UPDATE cabinets
            SET retired_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, code, name, cabinet_type, stock_id, status, retired_at, created_at, updated_at
            "#,
        )
        .bind(cabinet_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(cabinet_id = %cabinet_id, "Cabinet retired");

        Ok(row.try_into()?)
    }
}
