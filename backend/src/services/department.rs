//! Department master-data lookups (read-only)

use shared::{Department, DomainError};

use crate::error::AppResult;

/// Load a department, reporting a missing one as a rule violation
pub(crate) async fn find_department<'e, E>(executor: E, department_id: i64) -> AppResult<Department>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, (i64, String, Option<String>)>(
        "SELECT id, name, ref_code FROM departments WHERE id = $1",
    )
    .bind(department_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DomainError::not_found("Department"))?;

    Ok(Department {
        id: row.0,
        name: row.1,
        ref_code: row.2,
    })
}
