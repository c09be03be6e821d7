use chrono::{DateTime, Utc};
use model::{assignment::ManagerAssignment, station::Station, user::User, WithId};
use refill::database::{PageRequest, Result};
use utility::id::Id;

use crate::data_model::assignment::AssignmentRow;
use sqlx::{Executor, Postgres};

use super::convert_error;

const COLUMNS: &str = "id, manager_id, station_id, assigned_by, assigned_at, \
                       removed_at, removal_reason";

pub async fn active_for_station<'c, E>(
    executor: E,
    station: &Id<Station>,
) -> Result<Option<WithId<ManagerAssignment>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AssignmentRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM station_manager_assignments
        WHERE station_id = $1 AND removed_at IS NULL;
        "
    ))
    .bind(station.raw())
    .fetch_optional(executor)
    .await
    .map(|row| row.map(AssignmentRow::into_with_id))
    .map_err(convert_error)
}

pub async fn has_active<'c, E>(
    executor: E,
    manager: &Id<User>,
    station: &Id<Station>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT EXISTS (
            SELECT 1
            FROM station_manager_assignments
            WHERE manager_id = $1
              AND station_id = $2
              AND removed_at IS NULL
        );
        ",
    )
    .bind(manager.raw())
    .bind(station.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

pub async fn active_for_manager<'c, E>(
    executor: E,
    manager: &Id<User>,
) -> Result<Option<WithId<ManagerAssignment>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AssignmentRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM station_manager_assignments
        WHERE manager_id = $1 AND removed_at IS NULL
        ORDER BY assigned_at DESC
        LIMIT 1;
        "
    ))
    .bind(manager.raw())
    .fetch_optional(executor)
    .await
    .map(|row| row.map(AssignmentRow::into_with_id))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(
    executor: E,
    assignment: ManagerAssignment,
) -> Result<WithId<ManagerAssignment>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AssignmentRow>(&format!(
        "
        INSERT INTO station_manager_assignments(
            manager_id, station_id, assigned_by, assigned_at,
            removed_at, removal_reason
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS};
        "
    ))
    .bind(assignment.manager_id.raw())
    .bind(assignment.station_id.raw())
    .bind(assignment.assigned_by.raw())
    .bind(assignment.assigned_at)
    .bind(assignment.removed_at)
    .bind(&assignment.removal_reason)
    .fetch_one(executor)
    .await
    .map(AssignmentRow::into_with_id)
    .map_err(convert_error)
}

/// Closes a row that is still active. The `removed_at IS NULL` guard
/// makes a lost race surface as NotFound instead of double-closing.
pub async fn close<'c, E>(
    executor: E,
    id: &Id<ManagerAssignment>,
    removed_at: DateTime<Utc>,
    reason: &str,
) -> Result<WithId<ManagerAssignment>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AssignmentRow>(&format!(
        "
        UPDATE station_manager_assignments
        SET removed_at = $2, removal_reason = $3
        WHERE id = $1 AND removed_at IS NULL
        RETURNING {COLUMNS};
        "
    ))
    .bind(id.raw())
    .bind(removed_at)
    .bind(reason)
    .fetch_one(executor)
    .await
    .map(AssignmentRow::into_with_id)
    .map_err(convert_error)
}

// The optional manager filter is folded into the query: a NULL second
// parameter matches every row.
const HISTORY_CLAUSE: &str =
    "WHERE station_id = $1 AND ($2::text IS NULL OR manager_id = $2)";

pub async fn count_history<'c, E>(
    executor: E,
    station: &Id<Station>,
    manager: Option<&Id<User>>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM station_manager_assignments {HISTORY_CLAUSE};"
    ))
    .bind(station.raw())
    .bind(manager.map(|id| id.raw()))
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(total.max(0) as u64)
}

pub async fn history<'c, E>(
    executor: E,
    station: &Id<Station>,
    manager: Option<&Id<User>>,
    page: &PageRequest,
) -> Result<Vec<WithId<ManagerAssignment>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AssignmentRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM station_manager_assignments
        {HISTORY_CLAUSE}
        ORDER BY assigned_at DESC
        LIMIT $3 OFFSET $4;
        "
    ))
    .bind(station.raw())
    .bind(manager.map(|id| id.raw()))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(AssignmentRow::into_with_id).collect())
    .map_err(convert_error)
}
