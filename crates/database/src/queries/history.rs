use model::{
    history::{AvailabilityLogEntry, PriceHistoryEntry},
    station::Station,
    WithId,
};
use refill::database::{PageRequest, Result};
use utility::id::{Id, IdWrapper};

use crate::data_model::history::{AvailabilityLogRow, PriceHistoryRow};
use sqlx::{Executor, Postgres};

use super::convert_error;

const AVAILABILITY_COLUMNS: &str =
    "id, station_id, is_available, changed_by, changed_at";

const PRICE_COLUMNS: &str =
    "id, station_id, price_per_kg, effective_from, updated_by";

pub async fn insert_availability_log<'c, E>(
    executor: E,
    entry: AvailabilityLogEntry,
) -> Result<WithId<AvailabilityLogEntry>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AvailabilityLogRow>(&format!(
        "
        INSERT INTO station_availability_log(
            station_id, is_available, changed_by, changed_at
        )
        VALUES ($1, $2, $3, $4)
        RETURNING {AVAILABILITY_COLUMNS};
        "
    ))
    .bind(entry.station_id.raw())
    .bind(entry.is_available)
    .bind(entry.changed_by.raw())
    .bind(entry.changed_at)
    .fetch_one(executor)
    .await
    .map(AvailabilityLogRow::into_with_id)
    .map_err(convert_error)
}

pub async fn count_availability_log<'c, E>(
    executor: E,
    station: &Id<Station>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM station_availability_log WHERE station_id = $1;",
    )
    .bind(station.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(total.max(0) as u64)
}

pub async fn availability_log<'c, E>(
    executor: E,
    station: &Id<Station>,
    page: &PageRequest,
) -> Result<Vec<WithId<AvailabilityLogEntry>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, AvailabilityLogRow>(&format!(
        "
        SELECT {AVAILABILITY_COLUMNS}
        FROM station_availability_log
        WHERE station_id = $1
        ORDER BY changed_at DESC
        LIMIT $2 OFFSET $3;
        "
    ))
    .bind(station.raw())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await
    .map(|rows| {
        rows.into_iter()
            .map(AvailabilityLogRow::into_with_id)
            .collect()
    })
    .map_err(convert_error)
}

pub async fn insert_price_entry<'c, E>(
    executor: E,
    entry: PriceHistoryEntry,
) -> Result<WithId<PriceHistoryEntry>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, PriceHistoryRow>(&format!(
        "
        INSERT INTO price_history(
            station_id, price_per_kg, effective_from, updated_by
        )
        VALUES ($1, $2, $3, $4)
        RETURNING {PRICE_COLUMNS};
        "
    ))
    .bind(entry.station_id.raw())
    .bind(entry.price_per_kg)
    .bind(entry.effective_from)
    .bind(entry.updated_by.raw())
    .fetch_one(executor)
    .await
    .map(PriceHistoryRow::into_with_id)
    .map_err(convert_error)
}

pub async fn count_price_history<'c, E>(
    executor: E,
    station: &Id<Station>,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM price_history WHERE station_id = $1;",
    )
    .bind(station.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(total.max(0) as u64)
}

pub async fn price_history<'c, E>(
    executor: E,
    station: &Id<Station>,
    page: &PageRequest,
) -> Result<Vec<WithId<PriceHistoryEntry>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, PriceHistoryRow>(&format!(
        "
        SELECT {PRICE_COLUMNS}
        FROM price_history
        WHERE station_id = $1
        ORDER BY effective_from DESC
        LIMIT $2 OFFSET $3;
        "
    ))
    .bind(station.raw())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(PriceHistoryRow::into_with_id).collect())
    .map_err(convert_error)
}
