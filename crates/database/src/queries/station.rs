use model::{station::Station, WithId};
use refill::database::{Result, StationFilter, StationSort};
use utility::{
    geo::{self, EARTH_RADIUS_KM},
    id::Id,
};

use crate::data_model::station::StationRow;
use sqlx::{Executor, Postgres};

use super::convert_error;

const COLUMNS: &str = "id, name, address, phone, email, is_available, \
                       is_active, price_per_kg, operating_hours, image, \
                       latitude, longitude";

pub async fn get<'c, E>(executor: E, id: &Id<Station>) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM stations
        WHERE id = $1;
        "
    ))
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(StationRow::into_with_id)
    .map_err(convert_error)
}

fn filter_clause(filter: &StationFilter) -> String {
    let mut clause = String::from("WHERE TRUE");
    if filter.available {
        clause.push_str(" AND is_available = TRUE");
    }
    match filter.assigned {
        Some(true) => clause.push_str(
            " AND EXISTS (
                SELECT 1 FROM station_manager_assignments a
                WHERE a.station_id = stations.id AND a.removed_at IS NULL
            )",
        ),
        Some(false) => clause.push_str(
            " AND NOT EXISTS (
                SELECT 1 FROM station_manager_assignments a
                WHERE a.station_id = stations.id AND a.removed_at IS NULL
            )",
        ),
        None => {}
    }
    clause
}

fn order_clause(sort: StationSort) -> &'static str {
    match sort {
        StationSort::Name => "name ASC",
        StationSort::PricePerKg => "price_per_kg ASC NULLS LAST",
        StationSort::RecentlyUpdated => "updated_at DESC",
    }
}

pub async fn count<'c, E>(executor: E, filter: &StationFilter) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM stations {};",
        filter_clause(filter)
    ))
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(total.max(0) as u64)
}

pub async fn list<'c, E>(
    executor: E,
    filter: &StationFilter,
) -> Result<Vec<WithId<Station>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM stations
        {}
        ORDER BY {}
        LIMIT $1 OFFSET $2;
        ",
        filter_clause(filter),
        order_clause(filter.sort)
    ))
    .bind(filter.page.limit())
    .bind(filter.page.offset())
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(StationRow::into_with_id).collect())
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, station: Station) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        INSERT INTO stations(
            name, address, phone, email, is_available, is_active,
            price_per_kg, operating_hours, image, latitude, longitude
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {COLUMNS};
        "
    ))
    .bind(&station.name)
    .bind(&station.address)
    .bind(&station.phone)
    .bind(&station.email)
    .bind(station.is_available)
    .bind(station.is_active)
    .bind(station.price_per_kg)
    .bind(&station.operating_hours)
    .bind(&station.image)
    .bind(station.latitude)
    .bind(station.longitude)
    .fetch_one(executor)
    .await
    .map(StationRow::into_with_id)
    .map_err(convert_error)
}

pub async fn update<'c, E>(
    executor: E,
    station: WithId<Station>,
) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        UPDATE stations
        SET name = $1,
            address = $2,
            phone = $3,
            email = $4,
            is_available = $5,
            is_active = $6,
            price_per_kg = $7,
            operating_hours = $8,
            image = $9,
            latitude = $10,
            longitude = $11,
            updated_at = now()
        WHERE id = $12
        RETURNING {COLUMNS};
        "
    ))
    .bind(&station.content.name)
    .bind(&station.content.address)
    .bind(&station.content.phone)
    .bind(&station.content.email)
    .bind(station.content.is_available)
    .bind(station.content.is_active)
    .bind(station.content.price_per_kg)
    .bind(&station.content.operating_hours)
    .bind(&station.content.image)
    .bind(station.content.latitude)
    .bind(station.content.longitude)
    .bind(station.id.raw())
    .fetch_one(executor)
    .await
    .map(StationRow::into_with_id)
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, id: &Id<Station>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let _: (String,) = sqlx::query_as(
        "
        DELETE FROM stations
        WHERE id = $1
        RETURNING id;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

pub async fn set_available<'c, E>(
    executor: E,
    id: &Id<Station>,
    is_available: bool,
) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        UPDATE stations
        SET is_available = $2, updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS};
        "
    ))
    .bind(id.raw())
    .bind(is_available)
    .fetch_one(executor)
    .await
    .map(StationRow::into_with_id)
    .map_err(convert_error)
}

pub async fn set_active<'c, E>(
    executor: E,
    id: &Id<Station>,
    is_active: bool,
) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        UPDATE stations
        SET is_active = $2, updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS};
        "
    ))
    .bind(id.raw())
    .bind(is_active)
    .fetch_one(executor)
    .await
    .map(StationRow::into_with_id)
    .map_err(convert_error)
}

pub async fn set_price<'c, E>(
    executor: E,
    id: &Id<Station>,
    price_per_kg: f64,
) -> Result<WithId<Station>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, StationRow>(&format!(
        "
        UPDATE stations
        SET price_per_kg = $2, updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS};
        "
    ))
    .bind(id.raw())
    .bind(price_per_kg)
    .fetch_one(executor)
    .await
    .map(StationRow::into_with_id)
    .map_err(convert_error)
}

/// Coarse nearby candidates: active stations inside the bounding box,
/// prefiltered by the spherical law of cosines. The ACOS argument is
/// clamped against floating point drift past ±1.
pub async fn get_nearby<'c, E>(
    executor: E,
    center_latitude: f64,
    center_longitude: f64,
    radius_km: f64,
) -> Result<Vec<WithId<Station>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let ((min_lat, min_lon), (max_lat, max_lon)) =
        geo::calculate_bounding_box(center_latitude, center_longitude, radius_km);

    sqlx::query_as::<_, StationRow>(&format!(
        "
        WITH distance_calc AS (
            SELECT
                id,
                ($1 * ACOS(LEAST(1.0, GREATEST(-1.0,
                    COS(RADIANS($2)) * COS(RADIANS(latitude)) *
                    COS(RADIANS(longitude) - RADIANS($3)) +
                    SIN(RADIANS($2)) * SIN(RADIANS(latitude))
                )))) AS distance
            FROM
                stations
            WHERE
                is_active = TRUE
                AND latitude BETWEEN $4 AND $5
                AND longitude BETWEEN $6 AND $7
        )
        SELECT {COLUMNS}
        FROM stations
        WHERE
            id IN (
                SELECT id FROM distance_calc WHERE distance <= $8
            );
        "
    ))
    .bind(EARTH_RADIUS_KM)
    .bind(center_latitude)
    .bind(center_longitude)
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lon)
    .bind(max_lon)
    .bind(radius_km)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(StationRow::into_with_id).collect())
    .map_err(convert_error)
}
