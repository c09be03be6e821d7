use model::{user::User, WithId};
use refill::database::{Credentials, ManagerFilter, Result};
use utility::id::Id;

use crate::data_model::user::{CredentialsRow, UserRow};
use sqlx::{Executor, Postgres};

use super::convert_error;

const COLUMNS: &str = "id, name, email, role, station_id, is_active";

pub async fn get<'c, E>(executor: E, id: &Id<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM users
        WHERE id = $1;
        "
    ))
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(UserRow::into_with_id)
    .map_err(convert_error)
}

fn manager_clause(filter: &ManagerFilter) -> &'static str {
    if filter.active_only {
        "WHERE role = 'station' AND is_active = TRUE
         AND (name ILIKE $1 OR email ILIKE $1)"
    } else {
        "WHERE role = 'station'
         AND (name ILIKE $1 OR email ILIKE $1)"
    }
}

fn search_pattern(filter: &ManagerFilter) -> String {
    match &filter.search {
        Some(search) => format!("%{search}%"),
        None => "%".to_owned(),
    }
}

pub async fn count_managers<'c, E>(
    executor: E,
    filter: &ManagerFilter,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM users {};",
        manager_clause(filter)
    ))
    .bind(search_pattern(filter))
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(total.max(0) as u64)
}

pub async fn list_managers<'c, E>(
    executor: E,
    filter: &ManagerFilter,
) -> Result<Vec<WithId<User>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!(
        "
        SELECT {COLUMNS}
        FROM users
        {}
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3;
        ",
        manager_clause(filter)
    ))
    .bind(search_pattern(filter))
    .bind(filter.page.limit())
    .bind(filter.page.offset())
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(UserRow::into_with_id).collect())
    .map_err(convert_error)
}

pub async fn insert<'c, E>(
    executor: E,
    user: User,
    password_hash: String,
) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!(
        "
        INSERT INTO users(name, email, password_hash, role, station_id, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS};
        "
    ))
    .bind(&user.name)
    .bind(&user.email)
    .bind(password_hash)
    .bind(UserRow::role_to_db(user.role))
    .bind(user.station_id.as_ref().map(|id| id.raw()))
    .bind(user.is_active)
    .fetch_one(executor)
    .await
    .map(UserRow::into_with_id)
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, user: WithId<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(&format!(
        "
        UPDATE users
        SET name = $1,
            email = $2,
            role = $3,
            station_id = $4,
            is_active = $5,
            updated_at = now()
        WHERE id = $6
        RETURNING {COLUMNS};
        "
    ))
    .bind(&user.content.name)
    .bind(&user.content.email)
    .bind(UserRow::role_to_db(user.content.role))
    .bind(user.content.station_id.as_ref().map(|id| id.raw()))
    .bind(user.content.is_active)
    .bind(user.id.raw())
    .fetch_one(executor)
    .await
    .map(UserRow::into_with_id)
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, id: &Id<User>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let _: (String,) = sqlx::query_as(
        "
        DELETE FROM users
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

pub async fn credentials_by_email<'c, E>(
    executor: E,
    email: &str,
) -> Result<Credentials>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CredentialsRow>(&format!(
        "
        SELECT {COLUMNS}, password_hash
        FROM users
        WHERE email = $1;
        "
    ))
    .bind(email)
    .fetch_one(executor)
    .await
    .map(CredentialsRow::into_credentials)
    .map_err(convert_error)
}
