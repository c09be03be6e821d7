use chrono::{DateTime, Utc};
use model::{user::User, WithId};
use refill::database::Result;
use utility::id::Id;

use crate::data_model::user::UserRow;
use sqlx::{Executor, Postgres};

use super::convert_error;

pub async fn insert<'c, E>(
    executor: E,
    user: &Id<User>,
    token_digest: &str,
    created_at: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO api_tokens(user_id, token_digest, created_at)
        VALUES ($1, $2, $3);
        ",
    )
    .bind(user.raw())
    .bind(token_digest)
    .bind(created_at)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(convert_error)
}

pub async fn user_by_digest<'c, E>(
    executor: E,
    digest: &str,
) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, UserRow>(
        "
        SELECT u.id, u.name, u.email, u.role, u.station_id, u.is_active
        FROM api_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.token_digest = $1;
        ",
    )
    .bind(digest)
    .fetch_one(executor)
    .await
    .map(UserRow::into_with_id)
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, digest: &str) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let _: (String,) = sqlx::query_as(
        "
        DELETE FROM api_tokens
        WHERE token_digest = $1
        RETURNING id;
        ",
    )
    .bind(digest)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

pub async fn delete_for_user<'c, E>(executor: E, user: &Id<User>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        DELETE FROM api_tokens
        WHERE user_id = $1;
        ",
    )
    .bind(user.raw())
    .execute(executor)
    .await
    .map(|result| result.rows_affected())
    .map_err(convert_error)
}
