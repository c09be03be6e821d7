use model::{visit::Visit, WithId};
use refill::database::Result;
use utility::id::IdWrapper;

use crate::data_model::visit::VisitRow;
use sqlx::{Executor, Postgres};

use super::convert_error;

const COLUMNS: &str = "id, ip_address, url, method, user_agent, device_type, \
                       browser, os, user_id, response_code, response_time_ms";

pub async fn insert<'c, E>(executor: E, visit: Visit) -> Result<WithId<Visit>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, VisitRow>(&format!(
        "
        INSERT INTO visits(
            ip_address, url, method, user_agent, device_type,
            browser, os, user_id, response_code, response_time_ms
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS};
        "
    ))
    .bind(&visit.ip_address)
    .bind(&visit.url)
    .bind(&visit.method)
    .bind(&visit.user_agent)
    .bind(&visit.device_type)
    .bind(&visit.browser)
    .bind(&visit.os)
    .bind(visit.user_id.raw())
    .bind(visit.response_code.map(|code| code as i32))
    .bind(visit.response_time_ms.map(|ms| ms as i32))
    .fetch_one(executor)
    .await
    .map(VisitRow::into_with_id)
    .map_err(convert_error)
}
