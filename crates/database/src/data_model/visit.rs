use async_trait::async_trait;
use model::{visit::Visit, WithId};
use refill::database::{Result, VisitRepo};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::visit, PgDatabaseAutocommit, PgDatabaseTransaction};

#[derive(Debug, Clone, FromRow)]
pub struct VisitRow {
    pub id: String,
    pub ip_address: String,
    pub url: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub user_id: Option<String>,
    pub response_code: Option<i32>,
    pub response_time_ms: Option<i32>,
}

impl VisitRow {
    pub fn into_with_id(self) -> WithId<Visit> {
        WithId::new(
            Id::new(self.id),
            Visit {
                ip_address: self.ip_address,
                url: self.url,
                method: self.method,
                user_agent: self.user_agent,
                device_type: self.device_type,
                browser: self.browser,
                os: self.os,
                user_id: self.user_id.map(Id::new),
                response_code: self.response_code.map(|code| code as u16),
                response_time_ms: self.response_time_ms.map(|ms| ms as u32),
            },
        )
    }
}

#[async_trait]
impl VisitRepo for PgDatabaseAutocommit {
    async fn insert_visit(&mut self, new_visit: Visit) -> Result<WithId<Visit>> {
        visit::insert(&self.pool, new_visit).await
    }
}

#[async_trait]
impl<'a> VisitRepo for PgDatabaseTransaction<'a> {
    async fn insert_visit(&mut self, new_visit: Visit) -> Result<WithId<Visit>> {
        visit::insert(&mut *self.tx, new_visit).await
    }
}
