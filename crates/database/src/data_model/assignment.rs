use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{assignment::ManagerAssignment, station::Station, user::User, WithId};
use refill::database::{AssignmentRepo, Page, PageRequest, Result};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::assignment, PgDatabaseAutocommit, PgDatabaseTransaction};

#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: String,
    pub manager_id: String,
    pub station_id: String,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removal_reason: Option<String>,
}

impl AssignmentRow {
    pub fn into_with_id(self) -> WithId<ManagerAssignment> {
        WithId::new(
            Id::new(self.id),
            ManagerAssignment {
                manager_id: Id::new(self.manager_id),
                station_id: Id::new(self.station_id),
                assigned_by: Id::new(self.assigned_by),
                assigned_at: self.assigned_at,
                removed_at: self.removed_at,
                removal_reason: self.removal_reason,
            },
        )
    }
}

#[async_trait]
impl AssignmentRepo for PgDatabaseAutocommit {
    async fn active_assignment(
        &mut self,
        station: &Id<Station>,
    ) -> Result<Option<WithId<ManagerAssignment>>> {
        assignment::active_for_station(&self.pool, station).await
    }

    async fn has_active_assignment(
        &mut self,
        manager: &Id<User>,
        station: &Id<Station>,
    ) -> Result<bool> {
        assignment::has_active(&self.pool, manager, station).await
    }

    async fn active_assignment_for_manager(
        &mut self,
        manager: &Id<User>,
    ) -> Result<Option<WithId<ManagerAssignment>>> {
        assignment::active_for_manager(&self.pool, manager).await
    }

    async fn insert_assignment(
        &mut self,
        new_assignment: ManagerAssignment,
    ) -> Result<WithId<ManagerAssignment>> {
        assignment::insert(&self.pool, new_assignment).await
    }

    async fn close_assignment(
        &mut self,
        id: &Id<ManagerAssignment>,
        removed_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<WithId<ManagerAssignment>> {
        assignment::close(&self.pool, id, removed_at, reason).await
    }

    async fn assignment_history(
        &mut self,
        station: &Id<Station>,
        manager: Option<&Id<User>>,
        page: &PageRequest,
    ) -> Result<Page<WithId<ManagerAssignment>>> {
        let total =
            assignment::count_history(&self.pool, station, manager).await?;
        let items =
            assignment::history(&self.pool, station, manager, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}

#[async_trait]
impl<'a> AssignmentRepo for PgDatabaseTransaction<'a> {
    async fn active_assignment(
        &mut self,
        station: &Id<Station>,
    ) -> Result<Option<WithId<ManagerAssignment>>> {
        assignment::active_for_station(&mut *self.tx, station).await
    }

    async fn has_active_assignment(
        &mut self,
        manager: &Id<User>,
        station: &Id<Station>,
    ) -> Result<bool> {
        assignment::has_active(&mut *self.tx, manager, station).await
    }

    async fn active_assignment_for_manager(
        &mut self,
        manager: &Id<User>,
    ) -> Result<Option<WithId<ManagerAssignment>>> {
        assignment::active_for_manager(&mut *self.tx, manager).await
    }

    async fn insert_assignment(
        &mut self,
        new_assignment: ManagerAssignment,
    ) -> Result<WithId<ManagerAssignment>> {
        assignment::insert(&mut *self.tx, new_assignment).await
    }

    async fn close_assignment(
        &mut self,
        id: &Id<ManagerAssignment>,
        removed_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<WithId<ManagerAssignment>> {
        assignment::close(&mut *self.tx, id, removed_at, reason).await
    }

    async fn assignment_history(
        &mut self,
        station: &Id<Station>,
        manager: Option<&Id<User>>,
        page: &PageRequest,
    ) -> Result<Page<WithId<ManagerAssignment>>> {
        let total =
            assignment::count_history(&mut *self.tx, station, manager).await?;
        let items =
            assignment::history(&mut *self.tx, station, manager, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}
