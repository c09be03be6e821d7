use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    history::{AvailabilityLogEntry, PriceHistoryEntry},
    station::Station,
    WithId,
};
use refill::database::{HistoryRepo, Page, PageRequest, Result};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::history, PgDatabaseAutocommit, PgDatabaseTransaction};

#[derive(Debug, Clone, FromRow)]
pub struct AvailabilityLogRow {
    pub id: String,
    pub station_id: String,
    pub is_available: bool,
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl AvailabilityLogRow {
    pub fn into_with_id(self) -> WithId<AvailabilityLogEntry> {
        WithId::new(
            Id::new(self.id),
            AvailabilityLogEntry {
                station_id: Id::new(self.station_id),
                is_available: self.is_available,
                changed_by: self.changed_by.map(Id::new),
                changed_at: self.changed_at,
            },
        )
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PriceHistoryRow {
    pub id: String,
    pub station_id: String,
    pub price_per_kg: f64,
    pub effective_from: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl PriceHistoryRow {
    pub fn into_with_id(self) -> WithId<PriceHistoryEntry> {
        WithId::new(
            Id::new(self.id),
            PriceHistoryEntry {
                station_id: Id::new(self.station_id),
                price_per_kg: self.price_per_kg,
                effective_from: self.effective_from,
                updated_by: self.updated_by.map(Id::new),
            },
        )
    }
}

#[async_trait]
impl HistoryRepo for PgDatabaseAutocommit {
    async fn insert_availability_log(
        &mut self,
        entry: AvailabilityLogEntry,
    ) -> Result<WithId<AvailabilityLogEntry>> {
        history::insert_availability_log(&self.pool, entry).await
    }

    async fn availability_log(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<AvailabilityLogEntry>>> {
        let total = history::count_availability_log(&self.pool, station).await?;
        let items = history::availability_log(&self.pool, station, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn insert_price_entry(
        &mut self,
        entry: PriceHistoryEntry,
    ) -> Result<WithId<PriceHistoryEntry>> {
        history::insert_price_entry(&self.pool, entry).await
    }

    async fn price_history(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<PriceHistoryEntry>>> {
        let total = history::count_price_history(&self.pool, station).await?;
        let items = history::price_history(&self.pool, station, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}

#[async_trait]
impl<'a> HistoryRepo for PgDatabaseTransaction<'a> {
    async fn insert_availability_log(
        &mut self,
        entry: AvailabilityLogEntry,
    ) -> Result<WithId<AvailabilityLogEntry>> {
        history::insert_availability_log(&mut *self.tx, entry).await
    }

    async fn availability_log(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<AvailabilityLogEntry>>> {
        let total =
            history::count_availability_log(&mut *self.tx, station).await?;
        let items =
            history::availability_log(&mut *self.tx, station, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn insert_price_entry(
        &mut self,
        entry: PriceHistoryEntry,
    ) -> Result<WithId<PriceHistoryEntry>> {
        history::insert_price_entry(&mut *self.tx, entry).await
    }

    async fn price_history(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<PriceHistoryEntry>>> {
        let total = history::count_price_history(&mut *self.tx, station).await?;
        let items = history::price_history(&mut *self.tx, station, page).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}
