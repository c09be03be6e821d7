use async_trait::async_trait;
use model::{station::Station, WithId};
use refill::database::{Page, Result, StationFilter, StationRepo};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::station, PgDatabaseAutocommit, PgDatabaseTransaction};

#[derive(Debug, Clone, FromRow)]
pub struct StationRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub is_available: bool,
    pub is_active: bool,
    pub price_per_kg: Option<f64>,
    pub operating_hours: String,
    pub image: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl StationRow {
    pub fn into_with_id(self) -> WithId<Station> {
        WithId::new(
            Id::new(self.id),
            Station {
                name: self.name,
                address: self.address,
                phone: self.phone,
                email: self.email,
                is_available: self.is_available,
                is_active: self.is_active,
                price_per_kg: self.price_per_kg,
                operating_hours: self.operating_hours,
                image: self.image,
                latitude: self.latitude,
                longitude: self.longitude,
            },
        )
    }
}

#[async_trait]
impl StationRepo for PgDatabaseAutocommit {
    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>> {
        station::get(&self.pool, id).await
    }

    async fn get_stations(
        &mut self,
        filter: &StationFilter,
    ) -> Result<Page<WithId<Station>>> {
        let total = station::count(&self.pool, filter).await?;
        let items = station::list(&self.pool, filter).await?;
        Ok(Page {
            items,
            total,
            page: filter.page.page,
            per_page: filter.page.per_page,
        })
    }

    async fn insert_station(
        &mut self,
        new_station: Station,
    ) -> Result<WithId<Station>> {
        station::insert(&self.pool, new_station).await
    }

    async fn update_station(
        &mut self,
        updated: WithId<Station>,
    ) -> Result<WithId<Station>> {
        station::update(&self.pool, updated).await
    }

    async fn delete_station(&mut self, id: &Id<Station>) -> Result<()> {
        station::delete(&self.pool, id).await
    }

    async fn set_station_availability(
        &mut self,
        id: &Id<Station>,
        is_available: bool,
    ) -> Result<WithId<Station>> {
        station::set_available(&self.pool, id, is_available).await
    }

    async fn set_station_active(
        &mut self,
        id: &Id<Station>,
        is_active: bool,
    ) -> Result<WithId<Station>> {
        station::set_active(&self.pool, id, is_active).await
    }

    async fn set_station_price(
        &mut self,
        id: &Id<Station>,
        price_per_kg: f64,
    ) -> Result<WithId<Station>> {
        station::set_price(&self.pool, id, price_per_kg).await
    }

    async fn find_nearby(
        &mut self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<WithId<Station>>> {
        station::get_nearby(&self.pool, latitude, longitude, radius_km).await
    }
}

#[async_trait]
impl<'a> StationRepo for PgDatabaseTransaction<'a> {
    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>> {
        station::get(&mut *self.tx, id).await
    }

    async fn get_stations(
        &mut self,
        filter: &StationFilter,
    ) -> Result<Page<WithId<Station>>> {
        let total = station::count(&mut *self.tx, filter).await?;
        let items = station::list(&mut *self.tx, filter).await?;
        Ok(Page {
            items,
            total,
            page: filter.page.page,
            per_page: filter.page.per_page,
        })
    }

    async fn insert_station(
        &mut self,
        new_station: Station,
    ) -> Result<WithId<Station>> {
        station::insert(&mut *self.tx, new_station).await
    }

    async fn update_station(
        &mut self,
        updated: WithId<Station>,
    ) -> Result<WithId<Station>> {
        station::update(&mut *self.tx, updated).await
    }

    async fn delete_station(&mut self, id: &Id<Station>) -> Result<()> {
        station::delete(&mut *self.tx, id).await
    }

    async fn set_station_availability(
        &mut self,
        id: &Id<Station>,
        is_available: bool,
    ) -> Result<WithId<Station>> {
        station::set_available(&mut *self.tx, id, is_available).await
    }

    async fn set_station_active(
        &mut self,
        id: &Id<Station>,
        is_active: bool,
    ) -> Result<WithId<Station>> {
        station::set_active(&mut *self.tx, id, is_active).await
    }

    async fn set_station_price(
        &mut self,
        id: &Id<Station>,
        price_per_kg: f64,
    ) -> Result<WithId<Station>> {
        station::set_price(&mut *self.tx, id, price_per_kg).await
    }

    async fn find_nearby(
        &mut self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<WithId<Station>>> {
        station::get_nearby(&mut *self.tx, latitude, longitude, radius_km).await
    }
}
