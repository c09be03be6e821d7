use std::{error, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    assignment::ManagerAssignment,
    history::{AvailabilityLogEntry, PriceHistoryEntry},
    station::Station,
    user::User,
    visit::Visit,
    WithId,
};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    Other(Box<dyn error::Error + Send + Sync>),
}

pub type Result<T> = result::Result<T, DatabaseError>;

/// 1-based page request. The HTTP layer has already clamped the values.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 15,
        }
    }
}

/// One page of results plus the totals needed for pagination envelopes.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page as u64)
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Sort orders of the station listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StationSort {
    Name,
    PricePerKg,
    #[default]
    RecentlyUpdated,
}

/// Filters of the station listing. Radius search is its own operation
/// (`StationRepo::find_nearby`), not a listing filter.
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    /// Only stations that currently serve (`is_available`).
    pub available: bool,
    /// `Some(true)`: only stations with an active manager assignment,
    /// `Some(false)`: only stations without one.
    pub assigned: Option<bool>,
    pub sort: StationSort,
    pub page: PageRequest,
}

/// Filters of the manager directory listing.
#[derive(Debug, Clone, Default)]
pub struct ManagerFilter {
    pub active_only: bool,
    /// Substring match on name or email.
    pub search: Option<String>,
    pub page: PageRequest,
}

/// A user record joined with its password hash, for login only. The hash
/// never travels further than the auth check.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: WithId<User>,
    pub password_hash: String,
}

#[async_trait]
pub trait StationRepo {
    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>>;

    async fn get_stations(
        &mut self,
        filter: &StationFilter,
    ) -> Result<Page<WithId<Station>>>;

    async fn insert_station(&mut self, station: Station)
        -> Result<WithId<Station>>;

    async fn update_station(
        &mut self,
        station: WithId<Station>,
    ) -> Result<WithId<Station>>;

    /// Hard delete. History rows go with the station via cascade.
    async fn delete_station(&mut self, id: &Id<Station>) -> Result<()>;

    async fn set_station_availability(
        &mut self,
        id: &Id<Station>,
        is_available: bool,
    ) -> Result<WithId<Station>>;

    async fn set_station_active(
        &mut self,
        id: &Id<Station>,
        is_active: bool,
    ) -> Result<WithId<Station>>;

    async fn set_station_price(
        &mut self,
        id: &Id<Station>,
        price_per_kg: f64,
    ) -> Result<WithId<Station>>;

    /// Coarse radius candidates: active stations inside the bounding box
    /// whose spherical-law distance is within `radius_km`. The caller
    /// recomputes the exact haversine distance for each candidate, so
    /// implementations may return slightly too many rows but never too
    /// few.
    async fn find_nearby(
        &mut self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<WithId<Station>>>;
}

#[async_trait]
pub trait HistoryRepo {
    async fn insert_availability_log(
        &mut self,
        entry: AvailabilityLogEntry,
    ) -> Result<WithId<AvailabilityLogEntry>>;

    /// Newest first.
    async fn availability_log(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<AvailabilityLogEntry>>>;

    async fn insert_price_entry(
        &mut self,
        entry: PriceHistoryEntry,
    ) -> Result<WithId<PriceHistoryEntry>>;

    /// Newest `effective_from` first.
    async fn price_history(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<PriceHistoryEntry>>>;
}

#[async_trait]
pub trait UserRepo {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>>;

    /// Station-role users only.
    async fn get_managers(
        &mut self,
        filter: &ManagerFilter,
    ) -> Result<Page<WithId<User>>>;

    async fn insert_user(
        &mut self,
        user: User,
        password_hash: String,
    ) -> Result<WithId<User>>;

    async fn update_user(&mut self, user: WithId<User>) -> Result<WithId<User>>;

    async fn delete_user(&mut self, id: &Id<User>) -> Result<()>;

    async fn credentials_by_email(&mut self, email: &str) -> Result<Credentials>;
}

#[async_trait]
pub trait AssignmentRepo {
    /// The unique active row of a station, if any.
    async fn active_assignment(
        &mut self,
        station: &Id<Station>,
    ) -> Result<Option<WithId<ManagerAssignment>>>;

    /// Whether `manager` currently holds the active assignment of `station`.
    async fn has_active_assignment(
        &mut self,
        manager: &Id<User>,
        station: &Id<Station>,
    ) -> Result<bool>;

    /// The station a manager is currently assigned to, if any.
    async fn active_assignment_for_manager(
        &mut self,
        manager: &Id<User>,
    ) -> Result<Option<WithId<ManagerAssignment>>>;

    async fn insert_assignment(
        &mut self,
        assignment: ManagerAssignment,
    ) -> Result<WithId<ManagerAssignment>>;

    /// Sets `removed_at` and the reason on a still-active row.
    async fn close_assignment(
        &mut self,
        id: &Id<ManagerAssignment>,
        removed_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<WithId<ManagerAssignment>>;

    /// All rows of a station, newest `assigned_at` first, optionally
    /// restricted to one manager.
    async fn assignment_history(
        &mut self,
        station: &Id<Station>,
        manager: Option<&Id<User>>,
        page: &PageRequest,
    ) -> Result<Page<WithId<ManagerAssignment>>>;
}

#[async_trait]
pub trait TokenRepo {
    async fn insert_token(
        &mut self,
        user: &Id<User>,
        token_digest: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn user_by_token_digest(&mut self, digest: &str)
        -> Result<WithId<User>>;

    async fn delete_token(&mut self, digest: &str) -> Result<()>;

    async fn delete_tokens_for_user(&mut self, user: &Id<User>) -> Result<u64>;
}

#[async_trait]
pub trait VisitRepo {
    async fn insert_visit(&mut self, visit: Visit) -> Result<WithId<Visit>>;
}

pub trait DatabaseOperations:
    StationRepo + HistoryRepo + UserRepo + AssignmentRepo + TokenRepo + VisitRepo
{
}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// A handle to the station store. Concurrent access happens by cloning;
/// the store itself is the only synchronization point.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseAutocommit + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}
