//! In-memory store for exercising client flows without Postgres.
//!
//! Not transactional: commits are no-ops and there is no rollback. The
//! tests that use it only assert on states a real store would reach
//! through committed transactions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    assignment::ManagerAssignment,
    history::{AvailabilityLogEntry, PriceHistoryEntry},
    station::Station,
    user::{Role, User},
    visit::Visit,
    WithId,
};
use utility::{geo, id::Id};

use crate::database::{
    AssignmentRepo, Credentials, Database, DatabaseAutocommit, DatabaseError,
    DatabaseOperations, DatabaseTransaction, HistoryRepo, ManagerFilter, Page,
    PageRequest, Result, StationFilter, StationRepo, StationSort, TokenRepo,
    UserRepo, VisitRepo,
};

#[derive(Default)]
struct State {
    stations: Vec<(String, Station)>,
    users: Vec<(String, User)>,
    password_hashes: HashMap<String, String>,
    assignments: Vec<(String, ManagerAssignment)>,
    availability_log: Vec<(String, AvailabilityLogEntry)>,
    price_history: Vec<(String, PriceHistoryEntry)>,
    tokens: HashMap<String, (String, DateTime<Utc>)>,
    visits: Vec<(String, Visit)>,
    next_id: u64,
}

impl State {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }
}

#[derive(Clone, Default)]
pub struct MemDatabase {
    state: Arc<Mutex<State>>,
}

impl MemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a station and returns its id.
    pub fn add_station(&self, station: Station) -> Id<Station> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("station");
        state.stations.push((id.clone(), station));
        Id::new(id)
    }

    /// Seeds a user with an unusable password hash.
    pub fn add_user(&self, user: User) -> Id<User> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("user");
        state
            .password_hashes
            .insert(id.clone(), "!".to_owned());
        state.users.push((id.clone(), user));
        Id::new(id)
    }

    pub fn active_assignment_count(&self, station: &Id<Station>) -> usize {
        let state = self.state.lock().unwrap();
        state
            .assignments
            .iter()
            .filter(|(_, a)| a.station_id == *station && a.is_active())
            .count()
    }
}

pub struct MemOps {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Database for MemDatabase {
    type Transaction = MemOps;
    type Autocommit = MemOps;

    async fn transaction(&self) -> Result<Self::Transaction> {
        Ok(MemOps {
            state: self.state.clone(),
        })
    }

    fn auto(&self) -> Self::Autocommit {
        MemOps {
            state: self.state.clone(),
        }
    }
}

impl DatabaseOperations for MemOps {}
impl DatabaseAutocommit for MemOps {}

#[async_trait]
impl DatabaseTransaction for MemOps {
    async fn commit(self) -> Result<()> {
        Ok(())
    }
}

fn paginate<T>(items: Vec<T>, page: &PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = page.offset() as usize;
    let items = items
        .into_iter()
        .skip(offset)
        .take(page.limit() as usize)
        .collect();
    Page {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }
}

#[async_trait]
impl StationRepo for MemOps {
    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>> {
        let state = self.state.lock().unwrap();
        state
            .stations
            .iter()
            .find(|(station_id, _)| *station_id == id.raw())
            .map(|(station_id, station)| {
                WithId::new(Id::new(station_id.clone()), station.clone())
            })
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_stations(
        &mut self,
        filter: &StationFilter,
    ) -> Result<Page<WithId<Station>>> {
        let state = self.state.lock().unwrap();
        let mut stations = state
            .stations
            .iter()
            .filter(|(_, station)| !filter.available || station.is_available)
            .filter(|(id, _)| match filter.assigned {
                None => true,
                Some(assigned) => {
                    let has_active = state.assignments.iter().any(|(_, a)| {
                        a.station_id.raw() == *id && a.is_active()
                    });
                    has_active == assigned
                }
            })
            .map(|(id, station)| {
                WithId::new(Id::new(id.clone()), station.clone())
            })
            .collect::<Vec<_>>();

        match filter.sort {
            StationSort::Name => stations
                .sort_by(|a, b| a.content.name.cmp(&b.content.name)),
            StationSort::PricePerKg => stations.sort_by(|a, b| {
                let price = |s: &WithId<Station>| {
                    s.content.price_per_kg.unwrap_or(f64::MAX)
                };
                price(a).total_cmp(&price(b))
            }),
            // Insertion order stands in for updated_at recency.
            StationSort::RecentlyUpdated => stations.reverse(),
        }

        Ok(paginate(stations, &filter.page))
    }

    async fn insert_station(
        &mut self,
        station: Station,
    ) -> Result<WithId<Station>> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("station");
        state.stations.push((id.clone(), station.clone()));
        Ok(WithId::new(Id::new(id), station))
    }

    async fn update_station(
        &mut self,
        station: WithId<Station>,
    ) -> Result<WithId<Station>> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .stations
            .iter_mut()
            .find(|(id, _)| *id == station.id.raw())
            .ok_or(DatabaseError::NotFound)?;
        slot.1 = station.content.clone();
        Ok(station)
    }

    async fn delete_station(&mut self, id: &Id<Station>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.stations.len();
        state.stations.retain(|(station_id, _)| *station_id != id.raw());
        if state.stations.len() == before {
            return Err(DatabaseError::NotFound);
        }
        // Cascades, as the schema's foreign keys would.
        state
            .availability_log
            .retain(|(_, entry)| entry.station_id != *id);
        state
            .price_history
            .retain(|(_, entry)| entry.station_id != *id);
        state
            .assignments
            .retain(|(_, assignment)| assignment.station_id != *id);
        Ok(())
    }

    async fn set_station_availability(
        &mut self,
        id: &Id<Station>,
        is_available: bool,
    ) -> Result<WithId<Station>> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .stations
            .iter_mut()
            .find(|(station_id, _)| *station_id == id.raw())
            .ok_or(DatabaseError::NotFound)?;
        slot.1.is_available = is_available;
        Ok(WithId::new(id.clone(), slot.1.clone()))
    }

    async fn set_station_active(
        &mut self,
        id: &Id<Station>,
        is_active: bool,
    ) -> Result<WithId<Station>> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .stations
            .iter_mut()
            .find(|(station_id, _)| *station_id == id.raw())
            .ok_or(DatabaseError::NotFound)?;
        slot.1.is_active = is_active;
        Ok(WithId::new(id.clone(), slot.1.clone()))
    }

    async fn set_station_price(
        &mut self,
        id: &Id<Station>,
        price_per_kg: f64,
    ) -> Result<WithId<Station>> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .stations
            .iter_mut()
            .find(|(station_id, _)| *station_id == id.raw())
            .ok_or(DatabaseError::NotFound)?;
        slot.1.price_per_kg = Some(price_per_kg);
        Ok(WithId::new(id.clone(), slot.1.clone()))
    }

    async fn find_nearby(
        &mut self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<WithId<Station>>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .stations
            .iter()
            .filter(|(_, station)| station.is_active)
            .filter(|(_, station)| {
                geo::haversine_distance(
                    latitude,
                    longitude,
                    station.latitude,
                    station.longitude,
                ) <= radius_km
            })
            .map(|(id, station)| {
                WithId::new(Id::new(id.clone()), station.clone())
            })
            .collect())
    }
}

#[async_trait]
impl HistoryRepo for MemOps {
    async fn insert_availability_log(
        &mut self,
        entry: AvailabilityLogEntry,
    ) -> Result<WithId<AvailabilityLogEntry>> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("avlog");
        state.availability_log.push((id.clone(), entry.clone()));
        Ok(WithId::new(Id::new(id), entry))
    }

    async fn availability_log(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<AvailabilityLogEntry>>> {
        let state = self.state.lock().unwrap();
        let mut entries = state
            .availability_log
            .iter()
            .filter(|(_, entry)| entry.station_id == *station)
            .map(|(id, entry)| WithId::new(Id::new(id.clone()), entry.clone()))
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| b.content.changed_at.cmp(&a.content.changed_at));
        Ok(paginate(entries, page))
    }

    async fn insert_price_entry(
        &mut self,
        entry: PriceHistoryEntry,
    ) -> Result<WithId<PriceHistoryEntry>> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("price");
        state.price_history.push((id.clone(), entry.clone()));
        Ok(WithId::new(Id::new(id), entry))
    }

    async fn price_history(
        &mut self,
        station: &Id<Station>,
        page: &PageRequest,
    ) -> Result<Page<WithId<PriceHistoryEntry>>> {
        let state = self.state.lock().unwrap();
        let mut entries = state
            .price_history
            .iter()
            .filter(|(_, entry)| entry.station_id == *station)
            .map(|(id, entry)| WithId::new(Id::new(id.clone()), entry.clone()))
            .collect::<Vec<_>>();
        entries
            .sort_by(|a, b| b.content.effective_from.cmp(&a.content.effective_from));
        Ok(paginate(entries, page))
    }
}

#[async_trait]
impl UserRepo for MemOps {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|(user_id, _)| *user_id == id.raw())
            .map(|(user_id, user)| {
                WithId::new(Id::new(user_id.clone()), user.clone())
            })
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_managers(
        &mut self,
        filter: &ManagerFilter,
    ) -> Result<Page<WithId<User>>> {
        let state = self.state.lock().unwrap();
        let search = filter.search.as_deref().unwrap_or("").to_lowercase();
        let managers = state
            .users
            .iter()
            .filter(|(_, user)| user.role == Role::StationManager)
            .filter(|(_, user)| !filter.active_only || user.is_active)
            .filter(|(_, user)| {
                search.is_empty()
                    || user.name.to_lowercase().contains(&search)
                    || user.email.to_lowercase().contains(&search)
            })
            .map(|(id, user)| WithId::new(Id::new(id.clone()), user.clone()))
            .collect::<Vec<_>>();
        Ok(paginate(managers, &filter.page))
    }

    async fn insert_user(
        &mut self,
        user: User,
        password_hash: String,
    ) -> Result<WithId<User>> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("user");
        state.password_hashes.insert(id.clone(), password_hash);
        state.users.push((id.clone(), user.clone()));
        Ok(WithId::new(Id::new(id), user))
    }

    async fn update_user(&mut self, user: WithId<User>) -> Result<WithId<User>> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .users
            .iter_mut()
            .find(|(id, _)| *id == user.id.raw())
            .ok_or(DatabaseError::NotFound)?;
        slot.1 = user.content.clone();
        Ok(user)
    }

    async fn delete_user(&mut self, id: &Id<User>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.users.len();
        state.users.retain(|(user_id, _)| *user_id != id.raw());
        if state.users.len() == before {
            return Err(DatabaseError::NotFound);
        }
        state
            .assignments
            .retain(|(_, assignment)| assignment.manager_id != *id);
        Ok(())
    }

    async fn credentials_by_email(&mut self, email: &str) -> Result<Credentials> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|(_, user)| user.email == email)
            .map(|(id, user)| Credentials {
                user: WithId::new(Id::new(id.clone()), user.clone()),
                password_hash: state
                    .password_hashes
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| "!".to_owned()),
            })
            .ok_or(DatabaseError::NotFound)
    }
}

#[async_trait]
impl AssignmentRepo for MemOps {
    async fn active_assignment(
        &mut self,
        station: &Id<Station>,
    ) -> Result<Option<WithId<ManagerAssignment>>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .assignments
            .iter()
            .find(|(_, a)| a.station_id == *station && a.is_active())
            .map(|(id, a)| WithId::new(Id::new(id.clone()), a.clone())))
    }

    async fn has_active_assignment(
        &mut self,
        manager: &Id<User>,
        station: &Id<Station>,
    ) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.assignments.iter().any(|(_, a)| {
            a.manager_id == *manager && a.station_id == *station && a.is_active()
        }))
    }

    async fn active_assignment_for_manager(
        &mut self,
        manager: &Id<User>,
    ) -> Result<Option<WithId<ManagerAssignment>>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .assignments
            .iter()
            .find(|(_, a)| a.manager_id == *manager && a.is_active())
            .map(|(id, a)| WithId::new(Id::new(id.clone()), a.clone())))
    }

    async fn insert_assignment(
        &mut self,
        assignment: ManagerAssignment,
    ) -> Result<WithId<ManagerAssignment>> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("assignment");
        state.assignments.push((id.clone(), assignment.clone()));
        Ok(WithId::new(Id::new(id), assignment))
    }

    async fn close_assignment(
        &mut self,
        id: &Id<ManagerAssignment>,
        removed_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<WithId<ManagerAssignment>> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .assignments
            .iter_mut()
            .find(|(assignment_id, a)| {
                *assignment_id == id.raw() && a.is_active()
            })
            .ok_or(DatabaseError::NotFound)?;
        slot.1.removed_at = Some(removed_at);
        slot.1.removal_reason = Some(reason.to_owned());
        Ok(WithId::new(id.clone(), slot.1.clone()))
    }

    async fn assignment_history(
        &mut self,
        station: &Id<Station>,
        manager: Option<&Id<User>>,
        page: &PageRequest,
    ) -> Result<Page<WithId<ManagerAssignment>>> {
        let state = self.state.lock().unwrap();
        let mut rows = state
            .assignments
            .iter()
            .filter(|(_, a)| a.station_id == *station)
            .filter(|(_, a)| manager.map_or(true, |m| a.manager_id == *m))
            .map(|(id, a)| WithId::new(Id::new(id.clone()), a.clone()))
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| b.content.assigned_at.cmp(&a.content.assigned_at));
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl TokenRepo for MemOps {
    async fn insert_token(
        &mut self,
        user: &Id<User>,
        token_digest: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .tokens
            .insert(token_digest.to_owned(), (user.raw(), created_at));
        Ok(())
    }

    async fn user_by_token_digest(
        &mut self,
        digest: &str,
    ) -> Result<WithId<User>> {
        let state = self.state.lock().unwrap();
        let (user_id, _) =
            state.tokens.get(digest).ok_or(DatabaseError::NotFound)?;
        state
            .users
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(id, user)| WithId::new(Id::new(id.clone()), user.clone()))
            .ok_or(DatabaseError::NotFound)
    }

    async fn delete_token(&mut self, digest: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .tokens
            .remove(digest)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound)
    }

    async fn delete_tokens_for_user(&mut self, user: &Id<User>) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.tokens.len();
        state.tokens.retain(|_, (user_id, _)| *user_id != user.raw());
        Ok((before - state.tokens.len()) as u64)
    }
}

#[async_trait]
impl VisitRepo for MemOps {
    async fn insert_visit(&mut self, visit: Visit) -> Result<WithId<Visit>> {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id("visit");
        state.visits.push((id.clone(), visit.clone()));
        Ok(WithId::new(Id::new(id), visit))
    }
}
