use chrono::Utc;
use model::{
    assignment::{ManagerAssignment, REMOVED_REASON, REPLACED_REASON},
    history::{AvailabilityLogEntry, PriceHistoryEntry},
    station::Station,
    user::{ManagerSummary, Role, User},
    visit::Visit,
    WithId,
};
use utility::{id::Id, let_also::LetAlso};

use crate::{
    access, auth,
    database::{
        AssignmentRepo, Database, DatabaseTransaction, HistoryRepo,
        ManagerFilter, Page, PageRequest, StationFilter, StationRepo, TokenRepo,
        UserRepo, VisitRepo,
    },
    not_found_to_none, ranking, RequestError, RequestResult,
};

/// Input for account creation. The plain password only lives until the
/// argon2 hash is computed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub station_id: Option<Id<Station>>,
    pub is_active: bool,
}

/// A fresh login/registration: the account plus the one-time plain token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: WithId<User>,
    pub token: String,
}

/// Domain operations over a [`Database`]. One clone per request; the
/// store is the only shared state.
#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database + 'static,
{
    pub database: D,
}

impl<D> Client<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self { database }
    }
}

// Stations

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_station(
        &self,
        id: &Id<Station>,
    ) -> RequestResult<WithId<Station>> {
        self.database
            .auto()
            .get_station(id)
            .await?
            .let_owned(|station| Ok(station))
    }

    pub async fn list_stations(
        &self,
        filter: &StationFilter,
    ) -> RequestResult<Page<WithId<Station>>> {
        self.database
            .auto()
            .get_stations(filter)
            .await?
            .let_owned(|stations| Ok(stations))
    }

    pub async fn create_station(
        &self,
        station: Station,
    ) -> RequestResult<WithId<Station>> {
        station.validate().map_err(RequestError::InvalidValue)?;
        Ok(self.database.auto().insert_station(station).await?)
    }

    pub async fn update_station(
        &self,
        station: WithId<Station>,
    ) -> RequestResult<WithId<Station>> {
        station
            .content
            .validate()
            .map_err(RequestError::InvalidValue)?;
        Ok(self.database.auto().update_station(station).await?)
    }

    pub async fn delete_station(&self, id: &Id<Station>) -> RequestResult<()> {
        Ok(self.database.auto().delete_station(id).await?)
    }

    /// Radius search with two-tier ranking. Candidates come from the
    /// store's coarse prefilter; the exact haversine distance decides
    /// inclusion, boundary distance included.
    pub async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        available_only: bool,
    ) -> RequestResult<ranking::RankedStations> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RequestError::InvalidValue("latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RequestError::InvalidValue("longitude out of range"));
        }

        let candidates = self
            .database
            .auto()
            .find_nearby(latitude, longitude, radius_km)
            .await?;

        let within_radius = candidates
            .into_iter()
            .map(|station| {
                let id = station.id;
                station
                    .content
                    .with_distance_to(latitude, longitude)
                    .with_id(id)
            })
            .filter(|station| station.distance_km <= radius_km)
            .collect::<Vec<_>>();

        Ok(ranking::rank(within_radius, available_only))
    }

    /// Flips the availability flag and writes the log row in one
    /// transaction. The row is written even when the value is unchanged.
    pub async fn set_availability(
        &self,
        id: &Id<Station>,
        is_available: bool,
        actor: &Id<User>,
    ) -> RequestResult<WithId<Station>> {
        let mut tx = self.database.transaction().await?;

        tx.get_station(id).await?;
        tx.insert_availability_log(AvailabilityLogEntry {
            station_id: id.clone(),
            is_available,
            changed_by: Some(actor.clone()),
            changed_at: Utc::now(),
        })
        .await?;
        let station = tx.set_station_availability(id, is_available).await?;

        tx.commit().await?;
        Ok(station)
    }

    /// Writes the price history row and the new current price in one
    /// transaction. The current price is a materialized view of the
    /// latest history entry.
    pub async fn set_price(
        &self,
        id: &Id<Station>,
        price_per_kg: f64,
        actor: &Id<User>,
    ) -> RequestResult<WithId<Station>> {
        if price_per_kg < 0.0 {
            return Err(RequestError::InvalidValue(
                "price must be non-negative",
            ));
        }

        let mut tx = self.database.transaction().await?;

        tx.get_station(id).await?;
        tx.insert_price_entry(PriceHistoryEntry {
            station_id: id.clone(),
            price_per_kg,
            effective_from: Utc::now(),
            updated_by: Some(actor.clone()),
        })
        .await?;
        let station = tx.set_station_price(id, price_per_kg).await?;

        tx.commit().await?;
        Ok(station)
    }

    /// Permanent open/closed toggle. Availability history is untouched.
    pub async fn set_active(
        &self,
        id: &Id<Station>,
        is_active: bool,
    ) -> RequestResult<WithId<Station>> {
        Ok(self.database.auto().set_station_active(id, is_active).await?)
    }

    pub async fn price_history(
        &self,
        id: &Id<Station>,
        page: &PageRequest,
    ) -> RequestResult<Page<WithId<PriceHistoryEntry>>> {
        let mut ops = self.database.auto();
        ops.get_station(id).await?;
        Ok(ops.price_history(id, page).await?)
    }

    pub async fn availability_log(
        &self,
        id: &Id<Station>,
        page: &PageRequest,
    ) -> RequestResult<Page<WithId<AvailabilityLogEntry>>> {
        let mut ops = self.database.auto();
        ops.get_station(id).await?;
        Ok(ops.availability_log(id, page).await?)
    }
}

// Manager assignments

impl<D> Client<D>
where
    D: Database,
{
    /// Assigns a manager, atomically replacing any current one. The
    /// close of the old row and the insert of the new one are a single
    /// transaction; no reader ever sees zero or two active rows where
    /// there should be one.
    pub async fn assign_manager(
        &self,
        station_id: &Id<Station>,
        manager_id: &Id<User>,
        actor: &Id<User>,
    ) -> RequestResult<WithId<ManagerAssignment>> {
        let mut tx = self.database.transaction().await?;

        let station = tx.get_station(station_id).await?;
        let manager = tx.get_user(manager_id).await?;

        if !manager.content.is_station_manager() {
            return Err(RequestError::InvalidRole);
        }
        if !manager.content.is_active {
            return Err(RequestError::InactiveManager);
        }

        let now = Utc::now();
        if let Some(active) = tx.active_assignment(station_id).await? {
            tx.close_assignment(&active.id, now, REPLACED_REASON).await?;
        }

        let assignment = tx
            .insert_assignment(ManagerAssignment {
                manager_id: manager.id,
                station_id: station.id,
                assigned_by: actor.clone(),
                assigned_at: now,
                removed_at: None,
                removal_reason: None,
            })
            .await?;

        tx.commit().await?;
        Ok(assignment)
    }

    /// Closes the active assignment. Removal without an active row is an
    /// error, not a silent no-op.
    pub async fn remove_manager(
        &self,
        station_id: &Id<Station>,
        reason: Option<String>,
    ) -> RequestResult<WithId<ManagerAssignment>> {
        let mut tx = self.database.transaction().await?;

        tx.get_station(station_id).await?;
        let active = tx
            .active_assignment(station_id)
            .await?
            .ok_or(RequestError::NoActiveAssignment)?;

        let reason = reason.as_deref().unwrap_or(REMOVED_REASON);
        let closed = tx
            .close_assignment(&active.id, Utc::now(), reason)
            .await?;

        tx.commit().await?;
        Ok(closed)
    }

    pub async fn current_manager(
        &self,
        station_id: &Id<Station>,
    ) -> RequestResult<Option<WithId<ManagerAssignment>>> {
        let mut ops = self.database.auto();
        ops.get_station(station_id).await?;
        Ok(ops.active_assignment(station_id).await?)
    }

    pub async fn manager_history(
        &self,
        station_id: &Id<Station>,
        manager: Option<&Id<User>>,
        page: &PageRequest,
    ) -> RequestResult<Page<WithId<ManagerAssignment>>> {
        let mut ops = self.database.auto();
        ops.get_station(station_id).await?;
        Ok(ops.assignment_history(station_id, manager, page).await?)
    }

    pub async fn can_manage(
        &self,
        actor: &WithId<User>,
        station_id: &Id<Station>,
    ) -> RequestResult<bool> {
        let mut ops = self.database.auto();
        Ok(access::can_manage(&mut ops, actor, station_id).await?)
    }
}

// Manager directory

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_manager(
        &self,
        id: &Id<User>,
    ) -> RequestResult<ManagerSummary> {
        let mut ops = self.database.auto();
        let manager = ops.get_user(id).await?;
        if !manager.content.is_station_manager() {
            return Err(RequestError::NotFound);
        }
        let active_assignment =
            ops.active_assignment_for_manager(&manager.id).await?;
        Ok(ManagerSummary {
            manager,
            active_assignment,
        })
    }

    pub async fn list_managers(
        &self,
        filter: &ManagerFilter,
    ) -> RequestResult<Page<ManagerSummary>> {
        let mut ops = self.database.auto();
        let managers = ops.get_managers(filter).await?;

        let mut summaries = Vec::with_capacity(managers.items.len());
        for manager in managers.items {
            let active_assignment =
                ops.active_assignment_for_manager(&manager.id).await?;
            summaries.push(ManagerSummary {
                manager,
                active_assignment,
            });
        }

        Ok(Page {
            items: summaries,
            total: managers.total,
            page: managers.page,
            per_page: managers.per_page,
        })
    }

    pub async fn create_manager(
        &self,
        name: String,
        email: String,
        password: String,
        is_active: bool,
    ) -> RequestResult<WithId<User>> {
        self.register_user(NewUser {
            name,
            email,
            password,
            role: Role::StationManager,
            station_id: None,
            is_active,
        })
        .await
    }

    pub async fn update_manager(
        &self,
        manager: WithId<User>,
    ) -> RequestResult<WithId<User>> {
        if !manager.content.is_station_manager() {
            return Err(RequestError::InvalidRole);
        }
        Ok(self.database.auto().update_user(manager).await?)
    }

    /// Hard delete; ledger rows cascade with the account.
    pub async fn delete_manager(&self, id: &Id<User>) -> RequestResult<()> {
        let mut ops = self.database.auto();
        let manager = ops.get_user(id).await?;
        if !manager.content.is_station_manager() {
            return Err(RequestError::NotFound);
        }
        Ok(ops.delete_user(id).await?)
    }
}

// Accounts and sessions

impl<D> Client<D>
where
    D: Database,
{
    async fn register_user(&self, new_user: NewUser) -> RequestResult<WithId<User>> {
        let password_hash = auth::hash_password(&new_user.password)?;
        let user = User {
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            station_id: new_user.station_id,
            is_active: new_user.is_active,
        };
        Ok(self.database.auto().insert_user(user, password_hash).await?)
    }

    /// Creates the account and signs it in.
    pub async fn register(&self, new_user: NewUser) -> RequestResult<Session> {
        let user = self.register_user(new_user).await?;
        let token = self.issue_token(&user.id).await?;
        Ok(Session { user, token })
    }

    /// Verifies credentials and issues a fresh token. Unknown emails and
    /// wrong passwords are indistinguishable to the caller, and
    /// deactivated accounts cannot sign in.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> RequestResult<Session> {
        let credentials = not_found_to_none(
            self.database
                .auto()
                .credentials_by_email(email)
                .await
                .map_err(RequestError::from),
        )?
        .ok_or(RequestError::InvalidCredentials)?;

        if !credentials.user.content.is_active
            || !auth::verify_password(password, &credentials.password_hash)
        {
            return Err(RequestError::InvalidCredentials);
        }

        let token = self.issue_token(&credentials.user.id).await?;
        Ok(Session {
            user: credentials.user,
            token,
        })
    }

    async fn issue_token(&self, user: &Id<User>) -> RequestResult<String> {
        let token = auth::mint_token();
        self.database
            .auto()
            .insert_token(user, &auth::token_digest(&token), Utc::now())
            .await?;
        Ok(token)
    }

    /// Resolves a bearer token to its account, or NotFound.
    pub async fn user_by_token(&self, token: &str) -> RequestResult<WithId<User>> {
        Ok(self
            .database
            .auto()
            .user_by_token_digest(&auth::token_digest(token))
            .await?)
    }

    /// Revokes the presented token.
    pub async fn logout(&self, token: &str) -> RequestResult<()> {
        Ok(self
            .database
            .auto()
            .delete_token(&auth::token_digest(token))
            .await?)
    }

    /// Drops every token of the account and issues a new one.
    pub async fn refresh(&self, user: &Id<User>) -> RequestResult<String> {
        self.database.auto().delete_tokens_for_user(user).await?;
        self.issue_token(user).await
    }
}

// Visit tracking

impl<D> Client<D>
where
    D: Database,
{
    /// Best-effort insert used by the tracking middleware. Callers are
    /// expected to log failures and move on, never to fail the request.
    pub async fn record_visit(&self, visit: Visit) -> RequestResult<()> {
        self.database.auto().insert_visit(visit).await?;
        Ok(())
    }
}
