//! Client flows against the in-memory store: the assignment state
//! machine, the directory's toggle/price transactions and the access
//! policy.

use model::{
    assignment::{REMOVED_REASON, REPLACED_REASON},
    station::Station,
    user::{Role, User},
    ExampleData, WithId,
};
use utility::id::Id;

use crate::{
    client::{Client, NewUser},
    database::PageRequest,
    mock::MemDatabase,
    ranking::NearbyOutcome,
    RequestError,
};

fn client() -> Client<MemDatabase> {
    Client::new(MemDatabase::new())
}

fn station_at(latitude: f64, longitude: f64, is_available: bool) -> Station {
    let mut station = Station::example_data();
    station.latitude = latitude;
    station.longitude = longitude;
    station.is_available = is_available;
    station
}

fn manager(name: &str) -> User {
    let mut user = User::example_data();
    user.name = name.to_owned();
    user.email = format!("{name}@example.test");
    user
}

fn admin() -> User {
    let mut user = User::example_data();
    user.role = Role::Admin;
    user.email = "admin@example.test".to_owned();
    user
}

// Assignment ledger

#[tokio::test]
async fn assign_creates_single_active_row() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let manager_id = client.database.add_user(manager("m1"));
    let admin_id = client.database.add_user(admin());

    let assignment = client
        .assign_manager(&station, &manager_id, &admin_id)
        .await
        .unwrap();

    assert!(assignment.content.is_active());
    assert_eq!(assignment.content.manager_id, manager_id);
    assert_eq!(client.database.active_assignment_count(&station), 1);
}

#[tokio::test]
async fn reassign_closes_prior_row_atomically() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let first = client.database.add_user(manager("m1"));
    let second = client.database.add_user(manager("m2"));
    let admin_id = client.database.add_user(admin());

    client
        .assign_manager(&station, &first, &admin_id)
        .await
        .unwrap();
    client
        .assign_manager(&station, &second, &admin_id)
        .await
        .unwrap();

    // Exactly one active row, and it is the second manager's.
    assert_eq!(client.database.active_assignment_count(&station), 1);
    let current = client.current_manager(&station).await.unwrap().unwrap();
    assert_eq!(current.content.manager_id, second);

    // The first row is closed with the replacement reason.
    let history = client
        .manager_history(&station, None, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total, 2);
    let replaced = history
        .items
        .iter()
        .find(|row| row.content.manager_id == first)
        .unwrap();
    assert!(replaced.content.removed_at.is_some());
    assert_eq!(
        replaced.content.removal_reason.as_deref(),
        Some(REPLACED_REASON)
    );
}

#[tokio::test]
async fn assign_rejects_wrong_role() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let admin_id = client.database.add_user(admin());

    let result = client
        .assign_manager(&station, &admin_id, &admin_id)
        .await;
    assert!(matches!(result, Err(RequestError::InvalidRole)));
    assert_eq!(client.database.active_assignment_count(&station), 0);
}

#[tokio::test]
async fn assign_rejects_inactive_manager() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let mut inactive = manager("m1");
    inactive.is_active = false;
    let manager_id = client.database.add_user(inactive);
    let admin_id = client.database.add_user(admin());

    let result = client
        .assign_manager(&station, &manager_id, &admin_id)
        .await;
    assert!(matches!(result, Err(RequestError::InactiveManager)));
}

#[tokio::test]
async fn assign_rejects_unknown_station_and_manager() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let manager_id = client.database.add_user(manager("m1"));
    let admin_id = client.database.add_user(admin());

    let ghost_station: Id<Station> = Id::new("station-9999".to_owned());
    let result = client
        .assign_manager(&ghost_station, &manager_id, &admin_id)
        .await;
    assert!(matches!(result, Err(RequestError::NotFound)));

    let ghost_manager: Id<User> = Id::new("user-9999".to_owned());
    let result = client
        .assign_manager(&station, &ghost_manager, &admin_id)
        .await;
    assert!(matches!(result, Err(RequestError::NotFound)));
}

#[tokio::test]
async fn remove_without_active_assignment_fails() {
    let client = client();
    let station = client.database.add_station(Station::example_data());

    let result = client.remove_manager(&station, None).await;
    assert!(matches!(result, Err(RequestError::NoActiveAssignment)));
}

#[tokio::test]
async fn remove_closes_with_default_reason() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let manager_id = client.database.add_user(manager("m1"));
    let admin_id = client.database.add_user(admin());

    client
        .assign_manager(&station, &manager_id, &admin_id)
        .await
        .unwrap();
    let closed = client.remove_manager(&station, None).await.unwrap();

    assert_eq!(closed.content.removal_reason.as_deref(), Some(REMOVED_REASON));
    assert_eq!(client.database.active_assignment_count(&station), 0);
    assert!(client.current_manager(&station).await.unwrap().is_none());

    // Removing again fails, it is not a silent no-op.
    let again = client.remove_manager(&station, None).await;
    assert!(matches!(again, Err(RequestError::NoActiveAssignment)));
}

#[tokio::test]
async fn history_is_newest_first_and_filterable() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let first = client.database.add_user(manager("m1"));
    let second = client.database.add_user(manager("m2"));
    let admin_id = client.database.add_user(admin());

    client
        .assign_manager(&station, &first, &admin_id)
        .await
        .unwrap();
    client
        .assign_manager(&station, &second, &admin_id)
        .await
        .unwrap();

    let history = client
        .manager_history(&station, None, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.items.len(), 2);
    assert!(
        history.items[0].content.assigned_at
            >= history.items[1].content.assigned_at
    );

    let filtered = client
        .manager_history(&station, Some(&first), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.items[0].content.manager_id, first);
}

// Station directory

#[tokio::test]
async fn set_availability_logs_even_when_unchanged() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let admin_id = client.database.add_user(admin());

    client
        .set_availability(&station, true, &admin_id)
        .await
        .unwrap();
    client
        .set_availability(&station, true, &admin_id)
        .await
        .unwrap();

    let log = client
        .availability_log(&station, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(log.total, 2);
    assert!(log.items.iter().all(|entry| entry.content.is_available));
}

#[tokio::test]
async fn set_price_appends_history_and_updates_current() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let admin_id = client.database.add_user(admin());

    client.set_price(&station, 11.0, &admin_id).await.unwrap();
    let updated = client.set_price(&station, 12.5, &admin_id).await.unwrap();
    assert_eq!(updated.content.price_per_kg, Some(12.5));

    let history = client
        .price_history(&station, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total, 2);
    // Newest first, and the newest entry is the current price.
    assert_eq!(history.items[0].content.price_per_kg, 12.5);
    assert!(
        history.items[0].content.effective_from
            >= history.items[1].content.effective_from
    );
}

#[tokio::test]
async fn set_price_rejects_negative() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let admin_id = client.database.add_user(admin());

    let result = client.set_price(&station, -0.01, &admin_id).await;
    assert!(matches!(result, Err(RequestError::InvalidValue(_))));
}

#[tokio::test]
async fn set_availability_unknown_station_is_not_found() {
    let client = client();
    let admin_id = client.database.add_user(admin());
    let ghost: Id<Station> = Id::new("station-9999".to_owned());

    let result = client.set_availability(&ghost, false, &admin_id).await;
    assert!(matches!(result, Err(RequestError::NotFound)));
}

// Nearby search

#[tokio::test]
async fn nearby_ranks_available_first_and_counts() {
    let client = client();
    // Center at the origin-ish; distances grow with longitude offset.
    client.database.add_station(station_at(6.50, 3.35, true)); // s1
    client.database.add_station(station_at(6.50, 3.34, false)); // s2, closer
    client.database.add_station(station_at(6.50, 3.39, true)); // s3, farther

    let ranked = client
        .find_nearby(6.50, 3.33, 25.0, false)
        .await
        .unwrap();

    assert_eq!(ranked.available_count, 2);
    assert_eq!(ranked.unavailable_count, 1);
    assert_eq!(ranked.outcome(), NearbyOutcome::Available);
    // Available stations precede the closer unavailable one.
    assert!(ranked.ordered[0].content.content.is_available);
    assert!(ranked.ordered[1].content.content.is_available);
    assert!(!ranked.ordered[2].content.content.is_available);
    assert!(ranked.ordered[0].distance_km <= ranked.ordered[1].distance_km);
}

#[tokio::test]
async fn nearby_excludes_inactive_stations() {
    let client = client();
    let mut closed = station_at(6.50, 3.35, true);
    closed.is_active = false;
    client.database.add_station(closed);

    let ranked = client
        .find_nearby(6.50, 3.35, 10.0, false)
        .await
        .unwrap();
    assert_eq!(ranked.outcome(), NearbyOutcome::NoneInRadius);
}

#[tokio::test]
async fn nearby_distinguishes_empty_from_all_unavailable() {
    let client = client();
    let ranked = client
        .find_nearby(6.50, 3.35, 5.0, false)
        .await
        .unwrap();
    assert_eq!(ranked.outcome(), NearbyOutcome::NoneInRadius);

    client.database.add_station(station_at(6.50, 3.35, false));
    let ranked = client
        .find_nearby(6.50, 3.35, 5.0, false)
        .await
        .unwrap();
    assert_eq!(ranked.outcome(), NearbyOutcome::NoneAvailable);
    assert_eq!(ranked.unavailable_count, 1);
}

#[tokio::test]
async fn nearby_includes_station_exactly_at_boundary() {
    let client = client();
    let (center_lat, center_lon) = (6.50, 3.33);
    let station = station_at(6.50, 3.43, true);
    // Radius chosen as the exact distance to the station; inclusion is
    // <=, not <.
    let radius_km = utility::geo::haversine_distance(
        center_lat,
        center_lon,
        station.latitude,
        station.longitude,
    );
    client.database.add_station(station);

    let ranked = client
        .find_nearby(center_lat, center_lon, radius_km, false)
        .await
        .unwrap();
    assert_eq!(ranked.available_count, 1);
}

#[tokio::test]
async fn nearby_rejects_out_of_range_center() {
    let client = client();
    let result = client.find_nearby(91.0, 0.0, 5.0, false).await;
    assert!(matches!(result, Err(RequestError::InvalidValue(_))));
}

// Access policy

#[tokio::test]
async fn admin_manages_everything() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let admin_id = client.database.add_user(admin());
    let actor = WithId::new(admin_id, admin());

    assert!(client.can_manage(&actor, &station).await.unwrap());
}

#[tokio::test]
async fn ledger_assignment_grants_exactly_one_station() {
    let client = client();
    let station_x = client.database.add_station(Station::example_data());
    let station_y = client.database.add_station(Station::example_data());
    let manager_id = client.database.add_user(manager("m1"));
    let admin_id = client.database.add_user(admin());

    client
        .assign_manager(&station_x, &manager_id, &admin_id)
        .await
        .unwrap();

    let actor = WithId::new(manager_id, manager("m1"));
    assert!(client.can_manage(&actor, &station_x).await.unwrap());
    assert!(!client.can_manage(&actor, &station_y).await.unwrap());
}

#[tokio::test]
async fn legacy_pointer_still_grants_access() {
    let client = client();
    let station = client.database.add_station(Station::example_data());

    let mut legacy = manager("m1");
    legacy.station_id = Some(station.clone());
    let manager_id = client.database.add_user(legacy.clone());

    let actor = WithId::new(manager_id, legacy);
    assert!(client.can_manage(&actor, &station).await.unwrap());
}

// Accounts

#[tokio::test]
async fn login_round_trip_and_token_resolution() {
    let client = client();
    let session = client
        .register(NewUser {
            name: "Ada Obi".to_owned(),
            email: "ada@example.test".to_owned(),
            password: "correct horse".to_owned(),
            role: Role::Admin,
            station_id: None,
            is_active: true,
        })
        .await
        .unwrap();

    let resolved = client.user_by_token(&session.token).await.unwrap();
    assert_eq!(resolved.id, session.user.id);

    let relogin = client
        .login("ada@example.test", "correct horse")
        .await
        .unwrap();
    assert_eq!(relogin.user.id, session.user.id);

    let wrong = client.login("ada@example.test", "wrong").await;
    assert!(matches!(wrong, Err(RequestError::InvalidCredentials)));
    let unknown = client.login("nobody@example.test", "pw").await;
    assert!(matches!(unknown, Err(RequestError::InvalidCredentials)));
}

#[tokio::test]
async fn logout_revokes_token_and_refresh_rotates() {
    let client = client();
    let session = client
        .register(NewUser {
            name: "Ada Obi".to_owned(),
            email: "ada@example.test".to_owned(),
            password: "correct horse".to_owned(),
            role: Role::Admin,
            station_id: None,
            is_active: true,
        })
        .await
        .unwrap();

    client.logout(&session.token).await.unwrap();
    let gone = client.user_by_token(&session.token).await;
    assert!(matches!(gone, Err(RequestError::NotFound)));

    let token = client.refresh(&session.user.id).await.unwrap();
    let rotated = client.refresh(&session.user.id).await.unwrap();
    // The old token dies with the rotation.
    assert!(client.user_by_token(&token).await.is_err());
    assert!(client.user_by_token(&rotated).await.is_ok());
}

#[tokio::test]
async fn inactive_account_cannot_login() {
    let client = client();
    client
        .register(NewUser {
            name: "Gone".to_owned(),
            email: "gone@example.test".to_owned(),
            password: "password123".to_owned(),
            role: Role::StationManager,
            station_id: None,
            is_active: false,
        })
        .await
        .unwrap();

    let result = client.login("gone@example.test", "password123").await;
    assert!(matches!(result, Err(RequestError::InvalidCredentials)));
}

// Manager directory

#[tokio::test]
async fn manager_listing_carries_assignment_summary() {
    let client = client();
    let station = client.database.add_station(Station::example_data());
    let assigned = client.database.add_user(manager("assigned"));
    client.database.add_user(manager("unassigned"));
    let admin_id = client.database.add_user(admin());

    client
        .assign_manager(&station, &assigned, &admin_id)
        .await
        .unwrap();

    let page = client
        .list_managers(&Default::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let summary = page
        .items
        .iter()
        .find(|s| s.manager.id == assigned)
        .unwrap();
    assert!(summary.is_assigned());
    assert_eq!(
        summary.active_assignment.as_ref().unwrap().content.station_id,
        station
    );
}

#[tokio::test]
async fn get_manager_hides_non_manager_accounts() {
    let client = client();
    let admin_id = client.database.add_user(admin());

    let result = client.get_manager(&admin_id).await;
    assert!(matches!(result, Err(RequestError::NotFound)));
}
