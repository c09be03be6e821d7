//! Authorization predicate: may this actor manage this station?
//!
//! Two ownership signals coexist while the legacy direct pointer is
//! migrated into the assignment ledger; both are honored. The predicate
//! answers "no" as a value, never as an error.

use model::{station::Station, user::User, WithId};
use utility::id::Id;

use crate::database::{AssignmentRepo, Result};

/// Admins manage every station. Station managers manage the station
/// their legacy `station_id` points at, or the one they hold an active
/// ledger assignment for. Everything else is denied.
pub async fn can_manage<O>(
    ops: &mut O,
    actor: &WithId<User>,
    station: &Id<Station>,
) -> Result<bool>
where
    O: AssignmentRepo + Send,
{
    if actor.content.is_admin() {
        return Ok(true);
    }

    if !actor.content.is_station_manager() {
        return Ok(false);
    }

    if actor.content.station_id.as_ref() == Some(station) {
        return Ok(true);
    }

    ops.has_active_assignment(&actor.id, station).await
}
