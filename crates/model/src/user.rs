use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    assignment::ManagerAssignment, station::Station, ExampleData, WithId,
};

/// The two roles the API knows. The wire form keeps the original
/// database values ("admin" / "station").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(rename = "station")]
    StationManager,
}

impl Role {
    pub fn display(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::StationManager => "Station Manager",
        }
    }
}

/// An account that can act on the API: an administrator or a station
/// manager. `station_id` is the legacy direct assignment pointer, kept
/// alongside the assignment ledger while the migration lasts.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub station_id: Option<Id<Station>>,
    pub is_active: bool,
}

impl HasId for User {
    type IdType = String;
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_station_manager(&self) -> bool {
        self.role == Role::StationManager
    }
}

/// A manager directory row: the account plus its current assignment, if
/// any. Built by the client, not persisted.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSummary {
    #[serde(flatten)]
    pub manager: WithId<User>,
    pub active_assignment: Option<WithId<ManagerAssignment>>,
}

impl ManagerSummary {
    pub fn is_assigned(&self) -> bool {
        self.active_assignment.is_some()
    }
}

impl ExampleData for User {
    fn example_data() -> Self {
        Self {
            name: "Ada Obi".to_owned(),
            email: "ada.obi@gaspoint.example".to_owned(),
            role: Role::StationManager,
            station_id: None,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_form_matches_database_values() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&Role::StationManager).unwrap(),
            "\"station\""
        );
    }

    #[test]
    fn role_predicates() {
        let mut user = User::example_data();
        assert!(user.is_station_manager());
        assert!(!user.is_admin());
        user.role = Role::Admin;
        assert!(user.is_admin());
    }
}
