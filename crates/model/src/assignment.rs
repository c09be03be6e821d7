use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{station::Station, user::User, ExampleData};

/// Reason written to an assignment row that is closed because a new
/// manager takes over.
pub const REPLACED_REASON: &str = "Replaced by another manager";

/// Default reason when a manager is removed without one.
pub const REMOVED_REASON: &str = "Manager removed";

/// One interval in the manager ledger: who managed which station, from
/// when to when, and on whose authority. Rows are never deleted, removal
/// only sets `removed_at` and a reason.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagerAssignment {
    pub manager_id: Id<User>,
    pub station_id: Id<Station>,
    pub assigned_by: Id<User>,
    pub assigned_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removal_reason: Option<String>,
}

impl HasId for ManagerAssignment {
    type IdType = String;
}

impl ManagerAssignment {
    /// An assignment is active while it has not been closed.
    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}

impl ExampleData for ManagerAssignment {
    fn example_data() -> Self {
        Self {
            manager_id: Id::new("0b8f8a84-52c5-4ed9-a24b-10a0d6e0f0c1".to_owned()),
            station_id: Id::new("7f2b1c4e-9a3d-4f6b-8c1a-2d5e7f9a0b3c".to_owned()),
            assigned_by: Id::new("c1a2b3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d".to_owned()),
            assigned_at: DateTime::parse_from_rfc3339("2025-12-20T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            removed_at: None,
            removal_reason: None,
        }
    }
}
