use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{station::Station, user::User};

/// Append-only record of an availability flip. One row is written per
/// toggle call, even when the value did not change, so the log doubles
/// as an activity trail.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityLogEntry {
    pub station_id: Id<Station>,
    pub is_available: bool,
    pub changed_by: Option<Id<User>>,
    pub changed_at: DateTime<Utc>,
}

impl HasId for AvailabilityLogEntry {
    type IdType = String;
}

/// Append-only price point. The station's current price is the entry
/// with the latest `effective_from`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub station_id: Id<Station>,
    pub price_per_kg: f64,
    pub effective_from: DateTime<Utc>,
    pub updated_by: Option<Id<User>>,
}

impl HasId for PriceHistoryEntry {
    type IdType = String;
}
