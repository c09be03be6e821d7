use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::user::User;

/// A single recorded request. Written best-effort from the tracking
/// middleware; a failed insert must never fail the request itself.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub ip_address: String,
    pub url: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub user_id: Option<Id<User>>,
    pub response_code: Option<u16>,
    pub response_time_ms: Option<u32>,
}

impl HasId for Visit {
    type IdType = String;
}
