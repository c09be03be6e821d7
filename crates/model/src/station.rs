use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo;
use utility::id::HasId;

use crate::{ExampleData, WithDistance};

/// A physical LPG refill station.
///
/// `is_active` is the permanent open/closed state, `is_available` the
/// day-to-day operational readiness. Both are needed: an active station
/// may be out of gas, an inactive one never shows up in searches at all.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Station {
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

impl HasId for Station {
    type IdType = String;
}

impl Station {
    pub fn with_distance_to(
        self,
        latitude: f64,
        longitude: f64,
    ) -> WithDistance<Self> {
        let distance = geo::haversine_distance(
            latitude,
            longitude,
            self.latitude,
            self.longitude,
        );
        WithDistance::new(distance, self)
    }

    /// Domain-level validity: coordinates in degree range, price non-negative.
    /// Syntactic validation happens at the HTTP boundary, this is the last line.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err("latitude out of range");
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err("longitude out of range");
        }
        if matches!(self.price_per_kg, Some(price) if price < 0.0) {
            return Err("price must be non-negative");
        }
        Ok(())
    }
}

impl ExampleData for Station {
    fn example_data() -> Self {
        Self {
            name: "GasPoint Ikeja".to_owned(),
            address: "23 Obafemi Awolowo Way, Ikeja, Lagos".to_owned(),
            phone: "+234-801-234-5678".to_owned(),
            email: "ikeja@gaspoint.example".to_owned(),
            is_available: true,
            is_active: true,
            price_per_kg: Some(1250.0),
            operating_hours: "Mon-Sat 8:00-20:00".to_owned(),
            image: None,
            latitude: 6.6018,
            longitude: 3.3515,
        }
    }
}
