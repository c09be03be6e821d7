//! Two-tier ordering of radius search results.
//!
//! Available stations come first, unavailable ones after, each group
//! sorted by distance. The counts always describe the full radius
//! result, so callers can tell "nothing in range" apart from "in range
//! but nothing available".

use model::{station::Station, WithDistance, WithId};

/// Radius search result after ranking.
#[derive(Debug, Clone)]
pub struct RankedStations {
    pub ordered: Vec<WithDistance<WithId<Station>>>,
    pub available_count: usize,
    pub unavailable_count: usize,
}

/// The three user-facing outcomes of a nearby search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearbyOutcome {
    /// No station inside the radius at all.
    NoneInRadius,
    /// Stations exist inside the radius but none currently serves.
    NoneAvailable,
    /// At least one available station.
    Available,
}

impl RankedStations {
    pub fn outcome(&self) -> NearbyOutcome {
        if self.available_count == 0 && self.unavailable_count == 0 {
            NearbyOutcome::NoneInRadius
        } else if self.available_count == 0 {
            NearbyOutcome::NoneAvailable
        } else {
            NearbyOutcome::Available
        }
    }
}

/// Rank stations available-first, then by distance ascending. Distance
/// ties break on the station id so the order is total and reproducible.
///
/// With `available_only` the unavailable partition is dropped from
/// `ordered` but still reflected in `unavailable_count`.
pub fn rank(
    stations: Vec<WithDistance<WithId<Station>>>,
    available_only: bool,
) -> RankedStations {
    let (mut available, mut unavailable): (Vec<_>, Vec<_>) = stations
        .into_iter()
        .partition(|station| station.content.content.is_available);

    sort_by_distance(&mut available);
    sort_by_distance(&mut unavailable);

    let available_count = available.len();
    let unavailable_count = unavailable.len();

    let ordered = if available_only {
        available
    } else {
        available.extend(unavailable);
        available
    };

    RankedStations {
        ordered,
        available_count,
        unavailable_count,
    }
}

fn sort_by_distance(stations: &mut [WithDistance<WithId<Station>>]) {
    stations.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.content.id.cmp(&b.content.id))
    });
}
