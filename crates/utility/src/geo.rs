pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Great-circle distance in kilometers between two coordinates given in
/// decimal degrees, via the haversine formula.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = to_radians(latitude_2 - latitude_1);
    let dlon = to_radians(longitude_2 - longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Rectangular window guaranteed to contain the circle of `radius_km`
/// around the center. Used as a coarse database prefilter, the exact
/// distance check happens afterwards.
///
/// Returns `((min_lat, min_lon), (max_lat, max_lon))` in degrees.
pub fn calculate_bounding_box(
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> ((f64, f64), (f64, f64)) {
    let lat_rad = to_radians(latitude);
    let lon_rad = to_radians(longitude);

    let angular_radius = radius_km / EARTH_RADIUS_KM;

    let min_lat = lat_rad - angular_radius;
    let max_lat = lat_rad + angular_radius;

    // Longitude window widens towards the poles.
    let min_lon = lon_rad - angular_radius / lat_rad.cos();
    let max_lon = lon_rad + angular_radius / lat_rad.cos();

    (
        (to_degrees(min_lat), to_degrees(min_lon)),
        (to_degrees(max_lat), to_degrees(max_lon)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn distance_to_self_is_zero() {
        let distance = haversine_distance(54.3233, 10.1228, 54.3233, 10.1228);
        assert!(distance.abs() < 1e-9);
    }

    #[test]
    fn known_distance_kiel_to_hamburg() {
        // Kiel Hbf to Hamburg Hbf, roughly 86 km apart.
        let distance = haversine_distance(54.3146, 10.1319, 53.5530, 10.0069);
        assert!((distance - 85.0).abs() < 3.0, "got {distance}");
    }

    #[test]
    fn bounding_box_contains_center() {
        let ((min_lat, min_lon), (max_lat, max_lon)) =
            calculate_bounding_box(6.5244, 3.3792, 10.0);
        assert!(min_lat < 6.5244 && 6.5244 < max_lat);
        assert!(min_lon < 3.3792 && 3.3792 < max_lon);
    }

    #[test]
    fn bounding_box_covers_points_inside_radius() {
        let (lat, lon, radius) = (6.5244, 3.3792, 25.0);
        let ((min_lat, min_lon), (max_lat, max_lon)) =
            calculate_bounding_box(lat, lon, radius);
        // A point a few kilometers east of the center must fall inside.
        let (p_lat, p_lon) = (lat, lon + 0.05);
        assert!(haversine_distance(lat, lon, p_lat, p_lon) < radius);
        assert!(min_lat <= p_lat && p_lat <= max_lat);
        assert!(min_lon <= p_lon && p_lon <= max_lon);
    }

    proptest! {
        #[test]
        fn distance_is_symmetric(
            lat1 in -80.0f64..80.0,
            lon1 in -179.0f64..179.0,
            lat2 in -80.0f64..80.0,
            lon2 in -179.0f64..179.0,
        ) {
            let forward = haversine_distance(lat1, lon1, lat2, lon2);
            let backward = haversine_distance(lat2, lon2, lat1, lon1);
            prop_assert!((forward - backward).abs() < 1e-6);
        }

        #[test]
        fn distance_is_non_negative(
            lat1 in -90.0f64..90.0,
            lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0,
            lon2 in -180.0f64..180.0,
        ) {
            prop_assert!(haversine_distance(lat1, lon1, lat2, lon2) >= 0.0);
        }
    }
}
