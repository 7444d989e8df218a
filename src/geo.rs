//! Spherical geometry helpers

/// Mean earth radius used by the in-process store
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Search radius of the bounded nearest query
pub const NEAREST_MAX_DISTANCE_METERS: f64 = 10_000.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = to_radians(longitude_2) - to_radians(longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Meters to kilometers, rounded to three decimals.
pub fn meters_to_km(meters: f64) -> f64 {
    (meters / 1000.0 * 1000.0).round() / 1000.0
}

pub fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

pub fn is_valid_longitude(long: f64) -> bool {
    (-180.0..=180.0).contains(&long)
}
