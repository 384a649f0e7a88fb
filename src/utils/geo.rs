/// Average urban speed assumed when estimating driver arrival, in km/h.
/// Deliberately a flat constant, not a routing-engine figure.
pub const AVG_URBAN_SPEED_KMH: f64 = 30.0;

/// Calculate distance between two coordinates using Haversine formula
/// Returns distance in kilometers
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Rough arrival estimate from the driver's position to a pickup point,
/// rounded to the nearest minute. An approximation, not a promise.
pub fn eta_minutes(driver_lat: f64, driver_lng: f64, pickup_lat: f64, pickup_lng: f64) -> i64 {
    let distance_km = haversine_distance(driver_lat, driver_lng, pickup_lat, pickup_lng);
    (distance_km / AVG_URBAN_SPEED_KMH * 60.0).round() as i64
}

/// Whether a (lat, lng) pair is a plausible coordinate.
pub fn valid_coords(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}
