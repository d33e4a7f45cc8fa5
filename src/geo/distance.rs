//! Great-circle calculations on a spherical earth

use super::coordinates::Coordinates;

/// Mean earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers.
pub fn calculate_distance(a: &Coordinates, b: &Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial compass bearing in degrees `[0, 360)` from `start` towards `end`.
pub fn get_bearing(start: &Coordinates, end: &Coordinates) -> f64 {
    let start_lat = start.lat.to_radians();
    let end_lat = end.lat.to_radians();
    let d_lng = (end.lng - start.lng).to_radians();

    let y = d_lng.sin() * end_lat.cos();
    let x = start_lat.cos() * end_lat.sin() - start_lat.sin() * end_lat.cos() * d_lng.cos();

    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    // -0.0 and values rounding up to 360.0 both belong at north
    if bearing >= 360.0 || bearing == 0.0 {
        0.0
    } else {
        bearing
    }
}

/// The point reached after `distance_km` along `bearing` degrees from `start`.
pub fn get_destination(start: &Coordinates, bearing: f64, distance_km: f64) -> Coordinates {
    let bearing = bearing.to_radians();
    let start_lat = start.lat.to_radians();
    let start_lng = start.lng.to_radians();
    let angular = distance_km / EARTH_RADIUS_KM;

    let end_lat = (start_lat.sin() * angular.cos()
        + start_lat.cos() * angular.sin() * bearing.cos())
    .asin();

    let end_lng = start_lng
        + (bearing.sin() * angular.sin() * start_lat.cos())
            .atan2(angular.cos() - start_lat.sin() * end_lat.sin());

    Coordinates {
        lat: end_lat.to_degrees(),
        lng: end_lng.to_degrees(),
    }
}

/// Short compass label (N, NE, E, ...) for a bearing in degrees.
pub fn compass_point(bearing: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    if !bearing.is_finite() {
        return "?";
    }
    let idx = ((bearing.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
    POINTS[idx]
}
