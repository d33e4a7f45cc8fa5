//! Pure coordinate math for map displays
//!
//! Nothing here panics or returns errors. NaN or out of range input comes
//! back as NaN or `false`; use [`is_valid_coordinate`] to check input first.

mod coordinates;
mod distance;
mod viewport;

pub use self::coordinates::{Bounds, Coordinates, Pixel, format_coordinates, is_valid_coordinate};
pub use self::distance::{
    EARTH_RADIUS_KM, calculate_distance, compass_point, get_bearing, get_destination,
};
pub use self::viewport::{
    CHICAGO, LOS_ANGELES, MAP_PRESETS, MapPreset, NEW_YORK, calculate_bounds, calculate_center,
    calculate_zoom_level, coordinate_to_pixel, is_within_bounds, pixel_to_coordinate, preset_for,
};
